//! Falcon Query Language filter builder.

use std::fmt;

/// A conjunction of `field:'value'` clauses joined with `+`.
///
/// ```
/// use fusion_client::Fql;
///
/// let filter = Fql::new().eq("vendor", "Okta").eq("name", "user");
/// assert_eq!(filter.to_string(), "vendor:'Okta'+name:'user'");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fql {
    clauses: Vec<String>,
}

impl Fql {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field:'value'` clause. Single quotes in the value are escaped.
    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses
            .push(format!("{}:'{}'", field, value.replace('\'', "\\'")));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for Fql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join("+"))
    }
}
