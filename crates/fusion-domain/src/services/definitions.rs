//! Workflow definition queries and duplicate detection.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use fusion_client::{Definition, DefinitionsApi, FieldSchema};
use serde::Serialize;
use tracing::{debug, warn};

use super::document::{SharedNameExtractor, WorkflowDocument, file_label};
use crate::error::{DomainError, Result};

/// Existing definitions keyed by lowercased name.
///
/// Built once per batch so duplicate checks cost one catalog walk no matter
/// how many documents are checked.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    by_name: HashMap<String, Definition>,
    /// Definitions the walk returned.
    pub count: usize,
    /// False when the walk stopped early; a miss may then be a false negative.
    pub complete: bool,
}

impl DuplicateIndex {
    pub fn new(definitions: Vec<Definition>, complete: bool) -> Self {
        let count = definitions.len();
        let mut by_name = HashMap::with_capacity(count);
        for definition in definitions {
            // Later definitions with the same name replace earlier ones.
            by_name.insert(definition.name.to_lowercase(), definition);
        }
        Self {
            by_name,
            count,
            complete,
        }
    }

    /// The existing definition with this name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// A local document whose name already exists remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateDocument {
    pub file: String,
    pub name: String,
    pub existing_id: String,
}

/// A local document with no remote namesake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanDocument {
    pub file: String,
    pub name: String,
}

/// Duplicate check over several documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentCheck {
    pub duplicates: Vec<DuplicateDocument>,
    pub clean: Vec<CleanDocument>,
    /// Files that could not be read or had no name.
    pub skipped: Vec<String>,
    /// False when the definition listing was partial.
    pub complete: bool,
}

impl DocumentCheck {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Queries over stored workflow definitions.
#[derive(Debug, Clone)]
pub struct DefinitionService {
    definitions: DefinitionsApi,
    extractor: SharedNameExtractor,
}

impl DefinitionService {
    pub fn new(definitions: DefinitionsApi, extractor: SharedNameExtractor) -> Self {
        Self {
            definitions,
            extractor,
        }
    }

    /// All stored definitions, always fetched fresh.
    ///
    /// Fails only when nothing could be fetched at all.
    pub fn list(&self) -> Result<(Vec<Definition>, bool)> {
        let set = self.definitions.fetch_all();
        if set.entries.is_empty() && !set.complete {
            return Err(DomainError::CatalogUnavailable);
        }
        if !set.complete {
            warn!(count = set.entries.len(), "Definition listing incomplete");
        }
        Ok((set.entries, set.complete))
    }

    /// Definitions whose name contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Result<Vec<Definition>> {
        let needle = term.to_lowercase();
        let (definitions, _) = self.list()?;
        Ok(definitions
            .into_iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Definitions named exactly `name`, ignoring case.
    pub fn find_by_exact_name(&self, name: &str) -> Result<Vec<Definition>> {
        let needle = name.to_lowercase();
        let (definitions, _) = self.list()?;
        Ok(definitions
            .into_iter()
            .filter(|d| d.name.to_lowercase() == needle)
            .collect())
    }

    /// Build the duplicate index from a fresh listing.
    pub fn duplicate_index(&self) -> Result<DuplicateIndex> {
        let (definitions, complete) = self.list()?;
        debug!(count = definitions.len(), complete, "Built duplicate index");
        Ok(DuplicateIndex::new(definitions, complete))
    }

    /// Check local documents against the stored names.
    pub fn check_documents(&self, paths: &[PathBuf]) -> Result<DocumentCheck> {
        let index = self.duplicate_index()?;
        let mut check = DocumentCheck {
            complete: index.complete,
            ..Default::default()
        };

        for path in paths {
            let file = file_label(path);
            let Some(name) = self.document_name(path) else {
                check.skipped.push(file);
                continue;
            };
            match index.lookup(&name) {
                Some(existing) => check.duplicates.push(DuplicateDocument {
                    file,
                    name,
                    existing_id: existing.id.clone(),
                }),
                None => check.clean.push(CleanDocument { file, name }),
            }
        }
        Ok(check)
    }

    /// Export a definition as YAML.
    pub fn export(&self, id: &str) -> Result<String> {
        Ok(self.definitions.export(id)?)
    }

    /// A definition's declared input parameters.
    pub fn parameter_schema(&self, id: &str) -> Result<BTreeMap<String, FieldSchema>> {
        let definition = self
            .definitions
            .details(id)?
            .ok_or_else(|| DomainError::NotFound(format!("definition '{}'", id)))?;
        let mut schema = definition.parameter_schema();
        for name in definition.required_parameters() {
            if let Some(field) = schema.get_mut(&name) {
                field.required = true;
            }
        }
        Ok(schema)
    }

    fn document_name(&self, path: &Path) -> Option<String> {
        match WorkflowDocument::read(path) {
            Ok(document) => {
                let name = self.extractor.extract(&document.content);
                if name.is_none() {
                    warn!(file = %path.display(), "Could not extract workflow name");
                }
                name
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable document");
                None
            }
        }
    }
}
