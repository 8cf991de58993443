//! Two-stage document validation: local preflight, then remote dry-run.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use fusion_client::DefinitionsApi;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::document::{WorkflowDocument, file_label};

/// Keys every workflow document must define at the top level.
const REQUIRED_KEYS: [&str; 2] = ["name", "trigger"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PLACEHOLDER_[A-Z_]+").expect("static pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One preflight finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "WARNING: {}", self.message),
            Severity::Error => write!(f, "ERROR: {}", self.message),
        }
    }
}

/// Structural checks that need no remote call.
///
/// Text scanning only: a leading `#` header line (warning), top-level
/// `name:` and `trigger:` keys (errors), and no unresolved
/// `PLACEHOLDER_*` markers (error).
pub fn preflight_check(content: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    if !content.lines().next().is_some_and(|l| l.starts_with('#')) {
        issues.push(Issue::warning(
            "Missing header comment (first line should start with #)",
        ));
    }

    for key in REQUIRED_KEYS {
        let defined = content.lines().any(|line| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with(':'))
        });
        if !defined {
            issues.push(Issue::error(format!(
                "Missing required top-level key '{}'",
                key
            )));
        }
    }

    let mut markers: Vec<&str> = PLACEHOLDER.find_iter(content).map(|m| m.as_str()).collect();
    if !markers.is_empty() {
        markers.sort_unstable();
        markers.dedup();
        issues.push(Issue::error(format!(
            "Found PLACEHOLDER markers that must be replaced: {}",
            markers.join(", ")
        )));
    }

    issues
}

/// Outcome of the remote dry-run stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum RemoteCheck {
    /// Preflight errors stopped validation first.
    NotRun,
    /// Only preflight was requested.
    Skipped,
    Passed,
    Failed(String),
}

/// Validation result for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub file: String,
    pub passed: bool,
    pub issues: Vec<Issue>,
    pub remote: RemoteCheck,
}

impl ValidationReport {
    /// Human-readable lines, in the order the checks ran.
    pub fn messages(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.issues.iter().map(Issue::to_string).collect();
        match &self.remote {
            RemoteCheck::NotRun => {
                lines.push("Pre-flight FAILED - fix errors above before API validation".to_string())
            }
            RemoteCheck::Skipped if self.issues.is_empty() => {
                lines.push("Pre-flight passed".to_string())
            }
            RemoteCheck::Skipped => {}
            RemoteCheck::Passed => lines.push("API validation passed".to_string()),
            RemoteCheck::Failed(reason) => lines.push(format!("API validation FAILED: {}", reason)),
        }
        lines
    }

    /// The reason validation failed, if it did.
    pub fn failure_reason(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        match &self.remote {
            RemoteCheck::Failed(reason) => Some(reason.clone()),
            _ => Some(
                self.issues
                    .iter()
                    .filter(|i| i.is_error())
                    .map(|i| i.message.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Preflight a file without contacting the service.
pub fn preflight_path(path: &Path) -> ValidationReport {
    with_document(path, |document| check(document, None))
}

fn with_document<F>(path: &Path, validate: F) -> ValidationReport
where
    F: FnOnce(&WorkflowDocument) -> ValidationReport,
{
    match WorkflowDocument::read(path) {
        Ok(document) => validate(&document),
        Err(e) => ValidationReport {
            file: file_label(path),
            passed: false,
            issues: vec![Issue::error(e.to_string())],
            remote: RemoteCheck::NotRun,
        },
    }
}

/// Preflight, then the remote dry-run when `remote` is given.
fn check(document: &WorkflowDocument, remote: Option<&DefinitionsApi>) -> ValidationReport {
    let file = document.file_name();
    let issues = preflight_check(&document.content);

    if issues.iter().any(Issue::is_error) {
        debug!(file = %file, "Preflight failed");
        return ValidationReport {
            file,
            passed: false,
            issues,
            remote: RemoteCheck::NotRun,
        };
    }
    let Some(definitions) = remote else {
        return ValidationReport {
            file,
            passed: true,
            issues,
            remote: RemoteCheck::Skipped,
        };
    };

    let remote = match definitions.validate(&document.upload()) {
        Ok(()) => RemoteCheck::Passed,
        Err(failure) => RemoteCheck::Failed(failure.message),
    };
    debug!(file = %file, ?remote, "Remote validation finished");
    ValidationReport {
        file,
        passed: remote == RemoteCheck::Passed,
        issues,
        remote,
    }
}

/// Runs preflight and the remote dry-run.
#[derive(Debug, Clone)]
pub struct ValidationService {
    definitions: DefinitionsApi,
}

impl ValidationService {
    pub fn new(definitions: DefinitionsApi) -> Self {
        Self { definitions }
    }

    /// Validate one document. Preflight errors stop before any remote call.
    pub fn validate(&self, document: &WorkflowDocument, preflight_only: bool) -> ValidationReport {
        check(document, (!preflight_only).then_some(&self.definitions))
    }

    /// Read and validate a file. An unreadable file fails validation.
    pub fn validate_path(&self, path: &Path, preflight_only: bool) -> ValidationReport {
        with_document(path, |document| self.validate(document, preflight_only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::definitions;
    use fusion_client::{Envelope, InMemoryGateway, endpoints};
    use std::sync::Arc;

    const GOOD: &str = "# Contain a host\nname: Contain Host\ntrigger:\n  type: On demand\n";

    #[test]
    fn test_clean_document_has_no_issues() {
        assert!(preflight_check(GOOD).is_empty());
    }

    #[test]
    fn test_missing_header_is_warning() {
        let issues = preflight_check("name: X\ntrigger:\n  type: On demand\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_keys_are_errors() {
        let issues = preflight_check("# header\n  name: indented\n");
        let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("'name'"));
        assert!(errors[1].message.contains("'trigger'"));
    }

    #[test]
    fn test_placeholders_sorted_and_unique() {
        let doc = format!("{}host: PLACEHOLDER_HOST\nid: PLACEHOLDER_DEVICE_ID\nx: PLACEHOLDER_HOST\n", GOOD);
        let issues = preflight_check(&doc);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].to_string(),
            "ERROR: Found PLACEHOLDER markers that must be replaced: PLACEHOLDER_DEVICE_ID, PLACEHOLDER_HOST"
        );
    }

    #[test]
    fn test_preflight_errors_skip_remote() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = ValidationService::new(definitions(&gateway));

        let report = service.validate(&WorkflowDocument::new("bad.yaml", "# x\n"), false);
        assert!(!report.passed);
        assert_eq!(report.remote, RemoteCheck::NotRun);
        assert_eq!(gateway.count(endpoints::DEFINITIONS_IMPORT), 0);
    }

    #[test]
    fn test_remote_failure_fails_validation() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("POST", endpoints::DEFINITIONS_IMPORT, |_| {
            Ok(Envelope::with_errors(["activity not found", "bad ref"]))
        });
        let service = ValidationService::new(definitions(&gateway));

        let report = service.validate(&WorkflowDocument::new("wf.yaml", GOOD), false);
        assert!(!report.passed);
        assert_eq!(report.failure_reason().as_deref(), Some("activity not found; bad ref"));
        assert_eq!(
            report.messages().last().unwrap(),
            "API validation FAILED: activity not found; bad ref"
        );
    }

    #[test]
    fn test_preflight_only_passes_without_remote() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = ValidationService::new(definitions(&gateway));

        let report = service.validate(&WorkflowDocument::new("wf.yaml", GOOD), true);
        assert!(report.passed);
        assert_eq!(report.messages(), vec!["Pre-flight passed".to_string()]);
        assert!(gateway.requests().is_empty());
    }

    #[test]
    fn test_preflight_path_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wf.yaml");
        std::fs::write(&path, GOOD).unwrap();

        let report = preflight_path(&path);
        assert!(report.passed);
        assert_eq!(report.file, "wf.yaml");

        let missing = preflight_path(&dir.path().join("missing.yaml"));
        assert!(!missing.passed);
        assert_eq!(missing.remote, RemoteCheck::NotRun);
        assert_eq!(missing.file, "missing.yaml");
    }
}
