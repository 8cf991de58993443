//! Local workflow documents and name extraction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use fusion_client::Upload;
use regex::Regex;

use crate::error::{DomainError, Result};

/// Top-level `name:` line, with optional quotes around the value.
static NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^name:\s*['"]?(.+?)['"]?\s*$"#).expect("static pattern")
});

/// Pulls a human-readable name out of a workflow document.
pub trait NameExtractor: Send + Sync + fmt::Debug {
    fn extract(&self, content: &str) -> Option<String>;
}

pub type SharedNameExtractor = Arc<dyn NameExtractor>;

/// Reads the first unindented `name:` line. No YAML parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopLevelNameExtractor;

impl TopLevelNameExtractor {
    pub fn shared() -> SharedNameExtractor {
        Arc::new(Self)
    }
}

impl NameExtractor for TopLevelNameExtractor {
    fn extract(&self, content: &str) -> Option<String> {
        content.lines().find_map(|line| {
            NAME_LINE
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
    }
}

/// A workflow document read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDocument {
    pub path: PathBuf,
    pub content: String,
}

impl WorkflowDocument {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DomainError::ReadDocument {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, content))
    }

    /// Base name of the file, used in reports.
    pub fn file_name(&self) -> String {
        file_label(&self.path)
    }

    pub fn upload(&self) -> Upload {
        Upload::new(self.file_name(), self.content.as_bytes())
    }
}

/// Base name of `path`, or the whole path when it has none.
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_plain_and_quoted_names() {
        let extractor = TopLevelNameExtractor;
        assert_eq!(
            extractor.extract("# header\nname: Contain Host\ntrigger:\n").as_deref(),
            Some("Contain Host")
        );
        assert_eq!(
            extractor.extract("name: 'Quoted Name'\n").as_deref(),
            Some("Quoted Name")
        );
        assert_eq!(
            extractor.extract("name: \"Double\"   \n").as_deref(),
            Some("Double")
        );
    }

    #[test]
    fn test_ignores_indented_names() {
        let doc = "trigger:\n    name: On demand\nactions:\n  name: Step\n";
        assert_eq!(TopLevelNameExtractor.extract(doc), None);
    }

    #[test]
    fn test_first_top_level_name_wins() {
        let doc = "name: First\nname: Second\n";
        assert_eq!(TopLevelNameExtractor.extract(doc).as_deref(), Some("First"));
    }

    #[test]
    fn test_read_missing_file() {
        let err = WorkflowDocument::read(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, DomainError::ReadDocument { .. }));
    }

    #[test]
    fn test_upload_uses_base_name() {
        let doc = WorkflowDocument::new("/tmp/flows/isolate.yaml", "name: X\n");
        let upload = doc.upload();
        assert_eq!(upload.file_name, "isolate.yaml");
        assert_eq!(upload.content, b"name: X\n");
    }
}
