//! Import lifecycle over a batch of workflow documents.
//!
//! Each document moves one way through
//! `Pending -> (Duplicate | ValidationFailed | ImportFailed | Imported)`,
//! evaluated in a fixed order:
//!
//! 1. duplicate check against a name index built once for the batch,
//! 2. local preflight, then the remote dry-run,
//! 3. the real import.
//!
//! One item failing never stops the batch; every run yields one
//! [`BatchReport`].

use std::fmt;
use std::path::{Path, PathBuf};

use fusion_client::DefinitionsApi;
use serde::Serialize;
use tracing::{info, warn};

use super::definitions::{DefinitionService, DuplicateIndex};
use super::document::{SharedNameExtractor, WorkflowDocument, file_label};
use super::validation::ValidationService;

/// Which stages to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub skip_validate: bool,
    pub skip_duplicate_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    Duplicate,
    ValidationFailed,
    ImportFailed,
    Imported,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::ValidationFailed | Self::ImportFailed)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Duplicate => "DUPLICATE",
            Self::ValidationFailed => "VALIDATION FAILED",
            Self::ImportFailed => "IMPORT FAILED",
            Self::Imported => "IMPORTED",
        })
    }
}

/// Lifecycle record for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportItem {
    pub file: String,
    #[serde(skip)]
    pub file_reference: PathBuf,
    /// Name extracted from the document, if any.
    pub source_name: Option<String>,
    pub status: ImportStatus,
    /// Set only when imported.
    pub resulting_id: Option<String>,
    /// Id of the existing definition, for duplicates.
    pub existing_id: Option<String>,
    /// Why the item stopped, for duplicates and failures.
    pub reason: Option<String>,
    /// Validation messages, in order.
    pub messages: Vec<String>,
}

impl ImportItem {
    pub fn pending(path: &Path) -> Self {
        Self {
            file: file_label(path),
            file_reference: path.to_path_buf(),
            source_name: None,
            status: ImportStatus::Pending,
            resulting_id: None,
            existing_id: None,
            reason: None,
            messages: Vec::new(),
        }
    }

    /// Move to a terminal state. Terminal states never change.
    fn finish(&mut self, status: ImportStatus, reason: Option<String>) {
        if self.status.is_terminal() {
            warn!(file = %self.file, from = %self.status, to = %status, "Ignoring transition out of a terminal state");
            return;
        }
        info!(file = %self.file, status = %status, "Import item finished");
        self.status = status;
        self.reason = reason;
    }
}

/// How the duplicate index was obtained for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexStatus {
    /// Duplicate checking was turned off.
    Skipped,
    /// Built from a fresh listing. When incomplete, misses may be wrong.
    Fresh { count: usize, complete: bool },
    /// The listing failed; duplicate checking was disabled for the batch.
    Unavailable { reason: String },
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ImportItem>,
    pub index: IndexStatus,
}

impl BatchReport {
    fn count(&self, status: ImportStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn imported(&self) -> usize {
        self.count(ImportStatus::Imported)
    }

    pub fn duplicates(&self) -> usize {
        self.count(ImportStatus::Duplicate)
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_failure()).count()
    }

    /// True when any item is a duplicate or failed; the process should exit
    /// non-zero.
    pub fn has_failures(&self) -> bool {
        self.duplicates() > 0 || self.failed() > 0
    }
}

/// Drives documents through duplicate check, validation and import.
#[derive(Debug, Clone)]
pub struct ImportOrchestrator {
    definitions: DefinitionService,
    validation: ValidationService,
    api: DefinitionsApi,
    extractor: SharedNameExtractor,
}

impl ImportOrchestrator {
    pub fn new(
        definitions: DefinitionService,
        validation: ValidationService,
        api: DefinitionsApi,
        extractor: SharedNameExtractor,
    ) -> Self {
        Self {
            definitions,
            validation,
            api,
            extractor,
        }
    }

    /// Process every file in order.
    pub fn run(&self, paths: &[PathBuf], options: ImportOptions) -> BatchReport {
        let (index, index_status) = self.prepare_index(options);

        let items = paths
            .iter()
            .map(|path| self.process(path, index.as_ref(), options))
            .collect();

        BatchReport {
            items,
            index: index_status,
        }
    }

    /// The duplicate index is always built from a fresh listing, never cache.
    fn prepare_index(&self, options: ImportOptions) -> (Option<DuplicateIndex>, IndexStatus) {
        if options.skip_duplicate_check {
            return (None, IndexStatus::Skipped);
        }
        match self.definitions.duplicate_index() {
            Ok(index) => {
                if !index.complete {
                    warn!(count = index.count, "Definition listing incomplete, duplicates may be missed");
                }
                let status = IndexStatus::Fresh {
                    count: index.count,
                    complete: index.complete,
                };
                (Some(index), status)
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch existing workflows, skipping duplicate check");
                (
                    None,
                    IndexStatus::Unavailable {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    fn process(&self, path: &Path, index: Option<&DuplicateIndex>, options: ImportOptions) -> ImportItem {
        let mut item = ImportItem::pending(path);

        let document = match WorkflowDocument::read(path) {
            Ok(document) => document,
            Err(e) => {
                let status = if options.skip_validate {
                    ImportStatus::ImportFailed
                } else {
                    ImportStatus::ValidationFailed
                };
                item.finish(status, Some(e.to_string()));
                return item;
            }
        };
        item.source_name = self.extractor.extract(&document.content);

        if let (Some(index), Some(name)) = (index, item.source_name.as_deref())
            && let Some(existing) = index.lookup(name)
        {
            let reason = format!("'{}' already exists (ID: {})", name, existing.id);
            item.existing_id = Some(existing.id.clone());
            item.finish(ImportStatus::Duplicate, Some(reason));
            return item;
        }

        if !options.skip_validate {
            let report = self.validation.validate(&document, false);
            item.messages = report.messages();
            if !report.passed {
                item.finish(ImportStatus::ValidationFailed, report.failure_reason());
                return item;
            }
        }

        match self.api.import(&document.upload()) {
            Ok(id) => {
                item.resulting_id = id;
                item.finish(ImportStatus::Imported, None);
            }
            Err(failure) => item.finish(ImportStatus::ImportFailed, Some(failure.message)),
        }
        item
    }
}
