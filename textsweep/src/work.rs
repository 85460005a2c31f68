/// Work descriptors and the builder that enumerates a directory into them.
///
/// A [`WorkItem`] names one file and carries everything needed to process it. It is
/// plain serde data, so the same value can run on a pool thread or be shipped as a
/// JSON line to a worker process.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::errors::{SweepError, SweepResult};
use crate::filters;
use crate::ops::{Conversion, ExactSearch, FileOperation, FuzzySearch};
use crate::results::OperationResult;

/// Default minimum confidence of the fuzzy searcher
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.85;

/// Default external converter for office documents
pub const DEFAULT_CONVERTER: &str = "pandoc";

/// The operation to perform on a file, with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    ExactSearch {
        query: String,
    },
    FuzzySearch {
        query: String,
        cutoff: f64,
    },
    Convert {
        /// Extensions (with leading dot) copied verbatim into a `.txt` file
        plain_text_extensions: Vec<String>,
        /// Program used to turn office documents into plain text
        converter: String,
    },
}

impl Operation {
    pub fn is_search(&self) -> bool {
        matches!(
            self,
            Operation::ExactSearch { .. } | Operation::FuzzySearch { .. }
        )
    }

    /// Whether this operation wants to see the file at `path`
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            Operation::ExactSearch { .. } | Operation::FuzzySearch { .. } => {
                filters::is_searchable(path)
            }
            Operation::Convert {
                plain_text_extensions,
                ..
            } => filters::is_convertible(path, plain_text_extensions),
        }
    }
}

/// One file-scoped unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub file_name: String,
    pub directory: PathBuf,
    pub operation: Operation,
}

impl WorkItem {
    pub fn new(file_name: impl Into<String>, directory: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            file_name: file_name.into(),
            directory: directory.into(),
            operation,
        }
    }

    /// Full path of the file this item works on
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Runs the operation on the named file.
    ///
    /// Never fails: faults are folded into the returned result.
    pub fn execute(&self) -> OperationResult {
        let path = self.path();
        trace!("Processing {}", path.display());
        match &self.operation {
            Operation::ExactSearch { query } => ExactSearch::new(query).process(&path),
            Operation::FuzzySearch { query, cutoff } => {
                FuzzySearch::new(query, *cutoff).process(&path)
            }
            Operation::Convert {
                plain_text_extensions,
                converter,
            } => Conversion::new(plain_text_extensions.clone(), converter.clone()).process(&path),
        }
    }
}

/// Lists `directory` (one level, no recursion) and builds one work item per file
/// that `operation` accepts. Subdirectories and ineligible files are left out.
pub fn build_work_items(directory: &Path, operation: &Operation) -> SweepResult<Vec<WorkItem>> {
    let entries = fs::read_dir(directory).map_err(|e| SweepError::from_listing(directory, e))?;

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() && !path.is_file() {
            continue;
        }
        if !operation.accepts(&path) {
            trace!("Excluded {}", path.display());
            continue;
        }
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            debug!("Skipping non UTF-8 file name in {}", directory.display());
            continue;
        };
        items.push(WorkItem::new(file_name, directory, operation.clone()));
    }

    items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    debug!(
        "Built {} work items from {}",
        items.len(),
        directory.display()
    );
    Ok(items)
}
