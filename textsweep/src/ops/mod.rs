//! Per-file operations.
//!
//! Every operation answers the same question: given one file, what happened to it?
//! The answer is an [`OperationResult`] with a report for the user and a closed
//! outcome. Operations never return errors; a file that cannot be processed
//! produces a `Failed` outcome whose report states the cause.

mod convert;
mod exact;
mod fuzzy;

pub use convert::{output_path, Conversion};
pub use exact::ExactSearch;
pub use fuzzy::{closest_token, similarity, FuzzySearch};

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::results::OperationResult;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;

/// Processes one file into a report and an outcome
pub trait FileOperation {
    fn process(&self, path: &Path) -> OperationResult;
}

/// File name used in reports
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Feeds every line of a UTF-8 file to `on_line` with its 1-based number.
/// Fails on the first unreadable or non UTF-8 line.
pub(crate) fn scan_lines<F>(path: &Path, mut on_line: F) -> io::Result<()>
where
    F: FnMut(usize, &str),
{
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
    for (index, line) in reader.lines().enumerate() {
        on_line(index + 1, &line?);
    }
    Ok(())
}
