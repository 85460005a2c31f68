use std::path::Path;
use tracing::trace;

use super::{display_name, scan_lines, FileOperation};
use crate::output;
use crate::results::{OperationResult, Outcome, SearchOutcome};

/// Case-insensitive substring search, one report entry per matching line
#[derive(Debug, Clone)]
pub struct ExactSearch {
    folded_query: String,
}

impl ExactSearch {
    pub fn new(query: &str) -> Self {
        Self {
            folded_query: query.to_lowercase(),
        }
    }

    fn is_match(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.folded_query)
    }
}

impl FileOperation for ExactSearch {
    fn process(&self, path: &Path) -> OperationResult {
        let file_name = display_name(path);
        let mut report = String::new();
        let mut count = 0;

        let scanned = scan_lines(path, |line_number, line| {
            if !self.is_match(line) {
                return;
            }
            report.push_str(&format!(
                "{} 1 match at {} of {}\n{} {}\n",
                output::success(),
                output::highlight(&format!("Line({})", line_number)),
                output::highlight(&file_name),
                output::success_cont(),
                line.trim()
            ));
            count += 1;
        });

        if let Err(e) = scanned {
            return OperationResult::search_fault(
                &file_name,
                &format!("Couldn't read {}: {}", file_name, e),
            );
        }

        trace!("{} exact matches in {}", count, path.display());
        if count == 0 {
            OperationResult::not_matched()
        } else {
            OperationResult::new(report, Outcome::Search(SearchOutcome::Matched { count }))
        }
    }
}
