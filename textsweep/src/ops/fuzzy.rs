use similar::{DiffOp, TextDiff};
use std::path::Path;
use tracing::trace;

use super::{display_name, scan_lines, FileOperation};
use crate::output;
use crate::results::{OperationResult, Outcome, SearchOutcome};

/// Similarity ratio of two strings in `[0, 1]`, computed over characters as
/// `2 * matched / (len(a) + len(b))`. Two empty strings are identical.
///
/// Counted in `f64` so a ratio sitting exactly on a cutoff compares equal to it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let matched: usize = TextDiff::from_chars(a, b)
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    2.0 * matched as f64 / total as f64
}

/// Picks the token closest to `query` whose similarity reaches `cutoff`.
///
/// On equal scores the lexicographically greater token wins, so the choice does not
/// depend on token order within the line.
pub fn closest_token<'a, I>(query: &str, tokens: I, cutoff: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .map(|token| (token, similarity(query, token)))
        .filter(|&(_, score)| score >= cutoff)
        .fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                let (token, score) = candidate;
                if score > current.1 || (score == current.1 && token > current.0) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
}

/// Approximate token search with a minimum confidence.
///
/// The closest token is chosen with the lowercased query, while the reported
/// confidence compares the query as typed against that token.
#[derive(Debug, Clone)]
pub struct FuzzySearch {
    query: String,
    folded_query: String,
    cutoff: f64,
}

impl FuzzySearch {
    pub fn new(query: &str, cutoff: f64) -> Self {
        Self {
            query: query.to_string(),
            folded_query: query.to_lowercase(),
            cutoff,
        }
    }
}

impl FileOperation for FuzzySearch {
    fn process(&self, path: &Path) -> OperationResult {
        let file_name = display_name(path);
        let mut report = String::new();
        let mut count = 0;

        let scanned = scan_lines(path, |line_number, line| {
            let folded = line.to_lowercase();
            let Some((token, _)) =
                closest_token(&self.folded_query, folded.split_whitespace(), self.cutoff)
            else {
                return;
            };
            let score = similarity(&self.query, token);
            report.push_str(&format!(
                "{} 1 potential match at {} of {}\n{} {}\n{} confidence: {}\n",
                output::unsure(),
                output::highlight(&format!("Line({})", line_number)),
                output::highlight(&file_name),
                output::unsure_cont(),
                line.trim(),
                output::unsure_cont(),
                output::score(score)
            ));
            count += 1;
        });

        if let Err(e) = scanned {
            return OperationResult::search_fault(
                &file_name,
                &format!("Couldn't read {}: {}", file_name, e),
            );
        }

        trace!("{} fuzzy matches in {}", count, path.display());
        if count == 0 {
            OperationResult::not_matched()
        } else {
            OperationResult::new(report, Outcome::Search(SearchOutcome::Matched { count }))
        }
    }
}
