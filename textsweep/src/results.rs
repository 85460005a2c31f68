/// Per-file results and their aggregation.
///
/// A worker turns one [`WorkItem`](crate::work::WorkItem) into exactly one
/// [`OperationResult`]. The [`Aggregator`] consumes those results in whatever order
/// they complete, prints their reports and keeps one counter per [`OutcomeKind`].
/// Because counting is commutative, the final [`BatchSummary`] does not depend on
/// completion order; only the order of printed reports does.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use crate::output;
use crate::work::WorkItem;

/// Outcome of a search operation on one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// At least one line matched
    Matched { count: usize },
    /// No line matched; the report is empty
    NotMatched,
    /// The file could not be searched (unreadable, not UTF-8, worker died)
    Failed,
}

/// Outcome of a conversion operation on one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionOutcome {
    Success,
    Failed,
    /// Converted by copying an extension from the plain-text fallback list
    Unsure,
    Skipped,
}

/// Outcome of one operation, tagged by operation family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Search(SearchOutcome),
    Conversion(ConversionOutcome),
}

/// Flat classification used as the counter key of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Matched,
    NotMatched,
    Success,
    Failed,
    Unsure,
    Skipped,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Search(SearchOutcome::Matched { .. }) => OutcomeKind::Matched,
            Outcome::Search(SearchOutcome::NotMatched) => OutcomeKind::NotMatched,
            Outcome::Search(SearchOutcome::Failed) => OutcomeKind::Failed,
            Outcome::Conversion(ConversionOutcome::Success) => OutcomeKind::Success,
            Outcome::Conversion(ConversionOutcome::Failed) => OutcomeKind::Failed,
            Outcome::Conversion(ConversionOutcome::Unsure) => OutcomeKind::Unsure,
            Outcome::Conversion(ConversionOutcome::Skipped) => OutcomeKind::Skipped,
        }
    }
}

/// The result of processing a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Human-readable report, possibly empty
    pub report: String,
    pub outcome: Outcome,
}

impl OperationResult {
    pub fn new(report: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            report: report.into(),
            outcome,
        }
    }

    /// A search that found nothing
    pub fn not_matched() -> Self {
        Self::new(String::new(), Outcome::Search(SearchOutcome::NotMatched))
    }

    /// Converts a fault raised while processing `item` into a failed result of the
    /// item's operation family
    pub fn fault(item: &WorkItem, cause: &str) -> Self {
        if item.operation.is_search() {
            Self::search_fault(&item.file_name, cause)
        } else {
            Self::conversion_fault(&item.file_name, cause)
        }
    }

    /// A search that could not complete. The cause comes first, the summary second.
    pub fn search_fault(file_name: &str, cause: &str) -> Self {
        Self::new(
            format!(
                "{} {}\n{} Failed to search {}",
                output::fail(),
                cause,
                output::fail_cont(),
                file_name
            ),
            Outcome::Search(SearchOutcome::Failed),
        )
    }

    /// A conversion that could not complete. The cause comes first, the summary second.
    pub fn conversion_fault(file_name: &str, cause: &str) -> Self {
        Self::new(
            format!(
                "{} {}\n{} Failed to convert {}",
                output::fail(),
                cause,
                output::fail_cont(),
                file_name
            ),
            Outcome::Conversion(ConversionOutcome::Failed),
        )
    }
}

/// Summary of a finished batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Number of files per outcome
    pub counts: BTreeMap<OutcomeKind, usize>,
    /// Total matched lines across all matched files ("found results")
    pub matches: usize,
    pub elapsed: Duration,
    pub worker_count: usize,
}

impl BatchSummary {
    /// Number of files that ended with `kind`
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of files processed, whatever their outcome
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Consumes results in completion order, printing reports and counting outcomes
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: BTreeMap<OutcomeKind, usize>,
    matches: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records one result, writing its report to `out` immediately.
    ///
    /// A search that matched nothing is counted in the `NotMatched` bucket but never
    /// printed and never added to the found-results total. Every other outcome,
    /// including a skipped conversion, is printed when its report is non-empty.
    pub fn record<W: Write>(&mut self, result: OperationResult, out: &mut W) -> io::Result<()> {
        *self.counts.entry(result.outcome.kind()).or_insert(0) += 1;

        match result.outcome {
            Outcome::Search(SearchOutcome::NotMatched) => return Ok(()),
            Outcome::Search(SearchOutcome::Matched { count }) => self.matches += count,
            Outcome::Search(SearchOutcome::Failed) | Outcome::Conversion(_) => {}
        }

        if !result.report.is_empty() {
            out.write_all(result.report.as_bytes())?;
            if !result.report.ends_with('\n') {
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Number of results recorded so far
    pub fn recorded(&self) -> usize {
        self.counts.values().sum()
    }

    /// Finalizes the counters into a summary
    pub fn finish(self, elapsed: Duration, worker_count: usize) -> BatchSummary {
        BatchSummary {
            counts: self.counts,
            matches: self.matches,
            elapsed,
            worker_count,
        }
    }
}
