use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::errors::{SweepError, SweepResult};
use crate::filters;
use crate::output;
use crate::pool::{Dispatcher, Isolation};
use crate::results::{Aggregator, BatchSummary, OutcomeKind};
use crate::work::{build_work_items, Operation, DEFAULT_CONVERTER, DEFAULT_FUZZY_CUTOFF};

/// Matching strategy of a search batch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SearchMethod {
    /// Case-insensitive substring match
    #[default]
    Exact,
    /// Closest-token similarity at or above `cutoff`
    Fuzzy { cutoff: f64 },
}

impl SearchMethod {
    pub fn fuzzy() -> Self {
        SearchMethod::Fuzzy {
            cutoff: DEFAULT_FUZZY_CUTOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub method: SearchMethod,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, method: SearchMethod) -> Self {
        Self {
            query: query.into(),
            method,
        }
    }

    fn operation(&self) -> Operation {
        match self.method {
            SearchMethod::Exact => Operation::ExactSearch {
                query: self.query.clone(),
            },
            SearchMethod::Fuzzy { cutoff } => Operation::FuzzySearch {
                query: self.query.clone(),
                cutoff,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    /// Extensions (with leading dot) copied as plain text
    pub plain_text_extensions: Vec<String>,
    pub converter: String,
    /// One summary line per category instead of the compact line
    pub verbose: bool,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            plain_text_extensions: filters::default_plain_text_extensions(),
            converter: DEFAULT_CONVERTER.to_string(),
            verbose: false,
        }
    }
}

impl ConvertParams {
    fn operation(&self) -> Operation {
        Operation::Convert {
            plain_text_extensions: self.plain_text_extensions.clone(),
            converter: self.converter.clone(),
        }
    }
}

/// Runs one batch at a time: enumerate, dispatch, drain, summarize
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    isolation: Isolation,
}

impl BatchRunner {
    pub fn new(isolation: Isolation) -> Self {
        Self { isolation }
    }

    /// Searches every `.txt` file directly inside `directory`, writing reports and
    /// the summary to `out`
    pub fn search<W: Write>(
        &self,
        directory: &Path,
        worker_count: usize,
        params: &SearchParams,
        out: &mut W,
    ) -> SweepResult<BatchSummary> {
        info!(
            "Starting {:?} search for {:?} in {}",
            params.method,
            params.query,
            directory.display()
        );
        let summary = self.run(directory, worker_count, params.operation(), out)?;
        write_search_summary(&summary, out)?;
        info!(
            "Search complete. Found {} matches in {} files",
            summary.matches,
            summary.count(OutcomeKind::Matched)
        );
        Ok(summary)
    }

    /// Converts every eligible file directly inside `directory` to `.txt`,
    /// deleting originals that were converted
    pub fn convert<W: Write>(
        &self,
        directory: &Path,
        worker_count: usize,
        params: &ConvertParams,
        out: &mut W,
    ) -> SweepResult<BatchSummary> {
        info!("Starting conversion in {}", directory.display());
        let summary = self.run(directory, worker_count, params.operation(), out)?;
        write_conversion_summary(&summary, params.verbose, out)?;
        info!(
            "Conversion complete. {} converted, {} failed",
            summary.count(OutcomeKind::Success) + summary.count(OutcomeKind::Unsure),
            summary.count(OutcomeKind::Failed)
        );
        Ok(summary)
    }

    fn run<W: Write>(
        &self,
        directory: &Path,
        worker_count: usize,
        operation: Operation,
        out: &mut W,
    ) -> SweepResult<BatchSummary> {
        let started = Instant::now();
        if worker_count == 0 {
            return Err(SweepError::InvalidWorkerCount);
        }

        let items = build_work_items(directory, &operation)?;
        let mut aggregator = Aggregator::new();

        if !items.is_empty() {
            let dispatcher = Dispatcher::new(worker_count, &self.isolation)?;
            dispatcher.run(items, |completions| -> SweepResult<()> {
                for result in completions {
                    aggregator.record(result, out)?;
                }
                Ok(())
            })?;
        }
        out.flush()?;

        Ok(aggregator.finish(started.elapsed(), worker_count))
    }
}

fn write_finished<W: Write>(summary: &BatchSummary, out: &mut W) -> SweepResult<()> {
    let seconds = format!("{:.5}", summary.elapsed.as_secs_f64());
    writeln!(
        out,
        "{} Finished in {} seconds with ({}) workers",
        output::finish(),
        output::figure(&seconds),
        output::figure(summary.worker_count)
    )?;
    let plain = format!(
        "$$ Finished in {} seconds with ({}) workers",
        seconds, summary.worker_count
    );
    writeln!(out, "{}", "-".repeat(plain.len()))?;
    Ok(())
}

/// Writes the `Found N results` block closing a search batch
pub fn write_search_summary<W: Write>(summary: &BatchSummary, out: &mut W) -> SweepResult<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} Found {} results",
        output::finish(),
        output::figure(summary.matches)
    )?;
    write_finished(summary, out)
}

/// Writes the per-category block closing a conversion batch
pub fn write_conversion_summary<W: Write>(
    summary: &BatchSummary,
    verbose: bool,
    out: &mut W,
) -> SweepResult<()> {
    let success = summary.count(OutcomeKind::Success);
    let failed = summary.count(OutcomeKind::Failed);
    let unsure = summary.count(OutcomeKind::Unsure);
    let skipped = summary.count(OutcomeKind::Skipped);

    writeln!(out)?;
    if verbose {
        let lines = [
            (success, output::success(), "Successful conversion(s)"),
            (failed, output::fail(), "Failed conversion(s)"),
            (unsure, output::unsure(), "Attempted conversion(s)"),
            (skipped, output::skipped(), "Skipped file(s)"),
        ];
        for (count, marker, label) in lines {
            if count > 0 {
                writeln!(out, "{} {}: {}", marker, label, output::figure(count))?;
            }
        }
    } else {
        writeln!(
            out,
            "{} Operation result(s): #{} X{} @{} %{}",
            output::finish(),
            success,
            failed,
            unsure,
            skipped
        )?;
    }
    write_finished(summary, out)
}
