//! The worker side of the process protocol.
//!
//! A worker process reads one JSON-encoded [`WorkItem`] per line from its input and
//! answers each with exactly one JSON-encoded [`OperationResult`] line. It exits
//! cleanly when its input is closed.
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use crate::errors::{SweepError, SweepResult};
use crate::results::OperationResult;
use crate::work::WorkItem;

/// Runs one item, turning a panic into a fault result
pub fn run_item(item: &WorkItem) -> OperationResult {
    panic::catch_unwind(AssertUnwindSafe(|| item.execute())).unwrap_or_else(|_| {
        error!("Operation panicked on {}", item.path().display());
        OperationResult::fault(
            item,
            &format!("Worker panicked while processing {}", item.file_name),
        )
    })
}

/// Serves work items from `input` until it reaches end of file
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W) -> SweepResult<()> {
    let mut served = 0usize;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: WorkItem = serde_json::from_str(&line)
            .map_err(|e| SweepError::worker_protocol(format!("malformed work item: {}", e)))?;

        let result = run_item(&item);
        serde_json::to_writer(&mut output, &result)?;
        output.write_all(b"\n")?;
        output.flush()?;
        served += 1;
    }
    debug!("Worker input closed after {} items", served);
    Ok(())
}
