//! Bounded fan-out of work items over a fixed set of workers.
//!
//! A [`Dispatcher`] owns a rayon pool of exactly `worker_count` threads and one
//! worker slot per thread. Each slot either runs operations on its own thread or
//! drives one long-lived worker process. Results flow back through an `mpsc`
//! channel and reach the caller as [`Completions`], in whatever order they finish.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(4, &Isolation::InProcess)?;
//! let found = dispatcher.run(items, |completions| completions.count());
//! ```
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::io::{self, BufRead, BufReader, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{mpsc, Mutex, PoisonError};
use tracing::{debug, trace, warn};

use crate::errors::{SweepError, SweepResult};
use crate::results::OperationResult;
use crate::work::WorkItem;
use crate::worker;

/// How to launch a worker process speaking the JSON-lines protocol of
/// [`worker::serve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invokes the running executable with `args`
    pub fn current_exe(args: Vec<String>) -> SweepResult<Self> {
        Ok(Self::new(std::env::current_exe()?, args))
    }
}

/// Where a slot executes its operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Isolation {
    /// On the pool thread itself; panics are caught and reported as faults
    #[default]
    InProcess,
    /// In a dedicated child process per slot; a crashing operation only takes
    /// down its own worker
    Subprocess(WorkerCommand),
}

/// Results in completion order. Ends once every dispatched item has reported.
pub struct Completions {
    receiver: mpsc::Receiver<OperationResult>,
}

impl Iterator for Completions {
    type Item = OperationResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

/// A live worker process and its pipes
struct Live {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Live {
    fn spawn(command: &WorkerCommand) -> SweepResult<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SweepError::worker_protocol("worker pipes were not captured"));
        };
        debug!("Spawned worker process {}", child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

/// One long-lived worker process, respawned after it fails
struct ProcessWorker {
    command: WorkerCommand,
    live: Option<Live>,
}

impl ProcessWorker {
    fn start(command: &WorkerCommand) -> SweepResult<Self> {
        let live = Live::spawn(command).map_err(|e| {
            SweepError::pool_creation(format!(
                "couldn't start worker {}: {}",
                command.program.display(),
                e
            ))
        })?;
        Ok(Self {
            command: command.clone(),
            live: Some(live),
        })
    }

    fn handle(&mut self, item: &WorkItem) -> OperationResult {
        match self.exchange(item) {
            Ok(result) => result,
            Err(e) => {
                warn!("Worker process failed on {}: {}", item.file_name, e);
                self.kill();
                OperationResult::fault(
                    item,
                    &format!(
                        "Worker process crashed while processing {}: {}",
                        item.file_name, e
                    ),
                )
            }
        }
    }

    fn exchange(&mut self, item: &WorkItem) -> SweepResult<OperationResult> {
        if self.live.is_none() {
            self.live = Some(Live::spawn(&self.command)?);
        }
        let Some(live) = self.live.as_mut() else {
            return Err(SweepError::worker_protocol("no worker process"));
        };

        let mut request = serde_json::to_string(item)?;
        request.push('\n');
        live.stdin.write_all(request.as_bytes())?;
        live.stdin.flush()?;

        let mut answer = String::new();
        if live.stdout.read_line(&mut answer)? == 0 {
            return Err(SweepError::worker_protocol("worker exited before answering"));
        }
        Ok(serde_json::from_str(answer.trim_end())?)
    }

    fn kill(&mut self) {
        if let Some(mut live) = self.live.take() {
            let _ = live.child.kill();
            let _ = live.child.wait();
        }
    }

    /// Closes the worker's stdin so it drains and exits, then reaps it
    fn shutdown(&mut self) -> io::Result<()> {
        if let Some(Live {
            mut child,
            stdin,
            stdout,
        }) = self.live.take()
        {
            drop(stdin);
            drop(stdout);
            let status = child.wait()?;
            trace!("Worker process {} exited with {}", child.id(), status);
        }
        Ok(())
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        self.kill();
    }
}

enum Slot {
    InProcess,
    Process(ProcessWorker),
}

impl Slot {
    fn new(isolation: &Isolation) -> SweepResult<Self> {
        match isolation {
            Isolation::InProcess => Ok(Slot::InProcess),
            Isolation::Subprocess(command) => Ok(Slot::Process(ProcessWorker::start(command)?)),
        }
    }

    fn handle(&mut self, item: &WorkItem) -> OperationResult {
        match self {
            Slot::InProcess => worker::run_item(item),
            Slot::Process(process) => process.handle(item),
        }
    }
}

/// A fixed-size pool of workers
pub struct Dispatcher {
    pool: ThreadPool,
    slots: Vec<Mutex<Slot>>,
}

impl Dispatcher {
    /// Creates the pool and every worker slot up front.
    ///
    /// Fails with `InvalidWorkerCount` for zero workers and with `PoolCreation`
    /// when threads or worker processes cannot be started.
    pub fn new(worker_count: usize, isolation: &Isolation) -> SweepResult<Self> {
        let worker_count = NonZeroUsize::new(worker_count).ok_or(SweepError::InvalidWorkerCount)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count.get())
            .thread_name(|index| format!("textsweep-worker-{}", index))
            .build()
            .map_err(|e| SweepError::pool_creation(e.to_string()))?;

        let slots = (0..worker_count.get())
            .map(|_| Slot::new(isolation).map(Mutex::new))
            .collect::<SweepResult<Vec<_>>>()?;

        debug!(
            "Created pool with {} workers ({:?})",
            worker_count,
            isolation
        );
        Ok(Self { pool, slots })
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// Dispatches every item and hands the results to `drain` as they complete.
    ///
    /// Returns once all items have been processed and every worker has been shut
    /// down, even if `drain` stops consuming early.
    pub fn run<T, F>(self, items: Vec<WorkItem>, drain: F) -> T
    where
        F: FnOnce(Completions) -> T,
    {
        debug!("Dispatching {} items", items.len());
        let slots = &self.slots;

        let drained = self.pool.in_place_scope(|scope| {
            let (sender, receiver) = mpsc::channel();
            for item in items {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let index = rayon::current_thread_index().unwrap_or(0) % slots.len();
                    let result = slots[index]
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .handle(&item);
                    // The consumer may have stopped listening
                    let _ = sender.send(result);
                });
            }
            drop(sender);
            drain(Completions { receiver })
        });

        self.shutdown();
        drained
    }

    fn shutdown(self) {
        for slot in self.slots {
            if let Slot::Process(mut process) = slot.into_inner().unwrap_or_else(PoisonError::into_inner) {
                if let Err(e) = process.shutdown() {
                    warn!("Couldn't reap worker process: {}", e);
                }
            }
        }
    }
}
