pub mod batch;
pub mod config;
pub mod errors;
pub mod filters;
pub mod ops;
pub mod output;
pub mod pool;
pub mod results;
pub mod session;
pub mod work;
pub mod worker;

pub use batch::{BatchRunner, ConvertParams, SearchMethod, SearchParams};
pub use config::SweepConfig;
pub use errors::{SweepError, SweepResult};
pub use pool::{Dispatcher, Isolation, WorkerCommand};
pub use results::{BatchSummary, OperationResult, Outcome, OutcomeKind};
pub use session::Session;
pub use work::{build_work_items, Operation, WorkItem};
