//! flowline-core
//!
//! A generic batched work-flow engine: a producer/consumer pipeline that
//! drives units of work through N concurrent workers, with policies for
//! skipping, already-done detection, conditional re-execution, rate-limit
//! backoff, progress reporting, and early termination on failure.
//!
//! The crate is split into small modules:
//! - domain: work units, results, terminal records
//! - error: structured code + description errors
//! - events: optional listener hooks
//! - ports: the interfaces the engine consumes
//! - providers / store / limiter: stock implementations of those ports
//! - flow: the engine itself

pub mod domain;
pub mod error;
pub mod events;
pub mod flow;
pub mod interrupt;
pub mod limiter;
pub mod observability;
pub mod ports;
pub mod providers;
pub mod store;

pub use domain::{FlowResult, SharedResult, WorkInfo, WorkRecord};
pub use error::{CodeError, ErrorCode};
pub use events::EventListener;
pub use flow::{run, Flow, FlowBuilder, Info};
pub use ports::{
    AutoLimit, BatchOutcome, Overseer, Redo, Skipper, Supply, WorkProvider, Worker, WorkerProvider,
};
