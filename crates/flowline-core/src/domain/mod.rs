//! Domain types: the input and outcome of one unit of work.

mod record;
mod work;

pub use record::WorkRecord;
pub use work::{FlowResult, SharedResult, WorkInfo};
