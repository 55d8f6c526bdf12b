//! Process-wide interrupt flag.
//!
//! Single writer (a signal handler), many readers (the flow's consumers at
//! batch boundaries, the producer between items). Flows can carry a private
//! flag instead — see `FlowBuilder::interrupt_flag` — which embedding code
//! and tests use to avoid the shared global.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Raise the flag. Running flows stop at their next batch boundary;
/// in-flight work is allowed to finish.
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Lower the flag, e.g. before starting another flow in the same process.
pub fn clear_interrupted() {
    INTERRUPTED.store(false, Ordering::Relaxed);
}
