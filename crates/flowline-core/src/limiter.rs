//! Default adaptive limiter: a permit pool with a mutable ceiling.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{CodeError, ErrorCode};
use crate::ports::AutoLimit;

struct PermitState {
    ceiling: i64,
    in_use: i64,
    initial: i64,
    last_adjust: Instant,
}

impl PermitState {
    /// A batch larger than the whole ceiling may still run, but only alone;
    /// otherwise a shrunken ceiling would wedge its consumer forever.
    fn can_take(&self, n: i64) -> bool {
        n <= self.ceiling - self.in_use || (self.in_use == 0 && n >= self.ceiling)
    }

    fn recover_if_quiet(&mut self, recovery: Option<Duration>) {
        let Some(interval) = recovery else { return };
        if self.ceiling < self.initial && self.last_adjust.elapsed() >= interval {
            self.ceiling += 1;
            self.last_adjust = Instant::now();
        }
    }
}

/// Permit pool driven by throttling feedback.
///
/// The engine shrinks the ceiling through `add_limit_count`; it never grows
/// it back. Re-expansion is this limiter's own policy: with a recovery
/// interval configured, one permit returns per quiet interval until the
/// initial ceiling is restored. The ceiling never drops below 1.
pub struct PermitLimit {
    state: Mutex<PermitState>,
    notify: Notify,
    limit_codes: Vec<ErrorCode>,
    recovery: Option<Duration>,
}

impl PermitLimit {
    pub fn new(capacity: i64) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(PermitState {
                ceiling: capacity,
                in_use: 0,
                initial: capacity,
                last_adjust: Instant::now(),
            }),
            notify: Notify::new(),
            limit_codes: Vec::new(),
            recovery: None,
        }
    }

    /// Classify this code as a throttling signal.
    pub fn limit_code(mut self, code: ErrorCode) -> Self {
        self.limit_codes.push(code);
        self
    }

    /// Grow back one permit per quiet `interval`, up to the initial ceiling.
    pub fn with_recovery(mut self, interval: Duration) -> Self {
        self.recovery = Some(interval);
        self
    }

    pub fn ceiling(&self) -> i64 {
        self.state.lock().expect("limit lock").ceiling
    }

    pub fn in_use(&self) -> i64 {
        self.state.lock().expect("limit lock").in_use
    }
}

#[async_trait]
impl AutoLimit for PermitLimit {
    async fn acquire(&self, n: i64) {
        if n <= 0 {
            return;
        }
        loop {
            // Register for wakeup before checking, or a release landing
            // between the check and the await is lost.
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().expect("limit lock");
                state.recover_if_quiet(self.recovery);
                if state.can_take(n) {
                    state.in_use += n;
                    return;
                }
            }
            notified.await;
        }
    }

    fn release(&self, n: i64) {
        {
            let mut state = self.state.lock().expect("limit lock");
            state.in_use = (state.in_use - n).max(0);
            state.recover_if_quiet(self.recovery);
        }
        self.notify.notify_waiters();
    }

    fn is_limit_error(&self, err: &CodeError) -> bool {
        self.limit_codes.contains(&err.code)
    }

    fn add_limit_count(&self, delta: i64) {
        {
            let mut state = self.state.lock().expect("limit lock");
            state.ceiling = (state.ceiling + delta).max(1);
            state.last_adjust = Instant::now();
        }
        // A positive delta may unblock waiters.
        self.notify.notify_waiters();
    }
}
