//! Listener hooks, collected as a record of optional callbacks.
//!
//! No subclassing: adapters set only the hooks they need, the engine
//! nil-checks before every call. Hooks run on producer and consumer tasks
//! concurrently, so they must be `Send + Sync`.

use std::sync::Arc;

use crate::domain::{SharedResult, WorkInfo};
use crate::error::CodeError;

/// Flow lifecycle hook; an error from the start hook aborts the flow.
pub type FlowHookFn = Arc<dyn Fn() -> Result<(), CodeError> + Send + Sync>;

/// Asked before a unit is admitted; `(false, err)` turns it into a skip.
pub type WillWorkFn = Arc<dyn Fn(&WorkInfo) -> (bool, Option<CodeError>) + Send + Sync>;

/// A unit was skipped; carries a prior result when the overseer had one.
pub type WorkSkipFn = Arc<dyn Fn(&WorkInfo, Option<SharedResult>, Option<CodeError>) + Send + Sync>;

/// A unit finished successfully.
pub type WorkSuccessFn = Arc<dyn Fn(&WorkInfo, Option<SharedResult>) + Send + Sync>;

/// A unit failed.
pub type WorkFailFn = Arc<dyn Fn(&WorkInfo, CodeError) + Send + Sync>;

/// Observability and lifecycle hooks, all individually optional.
#[derive(Clone, Default)]
pub struct EventListener {
    pub flow_will_start: Option<FlowHookFn>,
    pub flow_will_end: Option<FlowHookFn>,
    pub will_work: Option<WillWorkFn>,
    pub on_work_skip: Option<WorkSkipFn>,
    pub on_work_success: Option<WorkSuccessFn>,
    pub on_work_fail: Option<WorkFailFn>,
}

impl EventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow_will_start(
        mut self,
        f: impl Fn() -> Result<(), CodeError> + Send + Sync + 'static,
    ) -> Self {
        self.flow_will_start = Some(Arc::new(f));
        self
    }

    pub fn flow_will_end(
        mut self,
        f: impl Fn() -> Result<(), CodeError> + Send + Sync + 'static,
    ) -> Self {
        self.flow_will_end = Some(Arc::new(f));
        self
    }

    pub fn will_work(
        mut self,
        f: impl Fn(&WorkInfo) -> (bool, Option<CodeError>) + Send + Sync + 'static,
    ) -> Self {
        self.will_work = Some(Arc::new(f));
        self
    }

    pub fn on_work_skip(
        mut self,
        f: impl Fn(&WorkInfo, Option<SharedResult>, Option<CodeError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_work_skip = Some(Arc::new(f));
        self
    }

    pub fn on_work_success(
        mut self,
        f: impl Fn(&WorkInfo, Option<SharedResult>) + Send + Sync + 'static,
    ) -> Self {
        self.on_work_success = Some(Arc::new(f));
        self
    }

    pub fn on_work_fail(
        mut self,
        f: impl Fn(&WorkInfo, CodeError) + Send + Sync + 'static,
    ) -> Self {
        self.on_work_fail = Some(Arc::new(f));
        self
    }

    // Nil-checked invocations used by the engine.

    pub(crate) fn notify_will_work(&self, work: &WorkInfo) -> (bool, Option<CodeError>) {
        match &self.will_work {
            Some(f) => f(work),
            None => (true, None),
        }
    }

    pub(crate) fn notify_skip(
        &self,
        work: &WorkInfo,
        prior: Option<SharedResult>,
        cause: Option<CodeError>,
    ) {
        if let Some(f) = &self.on_work_skip {
            f(work, prior, cause);
        }
    }

    pub(crate) fn notify_success(&self, work: &WorkInfo, result: Option<SharedResult>) {
        if let Some(f) = &self.on_work_success {
            f(work, result);
        }
    }

    pub(crate) fn notify_fail(&self, work: &WorkInfo, err: CodeError) {
        if let Some(f) = &self.on_work_fail {
            f(work, err);
        }
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("flow_will_start", &self.flow_will_start.is_some())
            .field("flow_will_end", &self.flow_will_end.is_some())
            .field("will_work", &self.will_work.is_some())
            .field("on_work_skip", &self.on_work_skip.is_some())
            .field("on_work_success", &self.on_work_success.is_some())
            .field("on_work_fail", &self.on_work_fail.is_some())
            .finish()
    }
}
