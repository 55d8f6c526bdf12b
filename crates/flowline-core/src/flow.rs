//! The flow engine: a bounded producer/consumer pipeline over batches.
//!
//! One producer task pulls units from the work provider, runs them through
//! the admission chain (skipper, overseer + redo, will-work hook), buffers
//! them into batches, and pushes the batches into a bounded channel. N
//! consumer tasks each build one worker and drain the channel, dispatching
//! every returned record to the overseer and the listener, and feeding
//! throttling signals back into the limiter.
//!
//! Errors never leave `start` as return values; they reach the caller
//! through listener hooks or logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::domain::{WorkInfo, WorkRecord};
use crate::error::{CodeError, ErrorCode};
use crate::events::EventListener;
use crate::interrupt;
use crate::ports::{AutoLimit, Overseer, Redo, Skipper, Supply, WorkProvider, WorkerProvider};

/// Pause after a batch that came back throttled, before the same consumer
/// pulls again.
const THROTTLE_PAUSE: Duration = Duration::from_millis(1500);

/// Asked instead of the confirmation prompt when `force` is off.
pub type ConfirmFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Info {
    /// Skip the confirmation step.
    pub force: bool,
    /// Number of consumer tasks.
    pub worker_count: usize,
    /// End the flow once any work item fails.
    pub stop_when_work_error: bool,
    /// Maximum units delivered to one `do_work` call.
    pub batch_max: usize,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            force: false,
            worker_count: 1,
            stop_when_work_error: false,
            batch_max: 1,
        }
    }
}

impl Info {
    /// Repair out-of-range values in place. Idempotent.
    pub fn check(&mut self) {
        if self.worker_count < 1 {
            self.worker_count = 1;
        }
        if self.batch_max < 1 {
            self.batch_max = 1;
        }
    }
}

/// A composed pipeline, single-use: build it, `start` it, done.
pub struct Flow {
    info: Info,
    work_provider: Option<Arc<dyn WorkProvider>>,
    worker_provider: Option<Arc<dyn WorkerProvider>>,
    listener: EventListener,
    overseer: Option<Arc<dyn Overseer>>,
    skipper: Option<Arc<dyn Skipper>>,
    redo: Option<Arc<dyn Redo>>,
    limit: Option<Arc<dyn AutoLimit>>,
    confirm: Option<ConfirmFn>,
    interrupt_flag: Option<Arc<AtomicBool>>,
}

impl Flow {
    pub fn builder(info: Info) -> FlowBuilder {
        FlowBuilder {
            flow: Flow {
                info,
                work_provider: None,
                worker_provider: None,
                listener: EventListener::default(),
                overseer: None,
                skipper: None,
                redo: None,
                limit: None,
                confirm: None,
                interrupt_flag: None,
            },
        }
    }

    fn check(&mut self) -> Result<(), CodeError> {
        self.info.check();
        if self.work_provider.is_none() {
            return Err(CodeError::param_missing("WorkProvider cannot be empty"));
        }
        if self.worker_provider.is_none() {
            return Err(CodeError::param_missing("WorkerProvider cannot be empty"));
        }
        Ok(())
    }

    /// Run the pipeline to completion.
    pub async fn start(mut self) {
        if let Err(e) = self.check() {
            error!("work flow start error: {e}");
            return;
        }
        let (Some(work_provider), Some(worker_provider)) =
            (self.work_provider.clone(), self.worker_provider.clone())
        else {
            return;
        };

        if !self.info.force {
            if let Some(confirm) = &self.confirm {
                if !confirm() {
                    debug!("work flow cancelled at confirmation");
                    return;
                }
            }
        }

        if let Some(hook) = &self.listener.flow_will_start {
            if let Err(e) = hook() {
                error!("flow start error: {e}");
                return;
            }
        }
        debug!("work flow did start");

        let shared = Arc::new(Shared {
            listener: self.listener.clone(),
            overseer: self.overseer.clone(),
            limit: self.limit.clone(),
            stop_when_work_error: self.info.stop_when_work_error,
            work_error_happened: AtomicBool::new(false),
            interrupt_flag: self.interrupt_flag.clone(),
        });

        let (batch_tx, batch_rx) = mpsc::channel::<Vec<WorkInfo>>(self.info.worker_count);

        let producer = tokio::spawn(produce(
            work_provider,
            self.skipper.clone(),
            self.redo.clone(),
            Arc::clone(&shared),
            batch_tx,
            self.info.batch_max,
        ));

        let batch_rx = Arc::new(Mutex::new(batch_rx));
        let mut consumers = Vec::with_capacity(self.info.worker_count);
        for index in 0..self.info.worker_count {
            consumers.push(tokio::spawn(consume(
                index,
                Arc::clone(&worker_provider),
                Arc::clone(&batch_rx),
                Arc::clone(&shared),
            )));
        }
        for handle in consumers {
            let _ = handle.await;
        }

        // Consumers are gone. Dropping the receiver fails any pending send,
        // so the producer cannot stay blocked behind a dead pipeline.
        drop(batch_rx);
        let _ = producer.await;

        if let Some(hook) = &self.listener.flow_will_end {
            if let Err(e) = hook() {
                error!("flow end error: {e}");
                return;
            }
        }
        debug!("work flow did end");
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("info", &self.info)
            .field("overseer", &self.overseer.is_some())
            .field("skipper", &self.skipper.is_some())
            .field("redo", &self.redo.is_some())
            .field("limit", &self.limit.is_some())
            .finish_non_exhaustive()
    }
}

/// Run a composed flow to completion. The single entry point of the engine.
pub async fn run(flow: Flow) {
    flow.start().await;
}

/// Builder for [`Flow`]; only the two providers are required.
pub struct FlowBuilder {
    flow: Flow,
}

impl FlowBuilder {
    pub fn work_provider(mut self, provider: Arc<dyn WorkProvider>) -> Self {
        self.flow.work_provider = Some(provider);
        self
    }

    pub fn worker_provider(mut self, provider: Arc<dyn WorkerProvider>) -> Self {
        self.flow.worker_provider = Some(provider);
        self
    }

    pub fn listener(mut self, listener: EventListener) -> Self {
        self.flow.listener = listener;
        self
    }

    pub fn overseer(mut self, overseer: Arc<dyn Overseer>) -> Self {
        self.flow.overseer = Some(overseer);
        self
    }

    pub fn skipper(mut self, skipper: Arc<dyn Skipper>) -> Self {
        self.flow.skipper = Some(skipper);
        self
    }

    pub fn redo(mut self, redo: Arc<dyn Redo>) -> Self {
        self.flow.redo = Some(redo);
        self
    }

    pub fn limit(mut self, limit: Arc<dyn AutoLimit>) -> Self {
        self.flow.limit = Some(limit);
        self
    }

    pub fn confirm(mut self, confirm: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.flow.confirm = Some(Arc::new(confirm));
        self
    }

    /// Use a private interrupt flag instead of the process-wide one.
    pub fn interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.flow.interrupt_flag = Some(flag);
        self
    }

    pub fn build(self) -> Flow {
        self.flow
    }
}

/// State shared by the producer and every consumer.
struct Shared {
    listener: EventListener,
    overseer: Option<Arc<dyn Overseer>>,
    limit: Option<Arc<dyn AutoLimit>>,
    stop_when_work_error: bool,
    work_error_happened: AtomicBool,
    interrupt_flag: Option<Arc<AtomicBool>>,
}

impl Shared {
    fn interrupted(&self) -> bool {
        match &self.interrupt_flag {
            Some(flag) => flag.load(Ordering::Relaxed),
            None => interrupt::is_interrupted(),
        }
    }

    /// Route one terminal record: overseer first, then the listener.
    async fn dispatch(&self, record: &WorkRecord) {
        if let Some(overseer) = &self.overseer {
            overseer.work_done(record).await;
        }
        match &record.err {
            Some(err) => {
                self.work_error_happened.store(true, Ordering::Relaxed);
                self.listener.notify_fail(&record.work_info, err.clone());
            }
            None => self
                .listener
                .notify_success(&record.work_info, record.result.clone()),
        }
    }
}

async fn produce(
    provider: Arc<dyn WorkProvider>,
    skipper: Option<Arc<dyn Skipper>>,
    redo: Option<Arc<dyn Redo>>,
    shared: Arc<Shared>,
    batch_tx: mpsc::Sender<Vec<WorkInfo>>,
    batch_max: usize,
) {
    debug!("work producer start");
    let mut batch: Vec<WorkInfo> = Vec::with_capacity(batch_max);

    loop {
        if shared.interrupted() {
            debug!("work producer interrupted");
            break;
        }

        let info = match provider.provide().await {
            Supply::Exhausted => break,
            Supply::Pending => continue,
            Supply::Defect { work, err } => {
                match work {
                    // Nothing to report a terminal event against.
                    None => warn!("work provider defect without a unit: {err}"),
                    Some(info) => {
                        if err.code == ErrorCode::PARAM_MISSING {
                            shared.listener.notify_skip(&info, None, Some(err));
                        } else {
                            shared.listener.notify_fail(&info, err);
                        }
                    }
                }
                continue;
            }
            Supply::Item(info) => info,
        };

        // A unit without a payload cannot be worked.
        if !info.has_work() {
            continue;
        }

        if let Some(skipper) = &skipper {
            let (skip, cause) = skipper.should_skip(&info);
            if skip {
                shared.listener.notify_skip(&info, None, cause);
                continue;
            }
        }

        if let Some(overseer) = &shared.overseer {
            if let Some(prior) = overseer.record_if_done(&info).await {
                match &redo {
                    None => {
                        let desc = prior
                            .err
                            .as_ref()
                            .map(|e| e.desc.clone())
                            .unwrap_or_else(|| "already done".to_string());
                        shared.listener.notify_skip(
                            &info,
                            prior.result.clone(),
                            Some(CodeError::already_done(desc)),
                        );
                        continue;
                    }
                    Some(redo) => {
                        let (should_redo, cause) = redo.should_redo(&info, &prior);
                        if !should_redo {
                            let cause = match cause {
                                Some(c) => c.recode(ErrorCode::ALREADY_DONE),
                                None => CodeError::already_done("already done"),
                            };
                            shared
                                .listener
                                .notify_skip(&info, prior.result.clone(), Some(cause));
                            continue;
                        }
                        match &cause {
                            Some(cause) => debug!("work redo, {} because: {}", info.data(), cause.desc),
                            None => debug!("work redo, {}", info.data()),
                        }
                    }
                }
            }
        }

        let (proceed, err) = shared.listener.notify_will_work(&info);
        if !proceed {
            shared.listener.notify_skip(&info, None, err);
            continue;
        }

        batch.push(info);
        if batch.len() >= batch_max {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_max));
            if batch_tx.send(full).await.is_err() {
                debug!("batch channel closed, work producer stopping");
                return;
            }
        }
    }

    if !batch.is_empty() {
        let _ = batch_tx.send(batch).await;
    }
    debug!("work producer end");
}

async fn consume(
    index: usize,
    worker_provider: Arc<dyn WorkerProvider>,
    batch_rx: Arc<Mutex<mpsc::Receiver<Vec<WorkInfo>>>>,
    shared: Arc<Shared>,
) {
    debug!("work consumer {index} start");
    let mut worker = match worker_provider.provide().await {
        Ok(worker) => worker,
        Err(e) => {
            error!("create worker error: {e}");
            return;
        }
    };

    loop {
        if shared.interrupted() {
            debug!("work consumer {index} interrupted");
            break;
        }

        let batch = {
            let mut rx = batch_rx.lock().await;
            rx.recv().await
        };
        let Some(batch) = batch else { break };

        if let Some(limit) = &shared.limit {
            limit.acquire(batch.len() as i64).await;
        }

        let mut outcome = worker.do_work(&batch).await;

        // A batch error with no records would leak every unit's terminal
        // event; synthesize one failure per unit instead, then give up on
        // this worker.
        let total_failure = outcome.records.is_empty() && outcome.err.is_some();
        let records: Vec<WorkRecord> = if total_failure {
            match &outcome.err {
                Some(err) => {
                    error!("do work error: {err}");
                    batch
                        .iter()
                        .cloned()
                        .map(|info| WorkRecord::fail(info, err.clone()))
                        .collect()
                }
                None => Vec::new(),
            }
        } else {
            std::mem::take(&mut outcome.records)
        };

        let mut hit_limit_count: i64 = 0;
        for mut record in records {
            record.apply_fallback(&outcome.err);
            if let (Some(limit), Some(err)) = (&shared.limit, &record.err) {
                if limit.is_limit_error(err) {
                    hit_limit_count += 1;
                }
            }
            shared.dispatch(&record).await;
        }

        if let Some(limit) = &shared.limit {
            limit.release(batch.len() as i64);
            if hit_limit_count > 0 {
                limit.add_limit_count(-hit_limit_count);
                tokio::time::sleep(THROTTLE_PAUSE).await;
            }
        }

        if total_failure {
            break;
        }
        if shared.stop_when_work_error && shared.work_error_happened.load(Ordering::Relaxed) {
            break;
        }
    }
    debug!("work consumer {index} end");
}
