// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live-instance registry and admission/control façade.
//!
//! Admission sequence: allocate ID → CREATED → disabled check → PENDING
//! (latch) or RUNNING (spawn). A monitor task per running instance pumps
//! output, awaits exit, selects the terminal state from exit status plus
//! termination intent, and persists the history record. The terminal
//! event is published only after both output pumps have drained.

use crate::bus::{EventBus, Subscription};
use crate::latch::LatchRegistry;
use crate::pump::OutputPump;
use crate::runner::{select_terminal_state, ProcessLauncher, ProcessRunner, SpawnedChild, SystemLauncher};
use crate::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use taro_core::{
    Clock, Event, EventFilter, ExecSpec, ExecutionState, InstanceId, InstanceIdGen, JobInstance,
    OutputLine, OutputStream, Snapshot, SystemClock, TailBuffer, TerminationIntent,
    DEFAULT_TAIL_CAPACITY,
};
use taro_storage::{DisabledRecord, DisabledRegistry, HistoryQuery, HistoryRecord, HistoryStore, PatternKind};
use tokio::sync::{watch, Notify};

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Tail ring capacity per instance.
    pub tail_capacity: usize,
    /// Bound of each subscription queue.
    pub queue_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tail_capacity: DEFAULT_TAIL_CAPACITY,
            queue_capacity: crate::bus::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A tracked instance while it is live (CREATED through terminal).
struct LiveInstance {
    state: Mutex<JobInstance>,
    tail: Arc<TailBuffer>,
    output_notify: Arc<Notify>,
    runner: Mutex<Option<ProcessRunner>>,
    bypass_output: bool,
    done_tx: watch::Sender<bool>,
}

impl LiveInstance {
    fn new(instance: JobInstance, tail_capacity: usize, bypass_output: bool) -> Arc<Self> {
        let (done_tx, _) = watch::channel(false);
        Arc::new(Self {
            state: Mutex::new(instance),
            tail: Arc::new(TailBuffer::new(tail_capacity)),
            output_notify: Arc::new(Notify::new()),
            runner: Mutex::new(None),
            bypass_output,
            done_tx,
        })
    }

    fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    fn id(&self) -> InstanceId {
        self.state.lock().id.clone()
    }

    async fn wait_done(&self) {
        let mut rx = self.done_tx.subscribe();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

/// The per-host job supervisor.
pub struct Supervisor<C: Clock = SystemClock, L: ProcessLauncher = SystemLauncher> {
    clock: C,
    launcher: L,
    bus: EventBus,
    latches: LatchRegistry,
    ids: InstanceIdGen,
    instances: Mutex<HashMap<InstanceId, Arc<LiveInstance>>>,
    store: Option<Arc<HistoryStore>>,
    disabled: Option<DisabledRegistry>,
    config: SupervisorConfig,
    /// Self-reference for handing the supervisor to monitor tasks.
    weak: Weak<Self>,
}

impl Supervisor<SystemClock, SystemLauncher> {
    /// Supervisor over the real clock and launcher.
    ///
    /// `store` is `None` when persistence is disabled; history and the
    /// disabled-job filter are then unavailable.
    pub fn new(
        store: Option<Arc<HistoryStore>>,
        config: SupervisorConfig,
    ) -> Result<Arc<Self>, EngineError> {
        Self::with_parts(SystemClock, SystemLauncher, store, config)
    }
}

impl<C: Clock + 'static, L: ProcessLauncher> Supervisor<C, L> {
    pub fn with_parts(
        clock: C,
        launcher: L,
        store: Option<Arc<HistoryStore>>,
        config: SupervisorConfig,
    ) -> Result<Arc<Self>, EngineError> {
        let disabled = match &store {
            Some(store) => Some(DisabledRegistry::load(Arc::clone(store))?),
            None => None,
        };
        Ok(Arc::new_cyclic(|weak| Self {
            clock,
            launcher,
            bus: EventBus::new(),
            latches: LatchRegistry::new(),
            ids: InstanceIdGen::new(),
            instances: Mutex::new(HashMap::new()),
            store,
            disabled,
            config,
            weak: weak.clone(),
        }))
    }

    /// Admit and (unless pending or disabled) start a new instance.
    pub async fn execute(&self, spec: ExecSpec) -> Result<InstanceId, EngineError> {
        let id = self.ids.next(&spec.job_id);
        let instance = JobInstance::create(id.clone(), &spec, self.clock.epoch_ms());
        let live = LiveInstance::new(instance, self.config.tail_capacity, spec.bypass_output);
        self.instances.lock().insert(id.clone(), Arc::clone(&live));
        tracing::info!(instance = %id, job = %spec.job_id, command = %spec.command_line(), "instance admitted");

        if let Some(disabled) = &self.disabled {
            if disabled.is_disabled(&spec.job_id) {
                tracing::info!(instance = %id, job = %spec.job_id, "job is disabled");
                self.finalize(&live, ExecutionState::Disabled).await;
                return Ok(id);
            }
        }

        if let Some(latch) = &spec.pending_latch {
            self.apply_transition(&live, ExecutionState::Pending).await?;
            self.latches.register(id.clone(), latch);
            return Ok(id);
        }

        self.start_running(&live).await?;
        Ok(id)
    }

    /// Snapshots of all live instances, oldest first.
    pub fn ps(&self) -> Vec<Snapshot> {
        let mut snapshots: Vec<Snapshot> =
            self.instances.lock().values().map(|l| l.snapshot()).collect();
        snapshots.sort_by(|a, b| {
            (a.created_at(), a.id.as_str()).cmp(&(b.created_at(), b.id.as_str()))
        });
        snapshots
    }

    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Request graceful stop for an instance or every instance of a job.
    pub async fn stop(&self, selector: &str) -> Result<usize, EngineError> {
        self.request_termination(selector, TerminationIntent::Stop).await
    }

    /// Request interrupt for an instance or every instance of a job.
    pub async fn interrupt(&self, selector: &str) -> Result<usize, EngineError> {
        self.request_termination(selector, TerminationIntent::Interrupt).await
    }

    /// Release every instance pending on `latch`; returns how many.
    ///
    /// All PENDING→RUNNING events are published before this returns.
    pub async fn release(&self, latch: &str) -> Result<usize, EngineError> {
        let waiters = self.latches.release(latch)?;
        let count = waiters.len();
        for id in waiters {
            let live = self.instances.lock().get(&id).cloned();
            if let Some(live) = live {
                if let Err(e) = self.start_running(&live).await {
                    tracing::warn!(instance = %id, error = %e, "released instance failed to start");
                }
            }
        }
        Ok(count)
    }

    /// Subscribe to events matching `filter`.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter, self.config.queue_capacity)
    }

    /// Block until an event matching `filter` satisfies `pred`, or the
    /// deadline elapses.
    pub async fn wait_for<F>(
        &self,
        filter: EventFilter,
        pred: F,
        timeout: Duration,
    ) -> Result<Event, EngineError>
    where
        F: Fn(&Event) -> bool,
    {
        let sub = self.subscribe(filter);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, sub.recv()).await {
                Ok(Some(event)) if pred(&event) => return Ok(event),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return Err(EngineError::Timeout),
            }
        }
    }

    /// Tail snapshots: one instance (or one job's instances), or all live
    /// instances when no selector is given.
    pub fn tails(
        &self,
        selector: Option<&str>,
    ) -> Result<Vec<(Snapshot, Vec<OutputLine>)>, EngineError> {
        let targets = match selector {
            Some(selector) => self.select(selector)?,
            None => self.instances.lock().values().cloned().collect(),
        };
        let mut tails: Vec<(Snapshot, Vec<OutputLine>)> = targets
            .iter()
            .map(|l| (l.snapshot(), l.tail.snapshot()))
            .collect();
        tails.sort_by(|a, b| {
            (a.0.created_at(), a.0.id.as_str()).cmp(&(b.0.created_at(), b.0.id.as_str()))
        });
        Ok(tails)
    }

    /// Follow one instance's tail from its current window onward.
    ///
    /// When the selector is a job ID with several live instances, the
    /// oldest one is followed.
    pub fn follow_tail(&self, selector: &str) -> Result<(Snapshot, TailFollower), EngineError> {
        let mut targets = self.select(selector)?;
        targets.sort_by_key(|l| l.snapshot().created_at());
        let live = targets
            .first()
            .ok_or_else(|| EngineError::UnknownInstance(selector.to_string()))?;
        Ok((
            live.snapshot(),
            TailFollower {
                tail: Arc::clone(&live.tail),
                notify: Arc::clone(&live.output_notify),
                cursor: 0,
            },
        ))
    }

    /// Query history records.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, EngineError> {
        let store = self.store.as_ref().ok_or(EngineError::PersistenceRequired)?;
        Ok(store.query(query)?)
    }

    /// Look up one history record by instance ID.
    pub fn history_get(&self, id: &InstanceId) -> Result<Option<HistoryRecord>, EngineError> {
        let store = self.store.as_ref().ok_or(EngineError::PersistenceRequired)?;
        Ok(store.get(id)?)
    }

    /// Add disabled patterns.
    pub fn disable(
        &self,
        patterns: &[String],
        kind: PatternKind,
        by: &str,
    ) -> Result<Vec<DisabledRecord>, EngineError> {
        let registry = self.disabled.as_ref().ok_or(EngineError::PersistenceRequired)?;
        Ok(registry.disable(patterns, kind, self.clock.epoch_ms(), by)?)
    }

    /// Remove disabled patterns; returns how many were removed.
    pub fn enable(&self, patterns: &[String]) -> Result<usize, EngineError> {
        let registry = self.disabled.as_ref().ok_or(EngineError::PersistenceRequired)?;
        Ok(registry.enable(patterns)?)
    }

    /// All disabled records.
    pub fn list_disabled(&self) -> Result<Vec<DisabledRecord>, EngineError> {
        let registry = self.disabled.as_ref().ok_or(EngineError::PersistenceRequired)?;
        Ok(registry.list()?)
    }

    /// Interrupt all live instances and wait for each to reach terminal.
    ///
    /// Called when the supervisor process receives SIGTERM/SIGINT; the
    /// daemon exits only after this returns.
    pub async fn shutdown(&self) {
        let live: Vec<Arc<LiveInstance>> = self.instances.lock().values().cloned().collect();
        if !live.is_empty() {
            tracing::info!(count = live.len(), "interrupting live instances for shutdown");
        }
        for instance in &live {
            self.terminate_instance(instance, TerminationIntent::Interrupt).await;
        }
        for instance in &live {
            instance.wait_done().await;
        }
        self.bus.close_all();
    }

    // -- internals --

    /// Resolve a selector to live instances: exact instance ID first,
    /// then all instances of a job.
    fn select(&self, selector: &str) -> Result<Vec<Arc<LiveInstance>>, EngineError> {
        let instances = self.instances.lock();
        if let Some(live) = instances.get(selector) {
            return Ok(vec![Arc::clone(live)]);
        }
        let matched: Vec<Arc<LiveInstance>> = instances
            .values()
            .filter(|l| l.state.lock().job_id == selector)
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(EngineError::UnknownInstance(selector.to_string()));
        }
        Ok(matched)
    }

    async fn request_termination(
        &self,
        selector: &str,
        intent: TerminationIntent,
    ) -> Result<usize, EngineError> {
        let targets = self.select(selector)?;
        let count = targets.len();
        for live in targets {
            self.terminate_instance(&live, intent).await;
        }
        Ok(count)
    }

    async fn terminate_instance(&self, live: &Arc<LiveInstance>, intent: TerminationIntent) {
        // CREATED and the pending→running hand-off are transient; retry
        // briefly instead of racing them.
        for _ in 0..50 {
            let state = live.state.lock().state();
            match state {
                ExecutionState::Pending => {
                    let id = live.id();
                    if self.latches.cancel(&id) {
                        self.finalize(live, intent.terminal_state()).await;
                        return;
                    }
                }
                ExecutionState::Running => {
                    if let Some(runner) = live.runner.lock().as_ref() {
                        runner.request(intent);
                        return;
                    }
                }
                ExecutionState::Created => {}
                _ => return,
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tracing::warn!(instance = %live.id(), "termination request gave up waiting for a signallable state");
    }

    /// Transition to RUNNING, spawn the child, and hand off to a monitor
    /// task. A spawn failure finalizes the instance as FAILED and is
    /// returned to the admitter.
    async fn start_running(&self, live: &Arc<LiveInstance>) -> Result<(), EngineError> {
        let (command, args) = {
            let state = live.state.lock();
            (state.command.clone(), state.args.clone())
        };
        self.apply_transition(live, ExecutionState::Running).await?;

        match self.launcher.spawn(&command, &args, !live.bypass_output).await {
            Ok(spawned) => {
                live.runner.lock().replace(ProcessRunner::new(spawned.pid));
                // The weak self always upgrades here: &self proves the Arc
                // is still alive.
                if let Some(supervisor) = self.weak.upgrade() {
                    let live = Arc::clone(live);
                    tokio::spawn(async move { supervisor.monitor(live, spawned).await });
                }
                Ok(())
            }
            Err(e) => {
                live.state.lock().error = Some(e.to_string());
                self.finalize(live, ExecutionState::Failed).await;
                Err(e)
            }
        }
    }

    /// Pump output, await exit, select and apply the terminal state.
    async fn monitor(self: Arc<Self>, live: Arc<LiveInstance>, spawned: SpawnedChild) {
        let SpawnedChild {
            mut child,
            stdout,
            stderr,
            ..
        } = spawned;
        let id = live.id();

        let mut pumps = Vec::new();
        if let Some(out) = stdout {
            pumps.push(OutputPump::spawn(
                id.clone(),
                OutputStream::Stdout,
                out,
                Arc::clone(&live.tail),
                Arc::clone(&live.output_notify),
                self.bus.clone(),
                self.clock.clone(),
            ));
        }
        if let Some(err) = stderr {
            pumps.push(OutputPump::spawn(
                id.clone(),
                OutputStream::Stderr,
                err,
                Arc::clone(&live.tail),
                Arc::clone(&live.output_notify),
                self.bus.clone(),
                self.clock.clone(),
            ));
        }

        let status = child.wait().await;

        // Drain remaining buffered lines before the terminal event
        for pump in pumps {
            let _ = pump.await;
        }

        let intent = live.runner.lock().as_ref().and_then(|r| r.intent());
        let (state, exit_code, error) = match status {
            Ok(status) => select_terminal_state(status, intent),
            Err(e) => (
                ExecutionState::Failed,
                None,
                Some(format!("wait failed: {e}")),
            ),
        };
        {
            let mut instance = live.state.lock();
            instance.exit_code = exit_code;
            if instance.error.is_none() {
                instance.error = error;
            }
        }
        self.finalize(&live, state).await;
    }

    /// Apply a transition and publish its event. `Ok(None)` when the
    /// instance is already in `to`.
    async fn apply_transition(
        &self,
        live: &Arc<LiveInstance>,
        to: ExecutionState,
    ) -> Result<Option<Snapshot>, EngineError> {
        let at = self.clock.epoch_ms();
        let (from, snapshot) = {
            let mut state = live.state.lock();
            match state.transition(to, at)? {
                Some(from) => (from, state.snapshot()),
                None => return Ok(None),
            }
        };
        tracing::info!(instance = %snapshot.id, %from, %to, "state changed");
        self.bus
            .publish(Event::StateChanged {
                instance: snapshot.clone(),
                from,
                to,
                at,
            })
            .await;
        Ok(Some(snapshot))
    }

    /// Terminal transition: close the tail, publish, persist, evict.
    async fn finalize(&self, live: &Arc<LiveInstance>, to: ExecutionState) {
        debug_assert!(to.is_terminal());
        live.tail.close();
        live.output_notify.notify_waiters();

        let snapshot = match self.apply_transition(live, to).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(instance = %live.id(), %to, error = %e, "terminal transition rejected");
                return;
            }
        };

        if let Some(store) = &self.store {
            if let Some(record) = HistoryRecord::from_snapshot(&snapshot, live.tail.snapshot()) {
                if let Err(e) = store.record(&record) {
                    // At-most-once: the transition stands, the record is lost
                    tracing::error!(instance = %snapshot.id, error = %e, "history write failed");
                }
            }
        }

        let overflow = live.tail.overflow();
        if overflow > 0 {
            tracing::debug!(instance = %snapshot.id, overflow, "tail lines evicted during run");
        }

        self.latches.cancel(&snapshot.id);
        self.instances.lock().remove(&snapshot.id);
        let _ = live.done_tx.send(true);
    }
}

/// Lazy sequence of tail lines, ending when the instance terminates.
pub struct TailFollower {
    tail: Arc<TailBuffer>,
    notify: Arc<Notify>,
    cursor: u64,
}

impl TailFollower {
    /// Next batch of lines, or `None` after the tail is closed and
    /// drained.
    pub async fn next_batch(&mut self) -> Option<Vec<OutputLine>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (lines, next) = self.tail.read_from(self.cursor);
            if !lines.is_empty() {
                self.cursor = next;
                return Some(lines);
            }
            if self.tail.is_closed() {
                return None;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
