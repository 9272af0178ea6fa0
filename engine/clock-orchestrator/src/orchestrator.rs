//! Core ClockOrchestrator implementation

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use matchclock::{ClockId, ClockKind, RunningClock, TimeSource};

use crate::config::{ErrorRecovery, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::metrics::{MetricsCollector, OrchestratorMetrics};

/// Callback invoked with the id of a due clock.
///
/// Update callbacks fire when a running clock crosses into a new whole
/// second with a non-zero value; stop callbacks fire when it reads zero.
/// Whatever the callback does (persist, notify subscribers) is called at
/// most once per elapsed second per clock, and must tolerate concurrent
/// registration changes of *other* clock ids.
pub type ClockCallback =
    Arc<dyn Fn(ClockId) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Default)]
struct CallbackSlots {
    playclock_update: Option<ClockCallback>,
    playclock_stop: Option<ClockCallback>,
    gameclock_update: Option<ClockCallback>,
    gameclock_stop: Option<ClockCallback>,
}

type ClockMap = BTreeMap<ClockId, Arc<dyn RunningClock>>;

/// The shared heartbeat driving all registered match clocks.
///
/// One instance per process, constructed explicitly and injected into the
/// services that register clocks and bind callbacks. All scheduling happens
/// on a single cooperative loop task, so per-clock callbacks are strictly
/// ordered and never run concurrently with each other.
pub struct ClockOrchestrator {
    // Core state
    is_running: AtomicBool,
    is_stopping: AtomicBool,

    // Clock registration (separate id namespaces per kind)
    playclocks: Mutex<ClockMap>,
    gameclocks: Mutex<ClockMap>,

    /// Last whole second already dispatched, keyed by kind and id so a play
    /// clock and a game clock sharing a numeric id never collide.
    last_dispatched_second: Mutex<HashMap<(ClockKind, ClockId), i64>>,

    callbacks: Mutex<CallbackSlots>,

    // System integration
    time: Arc<dyn TimeSource>,

    // Configuration
    config: OrchestratorConfig,

    // Metrics
    metrics_collector: Arc<MetricsCollector>,

    // Loop bookkeeping
    loop_task: Mutex<Option<JoinHandle<()>>>,
    last_error: Mutex<Option<String>>,
}

impl ClockOrchestrator {
    /// Create a new ClockOrchestrator
    pub fn new(
        config: OrchestratorConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let metrics_collector = Arc::new(MetricsCollector::new(1000));

        tracing::info!(
            tick_interval_ms = config.tick_interval_ms,
            time_source = time.name(),
            "Creating ClockOrchestrator"
        );

        Ok(Self {
            is_running: AtomicBool::new(false),
            is_stopping: AtomicBool::new(false),
            playclocks: Mutex::new(BTreeMap::new()),
            gameclocks: Mutex::new(BTreeMap::new()),
            last_dispatched_second: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(CallbackSlots::default()),
            time,
            config,
            metrics_collector,
            loop_task: Mutex::new(None),
            last_error: Mutex::new(None),
        })
    }

    /// Launch the scheduling loop as a background task.
    ///
    /// Calling `start()` on a running orchestrator is a logged no-op; there
    /// is never more than one loop task.
    pub fn start(self: &Arc<Self>) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            tracing::warn!("ClockOrchestrator already running");
            return;
        }
        self.is_stopping.store(false, Ordering::SeqCst);

        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move { orchestrator.run_loop().await });
        *self.loop_task.lock() = Some(task);

        tracing::info!("ClockOrchestrator started");
    }

    /// Shut the loop down and clear all registrations and callbacks.
    ///
    /// No callback fires after `stop()` returns. The orchestrator is left
    /// ready for a fresh `start()`; callers must re-register clocks and
    /// re-bind callbacks afterwards.
    pub async fn stop(&self) {
        self.is_stopping.store(true, Ordering::SeqCst);
        self.is_running.store(false, Ordering::SeqCst);

        *self.callbacks.lock() = CallbackSlots::default();
        self.playclocks.lock().clear();
        self.gameclocks.lock().clear();
        self.last_dispatched_second.lock().clear();
        self.metrics_collector.update_active_clocks(ClockKind::Play, 0);
        self.metrics_collector.update_active_clocks(ClockKind::Game, 0);

        let task = self.loop_task.lock().take();
        if let Some(task) = task {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    tracing::warn!("ClockOrchestrator loop ended abnormally: {err}");
                    *self.last_error.lock() = Some(err.to_string());
                }
            }
        }

        tracing::info!("ClockOrchestrator stopped");
    }

    /// Register a play clock, replacing any prior registration for this id.
    pub fn register_playclock(&self, clock_id: ClockId, clock: Arc<dyn RunningClock>) {
        self.register(ClockKind::Play, clock_id, clock);
    }

    /// Register a game clock, replacing any prior registration for this id.
    pub fn register_gameclock(&self, clock_id: ClockId, clock: Arc<dyn RunningClock>) {
        self.register(ClockKind::Game, clock_id, clock);
    }

    /// Remove a play clock. No-op for an id that is not registered.
    pub fn unregister_playclock(&self, clock_id: ClockId) {
        self.unregister(ClockKind::Play, clock_id);
    }

    /// Remove a game clock. No-op for an id that is not registered.
    pub fn unregister_gameclock(&self, clock_id: ClockId) {
        self.unregister(ClockKind::Game, clock_id);
    }

    /// Bind the playclock update callback, replacing any prior one.
    pub fn set_playclock_update_callback(&self, callback: ClockCallback) {
        self.callbacks.lock().playclock_update = Some(callback);
    }

    /// Bind the playclock stop callback, replacing any prior one.
    pub fn set_playclock_stop_callback(&self, callback: ClockCallback) {
        self.callbacks.lock().playclock_stop = Some(callback);
    }

    /// Bind the gameclock update callback, replacing any prior one.
    pub fn set_gameclock_update_callback(&self, callback: ClockCallback) {
        self.callbacks.lock().gameclock_update = Some(callback);
    }

    /// Bind the gameclock stop callback, replacing any prior one.
    pub fn set_gameclock_stop_callback(&self, callback: ClockCallback) {
        self.callbacks.lock().gameclock_stop = Some(callback);
    }

    /// Check if the loop is running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Check if a play clock id is registered
    pub fn is_playclock_registered(&self, clock_id: ClockId) -> bool {
        self.playclocks.lock().contains_key(&clock_id)
    }

    /// Check if a game clock id is registered
    pub fn is_gameclock_registered(&self, clock_id: ClockId) -> bool {
        self.gameclocks.lock().contains_key(&clock_id)
    }

    /// Number of registered play clocks
    pub fn playclock_count(&self) -> usize {
        self.playclocks.lock().len()
    }

    /// Number of registered game clocks
    pub fn gameclock_count(&self) -> usize {
        self.gameclocks.lock().len()
    }

    /// Last whole second dispatched for a clock, if it has been evaluated.
    pub fn last_dispatched_second(&self, kind: ClockKind, clock_id: ClockId) -> Option<i64> {
        self.last_dispatched_second.lock().get(&(kind, clock_id)).copied()
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> OrchestratorMetrics {
        self.metrics_collector.get_metrics()
    }

    /// Message of the most recent abnormal loop termination, if any.
    ///
    /// A crashed or halted loop is otherwise only visible in logs; operators
    /// can poll this as a health signal.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn clocks_for(&self, kind: ClockKind) -> &Mutex<ClockMap> {
        match kind {
            ClockKind::Play => &self.playclocks,
            ClockKind::Game => &self.gameclocks,
        }
    }

    fn register(&self, kind: ClockKind, clock_id: ClockId, clock: Arc<dyn RunningClock>) {
        let count = {
            let mut clocks = self.clocks_for(kind).lock();
            clocks.insert(clock_id, clock);
            clocks.len()
        };
        self.metrics_collector.update_active_clocks(kind, count);
        tracing::debug!(kind = kind.as_str(), clock_id, "clock registered");
    }

    fn unregister(&self, kind: ClockKind, clock_id: ClockId) {
        let removed = {
            let mut clocks = self.clocks_for(kind).lock();
            let removed = clocks.remove(&clock_id).is_some();
            if removed {
                self.metrics_collector.update_active_clocks(kind, clocks.len());
            }
            removed
        };
        self.last_dispatched_second.lock().remove(&(kind, clock_id));
        if removed {
            tracing::debug!(kind = kind.as_str(), clock_id, "clock unregistered");
        }
    }

    /// The scheduling loop: scan playclocks, then gameclocks, then sleep.
    async fn run_loop(self: Arc<Self>) {
        tracing::info!("ClockOrchestrator loop running");

        let mut last_metrics_emission = Instant::now();
        let mut last_health_check = Instant::now();
        let mut pass: u64 = 0;

        while self.is_running.load(Ordering::Relaxed) {
            let pass_start = Instant::now();
            pass += 1;

            if !self.scan_kind(ClockKind::Play).await {
                break;
            }
            if !self.scan_kind(ClockKind::Game).await {
                break;
            }

            self.metrics_collector.record_pass(pass, pass_start.elapsed());

            if self.config.monitoring.emit_metrics
                && last_metrics_emission.elapsed() >= self.config.metrics_interval()
            {
                self.emit_metrics(pass, pass_start.elapsed());
                last_metrics_emission = Instant::now();
            }

            if last_health_check.elapsed() >= self.config.health_check_interval() {
                self.perform_health_check();
                last_health_check = Instant::now();
            }

            tokio::time::sleep(self.config.tick_interval()).await;
        }

        tracing::info!("ClockOrchestrator loop stopped");
    }

    /// One pass over the registered clocks of one kind. Returns false when
    /// the loop must halt.
    async fn scan_kind(&self, kind: ClockKind) -> bool {
        // Stable snapshot: callbacks may register or unregister clocks while
        // the pass is in flight.
        let snapshot: Vec<(ClockId, Arc<dyn RunningClock>)> = {
            let clocks = self.clocks_for(kind).lock();
            clocks.iter().map(|(id, clock)| (*id, Arc::clone(clock))).collect()
        };

        for (clock_id, clock) in snapshot {
            if !self.should_update(kind, clock_id, clock.as_ref()) {
                continue;
            }
            if !self.dispatch(kind, clock_id, clock.as_ref()).await {
                return false;
            }
        }
        true
    }

    /// True when a new whole second has elapsed for this clock since its
    /// last dispatch. At most one true per clock per elapsed second, however
    /// often the loop polls; elapsed second 0 (the first poll after start)
    /// is dispatched too.
    fn should_update(&self, kind: ClockKind, clock_id: ClockId, clock: &dyn RunningClock) -> bool {
        let Some(started_at_ms) = clock.started_at_ms() else {
            return false;
        };
        let current_second = (self.time.now_ms() - started_at_ms).div_euclid(1000);

        let mut last = self.last_dispatched_second.lock();
        let last_second = last.get(&(kind, clock_id)).copied().unwrap_or(-1);
        if current_second > last_second {
            last.insert((kind, clock_id), current_second);
            true
        } else {
            false
        }
    }

    /// Fire the update or stop callback for one due clock. Returns false
    /// when the loop must not continue.
    async fn dispatch(&self, kind: ClockKind, clock_id: ClockId, clock: &dyn RunningClock) -> bool {
        // Re-checked at dispatch time so a concurrent stop() cannot race a
        // callback firing.
        if !self.is_running.load(Ordering::Relaxed) || self.is_stopping.load(Ordering::Relaxed) {
            return false;
        }

        let current_value = clock.current_value();
        if current_value == 0 {
            let callback = match kind {
                ClockKind::Play => self.callbacks.lock().playclock_stop.clone(),
                ClockKind::Game => self.callbacks.lock().gameclock_stop.clone(),
            };
            let result = match callback {
                Some(callback) => callback(clock_id).await,
                None => Ok(()),
            };
            // Terminal: once a clock reads zero it is retired and no longer
            // polled until something re-registers it.
            self.unregister(kind, clock_id);
            self.metrics_collector.record_stop_dispatched();
            tracing::debug!(kind = kind.as_str(), clock_id, "clock reached zero, retired");

            if let Err(err) = result {
                return self.handle_callback_failure(kind, clock_id, err);
            }
        } else {
            let callback = match kind {
                ClockKind::Play => self.callbacks.lock().playclock_update.clone(),
                ClockKind::Game => self.callbacks.lock().gameclock_update.clone(),
            };
            if let Some(callback) = callback {
                if let Err(err) = callback(clock_id).await {
                    self.metrics_collector.record_update_dispatched();
                    return self.handle_callback_failure(kind, clock_id, err);
                }
            }
            self.metrics_collector.record_update_dispatched();
        }
        true
    }

    /// Apply the configured recovery policy to a failed callback. Returns
    /// whether the loop should keep running.
    fn handle_callback_failure(
        &self,
        kind: ClockKind,
        clock_id: ClockId,
        err: anyhow::Error,
    ) -> bool {
        self.metrics_collector.record_callback_failure();
        match self.config.error_recovery {
            ErrorRecovery::Continue => {
                tracing::warn!(
                    kind = kind.as_str(),
                    clock_id,
                    error = %err,
                    "clock callback failed, continuing"
                );
                true
            }
            ErrorRecovery::Halt => {
                let cause = OrchestratorError::CallbackFailed { kind, clock_id, source: err };
                let halted = OrchestratorError::LoopHalted(cause.to_string());
                tracing::error!("{halted}");
                *self.last_error.lock() = Some(halted.to_string());
                self.is_running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Emit metrics from inside the loop
    fn emit_metrics(&self, pass: u64, pass_duration: Duration) {
        let metrics = self.metrics_collector.get_metrics();

        tracing::debug!(
            pass,
            duration_ns = pass_duration.as_nanos() as u64,
            active_playclocks = metrics.active_playclocks,
            active_gameclocks = metrics.active_gameclocks,
            updates_dispatched = metrics.total_updates_dispatched,
            stops_dispatched = metrics.total_stops_dispatched,
            "Scan pass metrics"
        );
    }

    /// Perform health check
    fn perform_health_check(&self) {
        let metrics = self.metrics_collector.get_metrics();

        if metrics.avg_pass_duration_ns > self.config.max_pass_duration().as_nanos() as u64 {
            tracing::warn!(
                "Slow scan passes: avg {}ns over the last {} passes",
                metrics.avg_pass_duration_ns,
                metrics.total_passes.min(1000)
            );
        }

        if self.config.monitoring.alert_on_failures && metrics.total_callback_failures > 0 {
            tracing::warn!(
                "{} callback failures since start",
                metrics.total_callback_failures
            );
        }
    }
}
