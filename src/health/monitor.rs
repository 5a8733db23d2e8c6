// src/health/monitor.rs
use super::checks::HealthProbes;
use super::status::HealthCheckResult;
use crate::guard::RunGuard;
use crate::logging::describe_panic;
use crate::metrics::MetricsCollector;
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub type Listener = Arc<dyn Fn(&HealthCheckResult) -> anyhow::Result<()> + Send + Sync>;

type ListenerMap = DashMap<u64, Listener>;

/// Handle returned by [`HealthMonitor::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl Subscription {
    /// Remove this listener. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.id);
        }
    }
}

#[derive(Default)]
struct MonitorState {
    running: bool,
    ticker: Option<JoinHandle<()>>,
}

pub struct HealthMonitor {
    probes: HealthProbes,
    metrics: Option<Arc<MetricsCollector>>,
    state: Mutex<MonitorState>,
    listeners: Arc<ListenerMap>,
    next_listener_id: AtomicU64,
    latest: ArcSwapOption<HealthCheckResult>,
    in_flight: AtomicBool,
}

impl HealthMonitor {
    /// Check interval used when none is configured.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(probes: HealthProbes, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self {
            probes,
            metrics,
            state: Mutex::new(MonitorState::default()),
            listeners: Arc::new(DashMap::new()),
            next_listener_id: AtomicU64::new(0),
            latest: ArcSwapOption::empty(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Check now and then every `period`. Results reach subscribers
    /// asynchronously. Must be called inside a Tokio runtime.
    pub fn start(self: &Arc<Self>, period: Duration) {
        let mut state = self.lock_state();
        if state.running {
            warn!("Health monitor already running");
            return;
        }

        let period = period.max(Duration::from_millis(1));
        info!(interval_ms = period.as_millis() as u64, "Starting health monitor");

        let monitor = Arc::clone(self);
        state.ticker = Some(tokio::spawn(async move {
            // First tick completes immediately
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let monitor = Arc::clone(&monitor);
                tokio::spawn(async move {
                    monitor.tick().await;
                });
            }
        }));
        state.running = true;
    }

    pub fn stop(&self) {
        let mut state = self.lock_state();
        state.running = false;

        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
            info!("Health monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&HealthCheckResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Run the aggregate check without publishing it.
    pub async fn run_health_check(&self) -> HealthCheckResult {
        self.probes.run_health_check().await
    }

    /// Most recent published result.
    pub fn latest(&self) -> Option<Arc<HealthCheckResult>> {
        self.latest.load_full()
    }

    async fn tick(&self) {
        let Some(_guard) = RunGuard::try_acquire(&self.in_flight) else {
            debug!("Previous health check still running, skipping tick");
            return;
        };

        let result = self.run_health_check().await;
        if !result.is_healthy() {
            warn!(
                status = %result.status,
                errors = ?result.errors,
                "Health check failed"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_health_check(&result);
        }

        let result = Arc::new(result);
        self.latest.store(Some(Arc::clone(&result)));
        self.notify(&result);
    }

    fn notify(&self, result: &HealthCheckResult) {
        // Snapshot first so listeners may unsubscribe while being called
        let mut listeners: Vec<(u64, Listener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);

        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(result))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(listener = id, error = %e, "Health monitor listener error");
                }
                Err(payload) => {
                    error!(
                        listener = id,
                        panic = %describe_panic(payload.as_ref()),
                        "Health monitor listener panicked"
                    );
                }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{
        DependencyHandle, DependencyResolver, EnvironmentReport, EnvironmentValidator,
        NetworkProbe,
    };
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct Ok3;

    impl EnvironmentValidator for Ok3 {
        fn validate(&self) -> Result<EnvironmentReport> {
            Ok(EnvironmentReport::from_errors(Vec::new()))
        }
    }

    #[async_trait]
    impl DependencyResolver for Ok3 {
        async fn resolve(&self) -> Result<Option<DependencyHandle>> {
            Ok(Some(DependencyHandle {
                name: "auth".into(),
                endpoint: None,
            }))
        }
    }

    #[async_trait]
    impl NetworkProbe for Ok3 {
        async fn is_online(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn monitor() -> HealthMonitor {
        let ok = Arc::new(Ok3);
        HealthMonitor::new(HealthProbes::new(ok.clone(), ok.clone(), ok), None)
    }

    #[tokio::test]
    async fn test_listeners_are_isolated_from_each_other() {
        let monitor = monitor();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["before", "failing", "panicking", "after"] {
            let seen = Arc::clone(&seen);
            monitor.subscribe(move |result| {
                seen.lock().unwrap().push((name, result.timestamp));
                match name {
                    "failing" => Err(anyhow!("listener rejected result")),
                    "panicking" => panic!("listener crashed"),
                    _ => Ok(()),
                }
            });
        }

        monitor.tick().await;

        let seen = seen.lock().unwrap();
        let names: Vec<_> = seen.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["before", "failing", "panicking", "after"]);
        assert!(seen.iter().all(|(_, ts)| *ts == seen[0].1));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_targeted() {
        let monitor = monitor();
        let first = monitor.subscribe(|_| Ok(()));
        let _second = monitor.subscribe(|_| Ok(()));

        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(monitor.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_publishes_latest_result() {
        let monitor = monitor();
        assert!(monitor.latest().is_none());

        monitor.tick().await;
        assert!(monitor.latest().unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_tick_skipped_while_previous_in_flight() {
        let monitor = monitor();
        let held = RunGuard::try_acquire(&monitor.in_flight).unwrap();

        monitor.tick().await;
        assert!(monitor.latest().is_none());

        drop(held);
        monitor.tick().await;
        assert!(monitor.latest().is_some());
    }
}
