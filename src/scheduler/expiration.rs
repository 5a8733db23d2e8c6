// src/scheduler/expiration.rs
use crate::config::SchedulerConfig;
use crate::guard::RunGuard;
use crate::leave::{LeaveManagementService, LeaveStep};
use crate::logging::describe_panic;
use crate::metrics::{MetricsCollector, Timer};
use crate::timezone::{self, Clock};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Startup,
    Hourly,
    Midnight,
    Manual,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Startup => "startup",
            RunTrigger::Hourly => "hourly",
            RunTrigger::Midnight => "midnight",
            RunTrigger::Manual => "manual",
        }
    }
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirationReport {
    Completed {
        run_id: Uuid,
        trigger: RunTrigger,
        failed_steps: Vec<LeaveStep>,
    },
    /// Another run was still in flight.
    Skipped { trigger: RunTrigger },
}

impl ExpirationReport {
    pub fn failed_steps(&self) -> &[LeaveStep] {
        match self {
            ExpirationReport::Completed { failed_steps, .. } => failed_steps,
            ExpirationReport::Skipped { .. } => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ExpirationReport::Skipped { .. })
    }
}

#[derive(Default)]
struct SchedulerState {
    running: bool,
    hourly: Option<JoinHandle<()>>,
    midnight: Option<JoinHandle<()>>,
}

/// Runs the leave expiration sequence on startup, every period, and at each
/// campus-local midnight.
pub struct ExpirationScheduler {
    service: Arc<dyn LeaveManagementService>,
    clock: Arc<dyn Clock>,
    period: Duration,
    metrics: Option<Arc<MetricsCollector>>,
    state: Mutex<SchedulerState>,
    in_flight: AtomicBool,
}

impl ExpirationScheduler {
    pub fn new(
        config: &SchedulerConfig,
        service: Arc<dyn LeaveManagementService>,
        clock: Arc<dyn Clock>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            service,
            clock,
            period: config.interval().max(Duration::from_secs(1)),
            metrics,
            state: Mutex::new(SchedulerState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Arm the timers. Must be called inside a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if state.running {
            info!("Leave scheduler is already running");
            return;
        }

        info!(
            interval_secs = self.period.as_secs(),
            "Starting leave scheduler"
        );

        self.spawn_run(RunTrigger::Startup);
        state.hourly = Some(tokio::spawn(Arc::clone(self).hourly_loop()));
        state.midnight = Some(tokio::spawn(Arc::clone(self).midnight_loop()));
        state.running = true;
    }

    /// Cancel both timers. Runs already in flight finish on their own.
    pub fn stop(&self) {
        let mut state = self.lock_state();

        let hourly = state.hourly.take();
        let midnight = state.midnight.take();
        let was_running = std::mem::replace(&mut state.running, false);

        for handle in hourly.into_iter().chain(midnight) {
            handle.abort();
        }

        if was_running {
            info!("Leave scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    /// Run the expiration sequence now, outside the timers.
    pub async fn run_expiration_check(&self) -> ExpirationReport {
        info!("Manual leave expiration check triggered");
        self.run(RunTrigger::Manual).await
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_run(self: &Arc<Self>, trigger: RunTrigger) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run(trigger).await;
        });
    }

    async fn hourly_loop(self: Arc<Self>) {
        // The startup run covers the first slot
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.spawn_run(RunTrigger::Hourly);
        }
    }

    async fn midnight_loop(self: Arc<Self>) {
        let mut target = timezone::next_midnight(&self.clock.now());

        loop {
            let delay = (target - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            info!(
                next_run = %timezone::format_date_time(&target),
                offset = %self.clock.offset(),
                minutes = delay.as_secs() / 60,
                "Scheduled midnight leave check"
            );

            sleep(delay).await;
            self.spawn_run(RunTrigger::Midnight);

            // A clock stepped back past the midnight just served must not re-arm it
            target = timezone::next_midnight(&self.clock.now().max(target));
        }
    }

    async fn run(&self, trigger: RunTrigger) -> ExpirationReport {
        let Some(_guard) = RunGuard::try_acquire(&self.in_flight) else {
            debug!(%trigger, "Leave expiration check already in progress, skipping");
            if let Some(metrics) = &self.metrics {
                metrics.record_expiration_skipped(trigger.as_str());
            }
            return ExpirationReport::Skipped { trigger };
        };

        let run_id = Uuid::new_v4();
        let timer = Timer::new();
        info!(%run_id, %trigger, "Checking for expired leaves");

        let mut failed_steps = Vec::new();
        for step in LeaveStep::SEQUENCE {
            let outcome = AssertUnwindSafe(step.run(self.service.as_ref()))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => debug!(%run_id, %step, "Leave step completed"),
                Ok(Err(e)) => {
                    error!(%run_id, %step, error = %e, "Leave step failed");
                    failed_steps.push(step);
                }
                Err(payload) => {
                    error!(
                        %run_id,
                        %step,
                        panic = %describe_panic(payload.as_ref()),
                        "Leave step panicked"
                    );
                    failed_steps.push(step);
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_expiration_run(trigger.as_str(), &failed_steps, timer.elapsed());
        }

        if failed_steps.is_empty() {
            info!(%run_id, %trigger, "Leave expiration check completed");
        } else {
            warn!(
                %run_id,
                %trigger,
                failed = failed_steps.len(),
                "Leave expiration check completed with failures"
            );
        }

        ExpirationReport::Completed {
            run_id,
            trigger,
            failed_steps,
        }
    }
}
