//! Daily sweep scheduler.
//!
//! The runner sleeps until the next punish time in the reference zone, runs
//! one sweep, and goes back to sleep. Manual sweeps arrive over the channel
//! and run immediately without touching the once-per-date guard.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use super::{Clock, ComplianceSweeper, SchedulerState, SweepError};

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Run a sweep right now.
    TriggerSweep,
    /// Stop the scheduler.
    Shutdown,
}

/// Runs the compliance sweep once a day.
pub struct DailyScheduler {
    sweeper: Arc<ComplianceSweeper>,
    state: Arc<RwLock<SchedulerState>>,
    state_path: PathBuf,
    punish_time: NaiveTime,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl DailyScheduler {
    #[must_use]
    pub fn new(
        sweeper: Arc<ComplianceSweeper>,
        state: Arc<RwLock<SchedulerState>>,
        state_path: PathBuf,
        punish_time: NaiveTime,
        timezone: Tz,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sweeper,
            state,
            state_path,
            punish_time,
            timezone,
            clock,
        }
    }

    /// Runs the scheduler loop.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!(
            "Daily scheduler started, sweeping at {} {}",
            self.punish_time.format("%H:%M"),
            self.timezone
        );

        loop {
            let now = self.clock.now();
            let next = next_trigger(now, self.punish_time, self.timezone);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!("Next sweep at {}", next.with_timezone(&self.timezone));

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    self.scheduled_sweep().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::TriggerSweep) => {
                            debug!("Received manual sweep trigger");
                            let _ = self.sweep().await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Sweep fired by the timer; skipped when the date was already swept.
    async fn scheduled_sweep(&self) {
        let today = self.clock.now().with_timezone(&self.timezone).date_naive();

        if self.state.read().await.has_swept(today) {
            debug!("Already swept {}, skipping", today);
            return;
        }

        match self.sweep().await {
            Ok(()) | Err(SweepError::DayOff) => {
                let mut state = self.state.write().await;
                state.mark_swept(today);
                if let Err(e) = state.to_persistent().save(&self.state_path) {
                    warn!("Failed to save scheduler state: {}", e);
                }
            }
            Err(SweepError::Store(_)) => {}
        }
    }

    async fn sweep(&self) -> Result<(), SweepError> {
        match self.sweeper.run_daily_check().await {
            Ok(summary) => {
                self.state.write().await.record_summary(summary);
                Ok(())
            }
            Err(SweepError::DayOff) => {
                info!("Day off, nobody punished");
                Err(SweepError::DayOff)
            }
            Err(e) => {
                error!("Sweep failed: {}", e);
                Err(e)
            }
        }
    }

    /// Gets a reference to the scheduler state.
    #[must_use]
    pub fn state(&self) -> &Arc<RwLock<SchedulerState>> {
        &self.state
    }
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
#[must_use]
pub fn next_trigger(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    let mut date = local.date_naive();
    if local.time() >= at
        && let Some(tomorrow) = date.succ_opt()
    {
        date = tomorrow;
    }

    let naive = date.and_time(at);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

impl std::fmt::Debug for DailyScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyScheduler")
            .field("punish_time", &self.punish_time)
            .field("timezone", &self.timezone)
            .field("state_path", &self.state_path)
            .finish_non_exhaustive()
    }
}
