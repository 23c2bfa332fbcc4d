//! Daily compliance scheduling.
//!
//! The [`ComplianceSweeper`] checks the roster against submitted standups;
//! the [`DailyScheduler`] fires it at the configured punish time.

mod clock;
mod runner;
mod state;
mod sweeper;

pub use clock::{Clock, SystemClock};
pub use runner::{DailyScheduler, SchedulerMessage, next_trigger};
pub use state::{PersistentState, SchedulerState};
pub use sweeper::{ComplianceSweeper, SWEEP_SUMMARY, SweepError};
