//! Scheduler state management.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persistent state that survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersistentState {
    /// Local date of the last scheduled sweep.
    pub last_sweep_date: Option<NaiveDate>,
}

impl PersistentState {
    /// Loads state from a JSON file, returns default if not found.
    pub fn load(path: impl AsRef<Path>) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Saves state to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

/// State of the daily scheduler.
#[derive(Debug, Default)]
pub struct SchedulerState {
    /// A date is swept by the schedule at most once.
    last_sweep_date: Option<NaiveDate>,

    /// Summary of the most recent completed sweep.
    pub last_summary: Option<String>,

    /// Sweeps run since startup, manual ones included.
    pub sweeps_run: u64,
}

impl SchedulerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_persistent(persistent: &PersistentState) -> Self {
        Self {
            last_sweep_date: persistent.last_sweep_date,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn to_persistent(&self) -> PersistentState {
        PersistentState {
            last_sweep_date: self.last_sweep_date,
        }
    }

    /// Whether the scheduled sweep for `date` already happened.
    #[must_use]
    pub fn has_swept(&self, date: NaiveDate) -> bool {
        self.last_sweep_date.is_some_and(|last| last >= date)
    }

    #[must_use]
    pub const fn last_sweep_date(&self) -> Option<NaiveDate> {
        self.last_sweep_date
    }

    /// Records a scheduled sweep for `date`.
    pub fn mark_swept(&mut self, date: NaiveDate) {
        self.last_sweep_date = Some(date);
    }

    /// Records the outcome of any completed sweep.
    pub fn record_summary(&mut self, summary: String) {
        self.sweeps_run += 1;
        self.last_summary = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_default_state() {
        let state = SchedulerState::new();
        assert!(state.last_sweep_date().is_none());
        assert!(!state.has_swept(date(4)));
        assert_eq!(state.sweeps_run, 0);
    }

    #[test]
    fn test_mark_swept() {
        let mut state = SchedulerState::new();
        state.mark_swept(date(4));
        assert!(state.has_swept(date(4)));
        assert!(state.has_swept(date(3)));
        assert!(!state.has_swept(date(5)));
    }

    #[test]
    fn test_record_summary() {
        let mut state = SchedulerState::new();
        state.record_summary("done".to_owned());
        state.record_summary("done again".to_owned());
        assert_eq!(state.sweeps_run, 2);
        assert_eq!(state.last_summary.as_deref(), Some("done again"));
        assert!(state.last_sweep_date().is_none());
    }

    #[test]
    fn test_persistent_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("punisher_state_{}.json", std::process::id()));
        let mut state = SchedulerState::new();
        state.mark_swept(date(4));
        state.to_persistent().save(&path).unwrap();

        let restored = SchedulerState::from_persistent(&PersistentState::load(&path));
        assert_eq!(restored.last_sweep_date(), Some(date(4)));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let state = PersistentState::load("/nonexistent/punisher_state.json");
        assert_eq!(state, PersistentState::default());
    }
}
