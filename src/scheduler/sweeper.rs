//! The daily compliance check.
//!
//! Walks the roster once, looks up each intern's latest standup and punishes
//! everyone who did not post one today. "Today" is judged in the reference
//! time zone, and only the day of the month is compared.

use std::sync::Arc;

use chrono::{Datelike, Weekday};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::Clock;
use crate::punish::Punisher;
use crate::storage::{Intern, InternStore, StandupStore, StorageError};
use crate::telegram::ChatTransport;

/// Message sent to the interns chat after every completed sweep.
pub const SWEEP_SUMMARY: &str = "Каратель завершил свою работу ;)";

/// Reasons a sweep did not run to completion.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Saturday or Sunday in the reference zone. Nothing was touched.
    #[error("Day off, nobody is punished on weekends")]
    DayOff,

    #[error("Failed to list interns: {0}")]
    Store(#[from] StorageError),
}

/// Finds interns without a standup for today and punishes them.
pub struct ComplianceSweeper {
    roster: Arc<dyn InternStore>,
    standups: Arc<dyn StandupStore>,
    punisher: Arc<Punisher>,
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl ComplianceSweeper {
    #[must_use]
    pub fn new(
        roster: Arc<dyn InternStore>,
        standups: Arc<dyn StandupStore>,
        punisher: Arc<Punisher>,
        transport: Arc<dyn ChatTransport>,
        chat_id: i64,
        timezone: Tz,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            roster,
            standups,
            punisher,
            transport,
            chat_id,
            timezone,
            clock,
        }
    }

    /// Runs one sweep and returns the summary sent to the chat.
    #[instrument(skip(self))]
    pub async fn run_daily_check(&self) -> Result<String, SweepError> {
        let now = self.clock.now().with_timezone(&self.timezone);

        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            info!("{} is a day off, skipping the sweep", now.weekday());
            return Err(SweepError::DayOff);
        }

        let interns = self.roster.list_interns().await?;
        info!("Checking standups of {} interns", interns.len());

        let mut punished = 0usize;
        for intern in &interns {
            match self.missed_standup(intern, now.day()).await {
                Ok(true) => match self.punisher.punish(intern).await {
                    Ok(record) => {
                        punished += 1;
                        debug!("Punished {} with {}", intern.username, record.kind);
                    }
                    Err(e) => warn!("Failed to punish {}: {}", intern.username, e),
                },
                Ok(false) => debug!("{} posted a standup today", intern.username),
                Err(e) => error!("Failed to look up the standup of {}: {}", intern.username, e),
            }
        }

        info!("Sweep finished, {} of {} interns punished", punished, interns.len());

        if let Err(e) = self.transport.send_message(self.chat_id, SWEEP_SUMMARY).await {
            warn!("Failed to send the sweep summary: {}", e);
        }

        Ok(SWEEP_SUMMARY.to_owned())
    }

    /// Whether `intern` has no standup whose day of month is `today`.
    async fn missed_standup(&self, intern: &Intern, today: u32) -> Result<bool, StorageError> {
        match self.standups.last_standup_for(&intern.username).await {
            Ok(standup) => Ok(standup.created.with_timezone(&self.timezone).day() != today),
            Err(StorageError::NotFound) => Ok(true),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for ComplianceSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceSweeper")
            .field("chat_id", &self.chat_id)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
