//! Applying punishments to interns who missed their standup.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::poetry::{LinkGenerationFailed, PoetryLinkGenerator};
use super::policy::{ExerciseRange, PunishmentKind, PunishmentPolicy, PunishmentRecord};
use crate::storage::{Intern, InternStore, StorageError};
use crate::telegram::ChatTransport;

/// Errors that stop a punishment from being applied.
#[derive(Debug, Error)]
pub enum PunishError {
    #[error("Roster update failed: {0}")]
    Store(#[from] StorageError),

    #[error(transparent)]
    LinkGeneration(#[from] LinkGenerationFailed),
}

/// Picks and applies punishments, then notifies the interns chat.
///
/// Notification failures are logged and do not fail the punishment; the
/// roster change has already been made by then.
pub struct Punisher {
    roster: Arc<dyn InternStore>,
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    policy: PunishmentPolicy,
    exercises: ExerciseRange,
    poetry: PoetryLinkGenerator,
    rng: Mutex<StdRng>,
}

impl Punisher {
    #[must_use]
    pub fn new(
        roster: Arc<dyn InternStore>,
        transport: Arc<dyn ChatTransport>,
        chat_id: i64,
        policy: PunishmentPolicy,
        poetry: PoetryLinkGenerator,
    ) -> Self {
        Self {
            roster,
            transport,
            chat_id,
            policy,
            exercises: ExerciseRange::default(),
            poetry,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn with_exercise_range(mut self, exercises: ExerciseRange) -> Self {
        self.exercises = exercises;
        self
    }

    /// Replaces the random source, e.g. with a seeded one.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> PunishmentPolicy {
        self.policy
    }

    /// Punishes `intern` according to the configured policy.
    pub async fn punish(&self, intern: &Intern) -> Result<PunishmentRecord, PunishError> {
        let kind = match self.policy {
            PunishmentPolicy::Fixed(kind) => kind,
            PunishmentPolicy::Random => self.pick_random().await,
        };
        self.apply(kind, intern).await
    }

    /// Applies one specific variant.
    pub async fn apply(
        &self,
        kind: PunishmentKind,
        intern: &Intern,
    ) -> Result<PunishmentRecord, PunishError> {
        match kind {
            PunishmentKind::RemoveLife => self.remove_life(intern).await,
            PunishmentKind::PushUps => Ok(self.push_ups(intern).await),
            PunishmentKind::SitUps => Ok(self.sit_ups(intern).await),
            PunishmentKind::Poetry => self.poetry(intern).await,
        }
    }

    /// Takes one life. At zero the intern is removed from the chat and the roster.
    #[instrument(skip(self, intern), fields(username = %intern.username))]
    pub async fn remove_life(&self, intern: &Intern) -> Result<PunishmentRecord, PunishError> {
        let mut updated = intern.clone();
        updated.lives = (intern.lives - 1).max(0);

        if updated.lives > 0 {
            let saved = self.roster.update_intern(&updated).await?;
            let text = format!("{} осталось жизней: {}", saved.mention(), saved.lives);
            self.notify(&text).await;
            info!("{} lost a life, {} left", saved.username, saved.lives);
            return Ok(PunishmentRecord {
                kind: PunishmentKind::RemoveLife,
                magnitude: Some(u32::try_from(saved.lives).unwrap_or_default()),
                text,
            });
        }

        self.roster.update_intern(&updated).await?;

        match intern.chat_user_id {
            Some(user_id) => {
                if let Err(e) = self.transport.remove_member(self.chat_id, user_id).await {
                    warn!("Failed to remove {} from the chat: {}", intern.username, e);
                }
            }
            None => warn!(
                "No chat user id known for {}, cannot remove from the chat",
                intern.username
            ),
        }

        self.roster.delete_intern(intern.id).await?;

        let text = format!(
            "{} у тебя не осталось жизней, ты исключен из стажировки",
            intern.mention()
        );
        self.notify(&text).await;
        info!("{} ran out of lives and was removed", intern.username);

        Ok(PunishmentRecord {
            kind: PunishmentKind::RemoveLife,
            magnitude: Some(0),
            text,
        })
    }

    pub async fn push_ups(&self, intern: &Intern) -> PunishmentRecord {
        let count = self.draw_exercises().await;
        let text = format!(
            "{} в наказание за пропущенный стэндап тебе {} отжиманий",
            intern.mention(),
            count
        );
        self.notify(&text).await;
        info!("{} got {} push-ups", intern.username, count);

        PunishmentRecord {
            kind: PunishmentKind::PushUps,
            magnitude: Some(count),
            text,
        }
    }

    pub async fn sit_ups(&self, intern: &Intern) -> PunishmentRecord {
        let count = self.draw_exercises().await;
        let text = format!(
            "{} в наказание за пропущенный стэндап тебе {} приседаний",
            intern.mention(),
            count
        );
        self.notify(&text).await;
        info!("{} got {} sit-ups", intern.username, count);

        PunishmentRecord {
            kind: PunishmentKind::SitUps,
            magnitude: Some(count),
            text,
        }
    }

    /// Assigns a poem. Nothing is sent when no live link could be found.
    pub async fn poetry(&self, intern: &Intern) -> Result<PunishmentRecord, PunishError> {
        let link = self.poetry.generate(&self.rng).await?;
        let text = format!(
            "{} в наказание за пропущенный стэндап прочитай этот стих: {}",
            intern.mention(),
            link
        );
        self.notify(&text).await;
        info!("{} has to read {}", intern.username, link);

        Ok(PunishmentRecord {
            kind: PunishmentKind::Poetry,
            magnitude: None,
            text,
        })
    }

    async fn pick_random(&self) -> PunishmentKind {
        let mut rng = self.rng.lock().await;
        PunishmentKind::RANDOM_POOL
            .choose(&mut *rng)
            .copied()
            .unwrap_or(PunishmentKind::PushUps)
    }

    async fn draw_exercises(&self) -> u32 {
        let mut rng = self.rng.lock().await;
        self.exercises.draw(&mut *rng)
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.transport.send_message(self.chat_id, text).await {
            warn!("Failed to send punishment notice: {}", e);
        }
    }
}

impl std::fmt::Debug for Punisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Punisher")
            .field("chat_id", &self.chat_id)
            .field("policy", &self.policy)
            .field("exercises", &self.exercises)
            .field("poetry", &self.poetry)
            .finish_non_exhaustive()
    }
}
