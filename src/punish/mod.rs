//! Punishments for missed standups.

mod poetry;
mod policy;
mod punisher;

pub use poetry::{
    HttpLinkChecker, LinkChecker, LinkGenerationFailed, NOT_FOUND_MARKER, PoetryLinkGenerator,
    candidate_link,
};
pub use policy::{
    ExerciseRange, PunishmentKind, PunishmentPolicy, PunishmentRecord, UnknownPunishment,
};
pub use punisher::{PunishError, Punisher};
