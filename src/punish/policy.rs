//! Punishment variants and the policy that selects them.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// One way of punishing an intern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunishmentKind {
    /// Take one life; at zero the intern is removed.
    RemoveLife,
    PushUps,
    SitUps,
    /// Read a random poem from stihi.ru.
    Poetry,
}

impl PunishmentKind {
    /// Variants the random policy picks from.
    pub const RANDOM_POOL: [Self; 3] = [Self::PushUps, Self::RemoveLife, Self::SitUps];

    /// Name used in configuration and admin commands.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemoveLife => "removelives",
            Self::PushUps => "pushups",
            Self::SitUps => "situps",
            Self::Poetry => "poetry",
        }
    }
}

impl fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A punishment name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown punishment type: {0}")]
pub struct UnknownPunishment(pub String);

impl FromStr for PunishmentKind {
    type Err = UnknownPunishment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "removelives" | "removelife" | "lives" => Ok(Self::RemoveLife),
            "pushups" | "push-ups" => Ok(Self::PushUps),
            "situps" | "sit-ups" => Ok(Self::SitUps),
            "poetry" | "poem" => Ok(Self::Poetry),
            other => Err(UnknownPunishment(other.to_owned())),
        }
    }
}

/// Which punishment a sweep applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentPolicy {
    /// Always the same variant.
    Fixed(PunishmentKind),
    /// A fresh uniform pick from [`PunishmentKind::RANDOM_POOL`] per intern.
    Random,
}

impl Default for PunishmentPolicy {
    fn default() -> Self {
        Self::Fixed(PunishmentKind::PushUps)
    }
}

impl FromStr for PunishmentPolicy {
    type Err = UnknownPunishment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("random") {
            return Ok(Self::Random);
        }
        s.parse().map(Self::Fixed)
    }
}

impl fmt::Display for PunishmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(kind) => fmt::Display::fmt(kind, f),
            Self::Random => f.write_str("random"),
        }
    }
}

/// Half-open `[min, max)` range of exercise repetitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseRange {
    pub min: u32,
    pub max: u32,
}

impl ExerciseRange {
    /// Returns `None` for an empty range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Option<Self> {
        if min < max { Some(Self { min, max }) } else { None }
    }

    /// Draws a count uniformly from the range.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..self.max)
    }

    #[must_use]
    pub const fn contains(&self, count: u32) -> bool {
        count >= self.min && count < self.max
    }
}

impl Default for ExerciseRange {
    fn default() -> Self {
        Self { min: 50, max: 500 }
    }
}

/// Outcome of punishing one intern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunishmentRecord {
    pub kind: PunishmentKind,

    /// Exercise count, or lives left for [`PunishmentKind::RemoveLife`].
    pub magnitude: Option<u32>,

    /// Notification sent to the chat.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("pushups".parse::<PunishmentKind>(), Ok(PunishmentKind::PushUps));
        assert_eq!("SitUps".parse::<PunishmentKind>(), Ok(PunishmentKind::SitUps));
        assert_eq!("removelives".parse::<PunishmentKind>(), Ok(PunishmentKind::RemoveLife));
        assert_eq!("poetry".parse::<PunishmentKind>(), Ok(PunishmentKind::Poetry));
        assert_eq!(
            "burpees".parse::<PunishmentKind>(),
            Err(UnknownPunishment("burpees".to_owned()))
        );
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("random".parse::<PunishmentPolicy>(), Ok(PunishmentPolicy::Random));
        assert_eq!(
            "poetry".parse::<PunishmentPolicy>(),
            Ok(PunishmentPolicy::Fixed(PunishmentKind::Poetry))
        );
        assert_eq!(PunishmentPolicy::default().to_string(), "pushups");
    }

    #[test]
    fn test_random_pool_excludes_poetry() {
        assert!(!PunishmentKind::RANDOM_POOL.contains(&PunishmentKind::Poetry));
    }

    #[test]
    fn test_exercise_range() {
        assert!(ExerciseRange::new(10, 10).is_none());
        assert!(ExerciseRange::new(11, 10).is_none());

        let range = ExerciseRange::new(0, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(range.contains(range.draw(&mut rng)));
        }
        assert!(!range.contains(10));
    }

    #[test]
    fn test_single_value_range() {
        let range = ExerciseRange::new(5, 6).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(range.draw(&mut rng), 5);
    }
}
