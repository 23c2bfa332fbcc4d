//! Decides whether a chat message counts as a standup report.
//!
//! Matching is plain case-sensitive substring search, with no
//! normalization and no word boundaries. Keyword stems are chosen so that
//! one fragment covers several word forms.

use tracing::debug;

use crate::config::{ClassifierPolicy, StandupRules};

/// Classifies free text as a standup according to [`StandupRules`].
#[derive(Debug, Clone)]
pub struct StandupClassifier {
    rules: StandupRules,
}

impl StandupClassifier {
    #[must_use]
    pub const fn new(rules: StandupRules) -> Self {
        Self { rules }
    }

    /// Returns true if `text` qualifies as a standup report.
    #[must_use]
    pub fn is_standup(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }

        match self.rules.policy {
            ClassifierPolicy::Tag => text.contains(self.rules.tag.as_str()),
            ClassifierPolicy::Keywords => self.matches_every_group(text),
        }
    }

    /// Names of the keyword groups `text` does not hit.
    #[must_use]
    pub fn missing_groups(&self, text: &str) -> Vec<&str> {
        self.rules
            .keyword_groups
            .iter()
            .filter(|group| !group.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|group| group.name.as_str())
            .collect()
    }

    fn matches_every_group(&self, text: &str) -> bool {
        let missing = self.missing_groups(text);
        if !missing.is_empty() {
            debug!("Message misses keyword groups: {:?}", missing);
        }
        !self.rules.keyword_groups.is_empty() && missing.is_empty()
    }

    #[must_use]
    pub const fn rules(&self) -> &StandupRules {
        &self.rules
    }
}
