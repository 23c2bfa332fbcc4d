//! Standup recognition rules and validation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker that makes a message a standup under the tag policy.
pub const DEFAULT_STANDUP_TAG: &str = "#standup";

/// Errors that can occur while loading or validating rules.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Standup tag must not be empty")]
    EmptyTag,

    #[error("No keyword groups configured")]
    NoGroups,

    #[error("Keyword group '{name}' has no keywords")]
    EmptyGroup { name: String },

    #[error("Keyword group '{group}' has an empty keyword at index {index}")]
    EmptyKeyword { group: String, index: usize },

    #[error("Duplicate keyword group found: {name}")]
    DuplicateGroup { name: String },

    #[error("Unknown classifier policy: {0} (expected 'tag' or 'keywords')")]
    UnknownPolicy(String),

    #[error("Failed to read rules file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse rules file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// How a message is recognised as a standup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierPolicy {
    /// The message contains the standup tag.
    #[default]
    Tag,
    /// The message hits every keyword group.
    Keywords,
}

impl FromStr for ClassifierPolicy {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tag" | "hashtag" => Ok(Self::Tag),
            "keywords" | "keyword" => Ok(Self::Keywords),
            other => Err(RulesError::UnknownPolicy(other.to_owned())),
        }
    }
}

impl fmt::Display for ClassifierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Keywords => write!(f, "keywords"),
        }
    }
}

/// A named, ordered set of substrings. One hit is enough for the group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    #[must_use]
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
        }
    }
}

/// Complete set of recognition rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandupRules {
    #[serde(default)]
    pub policy: ClassifierPolicy,

    #[serde(default = "default_tag")]
    pub tag: String,

    /// Groups used by the keyword policy. Word stems, matched as substrings.
    #[serde(default = "default_groups")]
    pub keyword_groups: Vec<KeywordGroup>,
}

fn default_tag() -> String {
    DEFAULT_STANDUP_TAG.to_owned()
}

fn default_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup::new("problems", &["роблем", "рудност", "атрдуднен"]),
        KeywordGroup::new("yesterday", &["чера", "ятницу", "делал", "делано"]),
        KeywordGroup::new("today", &["егодн", "обираюс", "ланир"]),
    ]
}

impl Default for StandupRules {
    fn default() -> Self {
        Self {
            policy: ClassifierPolicy::default(),
            tag: default_tag(),
            keyword_groups: default_groups(),
        }
    }
}

impl StandupRules {
    /// Default rules with the given policy.
    #[must_use]
    pub fn with_policy(policy: ClassifierPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Loads rules from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        let rules: Self = serde_json::from_str(&content)?;
        Ok(rules)
    }

    /// Saves rules to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), RulesError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the part of the rules the active policy relies on.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), RulesError> {
        match self.policy {
            ClassifierPolicy::Tag => {
                if self.tag.is_empty() {
                    return Err(RulesError::EmptyTag);
                }
                Ok(())
            }
            ClassifierPolicy::Keywords => self.validate_groups().into_iter().collect(),
        }
    }

    /// Returns one result per keyword group.
    #[must_use]
    pub fn validate_groups(&self) -> Vec<Result<(), RulesError>> {
        if self.keyword_groups.is_empty() {
            return vec![Err(RulesError::NoGroups)];
        }

        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::with_capacity(self.keyword_groups.len());

        for group in &self.keyword_groups {
            if !seen.insert(&group.name) {
                results.push(Err(RulesError::DuplicateGroup {
                    name: group.name.clone(),
                }));
                continue;
            }

            if group.keywords.is_empty() {
                results.push(Err(RulesError::EmptyGroup {
                    name: group.name.clone(),
                }));
                continue;
            }

            // An empty keyword is a substring of every message.
            if let Some(index) = group.keywords.iter().position(String::is_empty) {
                results.push(Err(RulesError::EmptyKeyword {
                    group: group.name.clone(),
                    index,
                }));
                continue;
            }

            results.push(Ok(()));
        }

        results
    }

    /// Creates an example rules file for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self::with_policy(ClassifierPolicy::Keywords)
    }
}
