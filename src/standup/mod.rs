//! Standup recognition.

mod classifier;

pub use classifier::StandupClassifier;
