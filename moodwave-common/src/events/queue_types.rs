//! Queue-related type definitions
//!
//! Supporting types describing why the song queue changed.

use serde::{Deserialize, Serialize};

/// What started a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GenerationTrigger {
    /// First song of a session, requested by the user
    Initial,
    /// Listen-before-generate dwell elapsed on the previous entry
    Dwell,
    /// Direct call (manual retry or presentation layer)
    Manual,
}

impl std::fmt::Display for GenerationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationTrigger::Initial => write!(f, "Initial"),
            GenerationTrigger::Dwell => write!(f, "Dwell"),
            GenerationTrigger::Manual => write!(f, "Manual"),
        }
    }
}

/// Why the current index moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NavigationCause {
    UserPrevious,
    UserNext,
    /// Current song finished and playback advanced on its own
    AutoAdvance,
}

impl std::fmt::Display for NavigationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationCause::UserPrevious => write!(f, "UserPrevious"),
            NavigationCause::UserNext => write!(f, "UserNext"),
            NavigationCause::AutoAdvance => write!(f, "AutoAdvance"),
        }
    }
}
