//! Moodwave generation pipeline
//!
//! Turns a user's current and desired mood into a queue of generated songs:
//! a trajectory of intermediate moods, one song per mood, produced by a
//! remote music provider (or a mock) while the previous song plays.
//!
//! Layout:
//! - [`trajectory`]: mood catalog and path planning
//! - [`jobs`]: provider job clients, polling and mock mode
//! - [`notification`]: late final-artifact delivery
//! - [`orchestrator`]: queue, generation lock, dwell timer and upgrades
//! - [`context`], [`prompt`], [`lyrics`]: prompt inputs and lyrics
//! - [`player`]: simulated player driving the orchestrator from the CLI

pub mod artifacts;
pub mod config;
pub mod context;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod lyrics;
pub mod notification;
pub mod orchestrator;
pub mod player;
pub mod prompt;
pub mod trajectory;

pub use error::{Error, GenerationError, Result};
pub use jobs::{JobClient, Provider, SongGenerator, SongQueueEntry};
pub use notification::{FinalReady, NotificationChannel};
pub use orchestrator::{Collaborators, GenerationOutcome, Orchestrator, OrchestratorSettings};
