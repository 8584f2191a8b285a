//! Per-index generation state and the generation lock
//!
//! A slot moves `Empty -> Generating -> Filled`; a failed job returns it to
//! `Empty`. Only one slot may be `Generating` at a time.

use serde::Serialize;

/// State of one queue slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotState {
    Empty,
    Generating,
    Filled,
}

/// Holds the index currently locked for generation
#[derive(Debug, Default)]
pub struct GenerationLock {
    locked: Option<usize>,
}

impl GenerationLock {
    /// Lock `index`; fails with the already-locked index
    pub fn try_lock(&mut self, index: usize) -> Result<(), usize> {
        match self.locked {
            Some(locked) => Err(locked),
            None => {
                self.locked = Some(index);
                Ok(())
            }
        }
    }

    /// Release `index`; a release for any other index is ignored
    pub fn release(&mut self, index: usize) -> bool {
        if self.locked == Some(index) {
            self.locked = None;
            true
        } else {
            false
        }
    }

    pub fn locked_index(&self) -> Option<usize> {
        self.locked
    }

    /// State of `index` given the current queue length
    pub fn slot_state(&self, index: usize, queue_len: usize) -> SlotState {
        if index < queue_len {
            SlotState::Filled
        } else if self.locked == Some(index) {
            SlotState::Generating
        } else {
            SlotState::Empty
        }
    }
}
