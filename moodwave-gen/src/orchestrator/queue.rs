//! Song queue with a navigation cursor and staged upgrades
//!
//! Entries only grow at the tail and never move. Final artifacts replace an
//! entry's audio reference in place unless the entry is current; upgrades for
//! the current entry are staged until the cursor moves away.

use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use crate::jobs::SongQueueEntry;

/// Early finals held back at most; the oldest is dropped first
const MAX_UNMATCHED: usize = 4;

/// Result of applying a final artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Entry at this index now references the final artifact
    Upgraded(usize),
    /// Entry is current; upgrade merges once it stops being current
    Staged(usize),
    /// No entry carries this job id (yet)
    UnknownJob,
}

/// Entry rejected by [`SongQueue::append`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superseded {
    pub queue_index: usize,
    pub queue_len: usize,
}

#[derive(Debug, Default)]
pub struct SongQueue {
    entries: Vec<SongQueueEntry>,
    current_index: usize,
    /// Index -> final reference waiting for the index to stop being current
    staged: BTreeMap<usize, String>,
    /// Finals that arrived before their entry was appended, oldest first
    unmatched: VecDeque<(String, String)>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SongQueueEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&SongQueueEntry> {
        self.entries.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&SongQueueEntry> {
        self.entries.get(self.current_index)
    }

    pub fn staged_indices(&self) -> Vec<usize> {
        self.staged.keys().copied().collect()
    }

    /// Append at the tail; only an entry for index `len()` is accepted
    ///
    /// A final artifact that arrived before the entry is applied right away.
    pub fn append(
        &mut self,
        entry: SongQueueEntry,
    ) -> Result<Option<UpgradeOutcome>, Superseded> {
        if entry.queue_index != self.entries.len() {
            return Err(Superseded {
                queue_index: entry.queue_index,
                queue_len: self.entries.len(),
            });
        }

        let early_final = entry.job_id.as_deref().and_then(|job_id| {
            let pos = self.unmatched.iter().position(|(id, _)| id == job_id)?;
            self.unmatched.remove(pos)
        });
        self.entries.push(entry);

        Ok(early_final.map(|(job_id, local_ref)| self.apply_final(&job_id, local_ref)))
    }

    /// Move the cursor back; None at index 0
    pub fn previous(&mut self) -> Option<(usize, usize)> {
        if self.current_index == 0 || self.entries.is_empty() {
            return None;
        }
        let old = self.current_index;
        self.current_index -= 1;
        Some((old, self.current_index))
    }

    /// Move the cursor forward; None at the last entry
    pub fn next(&mut self) -> Option<(usize, usize)> {
        if self.current_index + 1 >= self.entries.len() {
            return None;
        }
        let old = self.current_index;
        self.current_index += 1;
        Some((old, self.current_index))
    }

    /// Apply a final artifact for `job_id`
    pub fn apply_final(&mut self, job_id: &str, local_ref: String) -> UpgradeOutcome {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| e.job_id.as_deref() == Some(job_id))
        else {
            debug!(job_id = %job_id, "Final artifact for unknown job held back");
            self.unmatched.retain(|(id, _)| id != job_id);
            if self.unmatched.len() == MAX_UNMATCHED {
                self.unmatched.pop_front();
            }
            self.unmatched.push_back((job_id.to_string(), local_ref));
            return UpgradeOutcome::UnknownJob;
        };

        if index == self.current_index {
            self.staged.insert(index, local_ref);
            UpgradeOutcome::Staged(index)
        } else {
            self.entries[index].audio_ref = local_ref;
            self.staged.remove(&index);
            UpgradeOutcome::Upgraded(index)
        }
    }

    /// Drop held-back finals; called when a job ends without appending
    pub fn clear_unmatched(&mut self) {
        self.unmatched.clear();
    }

    pub fn unmatched_len(&self) -> usize {
        self.unmatched.len()
    }

    /// Merge staged upgrades for every index other than the current one
    ///
    /// Returns the merged indices with their new references.
    pub fn merge_staged(&mut self) -> Vec<(usize, String)> {
        let ready: Vec<usize> = self
            .staged
            .keys()
            .copied()
            .filter(|&index| index != self.current_index)
            .collect();

        let mut merged = Vec::with_capacity(ready.len());
        for index in ready {
            if let Some(local_ref) = self.staged.remove(&index) {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.audio_ref = local_ref.clone();
                    merged.push((index, local_ref));
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Provider;

    fn entry(queue_index: usize) -> SongQueueEntry {
        SongQueueEntry {
            queue_index,
            audio_ref: format!("https://stream/{}.mp3", queue_index),
            title: format!("Song {}", queue_index),
            approx_duration_secs: 30.0,
            provider: Provider::Suno,
            job_id: Some(format!("job-{}", queue_index)),
        }
    }

    fn queue_of(n: usize) -> SongQueue {
        let mut queue = SongQueue::new();
        for i in 0..n {
            queue.append(entry(i)).unwrap();
        }
        queue
    }

    #[test]
    fn test_append_only_at_tail() {
        let mut queue = queue_of(1);
        assert_eq!(
            queue.append(entry(3)),
            Err(Superseded {
                queue_index: 3,
                queue_len: 1
            })
        );
        assert_eq!(queue.append(entry(0)).unwrap_err().queue_len, 1);
        assert_eq!(queue.append(entry(1)), Ok(None));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut empty = SongQueue::new();
        assert_eq!(empty.previous(), None);
        assert_eq!(empty.next(), None);

        let mut queue = queue_of(2);
        assert_eq!(queue.previous(), None);
        assert_eq!(queue.next(), Some((0, 1)));
        assert_eq!(queue.next(), None);
        assert_eq!(queue.current_index(), 1);
        assert_eq!(queue.previous(), Some((1, 0)));
    }

    #[test]
    fn test_final_for_non_current_upgrades_in_place() {
        let mut queue = queue_of(2);
        assert_eq!(
            queue.apply_final("job-1", "/local/1.mp3".to_string()),
            UpgradeOutcome::Upgraded(1)
        );
        assert_eq!(queue.get(1).unwrap().audio_ref, "/local/1.mp3");
        assert_eq!(queue.get(1).unwrap().title, "Song 1");
    }

    #[test]
    fn test_final_for_current_is_staged_until_cursor_moves() {
        let mut queue = queue_of(2);
        assert_eq!(
            queue.apply_final("job-0", "/local/0.mp3".to_string()),
            UpgradeOutcome::Staged(0)
        );
        assert_eq!(queue.current().unwrap().audio_ref, "https://stream/0.mp3");
        assert!(queue.merge_staged().is_empty());

        queue.next();
        assert_eq!(queue.merge_staged(), vec![(0, "/local/0.mp3".to_string())]);
        assert_eq!(queue.get(0).unwrap().audio_ref, "/local/0.mp3");
        assert!(queue.staged_indices().is_empty());
    }

    #[test]
    fn test_early_final_applies_on_append() {
        let mut queue = queue_of(1);
        assert_eq!(
            queue.apply_final("job-1", "/local/1.mp3".to_string()),
            UpgradeOutcome::UnknownJob
        );
        assert_eq!(queue.append(entry(1)), Ok(Some(UpgradeOutcome::Upgraded(1))));
        assert_eq!(queue.get(1).unwrap().audio_ref, "/local/1.mp3");
        assert_eq!(queue.unmatched_len(), 0);
    }

    #[test]
    fn test_unknown_finals_are_bounded() {
        let mut queue = queue_of(1);
        for i in 0..10 {
            queue.apply_final(&format!("stray-{}", i), format!("/local/stray-{}.mp3", i));
        }
        assert_eq!(queue.unmatched_len(), MAX_UNMATCHED);

        // Newest stray is still held, oldest were dropped
        let mut late = entry(1);
        late.job_id = Some("stray-9".to_string());
        assert_eq!(queue.append(late), Ok(Some(UpgradeOutcome::Upgraded(1))));

        let mut dropped = entry(2);
        dropped.job_id = Some("stray-0".to_string());
        assert_eq!(queue.append(dropped), Ok(None));

        queue.clear_unmatched();
        assert_eq!(queue.unmatched_len(), 0);
    }
}
