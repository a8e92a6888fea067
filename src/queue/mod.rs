// Queue management module
// Holds the playlist order and the cursor into it

use rand::seq::SliceRandom;
use rand::Rng;

use crate::library::models::{Playlist, Track, TrackId};

/// Direction of a cursor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Backward,
}

/// Ordered tracks plus the position of the current one
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Playlist,
    cursor: Option<usize>,
}

impl PlayQueue {
    pub fn new(tracks: Playlist) -> Self {
        Self { tracks, cursor: None }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    /// Point the cursor at an index; out-of-range indices are rejected
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.cursor = Some(index);
            true
        } else {
            false
        }
    }

    pub fn position_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Index one step away from the cursor, wrapping at both ends.
    ///
    /// With no cursor, forward starts at the first track and backward at the last.
    pub fn peek_step(&self, step: Step) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        let target = match (self.cursor, step) {
            (None, Step::Forward) => 0,
            (None, Step::Backward) => len - 1,
            (Some(i), Step::Forward) => (i + 1) % len,
            (Some(i), Step::Backward) => (i + len - 1) % len,
        };
        Some(target)
    }

    /// Move the cursor one step and return the new index
    pub fn step(&mut self, step: Step) -> Option<usize> {
        let target = self.peek_step(step)?;
        self.cursor = Some(target);
        Some(target)
    }

    /// Randomly permute the tracks in place and reset the cursor to the first one
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        self.tracks.shuffle(rng);
        self.cursor = Some(0);
        Some(0)
    }

    /// Swap in a new playlist; the cursor is cleared
    pub fn replace(&mut self, tracks: Playlist) {
        self.tracks = tracks;
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn queue(n: usize) -> PlayQueue {
        PlayQueue::new((0..n).map(|i| Track::untagged(format!("/music/{}.mp3", i))).collect())
    }

    #[test]
    fn test_forward_wraps_after_len_steps() {
        for len in 1..6 {
            for start in 0..len {
                let mut q = queue(len);
                q.set_cursor(start);
                for _ in 0..len {
                    q.step(Step::Forward);
                }
                assert_eq!(q.cursor(), Some(start), "len {} start {}", len, start);
            }
        }
    }

    #[test]
    fn test_backward_undoes_forward() {
        let mut q = queue(4);
        for start in 0..4 {
            q.set_cursor(start);
            q.step(Step::Forward);
            q.step(Step::Backward);
            assert_eq!(q.cursor(), Some(start));
        }
    }

    #[test]
    fn test_wraps_at_both_ends() {
        let mut q = queue(3);
        q.set_cursor(2);
        assert_eq!(q.step(Step::Forward), Some(0));
        assert_eq!(q.step(Step::Backward), Some(2));
    }

    #[test]
    fn test_no_cursor_starting_points() {
        let q = queue(3);
        assert_eq!(q.peek_step(Step::Forward), Some(0));
        assert_eq!(q.peek_step(Step::Backward), Some(2));
    }

    #[test]
    fn test_empty_queue_never_moves() {
        let mut q = queue(0);
        assert_eq!(q.step(Step::Forward), None);
        assert_eq!(q.step(Step::Backward), None);
        assert_eq!(q.shuffle(&mut StdRng::seed_from_u64(1)), None);
        assert_eq!(q.cursor(), None);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut q = queue(20);
        q.set_cursor(7);
        let before: HashSet<TrackId> = q.tracks().iter().map(|t| t.id).collect();

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(q.shuffle(&mut rng), Some(0));

        let after: HashSet<TrackId> = q.tracks().iter().map(|t| t.id).collect();
        assert_eq!(q.len(), 20);
        assert_eq!(before, after);
        assert_eq!(q.cursor(), Some(0));
    }

    #[test]
    fn test_set_cursor_rejects_out_of_range() {
        let mut q = queue(2);
        assert!(!q.set_cursor(2));
        assert_eq!(q.cursor(), None);
        assert!(q.set_cursor(1));
        assert_eq!(q.current().unwrap().locator.as_path().to_str(), Some("/music/1.mp3"));
    }
}
