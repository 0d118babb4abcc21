use super::Replacer;
use crate::buffer::FrameId;
use crate::error::{PlumeError, PlumeResult};
use std::collections::{HashMap, VecDeque};

/// Eviction priority of a frame. Frames with fewer than k recorded
/// accesses rank above any frame with a full history; within a class
/// the larger value (older reference sample) loses its slot first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Distance {
    Finite(u64),
    Infinite { age: u64 },
}

#[derive(Debug)]
struct FrameHistory {
    // the last k access times, oldest first
    accesses: VecDeque<u64>,
    evictable: bool,
}

impl FrameHistory {
    fn distance(&self, now: u64, k: usize) -> Distance {
        match self.accesses.front() {
            Some(&first) if self.accesses.len() >= k => Distance::Finite(now - first),
            Some(&first) => Distance::Infinite { age: now - first },
            None => Distance::Infinite { age: 0 },
        }
    }
}

/// Backward k-distance replacement: the victim is the evictable frame
/// whose k-th most recent access lies furthest in the past.
#[derive(Debug)]
pub struct LRUKReplacer {
    k: usize,
    capacity: usize,
    clock: u64,
    frames: HashMap<FrameId, FrameHistory>,
}

impl LRUKReplacer {
    pub fn with_k(capacity: usize, k: usize) -> Self {
        Self {
            k,
            capacity,
            clock: 0,
            frames: HashMap::with_capacity(capacity),
        }
    }
}

impl Replacer for LRUKReplacer {
    fn new(capacity: usize) -> Self {
        const DEFAULT_K: usize = 2;
        Self::with_k(capacity, DEFAULT_K)
    }

    fn record_access(&mut self, frame_id: FrameId) -> PlumeResult<()> {
        if !self.frames.contains_key(&frame_id) && self.frames.len() == self.capacity {
            return Err(PlumeError::Internal(format!(
                "replacer already tracks {} frames",
                self.capacity
            )));
        }
        let now = self.clock;
        self.clock += 1;

        let k = self.k;
        let history = self.frames.entry(frame_id).or_insert_with(|| FrameHistory {
            accesses: VecDeque::with_capacity(k),
            evictable: false,
        });
        if history.accesses.len() == k {
            history.accesses.pop_front();
        }
        history.accesses.push_back(now);
        Ok(())
    }

    fn evict(&mut self) -> Option<FrameId> {
        let (now, k) = (self.clock, self.k);
        let victim = self
            .frames
            .iter()
            .filter(|(_, history)| history.evictable)
            .max_by_key(|(_, history)| history.distance(now, k))
            .map(|(frame_id, _)| *frame_id)?;
        self.frames.remove(&victim);
        Some(victim)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) -> PlumeResult<()> {
        match self.frames.get_mut(&frame_id) {
            Some(history) => {
                history.evictable = evictable;
                Ok(())
            }
            None => Err(PlumeError::Internal(format!(
                "replacer does not track frame {}",
                frame_id
            ))),
        }
    }

    fn size(&self) -> usize {
        self.frames
            .values()
            .filter(|history| history.evictable)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cache::Replacer;

    #[test]
    fn set_evictable_tracks_size() {
        let mut replacer = LRUKReplacer::with_k(3, 2);
        replacer.record_access(1).unwrap();
        replacer.set_evictable(1, true).unwrap();
        assert_eq!(replacer.size(), 1);
        replacer.set_evictable(1, false).unwrap();
        assert_eq!(replacer.size(), 0);
        assert!(replacer.set_evictable(9, true).is_err());
    }

    #[test]
    fn evicts_largest_k_distance() {
        let mut replacer = LRUKReplacer::with_k(2, 3);
        replacer.record_access(1).unwrap(); // ts=0
        replacer.record_access(2).unwrap(); // ts=1
        replacer.record_access(2).unwrap(); // ts=2
        replacer.record_access(1).unwrap(); // ts=3
        replacer.record_access(2).unwrap(); // ts=4
        replacer.set_evictable(1, true).unwrap();
        replacer.set_evictable(2, true).unwrap();
        // frame 1 has two of three samples, frame 2 a full history
        assert_eq!(replacer.evict(), Some(1));
    }

    #[test]
    fn infinite_distance_evicted_first() {
        let mut replacer = LRUKReplacer::with_k(3, 3);
        replacer.record_access(1).unwrap(); // ts=0
        replacer.record_access(2).unwrap(); // ts=1, fewer than k accesses
        replacer.record_access(3).unwrap(); // ts=2, fewer than k accesses
        replacer.record_access(1).unwrap(); // ts=3
        replacer.record_access(1).unwrap(); // ts=4
        replacer.record_access(3).unwrap(); // ts=5
        replacer.set_evictable(1, true).unwrap();
        replacer.set_evictable(2, true).unwrap();
        replacer.set_evictable(3, true).unwrap();
        // frames 2 and 3 are both cold; 2 holds the older access
        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn capacity_is_enforced_and_freed_by_eviction() {
        let mut replacer = LRUKReplacer::with_k(2, 2);
        replacer.record_access(0).unwrap();
        replacer.record_access(1).unwrap();
        assert!(replacer.record_access(2).is_err());

        replacer.set_evictable(0, true).unwrap();
        assert_eq!(replacer.evict(), Some(0));
        assert!(replacer.record_access(2).is_ok());
    }
}
