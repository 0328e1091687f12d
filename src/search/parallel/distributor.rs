//! Lock-free distribution of starting differences to workers.

use crate::table::Difference;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of a claim on the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller now owns the difference; nobody else will receive it
    Difference(Difference),
    /// Every difference has been handed out
    Done,
}

/// Hands out every difference of `[first, end)` exactly once across any
/// number of concurrent callers.
///
/// The cursor only moves forward and never passes `end`, so once a caller has
/// seen [`Claim::Done`] every later claim is `Done` as well.
#[derive(Debug)]
pub struct DifferenceQueue {
    next: AtomicUsize,
    first: Difference,
    end: Difference,
}

impl DifferenceQueue {
    /// All non-zero differences of an `blocks`-difference table
    pub fn new(blocks: usize) -> Self {
        Self::with_range(1, blocks)
    }

    /// Only the differences in `[first, end)`; an inverted range is empty
    pub fn with_range(first: Difference, end: Difference) -> Self {
        let end = end.max(first);
        Self {
            next: AtomicUsize::new(first),
            first,
            end,
        }
    }

    /// Claim the next unclaimed difference
    pub fn try_claim(&self) -> Claim {
        match self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next < self.end).then_some(next + 1)
            }) {
            Ok(claimed) => Claim::Difference(claimed),
            Err(_) => Claim::Done,
        }
    }

    /// Iterate over claims until the queue is exhausted
    pub fn claims(&self) -> impl Iterator<Item = Difference> + '_ {
        std::iter::from_fn(move || match self.try_claim() {
            Claim::Difference(difference) => Some(difference),
            Claim::Done => None,
        })
    }

    /// Total number of differences this queue hands out
    pub fn len(&self) -> usize {
        self.end - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of differences already handed out
    pub fn claimed(&self) -> usize {
        self.next.load(Ordering::SeqCst) - self.first
    }

    /// Number of differences still available
    pub fn remaining(&self) -> usize {
        self.end - self.next.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequential_claims() {
        let queue = DifferenceQueue::new(4);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_claim(), Claim::Difference(1));
        assert_eq!(queue.try_claim(), Claim::Difference(2));
        assert_eq!(queue.remaining(), 1);
        assert_eq!(queue.try_claim(), Claim::Difference(3));
        assert_eq!(queue.try_claim(), Claim::Done);
        assert_eq!(queue.claimed(), 3);
    }

    #[test]
    fn test_done_is_permanent() {
        let queue = DifferenceQueue::new(2);
        assert_eq!(queue.try_claim(), Claim::Difference(1));
        for _ in 0..100 {
            assert_eq!(queue.try_claim(), Claim::Done);
        }
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn test_range() {
        let queue = DifferenceQueue::with_range(10, 13);
        let claimed: Vec<_> = queue.claims().collect();
        assert_eq!(claimed, vec![10, 11, 12]);

        let empty = DifferenceQueue::with_range(7, 3);
        assert!(empty.is_empty());
        assert_eq!(empty.try_claim(), Claim::Done);
    }

    #[test]
    fn test_concurrent_claims_cover_every_difference_once() {
        for threads in [1, 2, 3, 8, 16] {
            let blocks = 1 << 12;
            let queue = Arc::new(DifferenceQueue::new(blocks));

            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    std::thread::spawn(move || queue.claims().collect::<Vec<_>>())
                })
                .collect();

            let mut all: Vec<Difference> = handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect();
            all.sort_unstable();

            let expected: Vec<Difference> = (1..blocks).collect();
            assert_eq!(all, expected, "{} threads", threads);
            assert_eq!(queue.try_claim(), Claim::Done);
        }
    }
}
