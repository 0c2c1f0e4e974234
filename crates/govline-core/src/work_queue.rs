//! Lock-free work queue for distributing records across worker threads

use std::sync::atomic::{AtomicUsize, Ordering};

/// Items claimed in order by any number of workers.
///
/// [`next()`](WorkQueue::next) hands out each item exactly once, together
/// with its position, so workers can log "n/total" without shared counters.
pub struct WorkQueue<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item and its 0-based position
    pub fn next(&self) -> Option<(usize, &T)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|item| (i, item))
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Give the items back once all workers are done
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn hands_out_in_order() {
        let q = WorkQueue::new(vec!["a", "b", "c"]);
        assert_eq!(q.total(), 3);
        assert_eq!(q.next(), Some((0, &"a")));
        assert_eq!(q.next(), Some((1, &"b")));
        assert_eq!(q.next(), Some((2, &"c")));
        assert_eq!(q.next(), None);
        assert_eq!(q.next(), None);
    }

    #[test]
    fn empty_queue() {
        let q: WorkQueue<i32> = WorkQueue::new(vec![]);
        assert_eq!(q.total(), 0);
        assert_eq!(q.next(), None);
    }

    #[test]
    fn each_item_claimed_once_across_threads() {
        let q = WorkQueue::new((0..1000).collect::<Vec<u32>>());
        let claimed = Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some((_, item)) = q.next() {
                        claimed.lock().unwrap().push(*item);
                    }
                });
            }
        });
        let mut claimed = claimed.into_inner().unwrap();
        claimed.sort_unstable();
        assert_eq!(claimed, q.into_items());
    }
}
