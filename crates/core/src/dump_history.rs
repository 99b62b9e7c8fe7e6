use std::collections::VecDeque;

/// Bounded ring of rendered dumps, oldest evicted first.
#[derive(Debug, Clone)]
pub struct DumpHistory<T> {
    capacity: usize,
    entries: VecDeque<T>,
    total_seen: u64,
}

impl<T> DumpHistory<T> {
    /// A zero capacity is raised to one so the latest dump is always kept.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            total_seen: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.total_seen.saturating_sub(self.entries.len() as u64)
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_seen += 1;
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::DumpHistory;

    #[test]
    fn keeps_memory_bounded_to_capacity() {
        let mut history = DumpHistory::new(3);
        history.push("d1");
        history.push("d2");
        history.push("d3");
        history.push("d4");

        assert_eq!(history.len(), 3);
        assert_eq!(history.evicted(), 1);
        assert_eq!(
            history.newest_first().copied().collect::<Vec<_>>(),
            vec!["d4", "d3", "d2"]
        );
    }

    #[test]
    fn zero_capacity_still_keeps_latest_entry() {
        let mut history = DumpHistory::new(0);
        history.push(1);
        history.push(2);

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.newest_first().collect::<Vec<_>>(), vec![&2]);
        assert_eq!(history.evicted(), 1);
    }

    #[test]
    fn empty_history_has_nothing_to_show() {
        let history: DumpHistory<String> = DumpHistory::new(4);
        assert!(history.is_empty());
        assert_eq!(history.newest_first().count(), 0);
        assert_eq!(history.evicted(), 0);
    }
}
