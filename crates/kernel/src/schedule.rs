use std::collections::BTreeMap;

/// Priority queue mapping due times to the tasks that fire at them.
///
/// Cancellation is the caller's business: a stale task carries enough state
/// for its handler to notice and do nothing.
#[derive(Debug)]
pub struct TaskQueue<T> {
    inner: BTreeMap<u64, Vec<T>>,
    total: usize,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            inner: BTreeMap::new(),
            total: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to fire at `due_ms`. Tasks sharing a due time fire in
    /// insertion order.
    pub fn push(&mut self, due_ms: u64, task: T) {
        self.inner.entry(due_ms).or_default().push(task);
        self.total += 1;
    }

    /// Remove and return every task due at or before `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<T> {
        let later = self.inner.split_off(&now_ms.saturating_add(1));
        let due = std::mem::replace(&mut self.inner, later);
        let out: Vec<T> = due.into_values().flatten().collect();
        self.total -= out.len();
        out
    }

    /// Keep only the tasks matching `pred`. Returns how many were dropped.
    pub fn retain(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.total;
        for tasks in self.inner.values_mut() {
            tasks.retain(&mut pred);
        }
        self.inner.retain(|_, tasks| !tasks.is_empty());
        self.total = self.inner.values().map(Vec::len).sum();
        before - self.total
    }

    /// Earliest due time, or `None` if empty.
    pub fn next_due(&self) -> Option<u64> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_due_tasks_in_order() {
        let mut q = TaskQueue::new();
        q.push(300, "c");
        q.push(100, "a");
        q.push(200, "b");
        q.push(100, "a2");

        assert_eq!(q.drain_due(150), vec!["a", "a2"]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_due(), Some(200));

        assert_eq!(q.drain_due(300), vec!["b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_on_empty_queue() {
        let mut q: TaskQueue<u8> = TaskQueue::new();
        assert!(q.drain_due(u64::MAX).is_empty());
        assert_eq!(q.next_due(), None);
    }

    #[test]
    fn retain_drops_matching() {
        let mut q = TaskQueue::new();
        q.push(10, 1);
        q.push(10, 2);
        q.push(20, 3);
        let dropped = q.retain(|t| *t != 2);
        assert_eq!(dropped, 1);
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain_due(100), vec![1, 3]);
    }
}
