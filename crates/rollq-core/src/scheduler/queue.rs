//! Pending-request queue with stable indices and a locked (in-flight) set.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::request::Request;

#[derive(Default)]
struct QueueState {
    /// Insertion-ordered; removed or finished entries leave a `None` hole so indices never shift.
    requests: Vec<Option<Arc<Request>>>,
    /// Indices currently occupying a transfer slot.
    locked: BTreeSet<usize>,
    /// Next index not yet dispatched.
    cursor: usize,
}

/// Shared handle to a scheduler's queue. Cheap to clone; safe to use from
/// inside a completion callback while a run is in progress.
#[derive(Clone, Default)]
pub struct QueueHandle {
    inner: Arc<Mutex<QueueState>>,
}

impl QueueHandle {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a request; returns its index.
    pub fn push(&self, request: Request) -> usize {
        let mut state = self.state();
        state.requests.push(Some(Arc::new(request)));
        state.requests.len() - 1
    }

    /// Replaces the whole queue. Indices restart at 0.
    pub fn replace(&self, requests: Vec<Request>) {
        let mut state = self.state();
        *state = QueueState {
            requests: requests.into_iter().map(|r| Some(Arc::new(r))).collect(),
            ..QueueState::default()
        };
    }

    /// Drops the request at `index` unless it is locked (in flight).
    /// Returns false only for locked requests.
    pub fn remove(&self, index: usize) -> bool {
        let mut state = self.state();
        if state.locked.contains(&index) {
            return false;
        }
        if let Some(entry) = state.requests.get_mut(index) {
            *entry = None;
        }
        true
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.state().locked.contains(&index)
    }

    pub fn locked_count(&self) -> usize {
        self.state().locked.len()
    }

    /// Requests still held by the queue (waiting or in flight).
    pub fn len(&self) -> usize {
        self.state().requests.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests not yet dispatched.
    pub fn pending(&self) -> usize {
        let state = self.state();
        state.requests[state.cursor.min(state.requests.len())..]
            .iter()
            .filter(|r| r.is_some())
            .count()
    }

    /// Snapshot of the request at `index`, if still queued.
    pub fn get(&self, index: usize) -> Option<Arc<Request>> {
        self.state().requests.get(index).cloned().flatten()
    }

    /// Takes the next undispatched request in queue order and locks it.
    pub(crate) fn lock_next(&self) -> Option<(usize, Arc<Request>)> {
        let mut state = self.state();
        while state.cursor < state.requests.len() {
            let index = state.cursor;
            state.cursor += 1;
            if let Some(request) = state.requests[index].clone() {
                state.locked.insert(index);
                return Some((index, request));
            }
        }
        None
    }

    /// Releases a finished request: unlocks it and drops it from the queue.
    pub(crate) fn finish(&self, index: usize) {
        let mut state = self.state();
        state.locked.remove(&index);
        if let Some(entry) = state.requests.get_mut(index) {
            *entry = None;
        }
    }

    pub(crate) fn clear(&self) {
        *self.state() = QueueState::default();
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("QueueHandle")
            .field("len", &state.requests.iter().filter(|r| r.is_some()).count())
            .field("locked", &state.locked)
            .field("cursor", &state.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(n: usize) -> QueueHandle {
        let q = QueueHandle::default();
        for i in 0..n {
            assert_eq!(q.push(Request::new(format!("http://h/{}", i))), i);
        }
        q
    }

    #[test]
    fn lock_next_follows_insertion_order_and_skips_holes() {
        let q = queue_of(4);
        assert!(q.remove(1));
        let (i, r) = q.lock_next().unwrap();
        assert_eq!((i, r.url()), (0, "http://h/0"));
        let (i, _) = q.lock_next().unwrap();
        assert_eq!(i, 2);
        assert_eq!(q.locked_count(), 2);
        assert_eq!(q.pending(), 1);
    }

    #[test]
    fn locked_requests_cannot_be_removed() {
        let q = queue_of(3);
        let (i, _) = q.lock_next().unwrap();
        assert!(q.is_locked(i));
        assert!(!q.remove(i));
        assert!(q.remove(2));
        assert!(q.get(2).is_none());
        q.finish(i);
        assert!(!q.is_locked(i));
        assert!(q.remove(i));
    }

    #[test]
    fn indices_are_stable_after_removal() {
        let q = queue_of(3);
        q.remove(0);
        assert_eq!(q.get(2).unwrap().url(), "http://h/2");
        assert_eq!(q.push(Request::new("http://h/3")), 3);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn removing_unknown_index_succeeds() {
        let q = queue_of(1);
        assert!(q.remove(42));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn replace_and_clear_reset_everything() {
        let q = queue_of(2);
        q.lock_next();
        q.replace(vec![Request::new("http://h/a")]);
        assert_eq!(q.locked_count(), 0);
        assert_eq!(q.len(), 1);
        q.clear();
        assert!(q.is_empty());
        assert!(q.lock_next().is_none());
    }
}
