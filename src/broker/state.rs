//! # Cluster State
//!
//! The registry, heartbeat map, and id counter are process-wide state with
//! a simple init-on-start lifecycle — modeled as a single value behind one
//! mutex, matching spec's concurrency model: the control-channel task and
//! the liveness sweep are the only writers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    registry: HashSet<u32>,
    last_heartbeat: HashMap<u32, Instant>,
    server_id_counter: u32,
}

#[derive(Debug, Default)]
pub struct ClusterState {
    inner: Mutex<Inner>,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically increments the id counter, registers the new id, and
    /// stamps its first heartbeat as now. Ids are never reused, even after
    /// eviction.
    pub fn register(&self) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        inner.server_id_counter += 1;
        let id = inner.server_id_counter;
        inner.registry.insert(id);
        inner.last_heartbeat.insert(id, Instant::now());
        id
    }

    pub fn list_servers(&self) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<u32> = inner.registry.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Highest live id, per the "highest live id wins" election rule.
    pub fn who_is_leader(&self) -> Option<u32> {
        let inner = self.inner.lock().unwrap();
        inner.registry.iter().copied().max()
    }

    /// Records a heartbeat for `id` if it is still registered. A heartbeat
    /// for an id that has already been evicted (or never registered) is
    /// ignored rather than silently re-admitted.
    pub fn record_heartbeat(&self, id: u32) {
        let mut inner = self.inner.lock().unwrap();
        if inner.registry.contains(&id) {
            inner.last_heartbeat.insert(id, Instant::now());
        }
    }

    /// Evicts every id whose last heartbeat is older than `timeout`.
    /// Returns the evicted ids, for logging.
    pub fn sweep(&self, timeout: Duration) -> Vec<u32> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let stale: Vec<u32> = inner
            .last_heartbeat
            .iter()
            .filter(|(_, &seen)| now.duration_since(seen) > timeout)
            .map(|(&id, _)| id)
            .collect();

        for id in &stale {
            inner.registry.remove(id);
            inner.last_heartbeat.remove(id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_assigns_strictly_increasing_ids() {
        let state = ClusterState::new();
        let a = state.register();
        let b = state.register();
        let c = state.register();
        assert!(a < b && b < c);
    }

    #[test]
    fn who_is_leader_picks_highest_registered_id() {
        let state = ClusterState::new();
        assert_eq!(state.who_is_leader(), None);
        state.register();
        let second = state.register();
        assert_eq!(state.who_is_leader(), Some(second));
    }

    #[test]
    fn sweep_evicts_and_ids_are_never_reused() {
        let state = ClusterState::new();
        let id = state.register();
        {
            let mut inner = state.inner.lock().unwrap();
            inner
                .last_heartbeat
                .insert(id, Instant::now() - Duration::from_secs(10));
        }
        let evicted = state.sweep(Duration::from_secs(4));
        assert_eq!(evicted, vec![id]);
        assert!(state.list_servers().is_empty());

        let next = state.register();
        assert!(next > id);
    }
}
