use std::collections::{HashMap, VecDeque};

use common::{Contestant, ContestantId};
use serde::Serialize;

/// Pending contestants by id
pub type Registry = HashMap<ContestantId, Contestant>;

/// Ordered waiting line of contestant ids, oldest at the front
pub type IdQueue = VecDeque<ContestantId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Team,
    Single,
}

impl QueueKind {
    pub fn for_contestant(contestant: &Contestant) -> Self {
        if contestant.is_team() { QueueKind::Team } else { QueueKind::Single }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub team: usize,
    pub single: usize,
}

/// Both waiting queues plus the registry backing them.
///
/// Outside of a running round an id is queued iff it is registered, and it
/// sits in exactly one of the two queues.
#[derive(Debug, Default)]
pub struct MatchPool {
    pub(crate) registry: Registry,
    pub(crate) team_queue: IdQueue,
    pub(crate) single_queue: IdQueue,
}

impl MatchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contestant and queue it at the tail. Re-inserting a pending
    /// id replaces its record; it keeps its queue slot unless it changes queue.
    pub fn insert(&mut self, contestant: Contestant) {
        let kind = QueueKind::for_contestant(&contestant);
        let id = contestant.id.clone();

        if let Some(previous) = self.registry.insert(id.clone(), contestant) {
            let previous_kind = QueueKind::for_contestant(&previous);
            if previous_kind == kind && self.queue(kind).contains(&id) {
                return;
            }
            remove_id(self.queue_mut(previous_kind), &id);
        }
        self.queue_mut(kind).push_back(id);
    }

    /// Drop a contestant from the registry and from whichever queue holds it
    pub fn remove(&mut self, id: &ContestantId) -> Option<Contestant> {
        let contestant = self.registry.remove(id)?;
        remove_id(&mut self.team_queue, id);
        remove_id(&mut self.single_queue, id);
        Some(contestant)
    }

    pub fn get(&self, id: &ContestantId) -> Option<&Contestant> {
        self.registry.get(id)
    }

    pub fn contains(&self, id: &ContestantId) -> bool {
        self.registry.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn queue(&self, kind: QueueKind) -> &IdQueue {
        match kind {
            QueueKind::Team => &self.team_queue,
            QueueKind::Single => &self.single_queue,
        }
    }

    pub(crate) fn queue_mut(&mut self, kind: QueueKind) -> &mut IdQueue {
        match kind {
            QueueKind::Team => &mut self.team_queue,
            QueueKind::Single => &mut self.single_queue,
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            team: self.team_queue.len(),
            single: self.single_queue.len(),
        }
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.team_queue.clear();
        self.single_queue.clear();
    }
}

fn remove_id(queue: &mut IdQueue, id: &ContestantId) {
    if let Some(idx) = queue.iter().position(|queued| queued == id) {
        queue.remove(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(queue: &IdQueue) -> Vec<&str> {
        queue.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_insert_routes_by_member_count() {
        let mut pool = MatchPool::new();
        pool.insert(Contestant::solo("s1", 1000.0, 10.0));
        pool.insert(Contestant::new("t1", 1000.0, 10.0, 2));
        pool.insert(Contestant::solo("s2", 1000.0, 10.0));

        assert_eq!(ids(pool.queue(QueueKind::Single)), vec!["s1", "s2"]);
        assert_eq!(ids(pool.queue(QueueKind::Team)), vec!["t1"]);
        assert_eq!(pool.stats(), QueueStats { team: 1, single: 2 });
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_reinsert_replaces_record_without_duplicating() {
        let mut pool = MatchPool::new();
        pool.insert(Contestant::solo("a", 1000.0, 10.0));
        pool.insert(Contestant::solo("b", 1000.0, 10.0));
        pool.insert(Contestant::solo("a", 1200.0, 10.0));

        assert_eq!(ids(pool.queue(QueueKind::Single)), vec!["a", "b"]);
        assert_eq!(pool.get(&"a".into()).unwrap().skill_rating, 1200.0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_between_queues() {
        let mut pool = MatchPool::new();
        pool.insert(Contestant::solo("a", 1000.0, 10.0));
        pool.insert(Contestant::new("a", 1000.0, 10.0, 2));

        assert!(pool.queue(QueueKind::Single).is_empty());
        assert_eq!(ids(pool.queue(QueueKind::Team)), vec!["a"]);
    }

    #[test]
    fn test_remove_clears_queue_and_registry() {
        let mut pool = MatchPool::new();
        pool.insert(Contestant::solo("a", 1000.0, 10.0));
        pool.insert(Contestant::new("t", 1000.0, 10.0, 2));

        assert!(pool.remove(&"a".into()).is_some());
        assert!(pool.remove(&"a".into()).is_none());
        assert!(pool.remove(&"t".into()).is_some());
        assert!(pool.is_empty());
        assert_eq!(pool.stats(), QueueStats::default());
    }
}
