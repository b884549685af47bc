use browserpilot_core_types::{TaskId, TaskResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Outcome of trying to claim a task id: either this caller owns the
/// execution, or it joins one already in flight.
pub(crate) enum Claim {
    Owner(broadcast::Sender<TaskResult>),
    Joiner(broadcast::Receiver<TaskResult>),
}

/// Map from task id to a broadcast-once handle. The first claimant runs the
/// work and publishes the result; every concurrent claimant for the same id
/// awaits that same result. This is the at-most-one-concurrent-execution
/// guarantee made explicit.
#[derive(Default)]
pub(crate) struct InFlightMap {
    inner: DashMap<TaskId, broadcast::Sender<TaskResult>>,
}

impl InFlightMap {
    pub fn claim(&self, id: &TaskId) -> Claim {
        match self.inner.entry(id.clone()) {
            Entry::Occupied(entry) => Claim::Joiner(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _) = broadcast::channel(1);
                entry.insert(tx.clone());
                Claim::Owner(tx)
            }
        }
    }

    /// Publish the result and release the id. The send also reaches joiners
    /// whose entry was removed by `cancel`; delivery is best-effort.
    pub fn complete(&self, id: &TaskId, tx: &broadcast::Sender<TaskResult>, result: TaskResult) {
        self.inner.remove(id);
        let _ = tx.send(result);
    }

    /// Non-preemptive cancellation: forgets the tracking entry so the id can
    /// be claimed again, but work already issued keeps running and its result
    /// is discarded from tracking.
    pub fn cancel(&self, id: &TaskId) -> bool {
        self.inner.remove(id).is_some()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browserpilot_core_types::{PilotError, TaskId};

    fn result(id: &TaskId) -> TaskResult {
        TaskResult::failure(id.clone(), "test", &PilotError::Validation("x".into()))
    }

    #[tokio::test]
    async fn second_claim_joins_the_first() {
        let map = InFlightMap::default();
        let id = TaskId::from("t1");

        let Claim::Owner(tx) = map.claim(&id) else {
            panic!("first claim must own");
        };
        let Claim::Joiner(mut rx) = map.claim(&id) else {
            panic!("second claim must join");
        };

        map.complete(&id, &tx, result(&id));
        let joined = rx.recv().await.unwrap();
        assert_eq!(joined.task_id, id);
        assert!(!map.contains(&id));
    }

    #[tokio::test]
    async fn completed_id_can_be_claimed_again() {
        let map = InFlightMap::default();
        let id = TaskId::from("t1");
        let Claim::Owner(tx) = map.claim(&id) else {
            panic!()
        };
        map.complete(&id, &tx, result(&id));
        assert!(matches!(map.claim(&id), Claim::Owner(_)));
    }

    #[tokio::test]
    async fn cancel_releases_tracking_but_owner_still_publishes() {
        let map = InFlightMap::default();
        let id = TaskId::from("t1");
        let Claim::Owner(tx) = map.claim(&id) else {
            panic!()
        };
        let Claim::Joiner(mut rx) = map.claim(&id) else {
            panic!()
        };

        assert!(map.cancel(&id));
        assert!(!map.cancel(&id));
        assert_eq!(map.len(), 0);

        // The orphaned execution still completes and reaches its joiners.
        map.complete(&id, &tx, result(&id));
        assert!(rx.recv().await.is_ok());
    }
}
