// ── Trigger cells ──
//
// Replay-latest tick cells driving the resource pipelines. A new
// subscriber's first `changed()` resolves immediately (the latest tick
// is replayed), after which each `tick()` wakes all subscribers.

use std::sync::Arc;

use tokio::sync::watch;

/// A shared refresh/load-more signal.
///
/// Clones alias the same cell, which is how `supervise_refreshers`
/// makes several resources restart from one signal.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: Arc<watch::Sender<u64>>,
}

impl Trigger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the trigger, waking every subscriber.
    pub fn tick(&self) {
        self.tx.send_modify(|v| *v += 1);
    }

    /// Subscribe with replay: the first `changed()` on the returned
    /// receiver resolves immediately.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }

    /// Whether two handles alias the same cell.
    pub fn same_cell(&self, other: &Trigger) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_replays_the_latest_tick() {
        let trigger = Trigger::new();
        let mut rx = trigger.subscribe();
        // Resolves without any tick() having fired.
        rx.changed().await.unwrap();
    }

    #[tokio::test]
    async fn tick_wakes_subscribers() {
        let trigger = Trigger::new();
        let mut rx = trigger.subscribe();
        rx.changed().await.unwrap();

        trigger.tick();
        rx.changed().await.unwrap();
    }

    #[test]
    fn clones_alias_the_same_cell() {
        let a = Trigger::new();
        let b = a.clone();
        assert!(a.same_cell(&b));
        assert!(!a.same_cell(&Trigger::new()));
    }
}
