use std::sync::Arc;

use tokio::sync::watch;

/// Latest smoothed distance in meters. `None` means no confident reading.
///
/// Single slot, last writer wins: the ranging engine publishes, everyone else reads
/// whatever value is current at the moment they look.
#[derive(Debug, Clone)]
pub struct CurrentDistance {
    tx: Arc<watch::Sender<Option<f32>>>,
}

impl Default for CurrentDistance {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentDistance {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<f32> {
        *self.tx.borrow()
    }

    pub fn publish(&self, meters: f32) {
        self.tx.send_replace(Some(meters));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Receiver that wakes on every publish, for display collaborators.
    pub fn subscribe(&self) -> watch::Receiver<Option<f32>> {
        self.tx.subscribe()
    }
}
