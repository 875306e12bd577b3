use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

pub const DEFAULT_FEEDBACK_MS: u64 = 1_500;

/// "Capture succeeded" cue. Raised synchronously on success and lowered again by a
/// timer; a newer raise extends the cue instead of being cut short by an older timer.
#[derive(Debug, Clone, Default)]
pub struct FeedbackFlag {
    raised: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl FeedbackFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Must be called from within a Tokio runtime.
    pub fn raise_for(&self, duration: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.raised.store(true, Ordering::Release);

        let raised = Arc::clone(&self.raised);
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if current.load(Ordering::Acquire) == generation {
                raised.store(false, Ordering::Release);
            }
        });
    }

    pub fn lower(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.raised.store(false, Ordering::Release);
    }
}
