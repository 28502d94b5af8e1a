//! Process-wide shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

// =============================================================================
// SHUTDOWN
// =============================================================================

/// Cancellation signal shared by the acquirer loop and the HTTP server.
///
/// Cloning is cheap; every clone observes the same trigger. A task that
/// starts waiting after the trigger returns immediately.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    /// Whether shutdown has been initiated.
    initiated: AtomicBool,
    /// Broadcast channel for waiters.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Initiate shutdown. Later calls are no-ops.
    pub fn trigger(&self) {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.inner.tx.send(());
            tracing::info!("Shutdown initiated");
        }
    }

    /// Returns true once shutdown has been initiated.
    pub fn is_triggered(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Resolve when shutdown is initiated.
    pub async fn wait(&self) {
        // Subscribe before checking the flag so a trigger in between is not lost.
        let mut rx = self.inner.tx.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}
