//! Expiry Sweeps
//!
//! Periodic removal of expired tokens and sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::StorageError;
use crate::telemetry::{Logger, TokenLogContext};
use crate::token::ServiceProviderTokenStore;

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Session-less tokens removed because they expired.
    pub expired_tokens: usize,
    /// Tokens removed because their session expired.
    pub expired_sessions: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.expired_tokens + self.expired_sessions
    }
}

/// Run both expiry sweeps once.
pub fn sweep_expired(store: &dyn ServiceProviderTokenStore) -> Result<SweepReport, StorageError> {
    let expired_tokens = store.remove_expired_tokens()?;
    let expired_sessions = store.remove_expired_sessions()?;
    Ok(SweepReport {
        expired_tokens,
        expired_sessions,
    })
}

/// Background task sweeping a store at a fixed interval.
pub struct TokenSweeper;

impl TokenSweeper {
    /// Start sweeping `store` every `interval` on the current tokio runtime.
    ///
    /// The first sweep runs one interval after spawning. Sweeps run on the
    /// blocking pool since the store does file I/O. A failed sweep is logged
    /// and the next one runs as scheduled.
    pub fn spawn(
        store: Arc<dyn ServiceProviderTokenStore>,
        interval: Duration,
        logger: Arc<dyn Logger>,
    ) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let completed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&completed);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let store = Arc::clone(&store);
                        let context = TokenLogContext::new().operation("sweep");
                        match tokio::task::spawn_blocking(move || sweep_expired(store.as_ref())).await {
                            Ok(Ok(report)) => {
                                if report.total() > 0 {
                                    logger.info(
                                        "Swept expired tokens",
                                        &context
                                            .extra("expired_tokens", report.expired_tokens)
                                            .extra("expired_sessions", report.expired_sessions),
                                    );
                                }
                            }
                            Ok(Err(e)) => logger.error(&format!("Token sweep failed: {}", e), &context),
                            Err(e) => logger.error(&format!("Token sweep panicked: {}", e), &context),
                        }
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            logger.debug("Token sweeper stopped", &TokenLogContext::new().operation("sweep"));
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
            completed,
        }
    }
}

/// Handle to a running [`TokenSweeper`]. Dropping it stops the sweeper.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    completed: Arc<AtomicU64>,
}

impl SweeperHandle {
    /// Number of sweeps attempted so far, failed ones included.
    pub fn sweeps_completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Stop the sweeper and wait for an in-flight sweep to finish.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}
