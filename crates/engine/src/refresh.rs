//! One-refresh-at-a-time gate for hosts that refresh lists in the background.
//!
//! Filtering itself is synchronous and can run on any thread. Hosts that
//! want at most one refresh in flight put the work behind a [`RefreshGate`]:
//! callers wait a bounded time for the gate and fail fast with
//! [`EngineError::Busy`] instead of queueing forever. The work runs on
//! tokio's blocking pool so the async runtime stays responsive.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

pub struct RefreshGate {
    lock: Mutex<()>,
    wait: Duration,
}

impl RefreshGate {
    pub fn new(wait: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            wait,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Run `work` while holding the gate.
    ///
    /// # Returns
    /// * `Err(Busy)` - the gate was not acquired within the wait period
    /// * `Err(Internal)` - the blocking task panicked or was aborted
    /// * otherwise whatever `work` returned
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let waited = Instant::now();
        let _guard = match tokio::time::timeout(self.wait, self.lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Refresh gate busy after {:?}", self.wait);
                return Err(EngineError::Busy);
            }
        };
        debug!("Acquired refresh gate in {:?}", waited.elapsed());

        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| EngineError::Internal(format!("refresh task failed: {}", e)))?
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_returns_work_result() {
        let gate = RefreshGate::default();
        let value = gate.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_busy_when_gate_held() {
        let gate = Arc::new(RefreshGate::new(Duration::from_millis(50)));
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.run(move || {
                    started_tx.send(()).ok();
                    release_rx.recv().ok();
                    Ok(())
                })
                .await
            })
        };

        tokio::task::spawn_blocking(move || started_rx.recv())
            .await
            .unwrap()
            .unwrap();

        let second = gate.run(|| Ok(())).await;
        assert!(matches!(second, Err(EngineError::Busy)));

        release_tx.send(()).unwrap();
        holder.await.unwrap().unwrap();

        // Free again once the first refresh finished
        assert!(gate.run(|| Ok(())).await.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_work_is_internal_error() {
        let gate = RefreshGate::default();
        let result: Result<()> = gate.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }
}
