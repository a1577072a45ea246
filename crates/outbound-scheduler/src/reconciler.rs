//! Background re-fetch policy.
//!
//! Every successful mutation is followed by at least one authoritative
//! re-fetch of what it touched. The re-fetches run as detached tasks so the
//! mutation result is never held up by them, and each source fails on its
//! own: one failed list does not cancel or mask another.
//!
//! [`LiveRefresh`] is the only recurring timer. It runs while the handle is
//! held and stops the moment the handle is stopped or dropped.

use std::future::Future;
use std::time::Duration;

use telephony_core::ApiError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Spawns post-mutation re-fetches.
pub struct Reconciler;

impl Reconciler {
    /// Run `refresh` in the background under a source label.
    ///
    /// Failures are logged with the label and kept in the returned handle;
    /// they are never rolled back into the mutation that triggered them.
    /// Callers run `refresh` with [`crate::store::FetchMode::Background`] so
    /// a failure also leaves the shown snapshot alone.
    pub fn spawn<F>(source: &'static str, refresh: F) -> Reconciliation
    where
        F: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = refresh.await;
            match &result {
                Ok(()) => debug!("Reconciled {}", source),
                Err(e) => warn!("Background refresh of {} failed: {}", source, e),
            }
            result
        });
        Reconciliation {
            tasks: vec![(source, handle)],
        }
    }
}

/// Handles to the re-fetches started by one action.
#[derive(Debug, Default)]
pub struct Reconciliation {
    tasks: Vec<(&'static str, JoinHandle<Result<(), ApiError>>)>,
}

impl Reconciliation {
    /// No re-fetch was started.
    pub fn none() -> Self {
        Self::default()
    }

    /// Combine with the re-fetches of another source.
    pub fn and(mut self, other: Reconciliation) -> Self {
        self.tasks.extend(other.tasks);
        self
    }

    /// Labels of the sources being re-fetched.
    pub fn sources(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(source, _)| *source).collect()
    }

    /// Wait for every re-fetch and report each source's result.
    ///
    /// Dropping the handle instead leaves the tasks running.
    pub async fn settled(self) -> Vec<(&'static str, Result<(), ApiError>)> {
        let mut results = Vec::with_capacity(self.tasks.len());
        for (source, handle) in self.tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ApiError::Network(format!("refresh task ended: {}", e))),
            };
            results.push((source, result));
        }
        results
    }
}

/// Result of a mutation plus the re-fetches it started.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub reconciliation: Reconciliation,
}

impl<T> Applied<T> {
    pub fn new(value: T, reconciliation: Reconciliation) -> Self {
        Self {
            value,
            reconciliation,
        }
    }
}

/// Periodic refresh tied to a live view.
#[derive(Debug)]
pub struct LiveRefresh {
    handle: JoinHandle<()>,
}

impl LiveRefresh {
    /// Call `tick` every `period`, starting one period from now.
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Live refresh tick");
                tick().await;
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop refreshing. An in-progress tick is cancelled as well.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for LiveRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_failures_reported_per_source() {
        let reconciliation = Reconciler::spawn("organization numbers", async { Ok(()) }).and(
            Reconciler::spawn("available pool", async {
                Err(ApiError::Network("unreachable".to_string()))
            }),
        );
        assert_eq!(
            reconciliation.sources(),
            vec!["organization numbers", "available pool"]
        );

        let results = reconciliation.settled().await;
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(ApiError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_refresh_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let live = {
            let ticks = Arc::clone(&ticks);
            LiveRefresh::start(Duration::from_secs(30), move || {
                let ticks = Arc::clone(&ticks);
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(live.is_running());

        live.stop();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_live_refresh() {
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let ticks = Arc::clone(&ticks);
            let _live = LiveRefresh::start(Duration::from_secs(1), move || {
                let ticks = Arc::clone(&ticks);
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
