//! At most one refresh per cache.
//!
//! The coordinator hands out a single [`RefreshPermit`] at a time. Acquiring
//! it never waits: when a refresh is already running the request is dropped,
//! and the next lookup asks again. The permit is moved into the background
//! task and released when dropped, whichever way the task ends.
//!
//! The lock is shared by every scope of the cache, so a long scan for one
//! scope delays refreshes of all the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Proof that the holder is the only running refresh.
#[derive(Debug)]
pub struct RefreshPermit {
    _permit: OwnedSemaphorePermit,
}

/// Request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub started: u64,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct RefreshCoordinator {
    permits: Arc<Semaphore>,
    started: AtomicU64,
    dropped: AtomicU64,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            started: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a permit if no other refresh holds one.
    pub fn try_begin(&self) -> Option<RefreshPermit> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                self.started.fetch_add(1, Ordering::Relaxed);
                Some(RefreshPermit { _permit: permit })
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether a refresh currently holds the permit. Never takes it.
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }

    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            started: self.started.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_permit() {
        let coordinator = RefreshCoordinator::new();
        assert!(!coordinator.is_busy());

        let permit = coordinator.try_begin().expect("lock is free");
        assert!(coordinator.is_busy());
        assert!(coordinator.try_begin().is_none());
        assert!(coordinator.try_begin().is_none());

        drop(permit);
        assert!(!coordinator.is_busy());
        assert!(coordinator.try_begin().is_some());

        assert_eq!(
            coordinator.stats(),
            RefreshStats {
                started: 2,
                dropped: 2
            }
        );
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let coordinator = RefreshCoordinator::new();
        let permit = coordinator.try_begin().unwrap();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            panic!("scan blew up");
        });
        assert!(handle.await.is_err());

        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_concurrent_attempts_grant_one_permit() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let permit = coordinator.try_begin();
                    let granted = permit.is_some();
                    // Hold on to it until every thread has tried
                    barrier.wait();
                    granted
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();

        assert_eq!(granted, 1);
        assert_eq!(coordinator.stats().dropped, 7);
    }

    #[test]
    fn test_busy_checks_never_cause_drops() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let watcher = {
            let coordinator = Arc::clone(&coordinator);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    std::hint::black_box(coordinator.is_busy());
                }
            })
        };

        for _ in 0..50_000 {
            let permit = coordinator.try_begin();
            assert!(permit.is_some());
        }

        done.store(true, Ordering::Relaxed);
        watcher.join().unwrap();

        assert_eq!(
            coordinator.stats(),
            RefreshStats {
                started: 50_000,
                dropped: 0
            }
        );
    }
}
