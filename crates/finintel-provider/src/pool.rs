//! Bounded pool for blocking provider calls.
//!
//! Each call holds a semaphore permit for as long as its blocking thread
//! runs, so the number of provider threads never exceeds `max_workers`,
//! even when callers time out and stop waiting.

use std::sync::Arc;
use std::time::Duration;

use finintel_telemetry::Metrics;
use tokio::sync::Semaphore;

use crate::error::PoolError;

struct InflightGuard;

impl InflightGuard {
    fn start() -> Self {
        Metrics::worker_started();
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        Metrics::worker_finished();
    }
}

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_workers: usize,
    timeout: Duration,
}

impl WorkerPool {
    pub fn new(max_workers: usize, timeout: Duration) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            timeout,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Free worker slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `f` on a blocking thread once a slot is free.
    ///
    /// The timeout covers both waiting for a slot and running `f`. On
    /// timeout the blocking work keeps running to completion in the
    /// background; only the caller stops waiting.
    pub async fn run<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        let work = async move {
            let permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _inflight = InflightGuard::start();
                f()
            })
            .await
            .map_err(|e| PoolError::WorkerFailed(e.to_string()))
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(PoolError::Timeout(self.timeout)),
        }
    }

    /// Stop accepting work; queued callers get `PoolError::Closed`.
    pub fn close(&self) {
        self.permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_runs_closure_and_returns_value() {
        let pool = WorkerPool::new(2, Duration::from_secs(5));
        let value = pool.run(|| 40 + 2).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2, Duration::from_secs(10));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let current = current.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    current.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_timeout_leaves_work_running() {
        let pool = WorkerPool::new(1, Duration::from_millis(20));
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = finished.clone();

        let err = pool
            .run(move || {
                std::thread::sleep(Duration::from_millis(100));
                flag.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_reported() {
        let pool = WorkerPool::new(1, Duration::from_secs(5));
        let err = pool.run(|| -> u8 { panic!("boom") }).await.unwrap_err();
        assert!(matches!(err, PoolError::WorkerFailed(_)));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects() {
        let pool = WorkerPool::new(1, Duration::from_secs(5));
        pool.close();
        assert_eq!(pool.run(|| 1).await.unwrap_err(), PoolError::Closed);
    }
}
