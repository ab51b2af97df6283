//! Periodic batch scheduler.
//!
//! Runs [`OrderSyncProcessor::process_pending`] on a fixed interval in a tokio
//! task. A failed batch is logged and counted; the next tick runs regardless.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::processor::{BatchReport, OrderSyncProcessor};
use crate::queue::OrderQueueStore;
use crate::remote::OrderTransport;

/// Cumulative scheduler statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub batches_run: u64,
    pub batches_failed: u64,
    pub orders_submitted: u64,
    pub orders_failed: u64,
    pub orders_skipped: u64,
    pub store_errors: u64,
    pub uptime_secs: u64,
}

impl SchedulerStats {
    fn record(&mut self, report: &BatchReport) {
        self.batches_run += 1;
        self.orders_submitted += report.submitted as u64;
        self.orders_failed += report.failed as u64;
        self.orders_skipped += report.skipped as u64;
        self.store_errors += report.store_errors as u64;
    }
}

/// Handle to a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl SchedulerHandle {
    /// Stop after the in-flight batch (if any) finishes, and wait for the task.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "order sync scheduler task panicked");
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncScheduler {
    poll_interval: Duration,
}

impl SyncScheduler {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Spawn the polling loop. The first batch runs immediately.
    pub fn spawn<S, T>(self, processor: Arc<OrderSyncProcessor<S, T>>) -> SchedulerHandle
    where
        S: OrderQueueStore + 'static,
        T: OrderTransport + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let stats = Arc::new(Mutex::new(SchedulerStats::default()));

        let join = tokio::spawn(run_loop(
            processor,
            self.poll_interval,
            shutdown.clone(),
            stats.clone(),
        ));

        SchedulerHandle {
            shutdown,
            join,
            stats,
        }
    }
}

async fn run_loop<S, T>(
    processor: Arc<OrderSyncProcessor<S, T>>,
    poll_interval: Duration,
    shutdown: Arc<Notify>,
    stats: Arc<Mutex<SchedulerStats>>,
) where
    S: OrderQueueStore,
    T: OrderTransport,
{
    tracing::info!(
        poll_interval_secs = poll_interval.as_secs(),
        batch_size = processor.batch_size(),
        "order sync scheduler started"
    );
    let started = Instant::now();

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!("order sync scheduler received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                let result = processor.process_pending().await;

                let mut current = stats.lock().unwrap();
                match result {
                    Ok(report) => current.record(&report),
                    Err(e) => {
                        current.batches_failed += 1;
                        tracing::error!(error = %e, "order batch failed");
                    }
                }
                current.uptime_secs = started.elapsed().as_secs();
            }
        }
    }

    tracing::info!("order sync scheduler stopped");
}
