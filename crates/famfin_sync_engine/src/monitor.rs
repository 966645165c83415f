//! Network state monitor.
//!
//! Watches the connectivity signal and schedules sync passes:
//!
//! - offline → online: one pass immediately, then one per interval
//! - online → offline: the periodic timer is dropped
//! - a tick while a pass is still running is skipped
//!
//! When already online at spawn the timer starts without an immediate pass.
//! The monitor performs no I/O itself; it only calls a [`PassTrigger`].

use crate::connectivity::Connectivity;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::remote::RemoteApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Something that can start a sync pass.
pub trait PassTrigger: Send + Sync + 'static {
    /// Returns true while a pass is running.
    fn is_running(&self) -> bool;

    /// Starts a pass without waiting for it.
    fn trigger(&self);
}

/// Runs engine passes on tokio's blocking pool.
pub struct EngineTrigger<R: RemoteApi + 'static> {
    engine: Arc<SyncEngine<R>>,
}

impl<R: RemoteApi + 'static> EngineTrigger<R> {
    /// Wraps an engine.
    pub fn new(engine: Arc<SyncEngine<R>>) -> Self {
        Self { engine }
    }
}

impl<R: RemoteApi + 'static> PassTrigger for EngineTrigger<R> {
    fn is_running(&self) -> bool {
        self.engine.is_syncing()
    }

    fn trigger(&self) {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || match engine.sync_all() {
            Ok(outcome) => debug!(
                synced = outcome.synced,
                failed = outcome.errors.len(),
                "scheduled sync pass finished"
            ),
            Err(SyncError::PassInProgress) => debug!("sync pass already running"),
            Err(e) => warn!(error = %e, "scheduled sync pass not run"),
        });
    }
}

/// Handle to the monitor task.
pub struct NetworkMonitor {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl NetworkMonitor {
    /// Spawns the monitor on the current tokio runtime.
    pub fn spawn(
        connectivity: &Connectivity,
        trigger: Arc<dyn PassTrigger>,
        interval: Duration,
    ) -> Self {
        let mut online_rx = connectivity.subscribe();
        let online = *online_rx.borrow_and_update();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(online_rx, online, trigger, interval, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the monitor and waits for the task to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.handle.abort();
        }
    }
}

fn periodic(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run(
    mut online_rx: watch::Receiver<bool>,
    mut online: bool,
    trigger: Arc<dyn PassTrigger>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = online.then(|| periodic(interval));
    debug!(online, ?interval, "network monitor started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = online_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_online = *online_rx.borrow_and_update();
                if now_online == online {
                    continue;
                }
                online = now_online;
                if online {
                    info!("back online; starting sync");
                    trigger.trigger();
                    ticker = Some(periodic(interval));
                } else {
                    info!("offline; periodic sync paused");
                    ticker = None;
                }
            }
            () = next_tick(&mut ticker) => {
                if trigger.is_running() {
                    debug!("sync pass still running; tick skipped");
                } else {
                    trigger.trigger();
                }
            }
        }
    }

    debug!("network monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTrigger {
        passes: AtomicUsize,
        running: AtomicBool,
    }

    impl PassTrigger for CountingTrigger {
        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn trigger(&self) {
            self.passes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingTrigger {
        fn passes(&self) -> usize {
            self.passes.load(Ordering::SeqCst)
        }
    }

    const PERIOD: Duration = Duration::from_secs(30);

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(by: Duration) {
        tokio::time::advance(by).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn going_online_triggers_immediately_then_periodically() {
        let connectivity = Connectivity::new(false);
        let trigger = Arc::new(CountingTrigger::default());
        let monitor = NetworkMonitor::spawn(&connectivity, trigger.clone(), PERIOD);
        settle().await;
        assert_eq!(trigger.passes(), 0);

        connectivity.set_online(true);
        settle().await;
        assert_eq!(trigger.passes(), 1);

        advance(PERIOD).await;
        assert_eq!(trigger.passes(), 2);
        advance(PERIOD).await;
        assert_eq!(trigger.passes(), 3);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn going_offline_stops_the_timer() {
        let connectivity = Connectivity::new(false);
        let trigger = Arc::new(CountingTrigger::default());
        let monitor = NetworkMonitor::spawn(&connectivity, trigger.clone(), PERIOD);
        settle().await;

        connectivity.set_online(true);
        settle().await;
        connectivity.set_online(false);
        settle().await;

        advance(PERIOD * 4).await;
        assert_eq!(trigger.passes(), 1);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn online_at_spawn_waits_for_first_tick() {
        let connectivity = Connectivity::new(true);
        let trigger = Arc::new(CountingTrigger::default());
        let monitor = NetworkMonitor::spawn(&connectivity, trigger.clone(), PERIOD);
        settle().await;
        assert_eq!(trigger.passes(), 0);

        advance(PERIOD).await;
        assert_eq!(trigger.passes(), 1);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_skip_while_running() {
        let connectivity = Connectivity::new(true);
        let trigger = Arc::new(CountingTrigger::default());
        trigger.running.store(true, Ordering::SeqCst);
        let monitor = NetworkMonitor::spawn(&connectivity, trigger.clone(), PERIOD);
        settle().await;

        advance(PERIOD).await;
        advance(PERIOD).await;
        assert_eq!(trigger.passes(), 0);

        trigger.running.store(false, Ordering::SeqCst);
        advance(PERIOD).await;
        assert_eq!(trigger.passes(), 1);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let connectivity = Connectivity::new(true);
        let trigger = Arc::new(CountingTrigger::default());
        let monitor = NetworkMonitor::spawn(&connectivity, trigger.clone(), PERIOD);
        assert!(!monitor.is_finished());
        monitor.shutdown().await;

        connectivity.set_online(false);
        connectivity.set_online(true);
        settle().await;
        assert_eq!(trigger.passes(), 0);
    }
}
