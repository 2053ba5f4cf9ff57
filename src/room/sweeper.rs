//! Periodic stale-entry sweeper
//!
//! A single timer task owned by the session: started once the initial sync
//! has completed, stopped on teardown. Each tick runs the room's sweep and
//! republishes the snapshot. `stop` awaits the task, so once it returns no
//! further publish can happen.

use crate::metrics::MetricsCollector;
use crate::report::ReusableReport;
use crate::room::render::render_report;
use crate::room::state::WaitingRoom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic sweep task with an explicit start/stop lifecycle
pub struct StaleSweeper {
    room: Arc<WaitingRoom>,
    report: Arc<ReusableReport>,
    interval: Duration,
    metrics: Option<Arc<MetricsCollector>>,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl StaleSweeper {
    pub fn new(room: Arc<WaitingRoom>, report: Arc<ReusableReport>, interval: Duration) -> Self {
        Self {
            room,
            report,
            interval,
            metrics: None,
            running: None,
        }
    }

    /// Create a sweeper that counts its passes in the given collector
    pub fn with_metrics(
        room: Arc<WaitingRoom>,
        report: Arc<ReusableReport>,
        interval: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(room, report, interval)
        }
    }

    /// Whether the sweep task is currently running
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawn the sweep task. Starting an already-running sweeper is a no-op.
    pub fn start(&mut self) {
        if self.running.is_some() {
            warn!("Sweeper already running, ignoring start");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let room = self.room.clone();
        let report = self.report.clone();
        let interval = self.interval;
        let metrics = self.metrics.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = room.sweep();
                        if let Some(metrics) = &metrics {
                            metrics.sweeps_total.inc();
                            metrics.members_tracked.set(snapshot.len() as i64);
                        }
                        debug!("Sweep pass complete, {} members tracked", snapshot.len());
                        if let Err(e) = report.set_text(&render_report(&snapshot)).await {
                            warn!("Failed to publish report after sweep: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
            debug!("Sweep task stopped");
        });

        self.running = Some((shutdown_tx, handle));
        info!("Started stale-member sweeper ({:?} interval)", self.interval);
    }

    /// Stop the sweep task and wait for it to finish.
    ///
    /// Join semantics: when this returns, the in-flight tick (if any) has
    /// completed and no tick will publish afterwards. Safe to call when not
    /// running.
    pub async fn stop(&mut self) {
        if let Some((shutdown_tx, handle)) = self.running.take() {
            let _ = shutdown_tx.send(true);
            if let Err(e) = handle.await {
                warn!("Sweep task ended abnormally: {}", e);
            }
            info!("Stopped stale-member sweeper");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MockReportSurface;
    use crate::room::state::RoomConfig;
    use crate::types::MemberRef;

    fn sweeper_with_mock(interval: Duration) -> (StaleSweeper, Arc<WaitingRoom>, Arc<MockReportSurface>) {
        let room = Arc::new(WaitingRoom::new(RoomConfig::default()));
        let surface = Arc::new(MockReportSurface::new());
        let report = Arc::new(ReusableReport::new(surface.clone()));
        (
            StaleSweeper::new(room.clone(), report, interval),
            room,
            surface,
        )
    }

    #[tokio::test]
    async fn test_sweeper_publishes_on_tick() {
        let (mut sweeper, room, surface) = sweeper_with_mock(Duration::from_millis(10));
        room.join(MemberRef::new("alice", "alice"));

        sweeper.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.stop().await;

        assert_eq!(surface.visible_text().as_deref(), Some("1. alice"));
    }

    #[tokio::test]
    async fn test_no_publish_after_stop_returns() {
        let (mut sweeper, room, surface) = sweeper_with_mock(Duration::from_millis(5));
        room.join(MemberRef::new("alice", "alice"));

        sweeper.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sweeper.stop().await;

        let actions_at_stop = surface.recorded_actions().len();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(surface.recorded_actions().len(), actions_at_stop);
    }

    #[tokio::test]
    async fn test_double_start_is_noop() {
        let (mut sweeper, _room, _surface) = sweeper_with_mock(Duration::from_millis(10));
        sweeper.start();
        sweeper.start();
        assert!(sweeper.is_running());
        sweeper.stop().await;
        assert!(!sweeper.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let (mut sweeper, _room, _surface) = sweeper_with_mock(Duration::from_millis(10));
        sweeper.stop().await;
        assert!(!sweeper.is_running());
    }
}
