//! Membership event router
//!
//! Receives gateway events, classifies membership transitions against the
//! two configured channels, invokes the matching waiting-room operation,
//! and hands every resulting snapshot to the report publisher. Also owns
//! the session lifecycle: sync on ready/resume, sweeper start after the
//! initial sync, sweeper stop and empty report on close.

use crate::amqp::consumer::EventHandler;
use crate::config::RoomSettings;
use crate::error::{Result, RoomError};
use crate::metrics::MetricsCollector;
use crate::report::ReusableReport;
use crate::room::entry::WaitingEntry;
use crate::room::render::render_report;
use crate::room::state::WaitingRoom;
use crate::room::sweeper::StaleSweeper;
use crate::types::{
    Command, GatewayEvent, MembershipChanged, SessionSnapshot, Transition,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Routes gateway events into waiting-room operations
pub struct MembershipEventRouter {
    room: Arc<WaitingRoom>,
    report: Arc<ReusableReport>,
    sweeper: Arc<Mutex<StaleSweeper>>,
    settings: RoomSettings,
    metrics: Arc<MetricsCollector>,
}

impl MembershipEventRouter {
    pub fn new(
        room: Arc<WaitingRoom>,
        report: Arc<ReusableReport>,
        sweeper: Arc<Mutex<StaleSweeper>>,
        settings: RoomSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            room,
            report,
            sweeper,
            settings,
            metrics,
        }
    }

    /// Collapse a raw membership change into a semantic transition.
    ///
    /// A join into either tracked channel wins over whatever channel was
    /// left; a departure only counts when the member did not land in a
    /// tracked channel at the same time.
    fn classify(&self, change: &MembershipChanged) -> Transition {
        let joined = change.joined_channel.as_deref();
        let left = change.left_channel.as_deref();

        if joined == Some(self.settings.waiting_channel.as_str()) {
            Transition::JoinedWaiting(change.member.clone())
        } else if joined == Some(self.settings.active_channel.as_str()) {
            Transition::JoinedActive(change.member.clone())
        } else if left == Some(self.settings.waiting_channel.as_str())
            || left == Some(self.settings.active_channel.as_str())
        {
            Transition::LeftTracked(change.member.id.clone())
        } else {
            Transition::Ignored
        }
    }

    async fn handle_membership_change(&self, change: MembershipChanged) -> Result<()> {
        let snapshot = match self.classify(&change) {
            Transition::JoinedWaiting(member) => {
                self.metrics.joins_total.inc();
                self.room.join(member)
            }
            Transition::JoinedActive(member) => {
                self.metrics.calls_total.inc();
                self.room.call(&member.id)
            }
            Transition::LeftTracked(member_id) => {
                self.metrics.leaves_total.inc();
                self.room.leave(&member_id)
            }
            Transition::Ignored => {
                debug!(
                    "Ignoring membership change for {} (no tracked channel involved)",
                    change.member.id
                );
                return Ok(());
            }
        };
        self.publish(&snapshot).await
    }

    async fn handle_command(&self, command: Command) -> Result<()> {
        let recognized = command
            .text
            .to_lowercase()
            .contains(&self.settings.shuffle_command.to_lowercase());

        if !recognized {
            debug!("Unrecognized command from {}: {}", command.member.id, command.text);
            return self
                .report
                .reply(&format!("Huh, {}?", command.member.display_name))
                .await;
        }

        if !command.can_reorder {
            info!(
                "Member {} lacks the capability to shuffle the waiting list",
                command.member.id
            );
            return self
                .report
                .reply(&format!(
                    "Hahaha... NO! You don't get to order me around, {}.",
                    command.member.display_name
                ))
                .await;
        }

        self.report
            .reply(&format!("As you command, {}!", command.member.display_name))
            .await?;

        info!("Shuffling waiting list on behalf of {}", command.member.id);
        self.metrics.resets_total.inc();
        let snapshot = self.room.reset();
        self.publish(&snapshot).await
    }

    async fn handle_session_ready(&self, snapshot: SessionSnapshot) -> Result<()> {
        info!(
            "Session ready: syncing against {} waiting / {} active members",
            snapshot.waiting.len(),
            snapshot.active.len()
        );
        self.metrics.syncs_total.inc();
        let entries = self.room.sync(&snapshot.waiting, &snapshot.active);
        self.publish(&entries).await?;

        // The sweeper only starts once the initial sync has completed
        self.sweeper.lock().await.start();
        Ok(())
    }

    async fn handle_session_resumed(&self, snapshot: SessionSnapshot) -> Result<()> {
        info!(
            "Session resumed: re-syncing against {} waiting / {} active members",
            snapshot.waiting.len(),
            snapshot.active.len()
        );
        self.metrics.syncs_total.inc();
        let entries = self.room.sync(&snapshot.waiting, &snapshot.active);
        self.publish(&entries).await
    }

    async fn handle_session_closed(&self) -> Result<()> {
        info!("Session closed: stopping sweeper and clearing report");
        self.sweeper.lock().await.stop().await;
        self.metrics.members_tracked.set(0);
        self.report.set_text("").await
    }

    /// Stop the sweeper outside of a session event (process shutdown)
    pub async fn stop_sweeper(&self) {
        self.sweeper.lock().await.stop().await;
    }

    async fn publish(&self, snapshot: &[WaitingEntry]) -> Result<()> {
        self.metrics.members_tracked.set(snapshot.len() as i64);
        self.report.set_text(&render_report(snapshot)).await
    }
}

#[async_trait]
impl EventHandler for MembershipEventRouter {
    async fn handle_event(&self, event: GatewayEvent) -> Result<()> {
        match event {
            GatewayEvent::MembershipChanged(change) => self.handle_membership_change(change).await,
            GatewayEvent::Command(command) => self.handle_command(command).await,
            GatewayEvent::SessionReady(snapshot) => self.handle_session_ready(snapshot).await,
            GatewayEvent::SessionResumed(snapshot) => self.handle_session_resumed(snapshot).await,
            GatewayEvent::SessionClosed {} => self.handle_session_closed().await,
        }
    }

    async fn handle_error(&self, error: RoomError, message_data: &[u8]) {
        self.metrics.event_errors_total.inc();
        error!(
            "Gateway event handling failed - error: {}, message_size: {} bytes",
            error,
            message_data.len()
        );
        if !message_data.is_empty() {
            let preview_len = std::cmp::min(100, message_data.len());
            let preview = String::from_utf8_lossy(&message_data[..preview_len]);
            warn!("Message preview: {:?}", preview);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MockReportSurface;
    use crate::room::state::RoomConfig;
    use crate::types::MemberRef;
    use crate::utils::current_timestamp;
    use std::time::Duration;

    struct Harness {
        router: MembershipEventRouter,
        surface: Arc<MockReportSurface>,
        sweeper: Arc<Mutex<StaleSweeper>>,
    }

    fn harness() -> Harness {
        let settings = RoomSettings::default();
        let room = Arc::new(WaitingRoom::new(RoomConfig::default()));
        let surface = Arc::new(MockReportSurface::new());
        let report = Arc::new(ReusableReport::new(surface.clone()));
        let sweeper = Arc::new(Mutex::new(StaleSweeper::new(
            room.clone(),
            report.clone(),
            Duration::from_secs(5),
        )));
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let router = MembershipEventRouter::new(room, report, sweeper.clone(), settings, metrics);
        Harness {
            router,
            surface,
            sweeper,
        }
    }

    fn membership(
        member: &str,
        joined: Option<&str>,
        left: Option<&str>,
    ) -> GatewayEvent {
        GatewayEvent::MembershipChanged(MembershipChanged {
            member: MemberRef::new(member, member),
            joined_channel: joined.map(str::to_string),
            left_channel: left.map(str::to_string),
            timestamp: current_timestamp(),
        })
    }

    fn command(member: &str, text: &str, can_reorder: bool) -> GatewayEvent {
        GatewayEvent::Command(Command {
            member: MemberRef::new(member, member),
            text: text.to_string(),
            can_reorder,
            timestamp: current_timestamp(),
        })
    }

    #[tokio::test]
    async fn test_join_then_call_renders_in_join_order() {
        let h = harness();
        let waiting = Some("waiting-room");
        let active = Some("on-stage");

        h.router
            .handle_event(membership("alice", waiting, None))
            .await
            .unwrap();
        h.router
            .handle_event(membership("bob", waiting, None))
            .await
            .unwrap();
        h.router
            .handle_event(membership("alice", active, waiting))
            .await
            .unwrap();

        // alice keeps her earliest join position despite being called
        assert_eq!(
            h.surface.visible_text().as_deref(),
            Some("**1. alice**\n2. bob")
        );
    }

    #[tokio::test]
    async fn test_leave_strikes_member_through() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("waiting-room"), None))
            .await
            .unwrap();
        h.router
            .handle_event(membership("alice", None, Some("waiting-room")))
            .await
            .unwrap();

        assert_eq!(h.surface.visible_text().as_deref(), Some("~~1. alice~~"));
    }

    #[tokio::test]
    async fn test_untracked_channels_are_ignored() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("lounge"), Some("afk")))
            .await
            .unwrap();

        assert!(h.surface.recorded_actions().is_empty());
    }

    #[tokio::test]
    async fn test_move_to_untracked_channel_counts_as_leave() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("waiting-room"), None))
            .await
            .unwrap();
        h.router
            .handle_event(membership("alice", Some("lounge"), Some("waiting-room")))
            .await
            .unwrap();

        assert_eq!(h.surface.visible_text().as_deref(), Some("~~1. alice~~"));
    }

    #[tokio::test]
    async fn test_session_ready_syncs_and_starts_sweeper() {
        let h = harness();
        let snapshot = SessionSnapshot {
            waiting: vec![MemberRef::new("alice", "alice"), MemberRef::new("bob", "bob")],
            active: vec![MemberRef::new("carol", "carol")],
            timestamp: current_timestamp(),
        };
        h.router
            .handle_event(GatewayEvent::SessionReady(snapshot))
            .await
            .unwrap();

        assert!(h.sweeper.lock().await.is_running());
        let text = h.surface.visible_text().unwrap();
        assert!(text.contains("**"));
        assert_eq!(text.lines().count(), 3);

        h.router.stop_sweeper().await;
    }

    #[tokio::test]
    async fn test_session_closed_stops_sweeper_and_clears_report() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("waiting-room"), None))
            .await
            .unwrap();
        h.sweeper.lock().await.start();

        h.router
            .handle_event(GatewayEvent::SessionClosed {})
            .await
            .unwrap();

        assert!(!h.sweeper.lock().await.is_running());
        assert_eq!(h.surface.visible_text(), None);
    }

    #[tokio::test]
    async fn test_shuffle_command_requires_capability() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("waiting-room"), None))
            .await
            .unwrap();

        h.router
            .handle_event(command("bob", "please shuffle the list", false))
            .await
            .unwrap();

        let replies = h.surface.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("NO"));
        // State unchanged
        assert_eq!(h.surface.visible_text().as_deref(), Some("1. alice"));
    }

    #[tokio::test]
    async fn test_authorized_shuffle_acknowledges_and_resets() {
        let h = harness();
        h.router
            .handle_event(membership("alice", Some("waiting-room"), None))
            .await
            .unwrap();

        h.router
            .handle_event(command("boss", "SHUFFLE now please", true))
            .await
            .unwrap();

        let replies = h.surface.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("As you command"));
        assert_eq!(h.surface.visible_text().as_deref(), Some("1. alice"));
    }

    #[tokio::test]
    async fn test_unrecognized_command_gets_fixed_reply() {
        let h = harness();
        h.router
            .handle_event(command("bob", "make me a sandwich", true))
            .await
            .unwrap();

        let replies = h.surface.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("Huh"));
    }
}
