//! `AudioSession`: the public handle over one conference at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use podcall_config::PodcallConfig;

use crate::media::{CaptureDevice, MediaStream};
use crate::peer::PeerManager;
use crate::presence::{MembershipTracker, PresenceService, PusherPresence};
use crate::signaling::{RelaySignaler, SignalTransport};
use crate::transport::PeerConnector;

use super::actor::{Command, SessionActor};
use super::types::{SessionError, SessionEvent, SessionSnapshot};

/// Collaborators a session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    pub capture: Arc<dyn CaptureDevice>,
    pub presence: Arc<dyn PresenceService>,
    pub connector: Arc<dyn PeerConnector>,
    pub signaler: Arc<dyn SignalTransport>,
    /// `None` waits forever for a peer to connect.
    pub negotiation_timeout: Option<Duration>,
}

impl SessionDeps {
    /// Presence and signaling against the configured relay and channel
    /// service. Capture and transport come from the host.
    pub fn from_config(
        config: &PodcallConfig,
        capture: Arc<dyn CaptureDevice>,
        connector: Arc<dyn PeerConnector>,
    ) -> Self {
        let timeout = config.client.negotiation_timeout_secs;
        Self {
            capture,
            presence: Arc::new(PusherPresence::from_config(config)),
            connector,
            signaler: Arc::new(RelaySignaler::from_config(config)),
            negotiation_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
        }
    }
}

struct ActiveSession {
    commands: mpsc::UnboundedSender<Command>,
    stream: MediaStream,
    task: JoinHandle<()>,
}

impl ActiveSession {
    fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

pub struct AudioSession {
    deps: SessionDeps,
    active: Option<ActiveSession>,
}

impl AudioSession {
    pub fn new(deps: SessionDeps) -> Self {
        Self { deps, active: None }
    }

    /// Acquire the microphone, join the presence channel and start reacting
    /// to peers. Nothing is left behind when a step fails.
    pub async fn start(
        &mut self,
        display_name: &str,
    ) -> Result<mpsc::UnboundedReceiver<SessionEvent>, SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        self.active = None;

        let stream = self.deps.capture.acquire().await?;
        let subscription = match self.deps.presence.join(display_name).await {
            Ok(subscription) => subscription,
            Err(e) => {
                stream.stop();
                warn!(error = %e, "Could not join presence channel");
                return Err(e.into());
            }
        };

        let mut tracker = MembershipTracker::new();
        tracker.begin();
        let me_id = subscription.me.id.clone();
        tracker.on_subscribed(subscription.me, subscription.members);

        let (peers, notices) = PeerManager::new(
            me_id.as_str(),
            stream.clone(),
            Arc::clone(&self.deps.connector),
            Arc::clone(&self.deps.signaler),
            self.deps.negotiation_timeout,
        );
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            tracker,
            peers,
            notices,
            channel: subscription.events,
            handle: subscription.handle,
            stream: stream.clone(),
            events: event_tx,
            stopped: false,
        };
        let task = tokio::spawn(actor.run(command_rx));
        info!(me = %me_id, "Audio session started");

        self.active = Some(ActiveSession {
            commands: command_tx,
            stream,
            task,
        });
        Ok(event_rx)
    }

    pub fn is_active(&self) -> bool {
        self.running().is_some()
    }

    /// The session, unless it ended on the remote side or was never started.
    fn running(&self) -> Option<&ActiveSession> {
        self.active.as_ref().filter(|active| active.is_running())
    }

    /// Flip every local track. Returns the new muted state. Peer
    /// connections are left alone.
    pub fn toggle_mute(&self) -> bool {
        let Some(active) = self.running() else {
            return false;
        };
        let muted = !active.stream.is_muted();
        active.stream.set_enabled(!muted);
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.running().is_some_and(|active| active.stream.is_muted())
    }

    /// Tell `target_id` to leave and drop them locally right away. Returns
    /// `false` when no session is running or the target is ourselves.
    pub async fn kick(&self, target_id: &str) -> bool {
        let Some(active) = self.running() else {
            return false;
        };
        let (reply, rx) = oneshot::channel();
        let command = Command::Kick {
            target: target_id.to_string(),
            reply,
        };
        if active.commands.send(command).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Leave the session and release everything. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let (reply, rx) = oneshot::channel();
        if active.commands.send(Command::Stop { reply: Some(reply) }).is_ok() {
            let _ = rx.await;
        }
        if let Err(e) = active.task.await {
            warn!(error = %e, "Session task ended abnormally");
        }
        // No-op unless the task died before releasing the device.
        active.stream.stop();
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let Some(active) = &self.active else {
            return SessionSnapshot::default();
        };
        let (reply, rx) = oneshot::channel();
        if active.commands.send(Command::Snapshot { reply }).is_err() {
            return SessionSnapshot::default();
        }
        rx.await.unwrap_or_default()
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.commands.send(Command::Stop { reply: None });
            active.stream.stop();
        }
    }
}
