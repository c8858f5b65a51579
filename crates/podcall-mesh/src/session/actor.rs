//! The task that owns one running session.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::media::MediaStream;
use crate::peer::{EnvelopeOutcome, PeerManager, PeerUpdate};
use crate::presence::{ChannelEvent, MembershipEvent, MembershipTracker, SubscriptionHandle};
use crate::transport::LinkNotice;

use super::types::{SessionEvent, SessionSnapshot};

pub(crate) enum Command {
    Kick {
        target: String,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Stop {
        reply: Option<oneshot::Sender<()>>,
    },
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

pub(crate) struct SessionActor {
    pub tracker: MembershipTracker,
    pub peers: PeerManager,
    pub notices: mpsc::UnboundedReceiver<LinkNotice>,
    pub channel: mpsc::Receiver<ChannelEvent>,
    pub handle: Box<dyn SubscriptionHandle>,
    pub stream: MediaStream,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub stopped: bool,
}

impl SessionActor {
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Session handle dropped");
                        self.shutdown().await;
                        break;
                    };
                    if self.on_command(command).await == Flow::Stop {
                        break;
                    }
                }
                event = self.channel.recv() => {
                    let Some(event) = event else {
                        self.emit(SessionEvent::Error("presence channel closed".into()));
                        self.shutdown().await;
                        break;
                    };
                    if self.on_channel_event(event).await == Flow::Stop {
                        break;
                    }
                }
                Some(notice) = self.notices.recv() => {
                    if let Some(update) = self.peers.on_link_notice(notice) {
                        self.emit_update(update);
                    }
                }
            }
        }
    }

    async fn on_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Kick { target, reply } => {
                let _ = reply.send(self.kick(&target));
                Flow::Continue
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }
            Command::Stop { reply } => {
                self.shutdown().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                Flow::Stop
            }
        }
    }

    async fn on_channel_event(&mut self, event: ChannelEvent) -> Flow {
        match event {
            ChannelEvent::Subscribed { me, members } => {
                info!(me = %me.id, members = members.len(), "Resubscribed to presence channel");
                self.peers.set_local_id(me.id.clone());
                self.tracker.on_subscribed(me, members);
            }
            ChannelEvent::MemberAdded(member) => {
                if let Some(MembershipEvent::PeerJoined(peer)) =
                    self.tracker.on_member_added(member)
                {
                    self.peers.on_peer_joined(&peer.id);
                    self.emit(SessionEvent::PeerJoined(peer));
                }
            }
            ChannelEvent::MemberRemoved { id } => {
                let left = self.tracker.on_member_removed(&id);
                if let Some(update) = self.peers.on_peer_left(&id) {
                    self.emit_update(update);
                }
                if let Some(MembershipEvent::PeerLeft(peer)) = left {
                    self.emit(SessionEvent::PeerLeft(peer));
                }
            }
            ChannelEvent::Signal(envelope) => {
                if let EnvelopeOutcome::Kicked { from } = self.peers.on_envelope(&envelope) {
                    info!(by = %from, "Removed from session");
                    self.emit(SessionEvent::Kicked { by: from });
                    self.shutdown().await;
                    return Flow::Stop;
                }
            }
            ChannelEvent::ConnectionLost => {
                warn!("Presence connection lost");
                for event in self.tracker.on_connection_lost() {
                    if let MembershipEvent::PeerLeft(peer) = event {
                        if let Some(update) = self.peers.remove_peer(&peer.id) {
                            self.emit_update(update);
                        }
                        self.emit(SessionEvent::PeerLeft(peer));
                    }
                }
                for update in self.peers.clear() {
                    self.emit_update(update);
                }
            }
            ChannelEvent::Error(message) => {
                warn!(%message, "Presence channel error");
                self.emit(SessionEvent::Error(message));
            }
        }
        Flow::Continue
    }

    fn kick(&mut self, target: &str) -> bool {
        if self.stopped || target == self.peers.local_id() {
            return false;
        }
        info!(peer = %target, "Kicking participant");
        if let Some(update) = self.peers.kick(target) {
            self.emit_update(update);
        }
        if let Some(peer) = self.tracker.remove(target) {
            self.emit(SessionEvent::PeerLeft(peer));
        }
        true
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            me: self.tracker.me().cloned(),
            connected_users: self.tracker.roster().to_vec(),
            remote_streams: self.peers.remote_streams().to_vec(),
            is_active: !self.stopped,
            is_muted: self.stream.is_muted(),
        }
    }

    /// Leave presence, destroy every link and release the microphone.
    /// Runs at most once.
    async fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.tracker.clear();
        for update in self.peers.clear() {
            self.emit_update(update);
        }
        self.handle.leave().await;
        let released = self.stream.stop();
        info!(released, "Audio session stopped");
        self.emit(SessionEvent::Stopped);
    }

    fn emit_update(&self, update: PeerUpdate) {
        let event = match update {
            PeerUpdate::StreamAdded(remote) => SessionEvent::RemoteStreamAdded {
                peer_id: remote.peer_id,
                stream: remote.stream,
            },
            PeerUpdate::StreamRemoved { peer_id } => SessionEvent::RemoteStreamRemoved { peer_id },
        };
        self.emit(event);
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have stopped listening; the session keeps running.
        let _ = self.events.send(event);
    }
}
