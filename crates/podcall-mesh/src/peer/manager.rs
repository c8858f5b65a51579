//! Peer manager: owns every `PeerRecord` and the remote stream list.
//!
//! Records are keyed by peer id and stamped with a generation. A record is
//! taken out of the map before its link is destroyed, and link notices for a
//! missing record or an older generation are dropped. Peers that left or were
//! kicked stay in a departed set until they join again, and envelopes from
//! them are dropped, so a late negotiation event can never bring a departed
//! peer back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use podcall_common::{Signal, SignalingEnvelope};

use crate::media::MediaStream;
use crate::signaling::SignalTransport;
use crate::transport::{LinkEvent, LinkEventSink, LinkNotice, PeerConnector, Role};

use super::types::{EnvelopeOutcome, PeerRecord, PeerUpdate, RemoteStream};

pub struct PeerManager {
    local_id: String,
    local_stream: MediaStream,
    connector: Arc<dyn PeerConnector>,
    signaler: Arc<dyn SignalTransport>,
    negotiation_timeout: Option<Duration>,
    records: HashMap<String, PeerRecord>,
    /// Left or kicked since their last join.
    departed: HashSet<String>,
    /// In arrival order. Every entry has a live record.
    streams: Vec<RemoteStream>,
    next_generation: u64,
    notice_tx: mpsc::UnboundedSender<LinkNotice>,
}

impl PeerManager {
    /// Returns the manager and the receiver its links report to. Feed every
    /// notice back through [`PeerManager::on_link_notice`].
    pub fn new(
        local_id: impl Into<String>,
        local_stream: MediaStream,
        connector: Arc<dyn PeerConnector>,
        signaler: Arc<dyn SignalTransport>,
        negotiation_timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<LinkNotice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let manager = Self {
            local_id: local_id.into(),
            local_stream,
            connector,
            signaler,
            negotiation_timeout,
            records: HashMap::new(),
            departed: HashSet::new(),
            streams: Vec::new(),
            next_generation: 0,
            notice_tx,
        };
        (manager, notice_rx)
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Our id changes when a guest re-authorizes after a reconnect.
    pub fn set_local_id(&mut self, id: impl Into<String>) {
        self.local_id = id.into();
    }

    pub fn role_of(&self, peer_id: &str) -> Option<Role> {
        self.records.get(peer_id).map(|r| r.role)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn remote_streams(&self) -> &[RemoteStream] {
        &self.streams
    }

    pub fn has_departed(&self, peer_id: &str) -> bool {
        self.departed.contains(peer_id)
    }

    /// A participant joined after us: open an initiator link toward them.
    /// No-op when a record already exists. Returns whether one was created.
    pub fn on_peer_joined(&mut self, peer_id: &str) -> bool {
        self.departed.remove(peer_id);
        if peer_id == self.local_id || self.records.contains_key(peer_id) {
            return false;
        }
        self.open(peer_id, Role::Initiator)
    }

    pub fn on_envelope(&mut self, envelope: &SignalingEnvelope) -> EnvelopeOutcome {
        if !envelope.is_addressed_to(&self.local_id) {
            return EnvelopeOutcome::Ignored;
        }
        let payload = match &envelope.signal {
            Signal::Kick => {
                return EnvelopeOutcome::Kicked {
                    from: envelope.from.clone(),
                }
            }
            Signal::Payload(payload) => payload.clone(),
        };
        if envelope.from == self.local_id {
            debug!("Ignoring signal from ourselves");
            return EnvelopeOutcome::Ignored;
        }
        if self.departed.contains(&envelope.from) {
            debug!(peer = %envelope.from, "Ignoring signal from departed peer");
            return EnvelopeOutcome::Ignored;
        }

        if let Some(record) = self.records.get_mut(&envelope.from) {
            record.link.signal(payload);
            return EnvelopeOutcome::Delivered;
        }

        if !self.open(&envelope.from, Role::Responder) {
            return EnvelopeOutcome::Ignored;
        }
        if let Some(record) = self.records.get_mut(&envelope.from) {
            record.link.signal(payload);
        }
        EnvelopeOutcome::Created
    }

    pub fn on_link_notice(&mut self, notice: LinkNotice) -> Option<PeerUpdate> {
        let current = self
            .records
            .get(&notice.peer_id)
            .is_some_and(|r| r.generation == notice.generation);
        if !current {
            debug!(
                peer = %notice.peer_id,
                generation = notice.generation,
                "Dropping stale link event"
            );
            return None;
        }

        match notice.event {
            LinkEvent::Signal(payload) => {
                self.send(SignalingEnvelope::payload(
                    payload,
                    &notice.peer_id,
                    &self.local_id,
                ));
                None
            }
            LinkEvent::Stream(stream) => {
                if let Some(timer) = self
                    .records
                    .get_mut(&notice.peer_id)
                    .and_then(|r| r.timer.take())
                {
                    timer.abort();
                }
                if self.streams.iter().any(|s| s.peer_id == notice.peer_id) {
                    return None;
                }
                info!(peer = %notice.peer_id, "Remote audio connected");
                let remote = RemoteStream {
                    peer_id: notice.peer_id,
                    stream,
                };
                self.streams.push(remote.clone());
                Some(PeerUpdate::StreamAdded(remote))
            }
            LinkEvent::Failed(reason) => {
                warn!(peer = %notice.peer_id, %reason, "Peer connection failed");
                self.remove_peer(&notice.peer_id)
            }
            LinkEvent::TimedOut => {
                warn!(peer = %notice.peer_id, "Peer negotiation timed out");
                self.remove_peer(&notice.peer_id)
            }
        }
    }

    /// Destroy the record for `peer_id`, if any. Reports the stream removal
    /// when the peer had connected audio.
    pub fn remove_peer(&mut self, peer_id: &str) -> Option<PeerUpdate> {
        let record = self.records.remove(peer_id)?;
        record.destroy();
        debug!(peer = %peer_id, "Peer connection destroyed");

        let index = self.streams.iter().position(|s| s.peer_id == peer_id)?;
        self.streams.remove(index);
        Some(PeerUpdate::StreamRemoved {
            peer_id: peer_id.to_string(),
        })
    }

    /// `peer_id` left the channel. Their in-flight signals are dropped
    /// until they join again.
    pub fn on_peer_left(&mut self, peer_id: &str) -> Option<PeerUpdate> {
        self.departed.insert(peer_id.to_string());
        self.remove_peer(peer_id)
    }

    /// Ask `peer_id` to leave and drop them locally without waiting.
    pub fn kick(&mut self, peer_id: &str) -> Option<PeerUpdate> {
        self.send(SignalingEnvelope::kick(peer_id, &self.local_id));
        self.on_peer_left(peer_id)
    }

    /// Destroy every record and forget who departed. Used when the
    /// subscription itself goes away.
    pub fn clear(&mut self) -> Vec<PeerUpdate> {
        self.departed.clear();
        let ids: Vec<String> = self.records.keys().cloned().collect();
        let updates = ids.iter().filter_map(|id| self.remove_peer(id)).collect();
        self.streams.clear();
        updates
    }

    fn open(&mut self, peer_id: &str, role: Role) -> bool {
        self.next_generation += 1;
        let generation = self.next_generation;
        let sink = LinkEventSink::new(peer_id, generation, self.notice_tx.clone());

        let link = match self.connector.open(peer_id, role, &self.local_stream, sink) {
            Ok(link) => link,
            Err(e) => {
                warn!(peer = %peer_id, error = %e, "Cannot open peer connection");
                return false;
            }
        };
        let timer = self.negotiation_timeout.map(|timeout| {
            let sink = LinkEventSink::new(peer_id, generation, self.notice_tx.clone());
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                sink.emit(LinkEvent::TimedOut);
            })
        });

        info!(peer = %peer_id, ?role, "Peer connection opened");
        self.records.insert(
            peer_id.to_string(),
            PeerRecord {
                role,
                generation,
                link,
                timer,
            },
        );
        true
    }

    /// Fire and forget. A lost signal stalls only that peer's negotiation.
    fn send(&self, envelope: SignalingEnvelope) {
        let signaler = self.signaler.clone();
        tokio::spawn(async move {
            if let Err(e) = signaler.send(&envelope).await {
                warn!(to = %envelope.to, error = %e, "Dropping signal");
            }
        });
    }
}

impl Drop for PeerManager {
    fn drop(&mut self) {
        for (_, record) in self.records.drain() {
            record.destroy();
        }
    }
}
