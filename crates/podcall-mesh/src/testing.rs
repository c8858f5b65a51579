//! Hand-written fakes for the peer and session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use podcall_common::{ParticipantIdentity, SignalingEnvelope};

use crate::media::{AudioTrack, CaptureDevice, MediaError, MediaStream};
use crate::presence::{
    ChannelEvent, PresenceError, PresenceService, PresenceSubscription, SubscriptionHandle,
};
use crate::signaling::{SignalError, SignalTransport};
use crate::transport::{LinkEvent, LinkEventSink, PeerConnector, PeerLink, Role, TransportError};

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

pub(crate) struct FakeSignaler {
    sent: mpsc::UnboundedSender<SignalingEnvelope>,
    fail: AtomicBool,
}

impl FakeSignaler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SignalingEnvelope>) {
        let (sent, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent,
                fail: AtomicBool::new(false),
            }),
            rx,
        )
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalTransport for FakeSignaler {
    async fn send(&self, envelope: &SignalingEnvelope) -> Result<(), SignalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SignalError::Network("relay unreachable".into()));
        }
        let _ = self.sent.send(envelope.clone());
        Ok(())
    }
}

/// Wait for the next envelope the fake relay accepted.
pub(crate) async fn next_sent(
    rx: &mut mpsc::UnboundedReceiver<SignalingEnvelope>,
) -> SignalingEnvelope {
    tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("no envelope sent in time")
        .expect("signaler dropped")
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct LinkLog {
    pub opened: Vec<(String, Role)>,
    pub received: Vec<(String, serde_json::Value)>,
    pub destroyed: Vec<String>,
}

/// Links that answer offers and otherwise do nothing until told to.
#[derive(Default)]
pub(crate) struct FakeConnector {
    log: Arc<Mutex<LinkLog>>,
    sinks: Mutex<HashMap<String, LinkEventSink>>,
    fail_open: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<(String, Role)> {
        self.log.lock().unwrap().opened.clone()
    }

    pub fn received(&self) -> Vec<(String, serde_json::Value)> {
        self.log.lock().unwrap().received.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.log.lock().unwrap().destroyed.clone()
    }

    /// Sink of the most recent link opened toward `peer_id`.
    pub fn sink(&self, peer_id: &str) -> LinkEventSink {
        self.sinks
            .lock()
            .unwrap()
            .get(peer_id)
            .cloned()
            .expect("no link opened for peer")
    }

    /// Make the latest link toward `peer_id` report remote media.
    pub fn deliver_stream(&self, peer_id: &str) -> MediaStream {
        let stream = MediaStream::new(
            format!("remote-{peer_id}"),
            vec![AudioTrack::new(format!("audio-{peer_id}"))],
        );
        self.sink(peer_id).emit(LinkEvent::Stream(stream.clone()));
        stream
    }
}

impl PeerConnector for FakeConnector {
    fn open(
        &self,
        peer_id: &str,
        role: Role,
        _local: &MediaStream,
        sink: LinkEventSink,
    ) -> Result<Box<dyn PeerLink>, TransportError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Setup("no transport".into()));
        }
        self.log
            .lock()
            .unwrap()
            .opened
            .push((peer_id.to_string(), role));
        if role == Role::Initiator {
            sink.emit(LinkEvent::Signal(
                json!({"type": "offer", "sdp": format!("offer-to-{peer_id}")}),
            ));
        }
        self.sinks
            .lock()
            .unwrap()
            .insert(peer_id.to_string(), sink.clone());
        Ok(Box::new(FakeLink {
            peer_id: peer_id.to_string(),
            role,
            sink,
            log: self.log.clone(),
            destroyed: false,
        }))
    }
}

struct FakeLink {
    peer_id: String,
    role: Role,
    sink: LinkEventSink,
    log: Arc<Mutex<LinkLog>>,
    destroyed: bool,
}

impl PeerLink for FakeLink {
    fn signal(&mut self, payload: serde_json::Value) {
        if self.destroyed {
            return;
        }
        let is_offer = payload["type"] == "offer";
        self.log
            .lock()
            .unwrap()
            .received
            .push((self.peer_id.clone(), payload));
        if is_offer && self.role == Role::Responder {
            self.sink.emit(LinkEvent::Signal(
                json!({"type": "answer", "sdp": format!("answer-to-{}", self.peer_id)}),
            ));
        }
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.log
                .lock()
                .unwrap()
                .destroyed
                .push(self.peer_id.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

pub(crate) struct FakeCapture {
    pub stream: MediaStream,
    deny: AtomicBool,
    pub acquired: AtomicUsize,
}

impl FakeCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stream: MediaStream::new("local", vec![AudioTrack::new("mic")]),
            deny: AtomicBool::new(false),
            acquired: AtomicUsize::new(0),
        })
    }

    pub fn deny(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureDevice for FakeCapture {
    async fn acquire(&self) -> Result<MediaStream, MediaError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.stream.clone())
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

pub(crate) struct FakePresence {
    me: ParticipantIdentity,
    members: Vec<ParticipantIdentity>,
    reject: AtomicBool,
    feed: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
    pub leaves: Arc<AtomicUsize>,
}

impl FakePresence {
    /// `members` excludes self; the subscription reports self first.
    pub fn new(me: ParticipantIdentity, members: Vec<ParticipantIdentity>) -> Arc<Self> {
        Arc::new(Self {
            me,
            members,
            reject: AtomicBool::new(false),
            feed: Mutex::new(None),
            leaves: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn reject(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    /// Drop the service side of the current subscription.
    pub fn close(&self) {
        self.feed.lock().unwrap().take();
    }

    /// Push channel events into the current subscription.
    pub fn feed(&self) -> mpsc::Sender<ChannelEvent> {
        self.feed
            .lock()
            .unwrap()
            .clone()
            .expect("not joined")
    }
}

#[async_trait]
impl PresenceService for FakePresence {
    async fn join(&self, _display_name: &str) -> Result<PresenceSubscription, PresenceError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(PresenceError::Auth("403 Forbidden".into()));
        }
        let (tx, events) = mpsc::channel(64);
        *self.feed.lock().unwrap() = Some(tx);
        let mut members = vec![self.me.clone()];
        members.extend(self.members.iter().cloned());
        Ok(PresenceSubscription {
            me: self.me.clone(),
            members,
            events,
            handle: Box::new(FakeHandle {
                leaves: self.leaves.clone(),
            }),
        })
    }
}

struct FakeHandle {
    leaves: Arc<AtomicUsize>,
}

#[async_trait]
impl SubscriptionHandle for FakeHandle {
    async fn leave(&mut self) {
        self.leaves.fetch_add(1, Ordering::SeqCst);
    }
}
