//! Peer-to-peer media transport seam.
//!
//! A `PeerConnector` opens one `PeerLink` per remote participant. Links are
//! driven synchronously by the peer manager (`signal`, `destroy`) and report
//! back asynchronously through a `LinkEventSink` tagged with the peer id and
//! the record generation the link was opened for.

#[cfg(feature = "webrtc-transport")]
mod webrtc;

#[cfg(feature = "webrtc-transport")]
pub use self::webrtc::WebRtcConnector;

use tokio::sync::mpsc;

use crate::media::MediaStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends the offer.
    Initiator,
    /// Waits for an offer and answers it.
    Responder,
}

#[derive(Debug)]
pub enum LinkEvent {
    /// Negotiation payload to forward to the remote side.
    Signal(serde_json::Value),
    /// Remote media arrived.
    Stream(MediaStream),
    /// The link is unusable.
    Failed(String),
    /// Negotiation did not finish in time. Raised by the peer manager.
    TimedOut,
}

/// A link event with the record it belongs to.
#[derive(Debug)]
pub struct LinkNotice {
    pub peer_id: String,
    pub generation: u64,
    pub event: LinkEvent,
}

/// Where a link reports its events.
#[derive(Debug, Clone)]
pub struct LinkEventSink {
    peer_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<LinkNotice>,
}

impl LinkEventSink {
    pub fn new(
        peer_id: impl Into<String>,
        generation: u64,
        tx: mpsc::UnboundedSender<LinkNotice>,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            generation,
            tx,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Returns `false` once nobody listens anymore.
    pub fn emit(&self, event: LinkEvent) -> bool {
        self.tx
            .send(LinkNotice {
                peer_id: self.peer_id.clone(),
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot set up peer link: {0}")]
    Setup(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),
}

/// One direct media connection.
pub trait PeerLink: Send {
    /// Feed a negotiation payload received from the remote side.
    fn signal(&mut self, payload: serde_json::Value);

    /// Tear down and release transport resources. No events may be emitted
    /// afterwards. Must tolerate repeated calls.
    fn destroy(&mut self);
}

pub trait PeerConnector: Send + Sync {
    /// Open a link toward `peer_id`. Initiators start negotiating right away
    /// and emit their offer through `sink`.
    fn open(
        &self,
        peer_id: &str,
        role: Role,
        local: &MediaStream,
        sink: LinkEventSink,
    ) -> Result<Box<dyn PeerLink>, TransportError>;
}
