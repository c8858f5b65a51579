//! Peer connection records and the outcomes the manager reports.

use tokio::task::JoinHandle;

use crate::media::MediaStream;
use crate::transport::{PeerLink, Role};

/// One live connection toward a remote participant.
pub(crate) struct PeerRecord {
    pub role: Role,
    pub generation: u64,
    pub link: Box<dyn PeerLink>,
    /// Negotiation deadline. Cancelled once remote media arrives.
    pub timer: Option<JoinHandle<()>>,
}

impl PeerRecord {
    /// Tear the link down. Call after the record has left the map.
    pub fn destroy(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.link.destroy();
    }
}

/// Remote media that is ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStream {
    pub peer_id: String,
    pub stream: MediaStream,
}

/// How an inbound signaling envelope was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    /// Not for us, sent by us, or unusable.
    Ignored,
    /// We were told to leave.
    Kicked { from: String },
    /// Fed into an existing record.
    Delivered,
    /// A responder record was created for the sender.
    Created,
}

/// Changes to the remote stream list.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerUpdate {
    StreamAdded(RemoteStream),
    StreamRemoved { peer_id: String },
}
