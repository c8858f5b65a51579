//! Peer connection manager: one transport link per remote participant.

mod manager;
mod types;

pub use manager::PeerManager;
pub use types::{EnvelopeOutcome, PeerUpdate, RemoteStream};
