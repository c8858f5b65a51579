//! Session lifecycle: start, mute, kick and stop a conference.
//!
//! `AudioSession` is the handle the hosting UI holds. Each started session
//! runs as one actor task owning the membership tracker, the peer manager,
//! the presence subscription and the local microphone stream.

mod actor;
mod coordinator;
mod types;

pub use coordinator::{AudioSession, SessionDeps};
pub use types::{SessionError, SessionEvent, SessionSnapshot};
