//! Presence: channel membership and the local roster.
//!
//! `PusherPresence` joins the shared presence channel through the hosted
//! channel service, authorizing each connection against the relay.
//! `MembershipTracker` turns the resulting channel events into the
//! authoritative list of connected participants.

mod authorizer;
mod client;
mod event_translator;
mod tracker;
mod types;

pub use authorizer::HttpAuthorizer;
pub use client::PusherPresence;
pub use tracker::{MembershipEvent, MembershipTracker, TrackerState};
pub use types::{
    ChannelEvent, PresenceError, PresenceService, PresenceSubscription, SubscriptionHandle,
};
