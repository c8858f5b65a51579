//! Signaling envelopes relayed over the shared broadcast channel.
//!
//! Every envelope is fanned out to every subscriber; receivers keep only
//! the ones whose `to` matches their own participant id.

use serde::{Deserialize, Serialize};

/// Channel event name that carries signaling envelopes.
pub const SIGNAL_EVENT: &str = "signal";

/// Control value that asks the addressee to leave the session.
pub const KICK: &str = "kick";

/// Either the `"kick"` control value or an opaque negotiation payload
/// (offer, answer or ICE candidate).
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Kick,
    Payload(serde_json::Value),
}

impl Signal {
    pub fn is_kick(&self) -> bool {
        matches!(self, Signal::Kick)
    }
}

impl From<serde_json::Value> for Signal {
    fn from(value: serde_json::Value) -> Self {
        match value.as_str() {
            Some(KICK) => Signal::Kick,
            _ => Signal::Payload(value),
        }
    }
}

impl From<Signal> for serde_json::Value {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Kick => serde_json::Value::String(KICK.to_string()),
            Signal::Payload(value) => value,
        }
    }
}

impl Serialize for Signal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Signal::Kick => serializer.serialize_str(KICK),
            Signal::Payload(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Signal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Signal::from)
    }
}

/// `{ signal, to, from }` as posted to the relay and received from the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingEnvelope {
    pub signal: Signal,
    pub to: String,
    pub from: String,
}

impl SignalingEnvelope {
    pub fn payload(payload: serde_json::Value, to: &str, from: &str) -> Self {
        Self {
            signal: Signal::from(payload),
            to: to.to_string(),
            from: from.to_string(),
        }
    }

    pub fn kick(to: &str, from: &str) -> Self {
        Self {
            signal: Signal::Kick,
            to: to.to_string(),
            from: from.to_string(),
        }
    }

    pub fn is_addressed_to(&self, participant_id: &str) -> bool {
        self.to == participant_id
    }
}
