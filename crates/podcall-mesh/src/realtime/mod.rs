//! Thin client for the hosted channel service (Pusher protocol 7).
//!
//! Provides a reusable WebSocket client using `tokio-tungstenite`.
//! Handles pings, channel subscribe/unsubscribe, presence member
//! notifications, and auto-reconnect with backoff.

mod client;
mod connection;
mod handler;
mod types;

pub use client::RealtimeClient;
pub use types::{PusherMessage, RealtimeConfig, RealtimeEvent};
