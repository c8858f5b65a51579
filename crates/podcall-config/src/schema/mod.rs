//! Configuration schema types for Podcall.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod client;
mod logging;
mod presence;
mod pusher;
mod relay;

pub use client::*;
pub use logging::*;
pub use presence::*;
pub use pusher::*;
pub use relay::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration shared by the relay binary and the mesh client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcallConfig {
    pub pusher: PusherConfig,
    pub presence: PresenceConfig,
    pub relay: RelayConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}
