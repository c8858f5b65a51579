//! Local and remote audio stream handles.
//!
//! A `MediaStream` groups `AudioTrack`s. Tracks are cheap cloneable handles
//! over shared state: the enabled flag (mute), the stopped flag (device
//! released) and a fan-out of encoded frames. Capture devices push frames
//! in; transports and renderers subscribe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

const FRAME_BUFFER: usize = 64;

/// One encoded audio frame (an opus packet for the built-in transport).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub data: Bytes,
    pub duration: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no capture device available")]
    NoDevice,

    #[error("capture failed: {0}")]
    Other(String),
}

/// Source of the local microphone stream.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self) -> Result<MediaStream, MediaError>;
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

struct TrackInner {
    id: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
    frames: broadcast::Sender<AudioFrame>,
}

#[derive(Clone)]
pub struct AudioTrack {
    inner: Arc<TrackInner>,
}

impl std::fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTrack")
            .field("id", &self.inner.id)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl AudioTrack {
    pub fn new(id: impl Into<String>) -> Self {
        let (frames, _) = broadcast::channel(FRAME_BUFFER);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                frames,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop the track for good. Returns `true` only for the call that
    /// actually stopped it.
    pub fn stop(&self) -> bool {
        let first = !self.inner.stopped.swap(true, Ordering::SeqCst);
        if first {
            debug!(track = %self.inner.id, "Track stopped");
        }
        first
    }

    /// Deliver a frame to subscribers. Dropped while muted or stopped.
    /// Returns whether the frame went out.
    pub fn push(&self, frame: AudioFrame) -> bool {
        if !self.is_enabled() || self.is_stopped() {
            return false;
        }
        self.inner.frames.send(frame).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.inner.frames.subscribe()
    }

    /// Same underlying track.
    pub fn same_as(&self, other: &AudioTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<AudioTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<AudioTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn set_enabled(&self, enabled: bool) {
        for track in &self.tracks {
            track.set_enabled(enabled);
        }
    }

    /// Muted when any track is disabled. An empty stream is never muted.
    pub fn is_muted(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_enabled())
    }

    /// Stop every track. Returns how many tracks this call stopped.
    pub fn stop(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_stopped())
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.tracks.len() == other.tracks.len()
            && self
                .tracks
                .iter()
                .zip(&other.tracks)
                .all(|(a, b)| a.same_as(b))
    }
}
