//! `webrtc`-crate backed peer links.
//!
//! Negotiation is non-trickle: each side waits for ICE gathering to finish
//! and sends one `{ "type", "sdp" }` description. Remote ICE candidates
//! (`{ "type": "candidate", "candidate": {...} }`) are still accepted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use bytes::Bytes;
use podcall_config::PodcallConfig;

use crate::media::{AudioFrame, AudioTrack, MediaStream};

use super::{LinkEvent, LinkEventSink, PeerConnector, PeerLink, Role, TransportError};

const OPUS_CLOCK_RATE: u32 = 48_000;
const OPUS_FRAME: std::time::Duration = std::time::Duration::from_millis(20);

pub struct WebRtcConnector {
    ice_servers: Vec<String>,
}

impl WebRtcConnector {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }

    pub fn from_config(config: &PodcallConfig) -> Self {
        Self::new(config.client.ice_servers.clone())
    }
}

impl PeerConnector for WebRtcConnector {
    fn open(
        &self,
        peer_id: &str,
        role: Role,
        local: &MediaStream,
        sink: LinkEventSink,
    ) -> Result<Box<dyn PeerLink>, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        let (payloads, payload_rx) = mpsc::unbounded_channel();
        let driver = LinkDriver {
            ice_servers: self.ice_servers.clone(),
            role,
            local: local.clone(),
            sink,
        };
        debug!(peer = %peer_id, ?role, "Spawning WebRTC link");
        let task = runtime.spawn(driver.run(payload_rx));
        Ok(Box::new(WebRtcLink {
            payloads: Some(payloads),
            task,
        }))
    }
}

struct WebRtcLink {
    /// Dropping the sender tells the driver to close the connection.
    payloads: Option<mpsc::UnboundedSender<serde_json::Value>>,
    task: JoinHandle<()>,
}

impl PeerLink for WebRtcLink {
    fn signal(&mut self, payload: serde_json::Value) {
        if let Some(payloads) = &self.payloads {
            let _ = payloads.send(payload);
        }
    }

    fn destroy(&mut self) {
        if self.payloads.take().is_some() {
            debug!("Closing WebRTC link");
        }
    }
}

impl Drop for WebRtcLink {
    fn drop(&mut self) {
        if self.payloads.is_some() {
            self.task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

struct LinkDriver {
    ice_servers: Vec<String>,
    role: Role,
    local: MediaStream,
    sink: LinkEventSink,
}

impl LinkDriver {
    async fn run(self, mut payloads: mpsc::UnboundedReceiver<serde_json::Value>) {
        let pc = match self.build().await {
            Ok(pc) => pc,
            Err(e) => {
                self.sink.emit(LinkEvent::Failed(e.to_string()));
                return;
            }
        };

        let mut pumps = Vec::new();
        for track in self.local.audio_tracks() {
            match attach_local_track(&pc, track, self.local.id()).await {
                Ok(pump) => pumps.push(pump),
                Err(e) => {
                    self.sink.emit(LinkEvent::Failed(e.to_string()));
                    let _ = pc.close().await;
                    return;
                }
            }
        }
        self.watch(&pc);

        if self.role == Role::Initiator {
            if let Err(e) = self.offer(&pc).await {
                self.sink.emit(LinkEvent::Failed(e.to_string()));
            }
        }

        while let Some(payload) = payloads.recv().await {
            if let Err(e) = self.apply(&pc, payload).await {
                warn!(peer = %self.sink.peer_id(), error = %e, "Negotiation step failed");
                self.sink.emit(LinkEvent::Failed(e.to_string()));
            }
        }

        for pump in pumps {
            pump.abort();
        }
        if let Err(e) = pc.close().await {
            debug!(error = %e, "Peer connection close failed");
        }
        info!(peer = %self.sink.peer_id(), "WebRTC link closed");
    }

    async fn build(&self) -> Result<Arc<RTCPeerConnection>, TransportError> {
        let setup = |e: webrtc::Error| TransportError::Setup(e.to_string());

        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(setup)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(setup)?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let pc = api.new_peer_connection(config).await.map_err(setup)?;
        Ok(Arc::new(pc))
    }

    /// Report remote audio and hard failures through the sink.
    fn watch(&self, pc: &Arc<RTCPeerConnection>) {
        let sink = self.sink.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!(peer = %sink.peer_id(), %state, "Peer connection state changed");
            if state == RTCPeerConnectionState::Failed {
                sink.emit(LinkEvent::Failed("peer connection failed".into()));
            }
            Box::pin(async {})
        }));

        let sink = self.sink.clone();
        let announced = Arc::new(AtomicBool::new(false));
        pc.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let sink = sink.clone();
            let announced = announced.clone();
            Box::pin(async move {
                if track.kind() != RTPCodecType::Audio {
                    return;
                }
                let audio = AudioTrack::new(track.id());
                if !announced.swap(true, Ordering::SeqCst) {
                    let stream = MediaStream::new(track.stream_id(), vec![audio.clone()]);
                    sink.emit(LinkEvent::Stream(stream));
                }
                tokio::spawn(forward_remote(track, audio));
            })
        }));
    }

    async fn offer(&self, pc: &RTCPeerConnection) -> Result<(), TransportError> {
        let offer = pc.create_offer(None).await.map_err(negotiation)?;
        self.publish_local(pc, offer).await
    }

    async fn apply(
        &self,
        pc: &RTCPeerConnection,
        payload: serde_json::Value,
    ) -> Result<(), TransportError> {
        if let Some(candidate) = payload.get("candidate").filter(|c| c.is_object()) {
            let init: RTCIceCandidateInit = serde_json::from_value(candidate.clone())
                .map_err(|e| TransportError::Negotiation(e.to_string()))?;
            return pc.add_ice_candidate(init).await.map_err(negotiation);
        }
        if payload.get("sdp").is_none() {
            debug!(peer = %self.sink.peer_id(), "Ignoring unknown negotiation payload");
            return Ok(());
        }

        let remote: RTCSessionDescription = serde_json::from_value(payload)
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;
        let is_offer = remote.sdp_type == RTCSdpType::Offer;
        pc.set_remote_description(remote).await.map_err(negotiation)?;

        if is_offer {
            let answer = pc.create_answer(None).await.map_err(negotiation)?;
            self.publish_local(pc, answer).await?;
        }
        Ok(())
    }

    /// Set the local description, wait for gathering and send the result.
    async fn publish_local(
        &self,
        pc: &RTCPeerConnection,
        description: RTCSessionDescription,
    ) -> Result<(), TransportError> {
        let mut gathered = pc.gathering_complete_promise().await;
        pc.set_local_description(description)
            .await
            .map_err(negotiation)?;
        let _ = gathered.recv().await;

        let local = pc
            .local_description()
            .await
            .ok_or_else(|| TransportError::Negotiation("no local description".into()))?;
        let payload =
            serde_json::to_value(&local).map_err(|e| TransportError::Negotiation(e.to_string()))?;
        self.sink.emit(LinkEvent::Signal(payload));
        Ok(())
    }
}

fn negotiation(e: webrtc::Error) -> TransportError {
    TransportError::Negotiation(e.to_string())
}

/// Add an opus track fed from `track`'s frames. Returns the feeding task.
async fn attach_local_track(
    pc: &RTCPeerConnection,
    track: &AudioTrack,
    stream_id: &str,
) -> Result<JoinHandle<()>, TransportError> {
    let sample_track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: OPUS_CLOCK_RATE,
            channels: 2,
            ..Default::default()
        },
        track.id().to_owned(),
        stream_id.to_owned(),
    ));
    let sender = pc
        .add_track(Arc::clone(&sample_track) as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .map_err(|e| TransportError::Setup(e.to_string()))?;

    // RTCP must be drained for the interceptors to work.
    tokio::spawn(async move {
        let mut buf = vec![0u8; 1500];
        while sender.read(&mut buf).await.is_ok() {}
    });

    let mut frames = track.subscribe();
    Ok(tokio::spawn(async move {
        loop {
            let frame = match frames.recv().await {
                Ok(frame) => frame,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Local audio lagged");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            let sample = Sample {
                data: frame.data,
                duration: frame.duration,
                ..Default::default()
            };
            if let Err(e) = sample_track.write_sample(&sample).await {
                debug!(error = %e, "Dropping local audio frame");
            }
        }
    }))
}

/// Push remote RTP payloads into `audio` until the track ends.
async fn forward_remote(track: Arc<TrackRemote>, audio: AudioTrack) {
    while let Ok((packet, _)) = track.read_rtp().await {
        audio.push(AudioFrame {
            data: Bytes::from(packet.payload.to_vec()),
            duration: OPUS_FRAME,
        });
    }
    audio.stop();
    debug!(track = %audio.id(), "Remote audio ended");
}
