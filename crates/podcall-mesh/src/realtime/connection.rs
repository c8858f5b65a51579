//! Background WebSocket connection loop with auto-reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::handler::handle_message;
use super::types::{events, PusherMessage, RealtimeCommand, RealtimeConfig, RealtimeEvent};

enum Exit {
    /// Connection dropped; reconnect after backoff.
    Lost,
    /// Disconnect requested or nobody is listening anymore.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the WebSocket connection with auto-reconnect.
///
/// Subscriptions are not replayed after a reconnect: the new socket id needs
/// a fresh authorization, which is the caller's job on `Connected`.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    connected: Arc<AtomicBool>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    mut command_rx: mpsc::Receiver<RealtimeCommand>,
) {
    let mut reconnect_delay = config.reconnect_delay_secs;
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

    loop {
        if event_tx.is_closed() {
            return;
        }
        info!(
            url = %config.ws_url.split('?').next().unwrap_or(""),
            "Connecting to channel service"
        );

        match tokio::time::timeout(
            connect_timeout,
            tokio_tungstenite::connect_async(config.ws_url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                connected.store(true, Ordering::SeqCst);

                let (mut ws_write, mut ws_read) = ws_stream.split();
                let period = Duration::from_secs(config.activity_timeout_secs.max(1));
                let mut ping = interval_at(Instant::now() + period, period);

                let exit = loop {
                    tokio::select! {
                        frame = ws_read.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                let Ok(msg) = serde_json::from_str::<PusherMessage>(&text) else {
                                    debug!(text = %text, "Unrecognized frame");
                                    continue;
                                };
                                let handled = handle_message(&msg);
                                if let Some(reply) = handled.reply {
                                    send_frame(&mut ws_write, &reply).await;
                                }
                                if let Some(event) = handled.event {
                                    if event_tx.send(event).await.is_err() {
                                        break Exit::Shutdown;
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("Channel service closed connection");
                                break Exit::Lost;
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket error");
                                break Exit::Lost;
                            }
                            Some(Ok(_)) => {}
                        },
                        cmd = command_rx.recv() => match cmd {
                            Some(RealtimeCommand::Disconnect) | None => {
                                let _ = ws_write.send(WsMessage::Close(None)).await;
                                break Exit::Shutdown;
                            }
                            Some(cmd) => forward_command(&mut ws_write, cmd).await,
                        },
                        _ = ping.tick() => {
                            let frame = PusherMessage::new(events::PING, serde_json::json!({}));
                            send_frame(&mut ws_write, &frame).await;
                        }
                    }
                };

                connected.store(false, Ordering::SeqCst);
                let _ = event_tx.send(RealtimeEvent::Disconnected).await;
                if let Exit::Shutdown = exit {
                    info!("Channel connection closed");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to channel service");
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!("Connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                error!(
                    timeout = config.connect_timeout_secs,
                    "WebSocket connection timed out"
                );
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!(
                        "Connection timed out after {}s",
                        config.connect_timeout_secs
                    )))
                    .await;
            }
        }

        // Exponential backoff reconnect. Commands arriving meanwhile are
        // stale (they were authorized for the old socket) except Disconnect.
        info!(delay = reconnect_delay, "Reconnecting in {} seconds", reconnect_delay);
        let sleep = tokio::time::sleep(Duration::from_secs(reconnect_delay));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = command_rx.recv() => match cmd {
                    Some(RealtimeCommand::Disconnect) | None => return,
                    Some(other) => debug!(?other, "Dropping command while disconnected"),
                },
            }
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay_secs);
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

async fn forward_command<S>(ws_write: &mut S, cmd: RealtimeCommand)
where
    S: Sink<WsMessage> + Unpin,
{
    let frame = match cmd {
        RealtimeCommand::Subscribe {
            channel,
            auth,
            channel_data,
        } => PusherMessage::new(
            events::SUBSCRIBE,
            serde_json::json!({
                "channel": channel,
                "auth": auth,
                "channel_data": channel_data
            }),
        ),
        RealtimeCommand::Unsubscribe { channel } => PusherMessage::new(
            events::UNSUBSCRIBE,
            serde_json::json!({ "channel": channel }),
        ),
        RealtimeCommand::Disconnect => return,
    };
    send_frame(ws_write, &frame).await;
}

async fn send_frame<S>(ws_write: &mut S, frame: &PusherMessage)
where
    S: Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(frame) {
        Ok(json) => {
            if ws_write.send(WsMessage::Text(json.into())).await.is_err() {
                debug!(event = %frame.event, "Send failed, connection closing");
            }
        }
        Err(e) => warn!(error = %e, "Cannot encode frame"),
    }
}
