//! Presence service backed by the hosted channel service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use podcall_common::ParticipantIdentity;
use podcall_config::PodcallConfig;

use crate::realtime::{RealtimeClient, RealtimeConfig, RealtimeEvent};

use super::authorizer::HttpAuthorizer;
use super::event_translator::{event_translator, Resubscribe};
use super::types::{
    members_from_subscription, PresenceError, PresenceService, PresenceSubscription,
    SubscriptionHandle,
};

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Joins the presence channel over a Pusher-protocol WebSocket.
pub struct PusherPresence {
    realtime: RealtimeConfig,
    authorizer: Arc<HttpAuthorizer>,
    channel: String,
    join_timeout: Duration,
}

impl PusherPresence {
    pub fn new(
        realtime: RealtimeConfig,
        authorizer: HttpAuthorizer,
        channel: impl Into<String>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            realtime,
            authorizer: Arc::new(authorizer),
            channel: channel.into(),
            join_timeout,
        }
    }

    pub fn from_config(config: &PodcallConfig) -> Self {
        Self::new(
            RealtimeConfig::from_config(config),
            HttpAuthorizer::from_config(config),
            config.presence.channel.clone(),
            Duration::from_secs(config.presence.connect_timeout_secs * 2),
        )
    }

    /// Drive the fresh connection until our subscription is confirmed.
    async fn subscribe_once(
        &self,
        client: &RealtimeClient,
        rt_rx: &mut mpsc::Receiver<RealtimeEvent>,
        display_name: &str,
    ) -> Result<(ParticipantIdentity, Vec<ParticipantIdentity>), PresenceError> {
        let mut me = None;
        while let Some(event) = rt_rx.recv().await {
            match event {
                RealtimeEvent::Connected { socket_id } => {
                    let grant = self
                        .authorizer
                        .authorize(&socket_id, &self.channel, display_name)
                        .await?;
                    let identity = grant
                        .identity()
                        .map_err(|e| PresenceError::Grant(e.to_string()))?;
                    client
                        .subscribe(&self.channel, &grant.auth, &grant.channel_data)
                        .await;
                    me = Some(identity);
                }
                RealtimeEvent::Subscribed { channel, data } if channel == self.channel => {
                    let me = me.take().ok_or_else(|| {
                        PresenceError::Rejected("subscribed before authorization".into())
                    })?;
                    return Ok((me, members_from_subscription(&data)));
                }
                RealtimeEvent::SubscriptionError { message, .. } => {
                    return Err(PresenceError::Rejected(message));
                }
                RealtimeEvent::Error(message) => {
                    warn!(error = %message, "Presence connection problem, retrying");
                }
                _ => {}
            }
        }
        Err(PresenceError::Closed)
    }
}

#[async_trait]
impl PresenceService for PusherPresence {
    async fn join(&self, display_name: &str) -> Result<PresenceSubscription, PresenceError> {
        let (client, mut rt_rx) = RealtimeClient::connect(self.realtime.clone());

        let joined = tokio::time::timeout(
            self.join_timeout,
            self.subscribe_once(&client, &mut rt_rx, display_name),
        )
        .await
        .unwrap_or(Err(PresenceError::Timeout));

        let (me, members) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                client.disconnect().await;
                return Err(e);
            }
        };
        info!(
            me = %me.id,
            members = members.len(),
            channel = %self.channel,
            "Joined presence channel"
        );

        let (event_tx, event_rx) = mpsc::channel(256);
        let resubscribe = Resubscribe {
            client: client.clone_sender(),
            authorizer: Arc::clone(&self.authorizer),
            channel: self.channel.clone(),
            display_name: display_name.to_string(),
        };
        tokio::spawn(event_translator(rt_rx, event_tx, resubscribe, me.clone()));

        Ok(PresenceSubscription {
            me,
            members,
            events: event_rx,
            handle: Box::new(PusherSubscription {
                client,
                channel: self.channel.clone(),
                left: false,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

struct PusherSubscription {
    client: RealtimeClient,
    channel: String,
    left: bool,
}

#[async_trait]
impl SubscriptionHandle for PusherSubscription {
    async fn leave(&mut self) {
        if std::mem::replace(&mut self.left, true) {
            return;
        }
        self.client.unsubscribe(&self.channel).await;
        self.client.disconnect().await;
        info!(channel = %self.channel, "Left presence channel");
    }
}
