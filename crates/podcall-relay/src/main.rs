//! podcall-relay: presence authenticator and signaling relay.
//!
//! Two HTTP endpoints sit next to the hosted presence service. `/auth`
//! signs presence subscriptions, `/signal` republishes peer signaling
//! envelopes onto the shared channel. The relay never inspects the
//! negotiation payloads it forwards.

mod auth;
mod error;
mod publisher;
mod routes;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use podcall_config::PodcallConfig;

use crate::auth::PresenceAuthenticator;
use crate::publisher::PusherPublisher;
use crate::routes::{router, AppState};
use crate::session::{RemoteSessionProvider, SessionProvider, TokenSessionProvider};

#[derive(Parser)]
#[command(name = "podcall-relay", about = "Presence auth and signaling relay for podcall")]
struct Args {
    /// Config file (defaults to the platform config path).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `relay.bind`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> podcall_common::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => podcall_config::load_config_from(path)?,
        None => podcall_config::load_config()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("podcall_relay={}", config.logging.level).into()),
        )
        .init();

    if config.pusher.key.is_empty() || config.pusher.secret.is_empty() {
        tracing::warn!("pusher key/secret not configured, /auth will fail");
    }

    let state = build_state(&config);
    let addr = args.bind.unwrap_or_else(|| config.relay.bind.clone());
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        channel = %config.presence.channel,
        "podcall-relay listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("podcall-relay stopped");
    Ok(())
}

fn build_state(config: &PodcallConfig) -> AppState {
    let sessions: Arc<dyn SessionProvider> = match &config.relay.session_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "using remote session endpoint");
            Arc::new(RemoteSessionProvider::new(endpoint.clone()))
        }
        None => {
            tracing::info!(tokens = config.relay.sessions.len(), "using static session tokens");
            Arc::new(TokenSessionProvider::new(&config.relay.sessions))
        }
    };

    AppState {
        authenticator: Arc::new(PresenceAuthenticator::new(
            config.pusher.key.clone(),
            config.pusher.secret.clone(),
            config.presence.channel.clone(),
        )),
        sessions,
        publisher: Arc::new(PusherPublisher::from_config(&config.pusher)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
