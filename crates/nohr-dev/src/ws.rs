//! WebSocket server for the update channel
//!
//! Routes:
//! - `GET /` WebSocket upgrade, joins the update channel
//! - `GET /__nohr/client.js` browser runtime
//! - `GET /__nohr/routes` current route manifest as JSON

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use nohr_router::SharedManifest;
use tokio::net::TcpListener;

use crate::channel::UpdateChannel;
use crate::client::ReconnectPolicy;

const RUNTIME_TEMPLATE: &str = include_str!("../assets/hmr-client.js");

pub const RUNTIME_PATH: &str = "/__nohr/client.js";
pub const ROUTES_PATH: &str = "/__nohr/routes";

/// Shared state for the channel server
#[derive(Clone)]
pub struct ChannelState {
    pub channel: UpdateChannel,
    pub manifest: SharedManifest,
    runtime: Arc<str>,
}

impl ChannelState {
    pub fn new(
        channel: UpdateChannel,
        manifest: SharedManifest,
        policy: &ReconnectPolicy,
        port: u16,
    ) -> Self {
        Self {
            channel,
            manifest,
            runtime: render_runtime(policy, port).into(),
        }
    }
}

/// Browser runtime with the reconnect policy and port filled in
pub fn render_runtime(policy: &ReconnectPolicy, port: u16) -> String {
    RUNTIME_TEMPLATE
        .replace("__NOHR_BASE_DELAY_MS__", &policy.base_delay_ms.to_string())
        .replace("__NOHR_FACTOR__", &policy.factor.to_string())
        .replace("__NOHR_MAX_ATTEMPTS__", &policy.max_attempts.to_string())
        .replace("__NOHR_HMR_PORT__", &port.to_string())
}

pub fn router(state: ChannelState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route(RUNTIME_PATH, get(runtime_handler))
        .route(ROUTES_PATH, get(routes_handler))
        .with_state(state)
}

/// Serves the channel on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: ChannelState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ws_handler(State(state): State<ChannelState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.channel))
}

async fn runtime_handler(State(state): State<ChannelState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        state.runtime.to_string(),
    )
}

async fn routes_handler(State(state): State<ChannelState>) -> impl IntoResponse {
    let manifest = state.manifest.load();
    Json(manifest.as_ref().clone())
}

async fn handle_socket(socket: WebSocket, channel: UpdateChannel) {
    let (mut sender, mut receiver) = socket.split();
    let (id, mut outbox) = channel.register();

    // Client -> server: only used to notice the close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Channel -> client
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    channel.unregister(id);
    tracing::debug!("HMR WebSocket connection closed");
}
