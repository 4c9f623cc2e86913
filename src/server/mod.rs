//! Subscriber broadcast server
//!
//! Subscribers open a WebSocket on any path and receive the current
//! snapshot right away, then every snapshot the watcher publishes. Nothing
//! is read from subscribers; the socket is only polled to notice a close.
//!
//! # Routes
//!
//! ```text
//! GET /api/health     watcher status and subscriber count
//! GET /api/snapshot   current snapshot, same bytes as pushed
//! GET /*              WebSocket subscription
//! ```

pub mod hub;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};

pub use hub::{PublishReport, Subscription, SubscriberHub};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Snapshot holder and subscriber set
    pub hub: Arc<SubscriberHub>,

    /// Number of identities in rotation
    pub identities: usize,

    /// Time between poll cycles
    pub poll_interval: Duration,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    subscribers: usize,
    identities: usize,
    poll_interval_secs: f64,
    last_status: u16,
}

/// Build the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/snapshot", get(current_snapshot))
        .route("/", get(subscribe))
        .fallback(subscribe)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribers: state.hub.subscriber_count().await,
        identities: state.identities,
        poll_interval_secs: state.poll_interval.as_secs_f64(),
        last_status: state.hub.snapshot().await.status(),
    })
}

async fn current_snapshot(State(state): State<AppState>) -> Response {
    let payload = state.hub.payload().await;
    ([(CONTENT_TYPE, "application/json")], payload.to_string()).into_response()
}

async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Serve one subscriber until it goes away
async fn handle_socket(socket: WebSocket, hub: Arc<SubscriberHub>) {
    let Subscription { id, mut receiver } = hub.subscribe().await;
    let (mut outgoing, mut incoming) = socket.split();

    loop {
        tokio::select! {
            payload = receiver.recv() => {
                let Some(payload) = payload else { break };
                if let Err(e) = outgoing.send(Message::Text(payload.to_string().into())).await {
                    tracing::debug!(subscriber = %id, error = %e, "Send to subscriber failed");
                    break;
                }
            }
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(subscriber = %id, error = %e, "Subscriber connection error");
                    break;
                }
                // Subscribers have nothing to say; pings are answered by axum
                Some(Ok(_)) => {}
            },
        }
    }

    hub.unsubscribe(id).await;
}

/// WebSocket server pushing snapshots to subscribers
pub struct BroadcastServer {
    bind_address: SocketAddr,
    state: AppState,
}

impl BroadcastServer {
    pub fn new(bind_address: SocketAddr, state: AppState) -> Self {
        Self {
            bind_address,
            state,
        }
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Router {
        create_router(self.state.clone())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener
    pub async fn bind(&self) -> Result<tokio::net::TcpListener> {
        tokio::net::TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| Error::server(format!("Failed to bind {}: {e}", self.bind_address)))
    }

    /// Serve subscribers on an already bound listener
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!("Server is running on {}", addr);

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::server(e.to_string()))
    }

    /// Bind and serve
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}
