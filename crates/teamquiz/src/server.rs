//! `TeamquizServer` builder and server loop.
//!
//! This is the entry point for running a quiz server. It ties together
//! all the layers: transport → protocol → session → room, plus the admin
//! HTTP surface and the optional chat bridge.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware;
use teamquiz_protocol::{Codec, JsonCodec};
use teamquiz_room::{RoomConfig, SessionRegistry};
use teamquiz_session::{Authenticator, SessionManager};
use teamquiz_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bridge::{ChatMessage, run_bridge};
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::limit::{ClientLimiter, RateLimit, limit_requests};
use crate::{TeamquizError, admin};

/// Shared server state passed to each connection handler task and to the
/// admin routes.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Both locks
/// are held only for map lookups and updates, never across a room
/// command.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

impl<A: Authenticator, C: Codec> ServerState<A, C> {
    pub(crate) fn new(auth: A, codec: C, room_config: RoomConfig) -> Self {
        Self {
            sessions: Mutex::new(SessionManager::new()),
            registry: Mutex::new(SessionRegistry::new(room_config)),
            auth,
            codec,
        }
    }
}

/// Builder for configuring and starting a quiz server.
///
/// # Example
///
/// ```rust,no_run
/// use teamquiz::prelude::*;
///
/// # async fn start() -> Result<(), TeamquizError> {
/// let server = TeamquizServerBuilder::new()
///     .ws_addr("0.0.0.0:3001")
///     .admin_addr("0.0.0.0:3002")
///     .build(SharedSecret::new(Some("hunter2".into())))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TeamquizServerBuilder {
    ws_addr: String,
    admin_addr: String,
    room_config: RoomConfig,
    cors_origin: Option<String>,
    rate_limit: RateLimit,
    chat_feed: Option<mpsc::Receiver<ChatMessage>>,
}

impl TeamquizServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            ws_addr: "127.0.0.1:3001".to_string(),
            admin_addr: "127.0.0.1:3002".to_string(),
            room_config: RoomConfig::default(),
            cors_origin: None,
            rate_limit: RateLimit::default(),
            chat_feed: None,
        }
    }

    /// Builder pre-filled from parsed configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, TeamquizError> {
        Ok(Self::new()
            .ws_addr(&config.ws_addr)
            .admin_addr(&config.admin_addr)
            .room_config(config.room_config()?)
            .cors_origin(config.cors_origin.clone())
            .rate_limit(config.rate_limit()))
    }

    /// Sets the address the WebSocket gateway binds to.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.ws_addr = addr.to_string();
        self
    }

    /// Sets the address the admin HTTP surface binds to.
    pub fn admin_addr(mut self, addr: &str) -> Self {
        self.admin_addr = addr.to_string();
        self
    }

    /// Sets the config every new room is spawned with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Restricts browser access to the admin surface to one origin.
    /// `None` allows any origin.
    pub fn cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }

    /// Caps admin requests per client IP (100 per 10 s by default).
    pub fn rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = limit;
        self
    }

    /// Feeds chat messages to the chat bridge. Without a feed the bridge
    /// does not run.
    pub fn chat_feed(mut self, feed: mpsc::Receiver<ChatMessage>) -> Self {
        self.chat_feed = Some(feed);
        self
    }

    /// Binds both listeners and builds the server with the given
    /// admin authenticator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<TeamquizServer<A, JsonCodec>, TeamquizError> {
        let cors = cors_layer(self.cors_origin.as_deref())?;
        let limiter = self.rate_limit.limiter()?;
        let transport = WebSocketTransport::bind(&self.ws_addr).await?;
        let admin_listener = TcpListener::bind(&self.admin_addr).await?;

        let state = Arc::new(ServerState::new(auth, JsonCodec, self.room_config));

        Ok(TeamquizServer {
            transport,
            admin_listener,
            state,
            cors,
            limiter,
            chat_feed: self.chat_feed,
        })
    }
}

impl Default for TeamquizServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, TeamquizError> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| TeamquizError::Config(format!("CORS origin {origin:?}: {e}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// A bound quiz server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct TeamquizServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    admin_listener: TcpListener,
    state: Arc<ServerState<A, C>>,
    cors: CorsLayer,
    limiter: Arc<ClientLimiter>,
    chat_feed: Option<mpsc::Receiver<ChatMessage>>,
}

impl<A: Authenticator, C: Codec> TeamquizServer<A, C> {
    /// Address the WebSocket gateway is bound to.
    pub fn ws_addr(&self) -> Result<SocketAddr, TeamquizError> {
        Ok(self.transport.local_addr()?)
    }

    /// Address the admin HTTP surface is bound to.
    pub fn admin_addr(&self) -> Result<SocketAddr, TeamquizError> {
        Ok(self.admin_listener.local_addr()?)
    }

    /// Serves the gateway and the admin surface until either fails.
    ///
    /// Spawns a handler task per WebSocket connection, and the chat
    /// bridge if a feed was configured.
    pub async fn run(self) -> Result<(), TeamquizError> {
        let Self {
            transport,
            admin_listener,
            state,
            cors,
            limiter,
            chat_feed,
        } = self;

        if let Some(feed) = chat_feed {
            tokio::spawn(run_bridge(Arc::clone(&state), feed));
        }

        let app = admin::router(Arc::clone(&state))
            .layer(middleware::from_fn_with_state(limiter, limit_requests))
            .layer(cors)
            .layer(TraceLayer::new_for_http());

        tracing::info!(
            ws = ?transport.local_addr().ok(),
            admin = ?admin_listener.local_addr().ok(),
            "teamquiz server running"
        );

        tokio::select! {
            result = accept_loop(transport, state) => result,
            result = axum::serve(
                admin_listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .into_future() => {
                result.map_err(TeamquizError::Io)
            }
        }
    }
}

/// Accepts WebSocket connections forever, one handler task each.
async fn accept_loop<A: Authenticator, C: Codec>(
    mut transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
) -> Result<(), TeamquizError> {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_origin_or_any() {
        assert!(cors_layer(None).is_ok());
        assert!(cors_layer(Some("https://quiz.example.com")).is_ok());
    }

    #[test]
    fn test_cors_layer_rejects_unprintable_origin() {
        assert!(matches!(
            cors_layer(Some("bad\norigin")),
            Err(TeamquizError::Config(_))
        ));
    }
}
