//! Per-client request limiting for the admin HTTP surface.
//!
//! Each client IP may make `max_requests` requests per `window`. The
//! allowance refills evenly over the window, so a client that stops
//! for a full window gets its whole burst back. Requests over the limit
//! are answered `429` with `{"error": "..."}` and never reach a handler.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;

use crate::TeamquizError;

/// Keyed limiter shared by every admin request.
pub(crate) type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// How many admin requests one client may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(10),
        }
    }
}

impl RateLimit {
    /// Builds the limiter, rejecting a zero budget or a zero window.
    pub(crate) fn limiter(&self) -> Result<Arc<ClientLimiter>, TeamquizError> {
        let burst = NonZeroU32::new(self.max_requests)
            .ok_or_else(|| TeamquizError::Config("rate limit must allow at least 1 request".into()))?;
        let quota = Quota::with_period(self.window / self.max_requests)
            .ok_or_else(|| TeamquizError::Config("rate limit window must not be zero".into()))?
            .allow_burst(burst);
        Ok(Arc::new(RateLimiter::keyed(quota)))
    }
}

/// Middleware refusing clients that exceeded their allowance.
pub(crate) async fn limit_requests(
    State(limiter): State<Arc<ClientLimiter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.check_key(&peer.ip()).is_err() {
        tracing::debug!(%peer, path = %request.uri().path(), "admin rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "too many requests, try again later" })),
        )
            .into_response();
    }
    next.run(request).await
}
