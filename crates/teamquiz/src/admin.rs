//! Administrative HTTP surface.
//!
//! Every `/admin/*` route checks the shared secret in the
//! `x-admin-token` header first (401), then the room code (404), then
//! the request body (400). Errors are `{"error": "..."}`.
//!
//! | Route | Effect |
//! |---|---|
//! | `GET /` | health check |
//! | `GET /state/{code}` | scrubbed room snapshot (no secret needed) |
//! | `POST /admin/upload-questions/{code}` | replace the bank from a CSV `file` part |
//! | `POST /admin/next-from-bank/{code}` | draw `{category?}` and open it |
//! | `POST /admin/kick/{code}/{playerId}` | remove a player |
//! | `POST /admin/lock/{code}`, `/admin/unlock/{code}` | toggle join lock |
//! | `POST /admin/swap/{code}` | swap or move players `{fromId, toId}` |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use teamquiz_protocol::{Codec, ParticipantId, RoomCode, RoundView};
use teamquiz_room::{BankError, BankSummary, Caller, QuestionBank, RoomError, RoomHandle};
use teamquiz_session::{ADMIN_TOKEN_HEADER, Authenticator, SessionError};

use crate::server::ServerState;

type AppState<A, C> = State<Arc<ServerState<A, C>>>;

/// Builds the admin router over the shared server state.
pub(crate) fn router<A: Authenticator, C: Codec>(state: Arc<ServerState<A, C>>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/state/{code}", get(room_state::<A, C>))
        .route("/admin/upload-questions/{code}", post(upload_questions::<A, C>))
        .route("/admin/next-from-bank/{code}", post(next_from_bank::<A, C>))
        .route("/admin/kick/{code}/{player_id}", post(kick::<A, C>))
        .route("/admin/lock/{code}", post(lock::<A, C>))
        .route("/admin/unlock/{code}", post(unlock::<A, C>))
        .route("/admin/swap/{code}", post(swap::<A, C>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of an admin request, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Unauthorized(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("invalid question file: {0}")]
    Bank(#[from] BankError),

    #[error("{0}")]
    BadRequest(String),
}

impl AdminError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Room(
                RoomError::NotFound(_) | RoomError::Unavailable(_) | RoomError::BankEmpty(_),
            ) => StatusCode::NOT_FOUND,
            Self::Room(_) | Self::Bank(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%status, error = %self, "admin request refused");
        } else {
            tracing::debug!(%status, error = %self, "admin request refused");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct NextFromBank {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest {
    #[serde(default)]
    from_id: Option<ParticipantId>,
    #[serde(default)]
    to_id: Option<ParticipantId>,
}

/// Parses an optional JSON body; an empty body is the default request.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AdminError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AdminError::BadRequest(format!("malformed body: {e}")))
}

/// Accepts `7` or the display form `P-7`.
fn parse_participant(raw: &str) -> Result<ParticipantId, AdminError> {
    raw.strip_prefix("P-")
        .unwrap_or(raw)
        .parse()
        .map(ParticipantId)
        .map_err(|_| AdminError::BadRequest(format!("invalid player id {raw:?}")))
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

async fn authorize<A: Authenticator, C: Codec>(
    state: &ServerState<A, C>,
    headers: &HeaderMap,
) -> Result<(), AdminError> {
    let token = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    state.auth.authenticate(token).await?;
    Ok(())
}

async fn find_room<A: Authenticator, C: Codec>(
    state: &ServerState<A, C>,
    code: &RoomCode,
) -> Result<RoomHandle, AdminError> {
    Ok(state.registry.lock().await.require(code)?)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    "ok"
}

async fn room_state<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
) -> Result<Json<RoundView>, AdminError> {
    let room = find_room(&*state, &RoomCode::new(code)).await?;
    Ok(Json(room.snapshot().await?))
}

async fn upload_questions<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BankSummary>, AdminError> {
    authorize(&*state, &headers).await?;
    let code = RoomCode::new(code);
    find_room(&*state, &code).await?;

    let mut multipart = multipart.map_err(|e| AdminError::BadRequest(e.body_text()))?;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdminError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes: Bytes = field
                .bytes()
                .await
                .map_err(|e| AdminError::BadRequest(e.body_text()))?;
            file = Some(bytes);
            break;
        }
    }
    let file = file.ok_or_else(|| AdminError::BadRequest("No file".into()))?;

    // Parse outside every lock; a bad file leaves the old bank in place.
    let bank = QuestionBank::from_csv(&file[..])?;
    let summary = state.registry.lock().await.replace_bank(&code, bank)?;
    tracing::info!(%code, loaded = summary.loaded, categories = ?summary.categories, "question bank uploaded");
    Ok(Json(summary))
}

async fn next_from_bank<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AdminError> {
    authorize(&*state, &headers).await?;
    let code = RoomCode::new(code);
    let room = find_room(&*state, &code).await?;
    let request: NextFromBank = parse_body(&body)?;

    let question = state
        .registry
        .lock()
        .await
        .draw_next(&code, request.category.as_deref())?;
    let question_id = question.id.clone();

    match room.start_round(Caller::Admin, question.clone()).await {
        Ok(round) => {
            tracing::info!(%code, round, question = %question_id, "admin drew from bank");
            Ok(Json(json!({ "ok": true, "round": round, "questionId": question_id })))
        }
        Err(e) => {
            state.registry.lock().await.return_to_bank(&code, question);
            Err(e.into())
        }
    }
}

async fn kick<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path((code, player_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, AdminError> {
    authorize(&*state, &headers).await?;
    let code = RoomCode::new(code);
    let room = find_room(&*state, &code).await?;
    let participant = parse_participant(&player_id)?;

    room.kick(participant).await?;
    // Free the connection to join another room.
    state.sessions.lock().await.unbind(participant);
    tracing::info!(%code, %participant, "admin kicked player");
    Ok(Json(json!({ "ok": true })))
}

async fn lock<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AdminError> {
    set_lock(&*state, code, &headers, true).await
}

async fn unlock<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AdminError> {
    set_lock(&*state, code, &headers, false).await
}

async fn set_lock<A: Authenticator, C: Codec>(
    state: &ServerState<A, C>,
    code: String,
    headers: &HeaderMap,
    locked: bool,
) -> Result<Json<Value>, AdminError> {
    authorize(state, headers).await?;
    let room = find_room(state, &RoomCode::new(code)).await?;
    room.set_lock(Caller::Admin, locked).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn swap<A: Authenticator, C: Codec>(
    State(state): AppState<A, C>,
    Path(code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AdminError> {
    authorize(&*state, &headers).await?;
    let code = RoomCode::new(code);
    let room = find_room(&*state, &code).await?;
    let request: SwapRequest = parse_body(&body)?;
    if request.from_id.is_none() && request.to_id.is_none() {
        return Err(AdminError::BadRequest("Invalid player ids".into()));
    }

    let roster = room.swap(request.from_id, request.to_id).await?;
    Ok(Json(json!({ "ok": true, "roster": roster })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamquiz_protocol::Team;

    #[test]
    fn test_status_mapping() {
        let not_found = AdminError::Room(RoomError::NotFound(RoomCode::new("ABCD")));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AdminError::Room(RoomError::BankEmpty(Some("Science".into()))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::Room(RoomError::TeamFull(Team::A)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::Unauthorized(SessionError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_parse_body_empty_is_default() {
        let request: NextFromBank = parse_body(b"").unwrap();
        assert!(request.category.is_none());
        let request: NextFromBank = parse_body(b"{\"category\":\"Math\"}").unwrap();
        assert_eq!(request.category.as_deref(), Some("Math"));
        assert!(parse_body::<NextFromBank>(b"{nope").is_err());
    }

    #[test]
    fn test_swap_request_shape() {
        let request: SwapRequest = parse_body(b"{\"fromId\": 4, \"toId\": 9}").unwrap();
        assert_eq!(request.from_id, Some(ParticipantId(4)));
        assert_eq!(request.to_id, Some(ParticipantId(9)));
        let request: SwapRequest = parse_body(b"{\"fromId\": 4}").unwrap();
        assert!(request.to_id.is_none());
    }

    #[test]
    fn test_parse_participant_accepts_display_form() {
        assert_eq!(parse_participant("7").unwrap(), ParticipantId(7));
        assert_eq!(parse_participant("P-7").unwrap(), ParticipantId(7));
        assert!(parse_participant("seven").is_err());
    }
}
