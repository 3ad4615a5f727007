use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

use campuswatch_common::{AccountStatus, NewUser, User};
use campuswatch_store::{
    evaluate, log_denial, with_deadline, GateDecision, RoleRequirement, SessionState,
};

use crate::rest::error_response;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const COOKIE_NAME: &str = "cw_session";
const SESSION_DURATION_SECS: i64 = 7 * 24 * 3600; // 7 days

/// Authenticated actor for the current request. Extract this in handlers
/// that require a session; anonymous requests are rejected with 401.
pub struct CurrentUser(pub User);

/// Tolerant variant: anonymous requests resolve to `None` instead of
/// rejecting. Used by entry points that accept guest reports.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = resolve_session(parts, state).await;
        match evaluate(&session, RoleRequirement::AnyAuthenticated) {
            GateDecision::Allow => match session {
                SessionState::Present(user) => Ok(CurrentUser(user)),
                _ => Err(unauthorized()),
            },
            GateDecision::Deny(reason) => {
                log_denial(reason, parts.uri.path());
                Err(unauthorized())
            }
            GateDecision::Wait => Err(unauthorized()),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session(parts, state).await {
            SessionState::Present(user) => Ok(MaybeUser(Some(user))),
            _ => Ok(MaybeUser(None)),
        }
    }
}

/// Resolve the session cookie to a state. A valid cookie for an account
/// that is no longer approved resolves to `Absent`; pending and banned
/// accounts never reach a protected view.
async fn resolve_session(parts: &Parts, state: &Arc<AppState>) -> SessionState {
    let cookie_header = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let Some(value) = parse_cookie(cookie_header, COOKIE_NAME) else {
        return SessionState::Absent;
    };
    let Some(user_id) = verify_session(&value, &state.config.session_secret) else {
        return SessionState::Absent;
    };

    match with_deadline(state.request_timeout(), state.directory.get_user(user_id)).await {
        Ok(Some(user)) if user.status == AccountStatus::Approved => SessionState::Present(user),
        _ => SessionState::Absent,
    }
}

/// Gate a handler on a capability level beyond "logged in".
pub fn require(user: &User, required: RoleRequirement, view: &str) -> Result<(), Response> {
    match evaluate(&SessionState::Present(user.clone()), required) {
        GateDecision::Allow => Ok(()),
        GateDecision::Deny(reason) => {
            log_denial(reason, view);
            Err(forbidden())
        }
        GateDecision::Wait => Err(forbidden()),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "authentication required"})),
    )
        .into_response()
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({"error": "insufficient role"})),
    )
        .into_response()
}

// --- Handlers ---

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
    /// Set by the admin entry point; demands the whole authority tier.
    #[serde(default)]
    admin: bool,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let required = body.admin.then_some(RoleRequirement::AuthorityTier);

    match with_deadline(
        state.request_timeout(),
        state
            .directory
            .authenticate(&body.email, &body.password, required),
    )
    .await
    {
        Ok(user) => {
            info!(user = %user.id, role = %user.role, "login");
            (
                StatusCode::OK,
                [(
                    header::SET_COOKIE,
                    session_cookie(user.id, &state.config.session_secret),
                )],
                Json(serde_json::json!({ "user": user })),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({"ok": true})),
    )
        .into_response()
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<NewUser>,
) -> Response {
    match with_deadline(
        state.request_timeout(),
        state.directory.create_user(profile),
    )
    .await
    {
        Ok(user) => (StatusCode::CREATED, Json(serde_json::json!({ "user": user })))
            .into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn current_session(MaybeUser(user): MaybeUser) -> Response {
    Json(serde_json::json!({ "user": user })).into_response()
}

// --- Cookie plumbing ---

/// Signed session cookie value: `user_id|expiry|signature`.
fn create_session(user_id: Uuid, secret: &str) -> String {
    let expiry = chrono::Utc::now().timestamp() + SESSION_DURATION_SECS;
    let payload = format!("{user_id}|{expiry}");
    let sig = sign(&payload, secret);
    format!("{payload}|{sig}")
}

/// Build the Set-Cookie header value.
/// In release builds, adds `Secure` to prevent transmission over HTTP.
fn session_cookie(user_id: Uuid, secret: &str) -> String {
    let value = create_session(user_id, secret);
    let secure = if cfg!(debug_assertions) { "" } else { "; Secure" };
    format!(
        "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_DURATION_SECS}{secure}"
    )
}

fn clear_session_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verify a session cookie value. Returns the user id if the signature
/// matches and the session has not expired.
fn verify_session(value: &str, secret: &str) -> Option<Uuid> {
    let parts: Vec<&str> = value.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let expiry_str = parts[1];
    let sig = parts[2];

    let payload = format!("{user_id}|{expiry_str}");
    let expected_sig = sign(&payload, secret);
    if sig != expected_sig {
        return None;
    }

    let expiry: i64 = expiry_str.parse().ok()?;
    if chrono::Utc::now().timestamp() > expiry {
        return None;
    }

    user_id.parse().ok()
}

fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}
