pub mod submit;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use campuswatch_common::{
    AccountStatus, CampusError, IncidentStatus, Location, Role, SeverityPolicy,
};
use campuswatch_store::{location_rollup, with_deadline, RoleRequirement, UserFilter};

use crate::auth::{require, CurrentUser};
use crate::AppState;

/// Map the error taxonomy onto HTTP statuses. Every failure gets a single,
/// specific body; server-side kinds are also logged.
pub fn error_response(err: &CampusError) -> Response {
    let status = match err {
        CampusError::Validation(_) => StatusCode::BAD_REQUEST,
        CampusError::Auth(_) => StatusCode::FORBIDDEN,
        CampusError::NotFound(_) => StatusCode::NOT_FOUND,
        CampusError::Conflict(_) => StatusCode::CONFLICT,
        CampusError::Transient(_) => StatusCode::BAD_GATEWAY,
        CampusError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CampusError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    }
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

// --- Query structs ---

#[derive(Deserialize)]
pub struct IncidentsQuery {
    location: Option<Location>,
    status: Option<IncidentStatus>,
}

#[derive(Deserialize)]
pub struct RecentQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    policy: Option<String>,
}

#[derive(Deserialize)]
pub struct UsersQuery {
    role: Option<Role>,
    status: Option<AccountStatus>,
}

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    status: IncidentStatus,
}

#[derive(Deserialize)]
pub struct AccountStatusRequest {
    status: AccountStatus,
}

// --- Handlers ---

pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<IncidentsQuery>,
) -> Response {
    match with_deadline(state.request_timeout(), state.repo.list_incidents()).await {
        Ok(incidents) => {
            let filtered: Vec<_> = incidents
                .into_iter()
                .filter(|i| params.location.is_none_or(|l| i.location == l))
                .filter(|i| params.status.is_none_or(|s| i.status == s))
                .collect();
            Json(serde_json::json!({ "incidents": filtered })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub async fn recent_incidents(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<RecentQuery>,
) -> Response {
    let limit = params.limit.unwrap_or(20).min(100);
    match with_deadline(state.request_timeout(), state.repo.list_incidents()).await {
        Ok(mut incidents) => {
            incidents.truncate(limit);
            Json(serde_json::json!({ "incidents": incidents })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChangeRequest>,
) -> Response {
    match with_deadline(
        state.request_timeout(),
        state.repo.update_incident_status(id, body.status, &user),
    )
    .await
    {
        Ok(incident) => Json(serde_json::json!({ "incident": incident })).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn location_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<StatsQuery>,
) -> Response {
    let policy = match params.policy.as_deref() {
        Some(raw) => match SeverityPolicy::parse(raw) {
            Some(p) => p,
            None => {
                return error_response(&CampusError::Validation(
                    "policy must be relative or absolute".into(),
                ))
            }
        },
        None => state.config.severity_policy,
    };

    match with_deadline(state.request_timeout(), state.repo.list_incidents()).await {
        Ok(incidents) => {
            let stats = location_rollup(&incidents, policy);
            Json(serde_json::json!({ "stats": stats })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<UsersQuery>,
) -> Response {
    if let Err(denied) = require(&user, RoleRequirement::AuthorityTier, "user list") {
        return denied;
    }

    let filter = UserFilter {
        role: params.role,
        status: params.status,
    };
    match with_deadline(state.request_timeout(), state.directory.list_users(filter)).await {
        Ok(users) => Json(serde_json::json!({ "users": users })).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn set_user_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AccountStatusRequest>,
) -> Response {
    if let Err(denied) = require(&user, RoleRequirement::AuthorityTier, "user management") {
        return denied;
    }
    if !user.role.can_manage_users() {
        return error_response(&CampusError::Auth(format!(
            "role {} may not manage accounts",
            user.role
        )));
    }

    match with_deadline(
        state.request_timeout(),
        state.directory.set_user_status(id, body.status),
    )
    .await
    {
        Ok(updated) => Json(serde_json::json!({ "user": updated })).into_response(),
        Err(e) => error_response(&e),
    }
}
