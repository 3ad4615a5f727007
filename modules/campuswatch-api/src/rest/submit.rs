use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::info;

use campuswatch_common::ReportDraft;
use campuswatch_store::with_deadline;

use crate::auth::MaybeUser;
use crate::rest::error_response;
use crate::AppState;

pub const RATE_LIMIT_PER_HOUR: usize = 10;

/// Check rate limit for an IP. Returns true if the request is allowed.
/// Prunes expired entries and records the new request if allowed.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, max_per_hour: usize) -> bool {
    let cutoff = now - Duration::from_secs(3600);
    entries.retain(|t| *t > cutoff);
    if entries.len() >= max_per_hour {
        return false;
    }
    entries.push(now);
    true
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(flatten)]
    draft: ReportDraft,
    /// Guest label for anonymous submissions; ignored when a session exists.
    #[serde(default)]
    reported_by: Option<String>,
}

/// Accepts reports from authenticated users and guests alike. The control
/// flow is validate, rate-limit, then create; validation failures never
/// reach the repository.
pub async fn submit_incident(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    MaybeUser(user): MaybeUser,
    Json(body): Json<SubmitRequest>,
) -> Response {
    if let Err(e) = body.draft.validate() {
        return error_response(&e);
    }

    let ip = addr.ip();
    {
        let mut limiter = state.rate_limiter.lock().await;
        // Prune occasionally to keep the map from growing unbounded.
        if limiter.len() > 1000 {
            prune_empty_entries(&mut limiter);
        }
        let entries = limiter.entry(ip).or_default();
        if !check_rate_limit(entries, Instant::now(), RATE_LIMIT_PER_HOUR) {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": format!("rate limit exceeded: max {RATE_LIMIT_PER_HOUR} reports per hour")
                })),
            )
                .into_response();
        }
    }

    let reported_by = user
        .map(|u| u.name)
        .or(body.reported_by)
        .unwrap_or_else(|| "Anonymous".to_string());

    match with_deadline(
        state.request_timeout(),
        state.repo.create_incident(body.draft, reported_by),
    )
    .await
    {
        Ok(incident) => {
            info!(incident = %incident.id, location = %incident.location, "report accepted");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "incident": incident })),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

fn prune_empty_entries(limiter: &mut HashMap<IpAddr, Vec<Instant>>) {
    let cutoff = Instant::now() - Duration::from_secs(3600);
    limiter.retain(|_, entries| {
        entries.retain(|t| *t > cutoff);
        !entries.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_under_the_limit_are_allowed() {
        let base = Instant::now();
        let mut entries = Vec::new();
        for i in 0..RATE_LIMIT_PER_HOUR {
            assert!(check_rate_limit(
                &mut entries,
                base + Duration::from_secs(i as u64),
                RATE_LIMIT_PER_HOUR
            ));
        }
    }

    #[test]
    fn request_over_the_limit_is_blocked() {
        let base = Instant::now();
        let mut entries = Vec::new();
        for i in 0..RATE_LIMIT_PER_HOUR {
            check_rate_limit(
                &mut entries,
                base + Duration::from_secs(i as u64),
                RATE_LIMIT_PER_HOUR,
            );
        }
        assert!(!check_rate_limit(
            &mut entries,
            base + Duration::from_secs(60),
            RATE_LIMIT_PER_HOUR
        ));
    }

    #[test]
    fn the_window_slides_after_an_hour() {
        let base = Instant::now();
        let mut entries = Vec::new();
        for _ in 0..RATE_LIMIT_PER_HOUR {
            check_rate_limit(&mut entries, base, RATE_LIMIT_PER_HOUR);
        }
        // An hour and a minute later the old entries have aged out.
        assert!(check_rate_limit(
            &mut entries,
            base + Duration::from_secs(3660),
            RATE_LIMIT_PER_HOUR
        ));
    }
}
