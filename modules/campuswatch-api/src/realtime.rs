use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::CurrentUser;
use crate::AppState;

/// Insert fan-out as server-sent events.
///
/// Delivery is at-least-once and consumers reconcile by id. A lagged
/// receiver gets a `refresh` event telling it to refetch the full set;
/// the subscription failure itself never surfaces as an error.
pub async fn incident_stream(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.repo.subscribe_inserts();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(incident) => {
                    if let Ok(payload) = serde_json::to_string(&incident) {
                        yield Ok(Event::default().event("incident").data(payload));
                    }
                }
                Err(RecvError::Lagged(_)) => {
                    yield Ok(Event::default().event("refresh").data("{}"));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
