//! Server-sent events for a running query.
//!
//! Events, in order: `stage_started` / `stage_completed` per stage,
//! `token` for each text delta of the final stage, then exactly one of
//! `completed` (the stored query) or `error`.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use cognita_reasoning::FlowEvent;

use crate::error::ApiError;
use crate::routes::queries::{AskRequest, begin_query, finish_query};
use crate::state::AppState;

const EVENT_BUFFER: usize = 64;

/// Ask a question and stream the flow's progress.
///
/// Validation errors are returned as plain HTTP errors before the stream
/// opens. The flow runs in its own task, so a client that disconnects
/// mid-stream still gets its answer stored.
pub async fn stream_query(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (patient, query) = begin_query(&state, patient_id, &req.question).await?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = finish_query(&state, patient, query, Some(&tx)).await;
        // Close the progress stream before the final event.
        drop(tx);
        let _ = done_tx.send(result);
    });

    let progress = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .filter_map(|event| future::ready(progress_event(event)));

    let finished = stream::once(async move {
        match done_rx.await {
            Ok(Ok(query)) => json_event("completed", &query),
            Ok(Err(e)) => error_event(e),
            Err(_) => error_event(ApiError::Internal(
                "query task ended without a result".to_string(),
            )),
        }
    });

    let events = progress.chain(finished).map(Ok);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn progress_event(event: FlowEvent) -> Option<Event> {
    match event {
        FlowEvent::StageStarted(stage) => {
            Some(json_event("stage_started", &json!({ "stage": stage })))
        }
        FlowEvent::StageCompleted {
            stage,
            used_fallback,
        } => Some(json_event(
            "stage_completed",
            &json!({ "stage": stage, "used_fallback": used_fallback }),
        )),
        FlowEvent::Token(text) => Some(json_event("token", &json!({ "text": text }))),
        // Superseded by `completed`, which carries the stored query.
        FlowEvent::Completed(_) => None,
    }
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => error_event(ApiError::Internal(format!("failed to encode {name} event: {e}"))),
    }
}

fn error_event(error: ApiError) -> Event {
    if let ApiError::Internal(msg) = &error {
        tracing::error!("internal error during query stream: {msg}");
    }
    let (status, message) = error.status_and_message();
    let payload = json!({ "status": status.as_u16(), "error": message });
    Event::default().event("error").data(payload.to_string())
}
