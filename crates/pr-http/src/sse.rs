//! Bridges a [`pr_progress::Subscription`] to an axum SSE response: the
//! bus's `connected` frame goes out first, then every subsequent frame
//! published to the topic, until the subscriber is dropped or the bus
//! closes the channel.

use axum::extract::{Path, State};
use axum::response::Sse;
use axum::response::sse::Event;
use pr_progress::{connected_frame, review_topic};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::state::AppState;

const BRIDGE_CHANNEL_CAPACITY: usize = 64;

pub async fn subscribe(state: &AppState, topic: &str) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    let mut subscription = state.bus.subscribe(topic).await;
    let (tx, rx) = mpsc::channel(BRIDGE_CHANNEL_CAPACITY);

    if tx.send(Ok(Event::default().data(connected_frame().to_string()))).await.is_err() {
        return Sse::new(ReceiverStream::new(rx));
    }

    tokio::spawn(async move {
        while let Some(frame) = subscription.next().await {
            if tx.send(Ok(Event::default().data(frame.to_string()))).await.is_err() {
                break;
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
}

/// `GET /api/local/{reviewId}/ai-suggestions/status` — subscribes to the
/// review-keyed topic, so both orchestrator runs and external ingestion
/// show up on the same stream.
pub async fn ai_suggestions_status(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    subscribe(&state, &review_topic(review_id)).await
}

