//! HTTP adapter for the broadcast core.
//!
//! Converts incoming connections into broadcaster registrations and
//! exposes the status/skip control operations. The audio channel is a raw
//! `audio/mpeg` byte stream; metadata flows over SSE.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use crate::broadcast::Broadcaster;
use crate::engine::{Engine, EngineStatus};

/// Interval of the `: heartbeat` comments on the SSE channel.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Router exposing the broadcast core to HTTP clients.
pub fn engine_router(engine: Engine) -> Router {
    Router::new()
        .route("/stream", get(stream_audio))
        .route("/api/now-playing/events", get(now_playing_sse))
        .route("/api/status", get(engine_status))
        .route("/api/skip", post(skip_track))
        .with_state(engine)
}

/// Body stream of one audio listener; detaches itself when the
/// connection goes away.
struct ListenerStream {
    rx: mpsc::Receiver<Bytes>,
    broadcaster: Broadcaster,
    id: u64,
}

impl Stream for ListenerStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for ListenerStream {
    fn drop(&mut self) {
        self.broadcaster.detach_listener(self.id);
    }
}

/// Detaches a metadata subscriber when its SSE stream is dropped.
struct SubscriberGuard {
    broadcaster: Broadcaster,
    id: u64,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.broadcaster.detach_subscriber(self.id);
    }
}

/// The live audio channel: a raw concatenation of MPEG frames, no
/// container. New listeners join mid-stream, there is no replay.
#[utoipa::path(
    get,
    path = "/stream",
    tag = "engine",
    responses(
        (status = 200, description = "Live MPEG audio stream", content_type = "audio/mpeg")
    )
)]
pub async fn stream_audio(State(engine): State<Engine>) -> Response {
    let broadcaster = engine.broadcaster().clone();
    let (id, rx) = broadcaster.attach_listener();

    let stream = ListenerStream {
        rx,
        broadcaster,
        id,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .expect("static headers are valid")
}

/// Now-playing metadata channel: one `data: <json>` event per track
/// change (and the current snapshot on attach), `: heartbeat` every 30 s.
#[utoipa::path(
    get,
    path = "/api/now-playing/events",
    tag = "engine",
    responses(
        (status = 200, description = "SSE stream of NowPlaying snapshots", content_type = "text/event-stream")
    )
)]
pub async fn now_playing_sse(State(engine): State<Engine>) -> impl IntoResponse {
    let broadcaster = engine.broadcaster().clone();
    let (id, mut rx) = broadcaster.attach_subscriber();
    let guard = SubscriberGuard { broadcaster, id };

    let stream = stream! {
        let _guard = guard;
        while let Some(now_playing) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&now_playing) {
                yield Ok::<_, axum::Error>(Event::default().data(json));
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "engine",
    responses(
        (status = 200, description = "Engine status snapshot", body = EngineStatus)
    )
)]
pub async fn engine_status(State(engine): State<Engine>) -> Json<EngineStatus> {
    Json(engine.status())
}

/// Response of the skip operation.
#[derive(Debug, Serialize, ToSchema)]
pub struct SkipResponse {
    pub skipped: bool,
}

/// Ends the current track early; the engine moves on to the next one.
#[utoipa::path(
    post,
    path = "/api/skip",
    tag = "engine",
    responses(
        (status = 200, description = "Skip requested", body = SkipResponse)
    )
)]
pub async fn skip_track(State(engine): State<Engine>) -> Json<SkipResponse> {
    engine.skip();
    Json(SkipResponse { skipped: true })
}
