//! SSE pour suivre la playlist (snapshot + changements de morceau).
//!
//! Route type : `GET /api/playlist/events`

use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};

use crate::Playlist;

/// Intervalle des commentaires keep-alive (`: heartbeat`)
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handler SSE : snapshot initial puis évènements playlist au fil de l'eau.
#[utoipa::path(
    get,
    path = "/api/playlist/events",
    tag = "playlist",
    responses(
        (status = 200, description = "Flux SSE des évènements playlist (playlist, trackChange)", content_type = "text/event-stream")
    )
)]
pub async fn playlist_events_sse(State(playlist): State<Playlist>) -> impl IntoResponse {
    let mut rx = playlist.subscribe().await;

    let stream = stream! {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
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
