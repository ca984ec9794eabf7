//! API REST pour la consultation et la gestion de la playlist.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::sse::playlist_events_sse;
use crate::{Playlist, Track};

/// Router playlist complet : REST + flux SSE.
pub fn playlist_router(playlist: Playlist) -> Router {
    Router::new()
        .route("/api/tracks", get(list_tracks))
        .route("/api/reorder", post(reorder_tracks))
        .route("/api/reload", post(reload_playlist))
        .route("/api/playlist/events", get(playlist_events_sse))
        .with_state(playlist)
}

/// Snapshot REST du catalogue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TracksResponse {
    pub tracks: Vec<Track>,
    pub current_index: usize,
}

/// Requête de réordonnancement : permutation des ids courants.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub ids: Vec<u64>,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[utoipa::path(
    get,
    path = "/api/tracks",
    tag = "playlist",
    responses(
        (status = 200, description = "Catalogue et index du morceau en cours", body = TracksResponse)
    )
)]
pub async fn list_tracks(State(playlist): State<Playlist>) -> Json<TracksResponse> {
    let (tracks, current_index) = playlist.snapshot().await;
    Json(TracksResponse {
        tracks,
        current_index,
    })
}

#[utoipa::path(
    post,
    path = "/api/reorder",
    tag = "playlist",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Nouvel ordre appliqué", body = TracksResponse),
        (status = 422, description = "Les ids ne forment pas une permutation", body = ErrorResponse)
    )
)]
pub async fn reorder_tracks(
    State(playlist): State<Playlist>,
    Json(request): Json<ReorderRequest>,
) -> Response {
    match playlist.reorder(&request.ids).await {
        Ok(()) => {
            let (tracks, current_index) = playlist.snapshot().await;
            (
                StatusCode::OK,
                Json(TracksResponse {
                    tracks,
                    current_index,
                }),
            )
                .into_response()
        }
        Err(err) => {
            warn!(%err, "Reorder rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/reload",
    tag = "playlist",
    responses(
        (status = 200, description = "Playlist rechargée depuis le disque", body = TracksResponse),
        (status = 500, description = "Erreur de scan du répertoire", body = ErrorResponse)
    )
)]
pub async fn reload_playlist(State(playlist): State<Playlist>) -> Response {
    match playlist.reload().await {
        Ok(()) => {
            let (tracks, current_index) = playlist.snapshot().await;
            (
                StatusCode::OK,
                Json(TracksResponse {
                    tracks,
                    current_index,
                }),
            )
                .into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}
