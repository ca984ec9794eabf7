//! Documentation OpenAPI pour les endpoints playlist.

use utoipa::OpenApi;

/// Documentation OpenAPI de l'API playlist (REST + SSE).
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_tracks,
        crate::api::reorder_tracks,
        crate::api::reload_playlist,
        crate::sse::playlist_events_sse,
    ),
    components(
        schemas(
            crate::Track,
            crate::PlaylistEvent,
            crate::api::TracksResponse,
            crate::api::ReorderRequest,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "playlist", description = "Catalogue de la radio : consultation, réordonnancement, rechargement, évènements SSE")
    ),
    info(
        title = "LofiCast Playlist API",
        version = "0.1.0",
        description = r#"
# API playlist

- `GET /api/tracks` : snapshot du catalogue et index du morceau en cours
- `POST /api/reorder` : permutation des ids (rejet 422 sinon)
- `POST /api/reload` : re-scan du répertoire musical
- `GET /api/playlist/events` : flux SSE (`playlist` / `trackChange`)
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
