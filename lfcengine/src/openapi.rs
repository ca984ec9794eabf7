//! OpenAPI documentation for the engine endpoints.

use utoipa::OpenApi;

/// OpenAPI document for the broadcast engine API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::stream_audio,
        crate::api::now_playing_sse,
        crate::api::engine_status,
        crate::api::skip_track,
    ),
    components(
        schemas(
            crate::NowPlaying,
            crate::EngineStatus,
            crate::api::SkipResponse,
        )
    ),
    tags(
        (name = "engine", description = "Live audio stream, now-playing metadata and engine control")
    ),
    info(
        title = "LofiCast Engine API",
        version = "0.1.0",
        description = r#"
# Broadcast engine API

- `GET /stream`: the live `audio/mpeg` channel (raw MPEG frames)
- `GET /api/now-playing/events`: SSE channel carrying NowPlaying snapshots
- `GET /api/status`: engine status (running flag, counts, now playing)
- `POST /api/skip`: end the current track early
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
