use axum::{routing::get, Json, Router};
use lfcengine::{api::engine_router, Broadcaster, Engine};
use lfcplaylist::{api::playlist_router, Playlist, RadioConfigExt};
use lfcserver::{init_logging, Server};
use tracing::info;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialiser le logging d'abord
    init_logging();

    // Charger la configuration et le catalogue
    let config = lfcconfig::get_config();
    let music_dir = config.get_music_dir();

    let playlist = Playlist::load(&music_dir)?;
    let broadcaster = Broadcaster::new();
    let engine = Engine::new(playlist.clone(), broadcaster);

    // Assembler le serveur HTTP
    let mut server = Server::new_configured();

    let server_info = server.info();
    server.merge_router(Router::new().route(
        "/info",
        get(move || {
            let info = server_info.clone();
            async move { Json(serde_json::json!(info)) }
        }),
    ));

    server.merge_router(engine_router(engine.clone()));
    server.merge_router(playlist_router(playlist));

    server.add_openapi("/swagger/engine", lfcengine::openapi::ApiDoc::openapi());
    server.add_openapi("/swagger/playlist", lfcplaylist::openapi::ApiDoc::openapi());

    // Démarrer le moteur de diffusion
    info!("🎵 Starting broadcast engine...");
    let engine_handle = engine.start();

    // L'arrêt du serveur (Ctrl+C) arrête aussi le moteur
    let shutdown = server.shutdown_token();
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            engine.stop();
        });
    }

    server.start().await?;
    server.wait().await;

    engine.stop();
    let _ = engine_handle.await;
    info!("✅ LofiCast stopped");
    Ok(())
}
