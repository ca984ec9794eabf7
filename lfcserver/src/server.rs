//! # Module Server - API de haut niveau pour Axum
//!
//! Assemble les routers des différentes crates, monte la documentation
//! Swagger, puis démarre le serveur avec un arrêt gracieux sur Ctrl+C.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use lfcconfig::get_config;
use serde::Serialize;
use tokio::{signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::openapi::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Info serveur sérialisable
#[derive(Clone, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Router,
    join_handle: Option<JoinHandle<()>>,
    shutdown_token: CancellationToken,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - URL de base (ex: "http://localhost:3000")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Router::new(),
            join_handle: None,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Crée un serveur à partir de la configuration globale
    pub fn new_configured() -> Self {
        let config = get_config();
        let url = config.get_base_url();
        let port = config.get_http_port();
        Self::new("LofiCast", url, port)
    }

    /// Retourne une copie du token d'arrêt gracieux
    ///
    /// Ce token peut être donné aux composants qui ont besoin de savoir
    /// quand le serveur s'arrête (moteur de diffusion, tâches longues).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Infos du serveur (nom, URL de base, port)
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// Fusionne un router applicatif dans le router principal
    pub fn merge_router(&mut self, router: Router) {
        self.router = std::mem::take(&mut self.router).merge(router);
    }

    /// Monte une documentation Swagger UI
    ///
    /// # Arguments
    ///
    /// * `path` - Chemin de l'UI (ex: "/swagger/engine")
    /// * `openapi` - Document OpenAPI généré par utoipa
    pub fn add_openapi(&mut self, path: &str, openapi: OpenApi) {
        let json_path = format!("/api-docs{}.json", path.replace('/', "-"));
        let swagger = SwaggerUi::new(path.to_string()).url(json_path, openapi);
        self.router = std::mem::take(&mut self.router).merge(swagger);
        info!(path, "Swagger UI mounted");
    }

    /// Démarre le serveur HTTP en arrière-plan.
    ///
    /// Le serveur s'arrête proprement quand le token d'arrêt est annulé
    /// (Ctrl+C compris). Utiliser [`wait`](Server::wait) pour bloquer
    /// jusqu'à l'arrêt.
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Cannot bind {}", addr))?;

        info!(name = %self.name, %addr, base_url = %self.base_url, "HTTP server listening");

        // Ctrl+C déclenche le même arrêt gracieux que stop()
        let ctrl_c_token = self.shutdown_token.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
                ctrl_c_token.cancel();
            }
        });

        let router = self.router.clone();
        let shutdown = self.shutdown_token.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = serve.await {
                error!(%err, "HTTP server error");
            }
        });

        self.join_handle = Some(handle);
        Ok(())
    }

    /// Attend la fin du serveur (après annulation du token d'arrêt)
    pub async fn wait(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
        info!(name = %self.name, "HTTP server stopped");
    }

    /// Annule le token d'arrêt : le serveur et les composants abonnés
    /// s'arrêtent proprement.
    pub fn stop(&self) {
        self.shutdown_token.cancel();
    }
}
