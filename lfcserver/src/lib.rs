//! # lfcserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour assembler et démarrer
//! le serveur HTTP de LofiCast :
//!
//! - Fusion de routers fournis par les autres crates (`merge_router`)
//! - Documentation OpenAPI/Swagger automatique (`add_openapi`)
//! - Arrêt gracieux sur Ctrl+C ou via un [`CancellationToken`] partagé
//! - Initialisation du logging `tracing`
//!
//! ## Exemple d'utilisation
//!
//! ```rust,ignore
//! use lfcserver::{init_logging, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_logging();
//!
//!     let mut server = Server::new_configured();
//!     server.merge_router(my_router);
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::init_logging;
pub use server::{Server, ServerInfo};
