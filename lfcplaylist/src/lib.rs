//! # lfcplaylist - Catalogue cyclique de morceaux pour LofiCast
//!
//! Cette crate fournit la playlist de la radio :
//! - Scan d'un répertoire de fichiers `.mp3` (créé s'il n'existe pas)
//! - Curseur de production (`next_track`) et curseur d'affichage
//!   (`playing_cursor`), tous deux cycliques
//! - Réordonnancement atomique par permutation d'ids, rechargement disque
//! - Canal d'évènements SSE propre à la playlist (snapshot + trackChange),
//!   distinct du canal now-playing du moteur de diffusion
//!
//! # Exemple
//!
//! ```no_run
//! use lfcplaylist::Playlist;
//!
//! # #[tokio::main]
//! # async fn main() -> lfcplaylist::Result<()> {
//! let playlist = Playlist::load("./music")?;
//!
//! if let Some(track) = playlist.next_track().await {
//!     println!("À l'antenne : {}", track.title);
//!     playlist.notify_track_change(&track).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config_ext;
mod error;
mod events;
pub mod openapi;
mod playlist;
pub mod sse;
mod track;

pub use config_ext::RadioConfigExt;
pub use error::{Error, Result};
pub use events::PlaylistEvent;
pub use playlist::Playlist;
pub use track::Track;
