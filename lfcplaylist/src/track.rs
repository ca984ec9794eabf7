//! Track : un morceau du catalogue radio

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Artiste par défaut quand le fichier n'en déclare pas
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Album par défaut du catalogue
pub const DEFAULT_ALBUM: &str = "Lofi Collection";

/// Un morceau du catalogue.
///
/// Les tracks sont immuables une fois chargés : le jeu n'est modifié que
/// par un rechargement ou un réordonnancement de la playlist. L'`id` est
/// positionnel (1-based, ordre du scan) et stable pour la durée de vie du
/// processus.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Identifiant stable (1-based, ordre du scan)
    pub id: u64,

    /// Chemin du fichier audio
    #[schema(value_type = String)]
    pub path: PathBuf,

    /// Titre (nom de fichier sans extension)
    pub title: String,

    /// Artiste
    pub artist: String,

    /// Album (optionnel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// URL de la pochette (optionnel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,

    /// Durée en millisecondes (optionnel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Construit un track à partir d'un fichier du répertoire scanné
    pub fn from_scan(id: u64, path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("Track {}", id));

        Self {
            id,
            path,
            title,
            artist: DEFAULT_ARTIST.to_string(),
            album: Some(DEFAULT_ALBUM.to_string()),
            album_art_url: None,
            duration_ms: None,
        }
    }
}
