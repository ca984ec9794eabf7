//! Évènements publiés sur le canal SSE de la playlist

use serde::Serialize;
use utoipa::ToSchema;

use crate::track::Track;

/// Évènement diffusé aux abonnés du canal playlist.
///
/// Sérialisation JSON taguée :
/// - `{"type":"playlist","tracks":[…],"currentIndex":N}` — snapshot
///   complet, envoyé à l'attachement et après reorder/reload
/// - `{"type":"trackChange","track":…,"currentIndex":N}` — à chaque
///   changement de morceau
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PlaylistEvent {
    #[serde(rename = "playlist", rename_all = "camelCase")]
    Snapshot {
        tracks: Vec<Track>,
        current_index: usize,
    },

    #[serde(rename = "trackChange", rename_all = "camelCase")]
    TrackChange { track: Track, current_index: usize },
}
