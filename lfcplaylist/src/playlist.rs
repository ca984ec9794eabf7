//! Playlist : catalogue cyclique rechargeable depuis un répertoire

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::PlaylistEvent;
use crate::track::Track;

/// Capacité du channel de chaque abonné SSE
const SUBSCRIBER_CHANNEL_SIZE: usize = 32;

struct PlaylistInner {
    music_dir: PathBuf,
    tracks: Vec<Track>,
    /// Index du prochain morceau à produire
    next_cursor: usize,
    /// Index du morceau affiché comme "en cours"
    playing_cursor: usize,
    subscribers: Vec<mpsc::Sender<PlaylistEvent>>,
}

impl PlaylistInner {
    /// Diffuse un évènement à tous les abonnés ; un abonné fermé ou
    /// saturé est retiré au passage.
    fn emit(&mut self, event: PlaylistEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Playlist subscriber too slow, dropping it");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn snapshot_event(&self) -> PlaylistEvent {
        PlaylistEvent::Snapshot {
            tracks: self.tracks.clone(),
            current_index: self.playing_cursor,
        }
    }
}

/// Catalogue cyclique thread-safe.
///
/// Les deux curseurs sont indépendants : `next_cursor` avance à chaque
/// [`next_track`](Playlist::next_track), `playing_cursor` n'est recalé que
/// par [`notify_track_change`](Playlist::notify_track_change) via une
/// recherche par `id`. C'est ce qui garde l'affichage correct quand un
/// réordonnancement survient pendant la diffusion d'un morceau.
#[derive(Clone)]
pub struct Playlist {
    inner: Arc<RwLock<PlaylistInner>>,
}

impl Playlist {
    /// Charge la playlist depuis un répertoire.
    ///
    /// Le répertoire est créé s'il n'existe pas (playlist vide). Les
    /// fichiers `.mp3` (insensible à la casse) sont triés par nom puis
    /// numérotés à partir de 1.
    pub fn load(music_dir: impl AsRef<Path>) -> Result<Self> {
        let music_dir = music_dir.as_ref().to_path_buf();
        let tracks = scan_tracks(&music_dir)?;
        info!(dir = %music_dir.display(), count = tracks.len(), "Playlist loaded");

        Ok(Self {
            inner: Arc::new(RwLock::new(PlaylistInner {
                music_dir,
                tracks,
                next_cursor: 0,
                playing_cursor: 0,
                subscribers: Vec::new(),
            })),
        })
    }

    /// Retourne le prochain morceau et avance le curseur de production
    /// (modulo la taille du catalogue). `None` si la playlist est vide.
    pub async fn next_track(&self) -> Option<Track> {
        let mut inner = self.inner.write().await;
        if inner.tracks.is_empty() {
            return None;
        }

        let track = inner.tracks[inner.next_cursor].clone();
        inner.next_cursor = (inner.next_cursor + 1) % inner.tracks.len();
        Some(track)
    }

    /// Recale le curseur d'affichage sur le morceau donné (recherche par
    /// `id`) et publie un évènement `trackChange`. No-op si l'id n'est
    /// plus dans le catalogue (reload concurrent).
    pub async fn notify_track_change(&self, track: &Track) {
        let mut inner = self.inner.write().await;

        let Some(pos) = inner.tracks.iter().position(|t| t.id == track.id) else {
            debug!(id = track.id, "Track change for an id no longer in the catalog");
            return;
        };

        inner.playing_cursor = pos;
        let event = PlaylistEvent::TrackChange {
            track: inner.tracks[pos].clone(),
            current_index: pos,
        };
        inner.emit(event);
    }

    /// Remplace atomiquement l'ordre du catalogue.
    ///
    /// `ids` doit être une permutation des ids courants, sinon l'appel est
    /// rejeté sans effet. Les deux curseurs sont recalculés pour pointer
    /// sur les mêmes morceaux qu'avant l'opération.
    pub async fn reorder(&self, ids: &[u64]) -> Result<()> {
        let mut inner = self.inner.write().await;

        if ids.len() != inner.tracks.len() {
            return Err(Error::NotAPermutation);
        }

        let mut reordered = Vec::with_capacity(ids.len());
        for id in ids {
            match inner.tracks.iter().find(|t| t.id == *id) {
                Some(track) => reordered.push(track.clone()),
                None => return Err(Error::NotAPermutation),
            }
        }
        // Un id dupliqué donnerait la bonne longueur mais en oublierait un autre
        for track in &inner.tracks {
            if !ids.contains(&track.id) {
                return Err(Error::NotAPermutation);
            }
        }

        let playing_id = inner.tracks.get(inner.playing_cursor).map(|t| t.id);
        let next_id = inner.tracks.get(inner.next_cursor).map(|t| t.id);

        inner.playing_cursor = locate(&reordered, playing_id);
        inner.next_cursor = locate(&reordered, next_id);
        inner.tracks = reordered;

        debug!(
            playing = inner.playing_cursor,
            next = inner.next_cursor,
            "Playlist reordered"
        );
        let event = inner.snapshot_event();
        inner.emit(event);
        Ok(())
    }

    /// Re-scanne le répertoire et remet les deux curseurs à 0.
    pub async fn reload(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.tracks = scan_tracks(&inner.music_dir)?;
        inner.next_cursor = 0;
        inner.playing_cursor = 0;
        info!(count = inner.tracks.len(), "Playlist reloaded");

        let event = inner.snapshot_event();
        inner.emit(event);
        Ok(())
    }

    /// Abonne un client au canal d'évènements ; le snapshot courant est
    /// poussé comme premier message.
    pub async fn subscribe(&self) -> mpsc::Receiver<PlaylistEvent> {
        let mut inner = self.inner.write().await;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_SIZE);

        // Le channel vient d'être créé : l'envoi ne peut pas échouer
        let _ = tx.try_send(inner.snapshot_event());
        inner.subscribers.push(tx);
        rx
    }

    /// Snapshot instantané : (tracks, index du morceau en cours)
    pub async fn snapshot(&self) -> (Vec<Track>, usize) {
        let inner = self.inner.read().await;
        (inner.tracks.clone(), inner.playing_cursor)
    }

    /// Nombre de morceaux du catalogue
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.tracks.len()
    }

    /// Vérifie si le catalogue est vide
    pub async fn is_empty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.tracks.is_empty()
    }
}

fn locate(tracks: &[Track], id: Option<u64>) -> usize {
    id.and_then(|id| tracks.iter().position(|t| t.id == id))
        .unwrap_or(0)
}

/// Scanne le répertoire et construit le catalogue (trié par nom de
/// fichier pour un ordre stable d'un scan à l'autre).
fn scan_tracks(music_dir: &Path) -> Result<Vec<Track>> {
    if !music_dir.exists() {
        warn!(dir = %music_dir.display(), "Music directory missing, creating it");
        fs::create_dir_all(music_dir)?;
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(music_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| Track::from_scan(i as u64 + 1, path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn music_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"fake").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_load_scans_mp3_files_sorted() {
        let dir = music_dir(&["b.mp3", "a.mp3", "c.MP3", "notes.txt"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let (tracks, _) = playlist.snapshot().await;
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].title, "a");
        assert_eq!(tracks[1].title, "b");
        assert_eq!(tracks[2].title, "c");
        assert_eq!(
            tracks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_load_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not_yet");
        let playlist = Playlist::load(&missing).unwrap();

        assert!(missing.is_dir());
        assert!(playlist.is_empty().await);
        assert!(playlist.next_track().await.is_none());
    }

    #[tokio::test]
    async fn test_next_track_wraps_around() {
        let dir = music_dir(&["a.mp3", "b.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let seq: Vec<String> = [
            playlist.next_track().await.unwrap(),
            playlist.next_track().await.unwrap(),
            playlist.next_track().await.unwrap(),
        ]
        .iter()
        .map(|t| t.title.clone())
        .collect();

        assert_eq!(seq, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_notify_track_change_moves_playing_cursor() {
        let dir = music_dir(&["a.mp3", "b.mp3", "c.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let (tracks, _) = playlist.snapshot().await;
        playlist.notify_track_change(&tracks[2]).await;

        let (_, playing) = playlist.snapshot().await;
        assert_eq!(playing, 2);
    }

    #[tokio::test]
    async fn test_notify_unknown_id_is_noop() {
        let dir = music_dir(&["a.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let ghost = Track::from_scan(99, PathBuf::from("ghost.mp3"));
        playlist.notify_track_change(&ghost).await;

        let (_, playing) = playlist.snapshot().await;
        assert_eq!(playing, 0);
    }

    #[tokio::test]
    async fn test_reorder_preserves_cursor_targets() {
        let dir = music_dir(&["a.mp3", "b.mp3", "c.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        // produit "a" : next_cursor pointe sur "b" (id 2)
        let playing = playlist.next_track().await.unwrap();
        playlist.notify_track_change(&playing).await;

        playlist.reorder(&[3, 1, 2]).await.unwrap();

        let (tracks, playing_idx) = playlist.snapshot().await;
        // Le morceau affiché reste "a" (id 1), maintenant en position 1
        assert_eq!(playing_idx, 1);
        assert_eq!(tracks[playing_idx].id, 1);

        // Le prochain produit reste "b" (id 2)
        assert_eq!(playlist.next_track().await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_reorder_identity_keeps_cursors() {
        let dir = music_dir(&["a.mp3", "b.mp3", "c.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let t = playlist.next_track().await.unwrap();
        playlist.notify_track_change(&t).await;

        playlist.reorder(&[1, 2, 3]).await.unwrap();

        let (_, playing) = playlist.snapshot().await;
        assert_eq!(playing, 0);
        assert_eq!(playlist.next_track().await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_reorder_rejects_non_permutations() {
        let dir = music_dir(&["a.mp3", "b.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        assert!(matches!(
            playlist.reorder(&[1]).await,
            Err(Error::NotAPermutation)
        ));
        assert!(matches!(
            playlist.reorder(&[1, 1]).await,
            Err(Error::NotAPermutation)
        ));
        assert!(matches!(
            playlist.reorder(&[1, 7]).await,
            Err(Error::NotAPermutation)
        ));

        // L'ordre n'a pas bougé
        let (tracks, _) = playlist.snapshot().await;
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[1].id, 2);
    }

    #[tokio::test]
    async fn test_reload_resets_cursors_and_is_idempotent() {
        let dir = music_dir(&["a.mp3", "b.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        playlist.next_track().await.unwrap();
        playlist.reload().await.unwrap();

        let first = playlist.snapshot().await;
        playlist.reload().await.unwrap();
        let second = playlist.snapshot().await;

        assert_eq!(first.1, 0);
        assert_eq!(second.1, 0);
        assert_eq!(
            first.0.iter().map(|t| (t.id, t.title.clone())).collect::<Vec<_>>(),
            second.0.iter().map(|t| (t.id, t.title.clone())).collect::<Vec<_>>()
        );

        // Après reload, la production repart du début
        assert_eq!(playlist.next_track().await.unwrap().title, "a");
    }

    #[tokio::test]
    async fn test_subscriber_gets_snapshot_then_track_change() {
        let dir = music_dir(&["a.mp3", "b.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let mut rx = playlist.subscribe().await;
        match rx.recv().await.unwrap() {
            PlaylistEvent::Snapshot { tracks, current_index } => {
                assert_eq!(tracks.len(), 2);
                assert_eq!(current_index, 0);
            }
            other => panic!("expected snapshot first, got {:?}", other),
        }

        let track = playlist.next_track().await.unwrap();
        playlist.notify_track_change(&track).await;

        match rx.recv().await.unwrap() {
            PlaylistEvent::TrackChange { track, current_index } => {
                assert_eq!(track.id, 1);
                assert_eq!(current_index, 0);
            }
            other => panic!("expected trackChange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reorder_notifies_subscribers_with_snapshot() {
        let dir = music_dir(&["a.mp3", "b.mp3"]);
        let playlist = Playlist::load(dir.path()).unwrap();

        let mut rx = playlist.subscribe().await;
        let _ = rx.recv().await.unwrap(); // snapshot initial

        playlist.reorder(&[2, 1]).await.unwrap();

        match rx.recv().await.unwrap() {
            PlaylistEvent::Snapshot { tracks, .. } => {
                assert_eq!(tracks[0].id, 2);
                assert_eq!(tracks[1].id, 1);
            }
            other => panic!("expected snapshot after reorder, got {:?}", other),
        }
    }
}
