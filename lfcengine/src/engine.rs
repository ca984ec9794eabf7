//! The producer loop: pulls tracks from the playlist, paces their frames
//! into the broadcaster, and publishes metadata on track boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use lfcmpeg::FrameReader;
use lfcplaylist::Playlist;

use crate::broadcast::{Broadcaster, NowPlaying};
use crate::clock::PaceClock;

/// Back-off before re-asking an empty playlist for a track.
const EMPTY_PLAYLIST_RETRY: Duration = Duration::from_secs(5);

/// Back-off after a per-track failure (open error, truncated frame, I/O).
const TRACK_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Point-in-time snapshot of the engine, for the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_running: bool,
    pub listener_count: usize,
    pub subscriber_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<NowPlaying>,
}

/// How the inner per-track loop ended.
enum TrackEnd {
    /// Clean end of file: move to the next track with no silence gap
    Eof,
    /// `stop()` was observed between frames
    Stopped,
    /// `skip()` was observed between frames
    Skipped,
}

struct EngineInner {
    playlist: Playlist,
    broadcaster: Broadcaster,
    stop_token: CancellationToken,
    skip_requested: AtomicBool,
    running: AtomicBool,
}

/// The broadcast engine handle.
///
/// `start()` spawns the single producer task; `stop()` makes it exit
/// promptly at the next frame boundary. Clones share the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(playlist: Playlist, broadcaster: Broadcaster) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                playlist,
                broadcaster,
                stop_token: CancellationToken::new(),
                skip_requested: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Spawns the producer loop on the runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run().await })
    }

    /// The producer loop. Runs until [`stop`](Engine::stop) is called.
    ///
    /// Per-track failures are logged, backed off for 1 s and skipped; an
    /// empty playlist is retried every 5 s. Listeners experience both as
    /// silence, never as an error.
    pub async fn run(&self) {
        self.inner.running.store(true, Ordering::SeqCst);
        info!("Broadcast engine started");

        loop {
            if self.inner.stop_token.is_cancelled() {
                break;
            }

            let Some(track) = self.inner.playlist.next_track().await else {
                debug!("Playlist is empty, retrying in {:?}", EMPTY_PLAYLIST_RETRY);
                if !self.sleep_unless_stopped(EMPTY_PLAYLIST_RETRY).await {
                    break;
                }
                continue;
            };

            if !track.path.is_file() {
                warn!(path = %track.path.display(), "Track file missing, skipping");
                continue;
            }

            let now_playing = NowPlaying {
                track: track.clone(),
                started_at: Utc::now(),
            };
            self.inner.broadcaster.publish_now_playing(now_playing);
            self.inner.playlist.notify_track_change(&track).await;
            info!(title = %track.title, id = track.id, "On air");

            let mut reader = match FrameReader::open(&track.path).await {
                Ok(reader) => reader,
                Err(err) => {
                    warn!(path = %track.path.display(), %err, "Cannot open track, backing off");
                    if !self.sleep_unless_stopped(TRACK_ERROR_BACKOFF).await {
                        break;
                    }
                    continue;
                }
            };

            self.inner.skip_requested.store(false, Ordering::SeqCst);
            let mut clock = PaceClock::new();

            match self.stream_track(&mut reader, &mut clock).await {
                Ok(TrackEnd::Eof) => {
                    debug!(title = %track.title, "Track finished");
                }
                Ok(TrackEnd::Skipped) => {
                    info!(title = %track.title, "Track skipped");
                }
                Ok(TrackEnd::Stopped) => break,
                Err(err) => {
                    warn!(title = %track.title, %err, "Track aborted, backing off");
                    if !self.sleep_unless_stopped(TRACK_ERROR_BACKOFF).await {
                        break;
                    }
                }
            }
        }

        self.inner.running.store(false, Ordering::SeqCst);
        info!("Broadcast engine stopped");
    }

    /// Broadcasts one track frame by frame at its natural rate.
    async fn stream_track(
        &self,
        reader: &mut FrameReader,
        clock: &mut PaceClock,
    ) -> lfcmpeg::Result<TrackEnd> {
        loop {
            if self.inner.stop_token.is_cancelled() {
                return Ok(TrackEnd::Stopped);
            }
            if self.inner.skip_requested.swap(false, Ordering::SeqCst) {
                return Ok(TrackEnd::Skipped);
            }

            let Some(frame) = reader.next_frame().await? else {
                return Ok(TrackEnd::Eof);
            };

            self.inner.broadcaster.broadcast_audio(frame.payload);
            clock.add_time(frame.duration_ms);
            clock.wait().await;
        }
    }

    /// Cancellable back-off; returns `false` when `stop()` fired first.
    async fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.inner.stop_token.cancelled() => false,
        }
    }

    /// Requests a prompt, clean shutdown of the producer loop. Attached
    /// connections are left to their own transports.
    pub fn stop(&self) {
        self.inner.stop_token.cancel();
    }

    /// Ends the current track early; the loop proceeds to the next one.
    pub fn skip(&self) {
        self.inner.skip_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The fan-out this engine broadcasts into.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    /// The playlist this engine pulls from.
    pub fn playlist(&self) -> &Playlist {
        &self.inner.playlist
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            is_running: self.is_running(),
            listener_count: self.inner.broadcaster.listener_count(),
            subscriber_count: self.inner.broadcaster.subscriber_count(),
            now_playing: self.inner.broadcaster.now_playing(),
        }
    }
}
