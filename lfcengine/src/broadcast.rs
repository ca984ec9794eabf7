//! Fan-out registries for audio listeners and now-playing subscribers.
//!
//! Each consumer is a bounded `mpsc` sender; every write is a `try_send`.
//! The producer therefore never blocks on a slow client: a full queue or a
//! closed receiver drops that one consumer and the fan-out continues with
//! the next. Registry locks are plain `std::sync::Mutex` and are never
//! held across an await point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use lfcplaylist::Track;

/// Per-listener queue bound, in frames (~3 s at 26 ms per frame).
/// A consumer that falls further behind than this is dropped.
const LISTENER_QUEUE_FRAMES: usize = 128;

/// Per-subscriber queue bound, in metadata messages.
const SUBSCRIBER_QUEUE_MESSAGES: usize = 16;

/// Retained snapshot of the track currently on air.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub track: Track,
    /// Wall-clock moment the first frame of this track was broadcast
    pub started_at: DateTime<Utc>,
}

struct BroadcasterInner {
    listeners: Mutex<HashMap<u64, mpsc::Sender<Bytes>>>,
    subscribers: Mutex<HashMap<u64, mpsc::Sender<NowPlaying>>>,
    now_playing: RwLock<Option<NowPlaying>>,
    next_id: AtomicU64,
    listener_count: AtomicUsize,
    subscriber_count: AtomicUsize,
}

/// Shared, cloneable fan-out handle.
///
/// The broadcaster is passive: the engine pushes frames and metadata into
/// it, the HTTP layer pushes registrations. It never reaches back into
/// either side.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                listeners: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(HashMap::new()),
                now_playing: RwLock::new(None),
                next_id: AtomicU64::new(1),
                listener_count: AtomicUsize::new(0),
                subscriber_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Registers a new audio listener. There is no replay: the receiver
    /// only sees frames broadcast after this call.
    pub fn attach_listener(&self) -> (u64, mpsc::Receiver<Bytes>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(LISTENER_QUEUE_FRAMES);

        let mut listeners = self.inner.listeners.lock().expect("listener registry mutex poisoned");
        listeners.insert(id, tx);
        self.inner
            .listener_count
            .store(listeners.len(), Ordering::SeqCst);
        drop(listeners);

        info!(listener = id, "Audio listener attached");
        (id, rx)
    }

    /// Registers a new metadata subscriber. The current now-playing
    /// snapshot, if any, is queued as its first message.
    pub fn attach_subscriber(&self) -> (u64, mpsc::Receiver<NowPlaying>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_MESSAGES);

        if let Some(current) = self.inner.now_playing.read().expect("now-playing lock poisoned").clone() {
            // Freshly created channel: cannot be full or closed
            let _ = tx.try_send(current);
        }

        let mut subscribers = self.inner.subscribers.lock().expect("subscriber registry mutex poisoned");
        subscribers.insert(id, tx);
        self.inner
            .subscriber_count
            .store(subscribers.len(), Ordering::SeqCst);
        drop(subscribers);

        info!(subscriber = id, "Metadata subscriber attached");
        (id, rx)
    }

    /// Removes an audio listener; idempotent.
    pub fn detach_listener(&self, id: u64) {
        let mut listeners = self.inner.listeners.lock().expect("listener registry mutex poisoned");
        if listeners.remove(&id).is_some() {
            info!(listener = id, "Audio listener detached");
        }
        self.inner
            .listener_count
            .store(listeners.len(), Ordering::SeqCst);
    }

    /// Removes a metadata subscriber; idempotent.
    pub fn detach_subscriber(&self, id: u64) {
        let mut subscribers = self.inner.subscribers.lock().expect("subscriber registry mutex poisoned");
        if subscribers.remove(&id).is_some() {
            info!(subscriber = id, "Metadata subscriber detached");
        }
        self.inner
            .subscriber_count
            .store(subscribers.len(), Ordering::SeqCst);
    }

    /// Writes one frame to every listener. Never blocks, never fails: a
    /// listener whose queue is full or whose connection is gone is removed
    /// and the iteration continues.
    pub fn broadcast_audio(&self, frame: Bytes) {
        let mut listeners = self.inner.listeners.lock().expect("listener registry mutex poisoned");
        listeners.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(listener = *id, "Listener queue full, dropping it");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(listener = *id, "Listener gone, dropping it");
                false
            }
        });
        self.inner
            .listener_count
            .store(listeners.len(), Ordering::SeqCst);
    }

    /// Replaces the retained snapshot and pushes it to every subscriber,
    /// with the same per-consumer isolation rule as audio.
    pub fn publish_now_playing(&self, now_playing: NowPlaying) {
        *self.inner.now_playing.write().expect("now-playing lock poisoned") = Some(now_playing.clone());

        let mut subscribers = self.inner.subscribers.lock().expect("subscriber registry mutex poisoned");
        subscribers.retain(|id, tx| match tx.try_send(now_playing.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(subscriber = *id, "Subscriber queue full, dropping it");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(subscriber = *id, "Subscriber gone, dropping it");
                false
            }
        });
        self.inner
            .subscriber_count
            .store(subscribers.len(), Ordering::SeqCst);
    }

    /// Current retained snapshot, if a track has started.
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.inner.now_playing.read().expect("now-playing lock poisoned").clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listener_count.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn now_playing(id: u64) -> NowPlaying {
        NowPlaying {
            track: Track::from_scan(id, PathBuf::from(format!("{id}.mp3"))),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_listener_receives_frames_in_order() {
        let broadcaster = Broadcaster::new();
        let (_, mut rx) = broadcaster.attach_listener();

        for i in 0..5u8 {
            broadcaster.broadcast_audio(Bytes::from(vec![i; 4]));
        }

        for i in 0..5u8 {
            assert_eq!(rx.recv().await.unwrap(), Bytes::from(vec![i; 4]));
        }
    }

    #[tokio::test]
    async fn test_no_replay_for_late_listeners() {
        let broadcaster = Broadcaster::new();
        broadcaster.broadcast_audio(Bytes::from_static(b"early"));

        let (_, mut rx) = broadcaster.attach_listener();
        broadcaster.broadcast_audio(Bytes::from_static(b"late"));

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"late"));
    }

    #[tokio::test]
    async fn test_closed_listener_is_dropped_on_next_broadcast() {
        let broadcaster = Broadcaster::new();
        let (_, rx) = broadcaster.attach_listener();
        let (_, mut rx_ok) = broadcaster.attach_listener();
        assert_eq!(broadcaster.listener_count(), 2);

        drop(rx);
        broadcaster.broadcast_audio(Bytes::from_static(b"x"));

        assert_eq!(broadcaster.listener_count(), 1);
        assert_eq!(rx_ok.recv().await.unwrap(), Bytes::from_static(b"x"));
    }

    #[tokio::test]
    async fn test_slow_listener_is_dropped_when_queue_overflows() {
        let broadcaster = Broadcaster::new();
        let (_, _rx) = broadcaster.attach_listener();

        // Never drained: the queue fills up, then the listener is dropped
        for _ in 0..=LISTENER_QUEUE_FRAMES {
            broadcaster.broadcast_audio(Bytes::from_static(b"x"));
        }
        assert_eq!(broadcaster.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let (id, _rx) = broadcaster.attach_listener();

        broadcaster.detach_listener(id);
        broadcaster.detach_listener(id);
        assert_eq!(broadcaster.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_gets_current_snapshot_first() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish_now_playing(now_playing(7));

        let (_, mut rx) = broadcaster.attach_subscriber();
        assert_eq!(rx.recv().await.unwrap().track.id, 7);
    }

    #[tokio::test]
    async fn test_subscriber_before_first_track_gets_nothing_until_publish() {
        let broadcaster = Broadcaster::new();
        let (_, mut rx) = broadcaster.attach_subscriber();

        assert!(rx.try_recv().is_err());

        broadcaster.publish_now_playing(now_playing(1));
        assert_eq!(rx.recv().await.unwrap().track.id, 1);
    }

    #[tokio::test]
    async fn test_publish_updates_retained_snapshot() {
        let broadcaster = Broadcaster::new();
        assert!(broadcaster.now_playing().is_none());

        broadcaster.publish_now_playing(now_playing(1));
        broadcaster.publish_now_playing(now_playing(2));
        assert_eq!(broadcaster.now_playing().unwrap().track.id, 2);
    }
}
