//! End-to-end scenarios for the broadcast engine: synthetic MP3 tracks on
//! disk, a real playlist, and listeners/subscribers attached at various
//! moments of the program.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use lfcengine::{Broadcaster, Engine, NowPlaying};
use lfcplaylist::Playlist;

/// 128 kbps @ 44100 Hz, no padding: 417 bytes, 26.122 ms per frame.
const FRAME_SIZE: usize = 417;

/// Builds one synthetic frame; bytes 4 and 5 encode provenance so tests
/// can tell which track and which frame a payload came from.
fn frame_bytes(tag: u8, index: u8) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_SIZE];
    frame[0] = 0xFF;
    frame[1] = 0xFB;
    frame[2] = 0x90;
    frame[3] = 0x00;
    frame[4] = tag;
    frame[5] = index;
    frame
}

fn write_track(dir: &Path, name: &str, tag: u8, frames: u8) {
    let mut content = Vec::new();
    for i in 0..frames {
        content.extend_from_slice(&frame_bytes(tag, i));
    }
    fs::write(dir.join(name), content).unwrap();
}

fn engine_for(dir: &Path) -> (Engine, Broadcaster, Playlist) {
    let playlist = Playlist::load(dir).unwrap();
    let broadcaster = Broadcaster::new();
    let engine = Engine::new(playlist.clone(), broadcaster.clone());
    (engine, broadcaster, playlist)
}

async fn recv_frame(rx: &mut mpsc::Receiver<Bytes>) -> Bytes {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("audio channel closed unexpectedly")
}

async fn recv_meta(rx: &mut mpsc::Receiver<NowPlaying>) -> NowPlaying {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for metadata")
        .expect("metadata channel closed unexpectedly")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_track_program_is_paced_and_ordered() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 10);
    write_track(dir.path(), "b.mp3", b'B', 5);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut audio_rx) = broadcaster.attach_listener();
    let (_, mut meta_rx) = broadcaster.attach_subscriber();

    let started = Instant::now();
    let handle = engine.start();

    let mut frames = Vec::new();
    for _ in 0..15 {
        frames.push(recv_frame(&mut audio_rx).await);
    }
    let elapsed = started.elapsed();

    // 10 frames of A then 5 frames of B, each in order
    for (i, frame) in frames.iter().take(10).enumerate() {
        assert_eq!(frame[4], b'A');
        assert_eq!(frame[5], i as u8);
    }
    for (i, frame) in frames.iter().skip(10).enumerate() {
        assert_eq!(frame[4], b'B');
        assert_eq!(frame[5], i as u8);
    }

    // 15 frames represent ~391.8 ms of audio; the burst must be paced,
    // not dumped instantly, and not stretched past its real-time length
    assert!(
        elapsed >= Duration::from_millis(330),
        "burst arrived too fast: {:?}",
        elapsed
    );
    assert!(
        elapsed <= Duration::from_millis(800),
        "burst arrived too slow: {:?}",
        elapsed
    );

    // Exactly one publish per track start, in program order
    assert_eq!(recv_meta(&mut meta_rx).await.track.title, "a");
    assert_eq!(recv_meta(&mut meta_rx).await.track.title, "b");

    engine.stop();
    handle.await.unwrap();
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscriber_attached_mid_track_sees_current_track_first() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 10);
    write_track(dir.path(), "b.mp3", b'B', 5);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut audio_rx) = broadcaster.attach_listener();
    let handle = engine.start();

    // Let a few frames of A go by, then attach the subscriber
    for _ in 0..3 {
        recv_frame(&mut audio_rx).await;
    }
    let (_, mut meta_rx) = broadcaster.attach_subscriber();

    assert_eq!(recv_meta(&mut meta_rx).await.track.title, "a");
    assert_eq!(recv_meta(&mut meta_rx).await.track.title, "b");

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_listener_shares_the_live_window() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 30);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut rx1) = broadcaster.attach_listener();
    let handle = engine.start();

    let mut seen1 = Vec::new();
    for _ in 0..5 {
        seen1.push(recv_frame(&mut rx1).await);
    }

    // L2 joins mid-stream: no replay, it starts at the live position
    let (_, mut rx2) = broadcaster.attach_listener();
    let mut seen2 = Vec::new();
    for _ in 0..3 {
        seen2.push(recv_frame(&mut rx2).await);
    }
    while seen1.len() < 12 {
        seen1.push(recv_frame(&mut rx1).await);
    }

    let first2 = seen2[0][5];
    assert!(first2 >= 5, "late listener replayed old frames");
    for (offset, frame) in seen2.iter().enumerate() {
        assert_eq!(frame[5], first2 + offset as u8, "gap in late listener");
        let same_in_l1 = seen1
            .iter()
            .find(|f| f[5] == frame[5])
            .expect("frame missing from first listener");
        assert_eq!(&same_in_l1[..], &frame[..]);
    }

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_listener_does_not_disturb_others() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 20);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut rx1) = broadcaster.attach_listener();
    let (_, mut rx2) = broadcaster.attach_listener();
    let handle = engine.start();

    for _ in 0..3 {
        recv_frame(&mut rx1).await;
        recv_frame(&mut rx2).await;
    }

    // L1's connection dies; the broadcaster notices on the next write
    drop(rx1);
    let next = recv_frame(&mut rx2).await;
    assert_eq!(next[4], b'A');

    for _ in 0..5 {
        recv_frame(&mut rx2).await;
    }
    assert_eq!(broadcaster.listener_count(), 1);

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_byte_track_is_advanced_immediately() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty.mp3"), b"").unwrap();
    write_track(dir.path(), "ok.mp3", b'K', 5);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut audio_rx) = broadcaster.attach_listener();

    let started = Instant::now();
    let handle = engine.start();

    // "empty.mp3" sorts first; its zero frames must not delay "ok.mp3"
    let first = recv_frame(&mut audio_rx).await;
    assert_eq!(first[4], b'K');
    assert!(started.elapsed() < Duration::from_millis(500));

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_file_is_skipped_without_publish() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 3);
    write_track(dir.path(), "b.mp3", b'B', 3);

    let (engine, broadcaster, _) = engine_for(dir.path());
    // The file disappears between scan and broadcast
    fs::remove_file(dir.path().join("a.mp3")).unwrap();

    let (_, mut audio_rx) = broadcaster.attach_listener();
    let (_, mut meta_rx) = broadcaster.attach_subscriber();
    let handle = engine.start();

    assert_eq!(recv_frame(&mut audio_rx).await[4], b'B');
    assert_eq!(recv_meta(&mut meta_rx).await.track.title, "b");

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_track_replays_with_one_publish_each() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "only.mp3", b'O', 3);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut meta_rx) = broadcaster.attach_subscriber();
    let handle = engine.start();

    for _ in 0..3 {
        let event = recv_meta(&mut meta_rx).await;
        assert_eq!(event.track.id, 1);
        assert_eq!(event.track.title, "only");
    }

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_skip_ends_the_current_track_early() {
    let dir = TempDir::new().unwrap();
    write_track(dir.path(), "a.mp3", b'A', 200);
    write_track(dir.path(), "b.mp3", b'B', 5);

    let (engine, broadcaster, _) = engine_for(dir.path());
    let (_, mut audio_rx) = broadcaster.attach_listener();
    let handle = engine.start();

    for _ in 0..3 {
        assert_eq!(recv_frame(&mut audio_rx).await[4], b'A');
    }

    // A has ~5 s left; the skip must land us in B well before that
    let skipped_at = Instant::now();
    engine.skip();
    loop {
        let frame = recv_frame(&mut audio_rx).await;
        if frame[4] == b'B' {
            break;
        }
        assert!(
            skipped_at.elapsed() < Duration::from_secs(2),
            "skip did not take effect"
        );
    }

    engine.stop();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_playlist_broadcasts_nothing_and_stops_cleanly() {
    let dir = TempDir::new().unwrap();

    let (engine, broadcaster, playlist) = engine_for(dir.path());
    assert!(playlist.is_empty().await);

    let (_, mut audio_rx) = broadcaster.attach_listener();
    let handle = engine.start();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(engine.is_running());
    assert!(audio_rx.try_recv().is_err(), "no audio byte may be sent");

    // stop() interrupts the 5 s retry back-off promptly
    let stopped_at = Instant::now();
    engine.stop();
    handle.await.unwrap();
    assert!(stopped_at.elapsed() < Duration::from_secs(1));
    assert!(!engine.is_running());

    let status = engine.status();
    assert!(!status.is_running);
    assert_eq!(status.listener_count, 1);
    assert!(status.now_playing.is_none());
}
