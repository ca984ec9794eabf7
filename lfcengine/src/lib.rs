//! # lfcengine - Frame-paced broadcast engine
//!
//! The live core of LofiCast: one long-running producer reads MPEG frames
//! from the playlist's files and paces them out, in real time, to a
//! dynamic fan-out of HTTP listeners and now-playing subscribers.
//!
//! ## Architecture
//!
//! ```text
//! Playlist → Engine (producer loop) → Broadcaster → (many) listeners
//!                 ↓                        ↓
//!             PaceClock            now-playing subscribers
//! ```
//!
//! - [`PaceClock`] releases frames at their natural playback rate using a
//!   cumulative time budget, so per-frame timer jitter never accumulates.
//! - [`Broadcaster`] owns the listener and subscriber registries. Writes
//!   are non-blocking: a slow or dead consumer is dropped, never waited on.
//! - [`Engine`] drives `next track → read frame → broadcast → pace` and
//!   publishes now-playing metadata on track boundaries.
//!
//! The HTTP adapter in [`api`] turns connections into registrations:
//! `GET /stream` for raw `audio/mpeg`, `GET /api/now-playing/events` for
//! the SSE metadata channel, plus status and skip endpoints.

pub mod api;
mod broadcast;
mod clock;
mod engine;
pub mod openapi;

pub use broadcast::{Broadcaster, NowPlaying};
pub use clock::PaceClock;
pub use engine::{Engine, EngineStatus};
