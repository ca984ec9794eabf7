//! # lfcmpeg - MPEG audio frame extraction
//!
//! This crate provides the frame-level reader used by the LofiCast
//! broadcast engine. It does **not** decode audio: it slices an MP3 file
//! into its constituent MPEG-1 Layer III frames, each tagged with its
//! intrinsic playback duration, so the engine can pace them out over HTTP
//! in real time.
//!
//! ## Architecture
//!
//! ```text
//! MP3 file → [ID3v2 skip] → [header parse + resync] → Frame { payload, duration_ms }
//! ```
//!
//! - **ID3v2 skip**: a leading `ID3` tag is skipped using its synchsafe
//!   length field; the position right after the tag is remembered for
//!   [`FrameReader::reset`].
//! - **Header parse**: each 4-byte header is validated against the MPEG-1
//!   Layer III tables; reserved version/layer/bitrate/sample-rate values
//!   reject the candidate header.
//! - **Resync**: on a rejected header the reader advances one byte and
//!   tries again, which tolerates garbage between frames.
//!
//! ## Example
//!
//! ```no_run
//! use lfcmpeg::FrameReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reader = FrameReader::open("track.mp3").await?;
//!     while let Some(frame) = reader.next_frame().await? {
//!         println!("{} bytes, {:.3} ms", frame.payload.len(), frame.duration_ms);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod frame;
mod reader;

pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader, SAMPLES_PER_FRAME};
pub use reader::FrameReader;
