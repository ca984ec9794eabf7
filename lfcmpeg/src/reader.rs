//! Lazy frame reader with ID3v2 skip and byte-wise resync

use std::path::Path;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, BufReader, SeekFrom};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHeader};

/// Size of the ID3v2 tag header.
const ID3_HEADER_LEN: usize = 10;

/// Streaming reader that yields the playable frames of one MP3 file.
///
/// The reader is lazy: each [`next_frame`](FrameReader::next_frame) call
/// performs just enough I/O to produce one frame. The sequence ends at
/// end-of-file, or as soon as fewer than 4 readable bytes remain.
pub struct FrameReader {
    file: BufReader<File>,
    /// Byte offset of the first audio byte (right after the ID3v2 tag)
    audio_start: u64,
    /// Sliding 4-byte header window
    window: [u8; 4],
    /// Number of valid bytes currently held in `window`
    filled: usize,
}

impl FrameReader {
    /// Opens a file and positions the cursor on the first audio byte.
    ///
    /// A leading `ID3` tag is skipped using its 28-bit synchsafe length
    /// (10-byte tag header + payload). Files without a tag start at
    /// offset 0. Open and seek failures are fatal.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref()).await?;

        let mut probe = [0u8; ID3_HEADER_LEN];
        let got = read_up_to(&mut file, &mut probe).await?;

        let audio_start = if got == ID3_HEADER_LEN && &probe[0..3] == b"ID3" {
            let tag_len = synchsafe_u28(&probe[6..10]);
            let start = (ID3_HEADER_LEN as u64) + tag_len as u64;
            debug!(path = %path.as_ref().display(), tag_len, "Skipping ID3v2 tag");
            start
        } else {
            0
        };

        file.seek(SeekFrom::Start(audio_start)).await?;

        Ok(Self {
            file: BufReader::new(file),
            audio_start,
            window: [0u8; 4],
            filled: 0,
        })
    }

    /// Returns the next playable frame, or `None` when the file is
    /// exhausted.
    ///
    /// Bytes that do not parse as a frame header are skipped one at a
    /// time, so garbage between frames is tolerated. A frame body cut
    /// short by end-of-file surfaces as [`Error::ShortRead`].
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            // Keep the 4-byte candidate window full
            while self.filled < 4 {
                let n = self.file.read(&mut self.window[self.filled..]).await?;
                if n == 0 {
                    return Ok(None);
                }
                self.filled += n;
            }

            let Some(header) = FrameHeader::parse(&self.window) else {
                // Not a frame start: slide the window one byte forward
                trace!("resync: skipping one byte");
                self.window.copy_within(1..4, 0);
                self.filled = 3;
                continue;
            };

            let mut payload = vec![0u8; header.frame_size];
            payload[..4].copy_from_slice(&self.window);
            self.filled = 0;

            let mut read = 4;
            while read < header.frame_size {
                let n = self.file.read(&mut payload[read..]).await?;
                if n == 0 {
                    return Err(Error::ShortRead {
                        expected: header.frame_size,
                        got: read,
                    });
                }
                read += n;
            }

            return Ok(Some(Frame {
                payload: Bytes::from(payload),
                duration_ms: header.duration_ms,
            }));
        }
    }

    /// Rewinds to the byte following the metadata block (not offset 0),
    /// making the reader re-entrant within one file.
    pub async fn reset(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.audio_start)).await?;
        self.filled = 0;
        Ok(())
    }
}

/// Decodes a 28-bit synchsafe integer: four bytes, high bit of each
/// masked off, concatenated MSB-first.
fn synchsafe_u28(bytes: &[u8]) -> u32 {
    ((bytes[0] & 0x7F) as u32) << 21
        | ((bytes[1] & 0x7F) as u32) << 14
        | ((bytes[2] & 0x7F) as u32) << 7
        | (bytes[3] & 0x7F) as u32
}

/// Reads until `buf` is full or EOF; returns the number of bytes read.
async fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        let n = file.read(&mut buf[got..]).await?;
        if n == 0 {
            break;
        }
        got += n;
    }
    Ok(got)
}
