//! Zlib-stream decompression for Discord Gateway frames.
//!
//! All messages on a `zlib-stream`-encoded connection share a single zlib
//! context; each logical message ends with the SYNC_FLUSH suffix
//! `0x00 0x00 0xFF 0xFF`.

use flate2::{Decompress, FlushDecompress, Status};

const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

pub struct ZlibDecompressor {
    buffer: Vec<u8>,
    output_buffer: Vec<u8>,
    decompressor: Decompress,
}

impl ZlibDecompressor {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(8 * 1024),
            output_buffer: Vec::with_capacity(32 * 1024),
            decompressor: Decompress::new(true),
        }
    }

    /// Push compressed bytes from a WebSocket frame. Returns the decoded
    /// message once a complete SYNC_FLUSH-terminated unit has accumulated.
    pub fn push(&mut self, data: &[u8]) -> Result<Option<&[u8]>, std::io::Error> {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() < 4 || self.buffer[self.buffer.len() - 4..] != ZLIB_SUFFIX {
            return Ok(None);
        }

        self.decompress()?;
        self.buffer.clear();

        Ok(Some(&self.output_buffer))
    }

    fn decompress(&mut self) -> Result<(), std::io::Error> {
        self.output_buffer.clear();
        let mut input_offset = 0;

        loop {
            if self.output_buffer.len() == self.output_buffer.capacity() {
                self.output_buffer.reserve(32 * 1024);
            }

            let len = self.output_buffer.len();
            let cap = self.output_buffer.capacity();
            self.output_buffer.resize(cap, 0);
            let dst = &mut self.output_buffer[len..];

            let prior_out = self.decompressor.total_out();
            let prior_in = self.decompressor.total_in();

            let status = self
                .decompressor
                .decompress(&self.buffer[input_offset..], dst, FlushDecompress::Sync)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

            let written = (self.decompressor.total_out() - prior_out) as usize;
            let consumed = (self.decompressor.total_in() - prior_in) as usize;
            input_offset += consumed;
            self.output_buffer.truncate(len + written);

            match status {
                Status::Ok => {
                    if input_offset >= self.buffer.len() {
                        break;
                    }
                }
                Status::BufError => continue,
                Status::StreamEnd => break,
            }
        }

        Ok(())
    }

    /// Reinitialize the zlib context for a fresh connection. Must be called
    /// on every reconnect since the server also starts a new context.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.output_buffer.clear();
        self.decompressor.reset(true);
    }
}

impl Default for ZlibDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn decompresses_a_single_sync_flushed_message() {
        let original = r#"{"op":10,"d":{"heartbeat_interval":41250}}"#;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut decompressor = ZlibDecompressor::new();
        let result = decompressor.push(&compressed).unwrap();
        assert_eq!(result.map(|b| b.to_vec()), Some(original.as_bytes().to_vec()));
    }

    #[test]
    fn incomplete_frame_returns_none_until_suffix_arrives() {
        let mut decompressor = ZlibDecompressor::new();
        let result = decompressor.push(&[0x78, 0x9c, 0x01]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn reset_clears_buffered_state() {
        let mut decompressor = ZlibDecompressor::new();
        decompressor.push(&[0x78, 0x9c]).unwrap();
        decompressor.reset();
        assert!(decompressor.buffer.is_empty());
    }
}
