/*
 * chunked.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of httpfetch, an outbound HTTP/1.1 client.
 *
 * httpfetch is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * httpfetch is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with httpfetch.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Chunked transfer decoding, push style: feed raw bytes, chunk data is moved into the body.
//! Size lines may end in CRLF or LF. Chunk extensions are skipped unvalidated. Trailer fields
//! after the zero-size chunk are read and discarded up to the empty line; bytes after that
//! are left in the buffer.

use bytes::{Buf, BytesMut};

use crate::error::FetchError;

/// Longest chunk-size line accepted while waiting for its terminator.
const MAX_SIZE_LINE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data,
    /// Line terminator after chunk data.
    DataEnd,
    /// Trailer lines after the zero-size chunk, up to the empty line.
    Trailer,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkProgress {
    NeedMore,
    Done,
}

pub struct ChunkedDecoder {
    state: ChunkState,
    remaining: usize,
    chunks: usize,
    body: BytesMut,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            remaining: 0,
            chunks: 0,
            body: BytesMut::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// The zero-size chunk was seen; only the trailer section is outstanding.
    pub fn in_trailer(&self) -> bool {
        self.state == ChunkState::Trailer
    }

    /// Number of non-empty chunks completed so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Decoded body length so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consume as much of `buf` as possible. Partial size lines stay in `buf`.
    pub fn receive(&mut self, buf: &mut BytesMut) -> Result<ChunkProgress, FetchError> {
        loop {
            match self.state {
                ChunkState::Size => {
                    let Some(lf) = buf.iter().position(|&b| b == b'\n') else {
                        if buf.len() > MAX_SIZE_LINE {
                            return Err(FetchError::MalformedResponse(
                                "chunk size line too long".to_string(),
                            ));
                        }
                        return Ok(ChunkProgress::NeedMore);
                    };
                    let line = buf.split_to(lf + 1);
                    let size = parse_chunk_size(&line[..lf])?;
                    if size == 0 {
                        self.state = ChunkState::Trailer;
                    } else {
                        self.remaining = size;
                        self.state = ChunkState::Data;
                    }
                }
                ChunkState::Data => {
                    if buf.is_empty() {
                        return Ok(ChunkProgress::NeedMore);
                    }
                    let n = self.remaining.min(buf.len());
                    self.body.extend_from_slice(&buf.split_to(n));
                    self.remaining -= n;
                    if self.remaining == 0 {
                        self.chunks += 1;
                        self.state = ChunkState::DataEnd;
                    }
                }
                ChunkState::DataEnd => {
                    if buf.starts_with(b"\r\n") {
                        buf.advance(2);
                    } else if buf.starts_with(b"\n") {
                        buf.advance(1);
                    } else if buf.is_empty() || &buf[..] == b"\r" {
                        return Ok(ChunkProgress::NeedMore);
                    } else {
                        return Err(FetchError::MalformedResponse(
                            "missing line break after chunk data".to_string(),
                        ));
                    }
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailer => {
                    let Some(lf) = buf.iter().position(|&b| b == b'\n') else {
                        if buf.len() > MAX_SIZE_LINE {
                            return Err(FetchError::MalformedResponse(
                                "chunked trailer line too long".to_string(),
                            ));
                        }
                        return Ok(ChunkProgress::NeedMore);
                    };
                    let line = buf.split_to(lf + 1);
                    if line[..lf].strip_suffix(b"\r").unwrap_or(&line[..lf]).is_empty() {
                        self.state = ChunkState::Done;
                    }
                }
                ChunkState::Done => return Ok(ChunkProgress::Done),
            }
        }
    }

    pub fn into_body(self) -> BytesMut {
        self.body
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex size before any `;extension`, with surrounding whitespace and a trailing CR ignored.
fn parse_chunk_size(line: &[u8]) -> Result<usize, FetchError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let end = line.iter().position(|&b| b == b';').unwrap_or(line.len());
    let hex = std::str::from_utf8(&line[..end])
        .map(str::trim)
        .unwrap_or_default();
    usize::from_str_radix(hex, 16).map_err(|_| {
        FetchError::MalformedResponse(format!(
            "invalid chunk size {:?}",
            String::from_utf8_lossy(&line[..end])
        ))
    })
}
