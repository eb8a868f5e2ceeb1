/*
 * error.rs
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

//! Fetch, gzip and charset errors.
//!
//! Connection and framing errors abort a request (`FetchError`). Gzip and charset
//! errors are local: the client logs them and keeps the undecoded body.

use std::io;

use thiserror::Error;

/// Errors that abort a whole request. No partial result accompanies them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL without a host, unparsable, or with a scheme other than http.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Socket-level connect error (includes timeout).
    #[error("connection to {host}:{port} failed: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Read/write error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// EOF while the headers or a framed body were incomplete.
    #[error("incomplete response: {0}")]
    IncompleteResponse(&'static str),

    /// Complete but unusable data (bad chunk size, bad Content-Length).
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("too many redirects (limit {0})")]
    TooManyRedirects(u32),

    /// Status outside the accepted range (conditional GET helper only).
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Cache file or lock file could not be used.
    #[error("cache: {0}")]
    Cache(String),
}

/// Gzip container errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GzipError {
    /// Bad magic, reserved flag bits, truncated header fields, header CRC
    /// mismatch or an undecodable deflate stream.
    #[error("invalid gzip data")]
    InvalidFormat,

    #[error("unsupported gzip compression method {0:#04x}")]
    UnsupportedMethod(u8),

    /// Decompressed CRC32 or length differs from the trailer.
    #[error("gzip CRC or length mismatch")]
    CrcMismatch,
}

/// Charset conversion errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CharsetError {
    #[error("unsupported charset {0}")]
    Unsupported(String),

    /// Encoding name does not fix the byte order and the data has no BOM.
    #[error("charset {0} requires a byte order mark")]
    MissingByteOrderMark(String),
}
