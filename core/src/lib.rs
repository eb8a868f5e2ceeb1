/*
 * lib.rs
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

//! httpfetch core: an outbound HTTP/1.1 client.
//!
//! - `protocol::http`: request/response model, HTTP/1.1 parsing, the client state machine,
//!   fan-out and a conditional-GET file cache.
//! - `gzip`, `charset`: body decoding applied to final responses.
//! - `config`, `logging`, `error`: injected configuration, log sink, error types.

pub mod charset;
pub mod config;
pub mod error;
pub mod gzip;
pub mod logging;
pub mod protocol;

pub use config::ClientConfig;
pub use error::{CharsetError, FetchError, GzipError};
pub use logging::{LogCrateSink, LogSink, NoopSink};
pub use protocol::http::{
    fetch_all, fetch_cached, fetch_cached_with, CachePolicy, FetchOptions, FetchOutcome,
    FetchResult, HttpClient, Request,
};
