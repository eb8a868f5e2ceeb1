/*
 * mod.rs
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

//! HTTP/1.1 client.
//!
//! - Request model with the method implied by the payload; responses parsed from a growing
//!   buffer (`h1`), header fields kept in order with repeated fields as lists.
//! - Buffers: `bytes` crate (BytesMut while reading, Bytes for finished bodies).
//! - `HttpClient` drives connect, send, read, redirect and shutdown over a `Connector`;
//!   `fetch_all` and `fetch_cached` are built on it.

mod cache;
mod client;
mod connection;
mod cookie;
mod date;
mod header;
mod multi;
mod request;
mod response;

pub mod h1;

pub use cache::{fetch_cached, fetch_cached_with, CacheLock, CachePolicy};
pub use client::{FetchOptions, FetchOutcome, FetchResult, HttpClient};
pub use connection::{Connector, HttpConnection, TcpConnector};
pub use cookie::{parse_set_cookie, Cookie, CookieJar};
pub use date::{format_http_date, parse_http_date, parse_retry_after};
pub use header::{canonical_name, is_known_field, parse_header_block, HeaderMap, HeaderValue};
pub use multi::fetch_all;
pub use request::{Method, Request};
pub use response::{parse_accept, Newline, QualityValue, Response, TypedFields};
