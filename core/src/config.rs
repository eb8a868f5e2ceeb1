/*
 * config.rs
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

//! Client configuration: timeouts, redirect limit, default request headers and debug switches.
//! Passed into `HttpClient` at construction; there is no global state.

use std::time::Duration;

use serde::Deserialize;

/// Connect timeout applied when nothing else is configured.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Redirects followed before giving up with `TooManyRedirects`.
pub const DEFAULT_MAX_REDIRECTS: u32 = 20;

/// Size of each socket read while assembling a response.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Concurrent requests in `fetch_all`.
pub const DEFAULT_FAN_OUT_WINDOW: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_secs: u64,
    /// None: wait on a stalled peer indefinitely.
    pub read_timeout_secs: Option<u64>,
    /// None: no limit.
    pub max_redirects: Option<u32>,
    pub user_agent: String,
    pub accept: String,
    pub accept_charset: String,
    pub accept_encoding: String,
    /// Emit debug events for reads, transfer modes, chunk boundaries and redirects.
    pub debug_reads: bool,
    pub read_chunk_size: usize,
    pub fan_out_window: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: None,
            max_redirects: Some(DEFAULT_MAX_REDIRECTS),
            user_agent: concat!("httpfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: "*/*".to_string(),
            accept_charset: "utf-8;q=1,utf-16le;q=0.7,utf-16be;q=0.7,iso-8859-1;q=0.5".to_string(),
            accept_encoding: "gzip,x-gzip,deflate,identity".to_string(),
            debug_reads: false,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            fan_out_window: DEFAULT_FAN_OUT_WINDOW,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    /// Default request header fields, in the order they are sent. Caller headers replace these.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        vec![
            ("Accept".to_string(), self.accept.clone()),
            ("Accept-Charset".to_string(), self.accept_charset.clone()),
            ("Accept-Encoding".to_string(), self.accept_encoding.clone()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.connect_timeout(), Duration::from_secs(10));
        assert_eq!(c.read_timeout(), None);
        assert_eq!(c.max_redirects, Some(20));
        assert_eq!(c.read_chunk_size, 4096);
        assert_eq!(c.fan_out_window, 5);
        assert!(!c.debug_reads);
    }

    #[test]
    fn json_overrides_keep_other_defaults() {
        let c = ClientConfig::from_json(
            r#"{"read_timeout_secs": 30, "debug_reads": true, "max_redirects": null}"#,
        )
        .unwrap();
        assert_eq!(c.read_timeout(), Some(Duration::from_secs(30)));
        assert!(c.debug_reads);
        assert_eq!(c.max_redirects, None);
        assert_eq!(c.connect_timeout_secs, 10);
        assert_eq!(c.accept, "*/*");
    }

    #[test]
    fn default_headers_order() {
        let names: Vec<String> = ClientConfig::default()
            .default_headers()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            names,
            [
                "Accept",
                "Accept-Charset",
                "Accept-Encoding",
                "Cache-Control",
                "Connection",
                "Pragma",
                "User-Agent"
            ]
        );
    }
}
