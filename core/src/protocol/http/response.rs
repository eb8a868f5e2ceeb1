/*
 * response.rs
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

//! Parsed response head plus the body bytes received so far, and typed views of known fields.

use bytes::BytesMut;
use chrono::{DateTime, Utc};

use crate::protocol::http::cookie::{parse_set_cookie, Cookie};
use crate::protocol::http::date::{parse_http_date, parse_retry_after};
use crate::protocol::http::header::HeaderMap;

/// Line terminator used by one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    CrLf,
    Lf,
}

impl Newline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Newline::CrLf => "\r\n",
            Newline::Lf => "\n",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub newline: Newline,
    /// "HTTP/1.1", or "HTTP/0.9" when the status line carried no version.
    pub protocol: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    /// Bytes after the header block. Raw until the client has applied transfer decoding.
    pub body: BytesMut,
}

impl Response {
    /// 1xx, 204 and 304 responses never carry a body.
    pub fn has_body(&self) -> bool {
        self.status_code >= 200 && self.status_code != 204 && self.status_code != 304
    }

    /// `Transfer-Encoding` present and not `identity`.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get_str("Transfer-Encoding")
            .map_or(false, |te| !te.trim().eq_ignore_ascii_case("identity"))
    }

    /// Raw `Content-Length` value, if present.
    pub fn content_length_raw(&self) -> Option<&str> {
        self.headers.get_str("Content-Length").map(str::trim)
    }

    pub fn keep_alive(&self) -> bool {
        self.headers
            .get_str("Connection")
            .map_or(false, |c| c.trim().eq_ignore_ascii_case("keep-alive"))
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get_str("Location").map(str::trim)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_str("Content-Type")
    }

    /// Cookies from every `Set-Cookie` field, in order. Invalid ones are skipped.
    pub fn cookies(&self) -> Vec<(String, Cookie)> {
        self.headers
            .get("Set-Cookie")
            .map(|v| v.values().into_iter().filter_map(parse_set_cookie).collect())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> TypedFields {
        self.fields_at(Utc::now())
    }

    /// Typed values of the known fields; `now` resolves a delta-seconds `Retry-After`.
    pub fn fields_at(&self, now: DateTime<Utc>) -> TypedFields {
        let date = |name: &str| self.headers.get_str(name).and_then(parse_http_date);
        let accept = self
            .headers
            .iter()
            .filter(|(name, _)| {
                name.get(..6)
                    .map_or(false, |prefix| prefix.eq_ignore_ascii_case("accept"))
            })
            .map(|(name, value)| {
                let list = value.values().into_iter().flat_map(parse_accept).collect();
                (name.to_string(), list)
            })
            .collect();
        TypedFields {
            content_length: self.content_length_raw().and_then(|v| v.parse().ok()),
            expires: date("Expires"),
            if_modified_since: date("If-Modified-Since"),
            if_unmodified_since: date("If-Unmodified-Since"),
            last_modified: date("Last-Modified"),
            retry_after: self
                .headers
                .get_str("Retry-After")
                .and_then(|v| parse_retry_after(v, now)),
            accept,
            cookies: self.cookies(),
        }
    }
}

/// Known fields coerced to their types. Unparsable values are None.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedFields {
    pub content_length: Option<u64>,
    pub expires: Option<DateTime<Utc>>,
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub retry_after: Option<DateTime<Utc>>,
    /// Every `Accept*` field with its quality list.
    pub accept: Vec<(String, Vec<QualityValue>)>,
    pub cookies: Vec<(String, Cookie)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityValue {
    pub token: String,
    pub q: f32,
}

/// Parse `token[;q=w], ...`. A missing or invalid weight is 1.0.
pub fn parse_accept(value: &str) -> Vec<QualityValue> {
    value
        .split(',')
        .filter_map(|item| {
            let mut params = item.split(';');
            let token = params.next()?.trim();
            if token.is_empty() {
                return None;
            }
            let q = params
                .filter_map(|p| p.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
                .and_then(|(_, w)| w.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(QualityValue {
                token: token.to_string(),
                q,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn response(headers: &[(&str, &str)], code: u16) -> Response {
        let mut map = HeaderMap::new();
        for (n, v) in headers {
            map.append(n, *v);
        }
        Response {
            newline: Newline::CrLf,
            protocol: "HTTP/1.1".to_string(),
            status_code: code,
            status_text: String::new(),
            headers: map,
            body: BytesMut::new(),
        }
    }

    #[test]
    fn body_presence() {
        assert!(response(&[], 200).has_body());
        assert!(!response(&[], 204).has_body());
        assert!(!response(&[], 304).has_body());
        assert!(!response(&[], 101).has_body());
        assert!(response(&[], 404).has_body());
    }

    #[test]
    fn transfer_modes() {
        assert!(response(&[("Transfer-Encoding", "chunked")], 200).is_chunked());
        assert!(!response(&[("Transfer-Encoding", "Identity")], 200).is_chunked());
        assert!(!response(&[], 200).is_chunked());
        assert!(response(&[("Connection", "Keep-Alive")], 200).keep_alive());
        assert!(!response(&[("Connection", "close")], 200).keep_alive());
    }

    #[test]
    fn accept_quality_values() {
        let list = parse_accept("text/html, application/xml;q=0.9, */*; Q=0.1,,");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], QualityValue { token: "text/html".to_string(), q: 1.0 });
        assert_eq!(list[1].q, 0.9);
        assert_eq!(list[2].token, "*/*");
        assert_eq!(list[2].q, 0.1);
    }

    #[test]
    fn typed_fields() {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let r = response(
            &[
                ("Content-Length", " 42 "),
                ("Last-Modified", "Sun, 06 Nov 1994 08:49:37 GMT"),
                ("Expires", "0"),
                ("Retry-After", "30"),
                ("Accept-Ranges", "bytes"),
                ("Set-Cookie", "a=1"),
                ("Set-Cookie", "broken"),
            ],
            200,
        );
        let f = r.fields_at(now);
        assert_eq!(f.content_length, Some(42));
        assert_eq!(f.last_modified, Some(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()));
        assert_eq!(f.expires, None);
        assert_eq!(f.retry_after, Some(now + Duration::seconds(30)));
        assert_eq!(f.accept.len(), 1);
        assert_eq!(f.accept[0].0, "Accept-Ranges");
        assert_eq!(f.cookies.len(), 1);
        assert_eq!(f.cookies[0].0, "a");
    }
}
