/*
 * parser.rs
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

//! HTTP/1.x response head parser: status line and header block, over a growing buffer.
//!
//! The parser holds no state. The caller appends bytes and calls again until it gets
//! `Parsed`; the result only depends on the bytes seen, so re-parsing a longer prefix never
//! changes the head.

use bytes::BytesMut;

use crate::protocol::http::header::parse_header_block;
use crate::protocol::http::response::{Newline, Response};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// No complete header block yet.
    Incomplete,
    Parsed(Response),
}

fn find(buf: &[u8], needle: &[u8]) -> Option<usize> {
    buf.windows(needle.len()).position(|w| w == needle)
}

/// Line terminator of the first line: CRLF if the first LF follows a CR.
pub fn detect_newline(buf: &[u8]) -> Option<Newline> {
    let lf = buf.iter().position(|&b| b == b'\n')?;
    if lf > 0 && buf[lf - 1] == b'\r' {
        Some(Newline::CrLf)
    } else {
        Some(Newline::Lf)
    }
}

/// Leading decimal digits of `s`, 0 if there are none or they overflow.
fn leading_int(s: &str) -> u16 {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

/// Split the status line. Without an "HTTP/" version token the reply is taken as HTTP/0.9
/// and the tokens as (code, text).
fn parse_status_line(line: &str) -> (String, u16, String) {
    if line.starts_with("HTTP/") {
        let mut parts = line.splitn(3, ' ');
        let protocol = parts.next().unwrap_or_default().to_string();
        let code = parts.next().map(leading_int).unwrap_or(0);
        let text = parts.next().unwrap_or_default().trim().to_string();
        (protocol, code, text)
    } else {
        let mut parts = line.splitn(2, ' ');
        let code = parts.next().map(leading_int).unwrap_or(0);
        let text = parts.next().unwrap_or_default().trim().to_string();
        ("HTTP/0.9".to_string(), code, text)
    }
}

/// Parse a response head from `buf`. With `newline` None the terminator is detected from
/// the first line.
pub fn parse_response(buf: &[u8], newline: Option<Newline>) -> ParseResult {
    let newline = match newline.or_else(|| detect_newline(buf)) {
        Some(nl) => nl,
        None => return ParseResult::Incomplete,
    };
    let nl = newline.as_bytes();
    let separator = [nl, nl].concat();

    let Some(status_end) = find(buf, nl) else {
        return ParseResult::Incomplete;
    };
    // The separator may begin with the status line's own terminator (no header fields).
    let Some(head_end) = find(&buf[status_end..], &separator).map(|i| i + status_end) else {
        return ParseResult::Incomplete;
    };

    let status_line = String::from_utf8_lossy(&buf[..status_end]);
    let (protocol, status_code, status_text) = parse_status_line(&status_line);

    let block_start = (status_end + nl.len()).min(head_end);
    let block = String::from_utf8_lossy(&buf[block_start..head_end]);
    let headers = parse_header_block(&block, newline.as_str());

    ParseResult::Parsed(Response {
        newline,
        protocol,
        status_code,
        status_text,
        headers,
        body: BytesMut::from(&buf[head_end + separator.len()..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(buf: &[u8]) -> Response {
        match parse_response(buf, None) {
            ParseResult::Parsed(r) => r,
            ParseResult::Incomplete => panic!("incomplete: {:?}", String::from_utf8_lossy(buf)),
        }
    }

    #[test]
    fn simple_response() {
        let r = parsed(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
        assert_eq!(r.newline, Newline::CrLf);
        assert_eq!(r.protocol, "HTTP/1.1");
        assert_eq!(r.status_code, 200);
        assert_eq!(r.status_text, "OK");
        assert_eq!(r.headers.len(), 1);
        assert_eq!(r.headers.get_str("Content-Length"), Some("5"));
        assert_eq!(&r.body[..], b"hello");
    }

    #[test]
    fn bare_lf_newlines() {
        let r = parsed(b"HTTP/1.0 404 Not Found\nServer: x\n\nbody\r\n");
        assert_eq!(r.newline, Newline::Lf);
        assert_eq!(r.status_code, 404);
        assert_eq!(r.status_text, "Not Found");
        assert_eq!(&r.body[..], b"body\r\n");
    }

    #[test]
    fn status_line_only() {
        let r = parsed(b"HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!(r.status_code, 204);
        assert!(r.headers.is_empty());
        assert!(r.body.is_empty());
    }

    #[test]
    fn reason_phrase_with_spaces_and_missing() {
        assert_eq!(parsed(b"HTTP/1.1 303 See Other\r\n\r\n").status_text, "See Other");
        let r = parsed(b"HTTP/1.1 200\r\n\r\n");
        assert_eq!(r.status_code, 200);
        assert_eq!(r.status_text, "");
    }

    #[test]
    fn http09_fallback() {
        let r = parsed(b"200 Fine\r\n\r\nrest");
        assert_eq!(r.protocol, "HTTP/0.9");
        assert_eq!(r.status_code, 200);
        assert_eq!(r.status_text, "Fine");
        let r = parsed(b"<html>\n\n");
        assert_eq!(r.protocol, "HTTP/0.9");
        assert_eq!(r.status_code, 0);
    }

    #[test]
    fn explicit_newline_overrides_detection() {
        let buf = b"HTTP/1.1 200 OK\nA: 1\n\nx";
        assert_eq!(parse_response(buf, Some(Newline::CrLf)), ParseResult::Incomplete);
    }

    #[test]
    fn incomplete_prefixes() {
        let full: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-A: 1\r\n\r\nbody";
        let head_len = full.len() - 4;
        for n in 0..head_len {
            assert_eq!(parse_response(&full[..n], None), ParseResult::Incomplete, "prefix {}", n);
        }
        let reference = parsed(full);
        // Every complete prefix yields the same head; the body is whatever followed.
        for n in head_len..=full.len() {
            let r = parsed(&full[..n]);
            assert_eq!(r.headers, reference.headers);
            assert_eq!(r.status_code, 200);
            assert_eq!(&r.body[..], &full[head_len..n]);
        }
    }

    #[test]
    fn accumulation_pattern_does_not_matter() {
        let full: &[u8] = b"HTTP/1.1 302 Found\r\nLocation: /b\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n";
        let reference = parsed(full);
        for step in 1..full.len() {
            let mut acc = Vec::new();
            let mut result = ParseResult::Incomplete;
            for piece in full.chunks(step) {
                acc.extend_from_slice(piece);
                result = parse_response(&acc, None);
            }
            assert_eq!(result, ParseResult::Parsed(reference.clone()));
        }
    }

    #[test]
    fn invalid_utf8_in_headers_is_tolerated() {
        let r = parsed(b"HTTP/1.1 200 OK\r\nX-Name: caf\xe9\r\n\r\n");
        assert_eq!(r.headers.get_str("X-Name"), Some("caf\u{fffd}"));
    }
}
