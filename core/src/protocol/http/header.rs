/*
 * header.rs
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

//! RFC 822 style header block: ordered fields, continuation lines, repeated fields as lists.

use std::fmt;

/// Standard field names. Matching names are stored in this spelling; others keep the case
/// the server sent.
const KNOWN_FIELDS: &[&str] = &[
    "Accept",
    "Accept-Charset",
    "Accept-Encoding",
    "Accept-Language",
    "Accept-Ranges",
    "Age",
    "Allow",
    "Authorization",
    "Cache-Control",
    "Connection",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Range",
    "Content-Type",
    "Cookie",
    "Date",
    "ETag",
    "Expect",
    "Expires",
    "From",
    "Host",
    "If-Match",
    "If-Modified-Since",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
    "Keep-Alive",
    "Last-Modified",
    "Location",
    "Max-Forwards",
    "Pragma",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "Range",
    "Referer",
    "Retry-After",
    "Server",
    "Set-Cookie",
    "TE",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
    "User-Agent",
    "Vary",
    "Via",
    "Warning",
    "WWW-Authenticate",
];

/// Canonical spelling of a standard field name.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    KNOWN_FIELDS
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(name))
}

pub fn is_known_field(name: &str) -> bool {
    canonical_name(name).is_some()
}

/// One field value, or all values of a field that appeared more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    List(Vec<String>),
}

impl HeaderValue {
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::List(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(v) => {
                let first = std::mem::take(v);
                *self = HeaderValue::List(vec![first, value]);
            }
            HeaderValue::List(vs) => vs.push(value),
        }
    }

    fn last_mut(&mut self) -> Option<&mut String> {
        match self {
            HeaderValue::Single(v) => Some(v),
            HeaderValue::List(vs) => vs.last_mut(),
        }
    }
}

impl fmt::Display for HeaderValue {
    /// Lists are shown comma-joined, as in a combined field value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Single(v) => f.write_str(v),
            HeaderValue::List(vs) => f.write_str(&vs.join(", ")),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

/// Ordered header fields. Lookup is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    /// First value of the field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Add a value; a second value for the same field turns it into a list.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value),
            None => self
                .entries
                .push((name.to_string(), HeaderValue::Single(value))),
        }
    }

    /// Set a field, replacing any previous values. Keeps the original position.
    pub fn insert(&mut self, name: &str, value: HeaderValue) {
        match self.position(name) {
            Some(i) => self.entries[i] = (name.to_string(), value),
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse the lines between the status line and the blank line.
/// Lines starting with SP or HT continue the previous field. Lines without a colon are ignored.
pub fn parse_header_block(raw: &str, newline: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut last: Option<usize> = None;
    for line in raw.split(newline) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            let folded = line.trim();
            let target = match last {
                Some(i) => headers.entries[i].1.last_mut(),
                None => None,
            };
            if let Some(value) = target {
                if !folded.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(folded);
                }
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            last = None;
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            last = None;
            continue;
        }
        let name = canonical_name(name).unwrap_or(name);
        headers.append(name, value.trim());
        last = headers.position(name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_fields() {
        let h = parse_header_block("Content-Length: 5\r\nServer:  test \r\n", "\r\n");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get_str("content-length"), Some("5"));
        assert_eq!(h.get_str("SERVER"), Some("test"));
    }

    #[test]
    fn known_names_are_canonicalized() {
        let h = parse_header_block("content-type: text/plain\nX-Custom-thing: 1", "\n");
        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Content-Type", "X-Custom-thing"]);
    }

    #[test]
    fn continuation_lines_fold() {
        let h = parse_header_block("X-Long: first\r\n  second\r\n\tthird\r\nOther: x", "\r\n");
        assert_eq!(h.get_str("X-Long"), Some("first second third"));
        assert_eq!(h.get_str("Other"), Some("x"));
    }

    #[test]
    fn repeated_fields_become_lists() {
        let h = parse_header_block(
            "Set-Cookie: a=1\r\nVia: p\r\nset-cookie: b=2\r\nSet-Cookie: c=3\r\n",
            "\r\n",
        );
        assert_eq!(
            h.get("Set-Cookie"),
            Some(&HeaderValue::List(vec![
                "a=1".to_string(),
                "b=2".to_string(),
                "c=3".to_string()
            ]))
        );
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn folding_applies_to_last_list_value() {
        let h = parse_header_block("Warning: a\nWarning: b\n c", "\n");
        assert_eq!(h.get("Warning").unwrap().values(), vec!["a", "b c"]);
    }

    #[test]
    fn junk_lines_are_ignored() {
        let h = parse_header_block("no colon here\r\n folded junk\r\nA: 1", "\r\n");
        assert_eq!(h.len(), 1);
        assert_eq!(h.get_str("A"), Some("1"));
    }

    #[test]
    fn insert_and_remove() {
        let mut h = HeaderMap::new();
        h.append("Accept", "*/*");
        h.append("X-A", "1");
        h.insert("accept", "text/html".into());
        assert_eq!(h.iter().next().map(|(n, _)| n), Some("accept"));
        assert_eq!(h.remove("X-a"), Some(HeaderValue::Single("1".to_string())));
        assert!(!h.contains("x-a"));
        assert_eq!(h.get("Accept").map(|v| v.to_string()), Some("text/html".to_string()));
    }
}
