/*
 * detect.rs
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

//! Charset detection for a response body.
//!
//! Priority: `charset` parameter of the Content-Type header, then a per-type rule:
//! HTML `<meta>` inside `<head>`, the XML declaration (default UTF-8), ISO-8859-1 for other
//! `text/*` (RFC 2616 §3.7.1). Other media types have no default.

/// Media type with its `charset` parameter, both lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub mime_type: String,
    pub charset: Option<String>,
}

impl MediaType {
    pub fn is_xml(&self) -> bool {
        matches!(self.mime_type.as_str(), "text/xml" | "application/xml")
            || self.mime_type.ends_with("+xml")
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

fn clean_charset(value: &str) -> Option<String> {
    let value = value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_ascii_lowercase())
    }
}

/// Parse `type/subtype (";" name=value)*`. Only `charset` is kept.
pub fn parse_media_type(value: &str) -> Option<MediaType> {
    let mut parts = value.split(';');
    let mime_type = parts.next()?.trim().to_ascii_lowercase();
    if mime_type.is_empty() {
        return None;
    }
    let mut charset = None;
    for param in parts {
        if let Some((name, v)) = param.split_once('=') {
            if charset.is_none() && name.trim().eq_ignore_ascii_case("charset") {
                charset = clean_charset(v);
            }
        }
    }
    Some(MediaType { mime_type, charset })
}

/// Determine the charset of a body from its Content-Type and leading bytes.
pub fn detect_charset(content_type: Option<&str>, body_prefix: &[u8]) -> Option<String> {
    let media = parse_media_type(content_type?)?;
    if let Some(charset) = media.charset {
        return Some(charset);
    }
    if media.mime_type == "text/html" {
        return head_region(body_prefix).and_then(meta_charset);
    }
    if media.is_xml() {
        return Some(xml_declared_encoding(body_prefix).unwrap_or_else(|| "utf-8".to_string()));
    }
    if media.is_text() {
        return Some("iso-8859-1".to_string());
    }
    None
}

fn find_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| i + from)
}

/// Content of the first `<head>` element, up to the first `</head>`.
fn head_region(body: &[u8]) -> Option<&[u8]> {
    let mut from = 0;
    let content_start = loop {
        let start = find_ci(body, b"<head", from)?;
        let after = start + 5;
        match body.get(after) {
            Some(b'>') => break after + 1,
            Some(b) if b.is_ascii_whitespace() => {
                let gt = body[after..].iter().position(|&b| b == b'>')?;
                break after + gt + 1;
            }
            // <header>, <heading> ...
            _ => from = after,
        }
    };
    let end = find_ci(body, b"</head>", content_start)?;
    Some(&body[content_start..end])
}

/// Charset from `<meta http-equiv="Content-Type" content="...">` or `<meta charset="...">`.
fn meta_charset(head: &[u8]) -> Option<String> {
    let mut from = 0;
    while let Some(start) = find_ci(head, b"<meta", from) {
        let attrs_start = start + 5;
        let end = head[attrs_start..]
            .iter()
            .position(|&b| b == b'>')
            .map(|i| attrs_start + i)
            .unwrap_or(head.len());
        from = end;
        let boundary = head
            .get(attrs_start)
            .map_or(false, |b| b.is_ascii_whitespace() || *b == b'/');
        if !boundary {
            continue;
        }
        let attrs = parse_attributes(&head[attrs_start..end]);
        if attribute(&attrs, "http-equiv").map_or(false, |v| v.eq_ignore_ascii_case("content-type")) {
            if let Some(charset) = attribute(&attrs, "content")
                .and_then(parse_media_type)
                .and_then(|m| m.charset)
            {
                return Some(charset);
            }
        }
        if let Some(charset) = attribute(&attrs, "charset").and_then(clean_charset) {
            return Some(charset);
        }
    }
    None
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// `encoding` pseudo-attribute of a leading `<?xml ... ?>` declaration.
fn xml_declared_encoding(body: &[u8]) -> Option<String> {
    let body = body.strip_prefix(b"\xef\xbb\xbf").unwrap_or(body);
    if !body.starts_with(b"<?xml") || !body.get(5)?.is_ascii_whitespace() {
        return None;
    }
    let end = body.windows(2).position(|w| w == b"?>")?;
    parse_attributes(&body[5..end])
        .into_iter()
        .find(|(name, _)| name == "encoding")
        .and_then(|(_, value)| clean_charset(&value))
}

/// Tag attributes as (lower-cased name, value). Values may be double-quoted, single-quoted or bare.
fn parse_attributes(raw: &[u8]) -> Vec<(String, String)> {
    let s = String::from_utf8_lossy(raw);
    let b = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < b.len() {
        while i < b.len() && (b[i].is_ascii_whitespace() || b[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'=' && b[i] != b'/' {
            i += 1;
        }
        if i == name_start {
            break;
        }
        let name = s[name_start..i].to_ascii_lowercase();
        while i < b.len() && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < b.len() && b[i] == b'=' {
            i += 1;
            while i < b.len() && b[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < b.len() && (b[i] == b'"' || b[i] == b'\'') {
                let quote = b[i];
                i += 1;
                let value_start = i;
                while i < b.len() && b[i] != quote {
                    i += 1;
                }
                let v = &s[value_start..i];
                if i < b.len() {
                    i += 1;
                }
                v
            } else {
                let value_start = i;
                while i < b.len() && !b[i].is_ascii_whitespace() {
                    i += 1;
                }
                &s[value_start..i]
            };
            out.push((name, value.to_string()));
        } else {
            out.push((name, String::new()));
        }
    }
    out
}
