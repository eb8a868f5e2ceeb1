/*
 * cookie.rs
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

//! Cookies set by the server and the per-request jar.
//!
//! The jar starts with the cookies the caller sent. Every `Set-Cookie` seen along a redirect
//! chain overlays it by name. When the exchange completes, an empty value revokes the cookie.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;

use crate::protocol::http::date::parse_http_date;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
}

impl Cookie {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

/// Form-style URL decoding: '+' is a space, then %XX escapes.
fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

/// Parse one `Set-Cookie` value. None when the first segment has no `=` or an empty name.
pub fn parse_set_cookie(raw: &str) -> Option<(String, Cookie)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut cookie = Cookie::new(url_decode(value.trim()));
    for part in parts {
        let (attr, attr_value) = match part.split_once('=') {
            Some((a, v)) => (a.trim(), Some(v.trim())),
            None => (part.trim(), None),
        };
        match (attr.to_ascii_lowercase().as_str(), attr_value) {
            ("secure", _) => cookie.secure = true,
            ("expires", Some(v)) => cookie.expires = parse_http_date(v),
            ("path", Some(v)) => cookie.path = Some(v.to_string()),
            ("domain", Some(v)) => cookie.domain = Some(v.to_string()),
            _ => {}
        }
    }
    Some((name.to_string(), cookie))
}

/// Name-keyed cookies in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, Cookie)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookies from a `Cookie` request header (`a=1; b=2`). Pairs without `=` are skipped.
    pub fn from_header(value: &str) -> Self {
        let mut jar = Self::new();
        for pair in value.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.set(name, Cookie::new(value.trim()));
                }
            }
        }
        jar
    }

    /// Insert or replace (last write wins). A replaced cookie keeps its position.
    pub fn set(&mut self, name: &str, cookie: Cookie) {
        match self.cookies.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = cookie,
            None => self.cookies.push((name.to_string(), cookie)),
        }
    }

    /// Apply server-set cookies on top of this jar.
    pub fn overlay(&mut self, cookies: impl IntoIterator<Item = (String, Cookie)>) {
        for (name, cookie) in cookies {
            self.set(&name, cookie);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        let i = self.cookies.iter().position(|(n, _)| n == name)?;
        Some(self.cookies.remove(i).1)
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cookie)> {
        self.cookies.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value of the `Cookie` request header, or None for an empty jar.
    pub fn request_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, c)| format!("{}={}", name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Reconcile the running jar with the cookies the caller supplied: every non-empty cookie
    /// is stored, an empty one removes the caller's cookie of that name.
    pub fn finish(self, mut caller: CookieJar) -> CookieJar {
        for (name, cookie) in self.cookies {
            if cookie.value.is_empty() {
                caller.remove(&name);
            } else {
                caller.set(&name, cookie);
            }
        }
        caller
    }
}

impl IntoIterator for CookieJar {
    type Item = (String, Cookie);
    type IntoIter = std::vec::IntoIter<(String, Cookie)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cookies.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_attributes() {
        let (name, c) = parse_set_cookie(
            "sid = a%20b+c ; Path=/app; DOMAIN=.example.test; secure; Expires=Sun, 06 Nov 1994 08:49:37 GMT; HttpOnly",
        )
        .unwrap();
        assert_eq!(name, "sid");
        assert_eq!(c.value, "a b c");
        assert_eq!(c.path.as_deref(), Some("/app"));
        assert_eq!(c.domain.as_deref(), Some(".example.test"));
        assert!(c.secure);
        assert_eq!(c.expires, Some(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()));
    }

    #[test]
    fn invalid_cookie_is_discarded() {
        assert_eq!(parse_set_cookie("novalue; path=/"), None);
        assert_eq!(parse_set_cookie("=x"), None);
    }

    #[test]
    fn empty_value_parses() {
        let (name, c) = parse_set_cookie("a=").unwrap();
        assert_eq!(name, "a");
        assert_eq!(c.value, "");
    }

    #[test]
    fn request_header_joins_pairs() {
        let jar = CookieJar::from_header("a=1;  b = 2 ; junk");
        assert_eq!(jar.request_header().as_deref(), Some("a=1; b=2"));
        assert_eq!(CookieJar::new().request_header(), None);
    }

    #[test]
    fn overlay_last_write_wins() {
        let mut jar = CookieJar::from_header("a=1; b=2");
        jar.overlay(vec![
            ("b".to_string(), Cookie::new("3")),
            ("c".to_string(), Cookie::new("4")),
        ]);
        assert_eq!(jar.request_header().as_deref(), Some("a=1; b=3; c=4"));
    }

    #[test]
    fn revocation_removes_cookie() {
        let caller = CookieJar::from_header("a=1");
        let mut jar = caller.clone();
        jar.overlay(vec![("a".to_string(), Cookie::new(""))]);
        let out = jar.finish(caller);
        assert!(out.get("a").is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn revocation_of_unknown_cookie_is_dropped() {
        let caller = CookieJar::from_header("keep=1");
        let mut jar = caller.clone();
        jar.overlay(vec![
            ("gone".to_string(), Cookie::new("")),
            ("new".to_string(), Cookie::new("x")),
        ]);
        let out = jar.finish(caller);
        let names: Vec<&str> = out.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["keep", "new"]);
    }
}
