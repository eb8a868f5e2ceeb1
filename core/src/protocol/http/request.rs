/*
 * request.rs
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

//! HTTP request: URL, headers, optional POST payload.
//!
//! The method is not stored; it follows from the payload (POST iff a payload is present).

use bytes::Bytes;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One request as supplied by the caller. Header names are compared case-insensitively when
/// merged over the default headers; a `Cookie` header seeds the cookie jar.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub payload: Option<Bytes>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            payload: None,
        }
    }

    pub fn post(url: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            payload: Some(payload.into()),
        }
    }

    pub fn method(&self) -> Method {
        if self.payload.is_some() {
            Method::Post
        } else {
            Method::Get
        }
    }

    /// Add or replace a header. Name is stored as given; comparison is case-insensitive per HTTP.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Multi-valued header; values are joined with "; ".
    pub fn header_list<I, S>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        self.header(name, joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_follows_payload() {
        assert_eq!(Request::get("http://a.test/").method(), Method::Get);
        assert_eq!(Request::post("http://a.test/", "x=1").method(), Method::Post);
        assert_eq!(Request::post("http://a.test/", "").method(), Method::Post);
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let r = Request::get("http://a.test/")
            .header("Accept", "*/*")
            .header("accept", "text/html");
        assert_eq!(r.headers, vec![("accept".to_string(), "text/html".to_string())]);
    }

    #[test]
    fn header_list_joins_values() {
        let r = Request::get("http://a.test/").header_list("Cookie", ["a=1", "b=2"]);
        assert_eq!(r.headers[0].1, "a=1; b=2");
    }
}
