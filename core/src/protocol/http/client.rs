/*
 * client.rs
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

//! HTTP client: runs one request through connect, send, read, redirect and shutdown.
//!
//! Each request is a loop over `State`. The connection is owned by the state that uses it,
//! so every exit path (including errors) drops and closes it. Redirects go back to `Send`
//! on a kept-alive connection to the same host and to `Connect` otherwise.
//!
//! Once the final response body is assembled it is gunzipped if the server compressed it
//! and converted to UTF-8 if its charset can be determined. Failures of either step are
//! logged and leave the body as received.

use std::mem;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use log::Level;
use url::{Host, Url};

use crate::charset::{detect_charset, transcode};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::gzip;
use crate::logging::{LogCrateSink, LogSink, LOG_TARGET};
use crate::protocol::http::connection::{Connector, HttpConnection, TcpConnector};
use crate::protocol::http::cookie::CookieJar;
use crate::protocol::http::h1::{parse_response, ChunkProgress, ChunkedDecoder, ParseResult};
use crate::protocol::http::header::HeaderMap;
use crate::protocol::http::request::{Method, Request};
use crate::protocol::http::response::{Newline, Response};

/// Per-call switches.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Follow `Location` on the final response. When off, a redirect response is returned
    /// as the result.
    pub follow_redirects: bool,
    /// Return only the body instead of the full result.
    pub body_only: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            body_only: false,
        }
    }
}

/// Final response of a request, after redirects and content decoding.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL as given by the caller.
    pub request_url: String,
    /// URL of the final response.
    pub url: String,
    pub redirects: u32,
    pub protocol: String,
    pub status_code: u16,
    pub status_text: String,
    pub newline: Newline,
    /// Response fields without `Set-Cookie`.
    pub headers: HeaderMap,
    /// Caller cookies updated with what the server set; revoked cookies removed.
    pub cookies: CookieJar,
    /// Charset the body was sent in, when it could be determined.
    pub charset: Option<String>,
    /// Body was converted from `charset` to UTF-8.
    pub transcoded: bool,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Full(FetchResult),
    Body(Bytes),
}

impl FetchOutcome {
    pub fn body(&self) -> &Bytes {
        match self {
            FetchOutcome::Full(result) => &result.body,
            FetchOutcome::Body(body) => body,
        }
    }

    pub fn into_result(self) -> Option<FetchResult> {
        match self {
            FetchOutcome::Full(result) => Some(result),
            FetchOutcome::Body(_) => None,
        }
    }
}

/// Final response with its decoded body.
struct Completed {
    response: Response,
    body: Bytes,
    charset: Option<String>,
    transcoded: bool,
}

/// What happens after the connection is closed.
enum After {
    Reconnect,
    Finish(Box<Completed>),
}

enum State<S> {
    Connect,
    Send(HttpConnection<S>),
    Read(HttpConnection<S>),
    Shutdown(HttpConnection<S>, After),
    End(Box<Completed>),
}

/// Mutable state of one request across its redirect chain.
struct Session {
    request_url: String,
    url: Url,
    headers: Vec<(String, String)>,
    payload: Option<Bytes>,
    /// Cookies the caller sent.
    caller_cookies: CookieJar,
    /// Caller cookies overlaid with everything the server set so far.
    jar: CookieJar,
    /// Caller `Host` value, sent only while the endpoint is `origin`.
    host_override: Option<String>,
    origin: (String, u16),
    redirects: u32,
}

impl Session {
    fn new(request: Request, config: &ClientConfig) -> Result<Self, FetchError> {
        let url = parse_url(&request.url)?;
        let origin = endpoint(&url)?;
        let mut caller_cookies = CookieJar::new();
        let mut host_override = None;
        let mut headers = config.default_headers();
        for (name, value) in request.headers {
            if name.eq_ignore_ascii_case("Cookie") {
                caller_cookies.overlay(CookieJar::from_header(&value));
                continue;
            }
            if name.eq_ignore_ascii_case("Host") {
                host_override = Some(value);
                continue;
            }
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
                Some(entry) => *entry = (name, value),
                None => headers.push((name, value)),
            }
        }
        Ok(Self {
            request_url: request.url,
            url,
            headers,
            payload: request.payload,
            jar: caller_cookies.clone(),
            caller_cookies,
            host_override,
            origin,
            redirects: 0,
        })
    }

    fn method(&self) -> Method {
        if self.payload.is_some() {
            Method::Post
        } else {
            Method::Get
        }
    }

    /// The caller's `Host`, unless a redirect has left the original host and port.
    fn host_header(&self) -> Option<&str> {
        let same_endpoint = endpoint(&self.url).map_or(false, |e| e == self.origin);
        self.host_override.as_deref().filter(|_| same_endpoint)
    }

    /// Origin-form request target: path and query.
    fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// Parse a request URL. A missing scheme means http.
pub(crate) fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{}", raw))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?,
        Err(e) => return Err(FetchError::InvalidUrl(format!("{}: {}", raw, e))),
    };
    endpoint(&url)?;
    Ok(url)
}

/// Host and port to connect to. Only http URLs with a host are accepted.
fn endpoint(url: &Url) -> Result<(String, u16), FetchError> {
    if url.scheme() != "http" {
        return Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            url,
            url.scheme()
        )));
    }
    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(FetchError::InvalidUrl(format!("{}: missing host", url))),
    };
    Ok((host, url.port_or_known_default().unwrap_or(80)))
}

/// HTTP/1.1 client. Holds configuration and the log sink; each `fetch` is independent.
pub struct HttpClient<C: Connector = TcpConnector> {
    connector: C,
    config: ClientConfig,
    log: Arc<dyn LogSink>,
}

impl HttpClient<TcpConnector> {
    pub fn new(config: ClientConfig) -> Self {
        let connector = TcpConnector::new(config.connect_timeout());
        Self::with_connector(connector, config)
    }
}

impl Default for HttpClient<TcpConnector> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<C: Connector> HttpClient<C> {
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self {
            connector,
            config,
            log: Arc::new(LogCrateSink),
        }
    }

    /// Replace the default sink (which forwards to the `log` crate).
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = sink;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run `request` to completion.
    pub async fn fetch(
        &self,
        request: Request,
        options: FetchOptions,
    ) -> Result<FetchOutcome, FetchError> {
        let result = self.run(request, options.follow_redirects).await?;
        if options.body_only {
            Ok(FetchOutcome::Body(result.body))
        } else {
            Ok(FetchOutcome::Full(result))
        }
    }

    /// Run `request` following redirects and return the full result.
    pub async fn fetch_full(&self, request: Request) -> Result<FetchResult, FetchError> {
        self.run(request, true).await
    }

    fn debug(&self, message: &str, detail: impl FnOnce() -> String) {
        if self.config.debug_reads {
            self.log.log(Level::Debug, message, Some(&detail()));
        }
    }

    async fn run(&self, request: Request, follow_redirects: bool) -> Result<FetchResult, FetchError> {
        let mut session = Session::new(request, &self.config)?;
        let mut state = State::Connect;
        let completed = loop {
            state = match state {
                State::Connect => State::Send(self.connect(&session.url).await?),
                State::Send(mut conn) => {
                    self.send(&mut conn, &session).await?;
                    State::Read(conn)
                }
                State::Read(conn) => self.read(conn, &mut session, follow_redirects).await?,
                State::Shutdown(conn, after) => {
                    if let Err(e) = conn.shutdown().await {
                        log::trace!(target: LOG_TARGET, "shutdown: {}", e);
                    }
                    match after {
                        After::Reconnect => State::Connect,
                        After::Finish(completed) => State::End(completed),
                    }
                }
                State::End(completed) => break completed,
            };
        };

        let Completed {
            response,
            body,
            charset,
            transcoded,
        } = *completed;
        let cookies = session.jar.finish(session.caller_cookies);
        Ok(FetchResult {
            request_url: session.request_url,
            url: session.url.to_string(),
            redirects: session.redirects,
            protocol: response.protocol,
            status_code: response.status_code,
            status_text: response.status_text,
            newline: response.newline,
            headers: response.headers,
            cookies,
            charset,
            transcoded,
            body,
        })
    }

    async fn connect(&self, url: &Url) -> Result<HttpConnection<C::Stream>, FetchError> {
        let (host, port) = endpoint(url)?;
        log::trace!(target: LOG_TARGET, "connect {}:{}", host, port);
        let stream = self
            .connector
            .connect(&host, port)
            .await
            .map_err(|source| FetchError::ConnectionFailed {
                host: host.clone(),
                port,
                source,
            })?;
        Ok(HttpConnection::new(
            stream,
            host,
            port,
            self.config.read_timeout(),
            self.config.read_chunk_size,
        ))
    }

    async fn send(
        &self,
        conn: &mut HttpConnection<C::Stream>,
        session: &Session,
    ) -> Result<(), FetchError> {
        let mut headers = session.headers.clone();
        if let Some(host) = session.host_header() {
            headers.insert(0, ("Host".to_string(), host.to_string()));
        }
        if let Some(cookie) = session.jar.request_header() {
            headers.push(("Cookie".to_string(), cookie));
        }
        let target = session.target();
        log::trace!(target: LOG_TARGET, "{} {}", session.method().as_str(), session.url);
        conn.write_request(session.method(), &target, &headers, session.payload.as_deref())
            .await?;
        Ok(())
    }

    /// Read one final response (skipping `100 Continue`) and decide the next state.
    async fn read(
        &self,
        mut conn: HttpConnection<C::Stream>,
        session: &mut Session,
        follow_redirects: bool,
    ) -> Result<State<C::Stream>, FetchError> {
        let mut buf = BytesMut::new();
        let mut response = loop {
            let mut response = self.read_head(&mut conn, &mut buf).await?;
            session.jar.overlay(response.cookies());
            response.headers.remove("Set-Cookie");
            if response.status_code == 100 {
                // Whatever followed the interim response belongs to the next one.
                buf = mem::take(&mut response.body);
                continue;
            }
            break response;
        };
        let reached_eof = self.read_body(&mut conn, &mut response).await?;

        if follow_redirects {
            if let Some(next) = response.location().and_then(|loc| session.url.join(loc).ok()) {
                if let Some(max) = self.config.max_redirects {
                    if session.redirects >= max {
                        return Err(FetchError::TooManyRedirects(max));
                    }
                }
                self.debug("redirect", || format!("{} -> {}", session.url, next));
                session.redirects += 1;
                session.url = next;
                if response.status_code == 303 && session.payload.is_some() {
                    session.payload = None;
                    session.headers.retain(|(n, _)| !n.eq_ignore_ascii_case("Content-Type"));
                }
                let reusable = response.keep_alive()
                    && !reached_eof
                    && endpoint(&session.url)
                        .map_or(false, |(host, port)| host == conn.host() && port == conn.port());
                return Ok(if reusable {
                    State::Send(conn)
                } else {
                    State::Shutdown(conn, After::Reconnect)
                });
            }
        }

        let completed = self.decode_content(response);
        Ok(State::Shutdown(conn, After::Finish(Box::new(completed))))
    }

    /// Read until the response head parses. Bytes after the head stay in the response body.
    async fn read_head(
        &self,
        conn: &mut HttpConnection<C::Stream>,
        buf: &mut BytesMut,
    ) -> Result<Response, FetchError> {
        loop {
            if !buf.is_empty() {
                if let ParseResult::Parsed(response) = parse_response(&buf[..], None) {
                    self.debug("initial read", || String::from_utf8_lossy(&buf[..]).into_owned());
                    return Ok(response);
                }
            }
            if conn.read_into(buf).await? == 0 {
                return Err(FetchError::IncompleteResponse(
                    "connection closed before the response head was complete",
                ));
            }
        }
    }

    /// Complete the body per its framing. Returns true when the body ran to EOF.
    async fn read_body(
        &self,
        conn: &mut HttpConnection<C::Stream>,
        response: &mut Response,
    ) -> Result<bool, FetchError> {
        if !response.has_body() {
            response.body.clear();
            return Ok(false);
        }

        if response.is_chunked() {
            self.debug("transfer", || "chunked".to_string());
            let mut raw = mem::take(&mut response.body);
            let mut decoder = ChunkedDecoder::new();
            let mut reached_eof = false;
            while decoder.receive(&mut raw)? == ChunkProgress::NeedMore {
                self.debug("before reading", || {
                    format!(
                        "{} decoded in {} chunks, {} buffered",
                        decoder.body_len(),
                        decoder.chunks(),
                        raw.len()
                    )
                });
                if conn.read_into(&mut raw).await? == 0 {
                    if decoder.in_trailer() {
                        // The body is complete; only the trailer section was cut short.
                        reached_eof = true;
                        break;
                    }
                    return Err(FetchError::IncompleteResponse(
                        "connection closed before the last chunk",
                    ));
                }
            }
            self.debug("end of chunked body", || {
                format!("{} bytes in {} chunks", decoder.body_len(), decoder.chunks())
            });
            response.body = decoder.into_body();
            return Ok(reached_eof);
        }

        if let Some(raw_length) = response.content_length_raw() {
            let length: usize = raw_length.parse().map_err(|_| {
                FetchError::MalformedResponse(format!("invalid Content-Length {:?}", raw_length))
            })?;
            self.debug("transfer", || format!("Content-Length {}", length));
            while response.body.len() < length {
                if conn.read_into(&mut response.body).await? == 0 {
                    return Err(FetchError::IncompleteResponse(
                        "connection closed before Content-Length bytes were read",
                    ));
                }
            }
            response.body.truncate(length);
            self.debug("after reading", || format!("{} of {}", response.body.len(), length));
            return Ok(false);
        }

        self.debug("transfer", || "until EOF".to_string());
        while conn.read_into(&mut response.body).await? > 0 {}
        self.debug("after reading", || format!("{} read", response.body.len()));
        Ok(true)
    }

    /// Undo content coding, then convert the body to UTF-8 when its charset is known.
    fn decode_content(&self, mut response: Response) -> Completed {
        let mut body: Vec<u8> = mem::take(&mut response.body).to_vec();

        let coding = response
            .headers
            .get_str("Content-Encoding")
            .map(|v| v.trim().to_ascii_lowercase());
        let decoded = match coding.as_deref() {
            Some("gzip") | Some("x-gzip") => Some(gzip::decode(&body)),
            Some("deflate") => Some(gzip::decode_deflate(&body)),
            _ => None,
        };
        match decoded {
            Some(Ok(plain)) => body = plain,
            Some(Err(e)) => self.log.log(
                Level::Warn,
                "content decoding failed, keeping encoded body",
                Some(&e.to_string()),
            ),
            None => {}
        }

        let charset = detect_charset(response.content_type(), &body);
        let mut transcoded = false;
        if let Some(charset) = &charset {
            match transcode(&body, charset) {
                Ok(utf8) => {
                    body = utf8;
                    transcoded = true;
                }
                Err(e) => self.log.log(
                    Level::Warn,
                    "charset conversion failed, keeping original body",
                    Some(&e.to_string()),
                ),
            }
        }

        Completed {
            response,
            body: Bytes::from(body),
            charset,
            transcoded,
        }
    }
}
