/*
 * connection.rs
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

//! HTTP connection: one stream to one host, request writing and raw reads.
//! Streams come from a `Connector`; the default opens plain TCP with a connect timeout.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::protocol::http::request::Method;

/// Opens streams for the client. Implement this to run the client over something other
/// than plain TCP.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, host: &str, port: u16) -> impl Future<Output = io::Result<TcpStream>> + Send {
        let addr = (host.to_string(), port);
        let connect_timeout = self.connect_timeout;
        async move {
            timeout(connect_timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TCP connect timed out"))?
        }
    }
}

/// One open connection. Dropping it closes the stream.
pub struct HttpConnection<S> {
    stream: S,
    host: String,
    port: u16,
    read_timeout: Option<Duration>,
    scratch: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> HttpConnection<S> {
    pub fn new(
        stream: S,
        host: String,
        port: u16,
        read_timeout: Option<Duration>,
        read_chunk_size: usize,
    ) -> Self {
        Self {
            stream,
            host,
            port,
            read_timeout,
            scratch: vec![0u8; read_chunk_size.max(1)],
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Write request line, `Host`, the given headers, and the payload (with its
    /// `Content-Length`) if any. A `Host` entry in `headers` replaces the computed one.
    pub async fn write_request(
        &mut self,
        method: Method,
        target: &str,
        headers: &[(String, String)],
        payload: Option<&[u8]>,
    ) -> io::Result<()> {
        let mut req = format!("{} {} HTTP/1.1\r\n", method.as_str(), target);
        if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("Host")) {
            let host = if self.host.contains(':') {
                format!("[{}]", self.host)
            } else {
                self.host.clone()
            };
            if self.port != 80 {
                req.push_str(&format!("Host: {}:{}\r\n", host, self.port));
            } else {
                req.push_str(&format!("Host: {}\r\n", host));
            }
        }
        for (k, v) in headers {
            req.push_str(k);
            req.push_str(": ");
            req.push_str(v);
            req.push_str("\r\n");
        }
        if let Some(body) = payload {
            req.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        req.push_str("\r\n");
        self.stream.write_all(req.as_bytes()).await?;
        if let Some(body) = payload {
            self.stream.write_all(body).await?;
        }
        self.stream.flush().await?;
        Ok(())
    }

    /// Read once into `buf`. Returns 0 at EOF.
    pub async fn read_into(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let read = self.stream.read(&mut self.scratch);
        let n = match self.read_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "HTTP read timed out"))??,
            None => read.await?,
        };
        buf.extend_from_slice(&self.scratch[..n]);
        Ok(n)
    }

    /// Close the write side and drop the stream.
    pub async fn shutdown(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
