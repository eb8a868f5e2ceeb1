/*
 * common/mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Scripted loopback HTTP server for the integration tests. Each accepted
 * connection follows one entry of the script: read a request, write the
 * canned response in the given pieces, repeat, then close.
 */

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Response pieces, written with a short pause between them so they arrive in separate reads.
pub type Exchange = Vec<Vec<u8>>;
/// Exchanges served on one connection before it is closed.
pub type Connection = Vec<Exchange>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Single-piece response.
pub fn reply(raw: &[u8]) -> Exchange {
    vec![raw.to_vec()]
}

pub fn pieces(parts: &[&[u8]]) -> Exchange {
    parts.iter().map(|p| p.to_vec()).collect()
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }
}

pub struct TestServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<Captured>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(script: Vec<Connection>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let task = {
            let requests = Arc::clone(&requests);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                for connection in script {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        return;
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    let mut buf = Vec::new();
                    for exchange in connection {
                        let Some(request) = read_request(&mut stream, &mut buf).await else {
                            break;
                        };
                        requests.lock().unwrap().push(request);
                        for piece in exchange {
                            if stream.write_all(&piece).await.is_err() {
                                break;
                            }
                            let _ = stream.flush().await;
                            tokio::time::sleep(Duration::from_millis(5)).await;
                        }
                    }
                    let _ = stream.shutdown().await;
                }
            })
        };
        Self {
            port,
            requests,
            connections,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one request head and its Content-Length body. None at EOF.
pub async fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<Captured> {
    loop {
        if let Some(end) = find(buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let captured = Captured {
                head,
                body: Vec::new(),
            };
            let length: usize = captured
                .header("Content-Length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let total = end + 4 + length;
            while buf.len() < total {
                let mut tmp = [0u8; 1024];
                let n = stream.read(&mut tmp).await.ok()?;
                if n == 0 {
                    return None;
                }
                buf.extend_from_slice(&tmp[..n]);
            }
            let body = buf[end + 4..total].to_vec();
            buf.drain(..total);
            return Some(Captured { body, ..captured });
        }
        let mut tmp = [0u8; 1024];
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
}
