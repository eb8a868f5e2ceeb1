/*
 * fan_out.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * fetch_all against a loopback server that counts concurrent connections.
 *
 * Run with:
 *   cargo test -p httpfetch_core --test fan_out -- --nocapture
 */

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use httpfetch_core::{fetch_all, ClientConfig, FetchError, HttpClient};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

struct Counters {
    active: AtomicUsize,
    max: AtomicUsize,
}

#[tokio::test]
async fn window_bounds_concurrency() {
    common::init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let counters = Arc::new(Counters {
        active: AtomicUsize::new(0),
        max: AtomicUsize::new(0),
    });

    let server = {
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    let now = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
                    counters.max.fetch_max(now, Ordering::SeqCst);
                    let mut buf = Vec::new();
                    let request = common::read_request(&mut stream, &mut buf).await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    // Leave before answering: the client may start its next request
                    // as soon as it sees the response.
                    counters.active.fetch_sub(1, Ordering::SeqCst);
                    let path = request
                        .map(|r| r.request_line().split(' ').nth(1).unwrap_or("").to_string())
                        .unwrap_or_default();
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
                        path.len(),
                        path
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        })
    };

    let mut urls: Vec<String> = (0..7)
        .map(|i| format!("http://127.0.0.1:{}/item/{}", port, i))
        .collect();
    urls.push("ftp://nope".to_string());

    let client = Arc::new(HttpClient::new(ClientConfig::default()));
    let mut done = Vec::new();
    fetch_all(client, urls, |url, result| done.push((url, result))).await;
    server.abort();

    assert_eq!(done.len(), 8);
    let mut ok = 0;
    for (url, result) in &done {
        match result {
            Ok(r) => {
                ok += 1;
                assert_eq!(r.status_code, 200);
                assert!(url.ends_with(std::str::from_utf8(&r.body).unwrap()), "{}", url);
            }
            Err(e) => {
                assert_eq!(url, "ftp://nope");
                assert!(matches!(e, FetchError::InvalidUrl(_)));
            }
        }
    }
    assert_eq!(ok, 7);
    let max = counters.max.load(Ordering::SeqCst);
    assert!(max <= 5, "{} concurrent connections", max);
    assert!(max >= 2, "requests did not overlap");
}

#[tokio::test]
async fn empty_input_finishes() {
    let client = Arc::new(HttpClient::default());
    let mut calls = 0;
    fetch_all(client, Vec::<String>::new(), |_, _| calls += 1).await;
    assert_eq!(calls, 0);
}
