/*
 * multi.rs
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

//! Fan-out: GET many URLs with a bounded number of requests in flight.
//! Every request runs the ordinary client state machine in its own task.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::FetchError;
use crate::logging::LOG_TARGET;
use crate::protocol::http::client::{parse_url, FetchResult, HttpClient};
use crate::protocol::http::connection::Connector;
use crate::protocol::http::request::Request;

/// Fetch every URL, at most `fan_out_window` at a time, following redirects.
/// `on_done` is called with the requested URL and its outcome as each request finishes,
/// so completion order is not input order. Invalid URLs are reported without connecting.
pub async fn fetch_all<C, I, F>(client: Arc<HttpClient<C>>, urls: I, mut on_done: F)
where
    C: Connector,
    I: IntoIterator,
    I::Item: Into<String>,
    F: FnMut(String, Result<FetchResult, FetchError>),
{
    let window = client.config().fan_out_window.max(1);
    let permits = Arc::new(Semaphore::new(window));
    let mut tasks = JoinSet::new();

    for url in urls {
        let url: String = url.into();
        if let Err(e) = parse_url(&url) {
            on_done(url, Err(e));
            continue;
        }
        let client = Arc::clone(&client);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire().await.ok();
            let result = client.fetch_full(Request::get(url.as_str())).await;
            (url, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((url, result)) => on_done(url, result),
            Err(e) => log::error!(target: LOG_TARGET, "fetch task failed: {}", e),
        }
    }
}
