/*
 * cache.rs
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

//! Conditional GET against a local cache file.
//!
//! The cache file's mtime is the validator: it is sent as `If-Modified-Since` and set from
//! `Last-Modified` when a new body is stored. A `<cache>.lock` file serializes users of the
//! same cache file across tasks and processes.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::time::sleep;

use crate::error::FetchError;
use crate::logging::LOG_TARGET;
use crate::protocol::http::client::HttpClient;
use crate::protocol::http::connection::Connector;
use crate::protocol::http::date::{format_http_date, parse_http_date};
use crate::protocol::http::request::Request;

const DEFAULT_LOCK_RETRIES: u32 = 15;
const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Further attempts after the lock file was found to exist.
    pub lock_retries: u32,
    pub lock_retry_delay: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            lock_retries: DEFAULT_LOCK_RETRIES,
            lock_retry_delay: DEFAULT_LOCK_RETRY_DELAY,
        }
    }
}

/// Exclusive lock on a cache file, held as long as this value lives.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    pub async fn acquire(cache_path: &Path, policy: &CachePolicy) -> Result<Self, FetchError> {
        let path = lock_path(cache_path);
        let mut attempts = 0;
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempts < policy.lock_retries => {
                    attempts += 1;
                    log::debug!(target: LOG_TARGET, "{} is locked, retry {}", path.display(), attempts);
                    sleep(policy.lock_retry_delay).await;
                }
                Err(e) => {
                    return Err(FetchError::Cache(format!(
                        "cannot lock {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!(target: LOG_TARGET, "cannot remove {}: {}", self.path.display(), e);
        }
    }
}

fn lock_path(cache_path: &Path) -> PathBuf {
    let mut name = OsString::from(cache_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn cache_error(path: &Path, e: io::Error) -> FetchError {
    FetchError::Cache(format!("{}: {}", path.display(), e))
}

/// GET `url` through the cache file at `cache_path`, with the default lock policy.
pub async fn fetch_cached<C: Connector>(
    client: &HttpClient<C>,
    url: &str,
    cache_path: &Path,
    headers: Vec<(String, String)>,
) -> Result<Bytes, FetchError> {
    let mut request = Request::get(url);
    for (name, value) in headers {
        request = request.header(name, value);
    }
    fetch_cached_with(client, request, cache_path, &CachePolicy::default()).await
}

/// Returns the cached bytes on 304, the new body (after storing it) on any other status
/// from 200 to 399. Other statuses fail with `FetchError::Status` and leave the cache as is.
pub async fn fetch_cached_with<C: Connector>(
    client: &HttpClient<C>,
    mut request: Request,
    cache_path: &Path,
    policy: &CachePolicy,
) -> Result<Bytes, FetchError> {
    let _lock = CacheLock::acquire(cache_path, policy).await?;

    let cached_mtime = match fs::metadata(cache_path).await {
        Ok(meta) if meta.is_file() => Some(meta.modified().map_err(|e| cache_error(cache_path, e))?),
        _ => None,
    };
    if let Some(mtime) = cached_mtime {
        request = request.header("If-Modified-Since", format_http_date(&DateTime::<Utc>::from(mtime)));
    }

    let result = client.fetch_full(request).await?;
    let code = result.status_code;
    if code == 304 && cached_mtime.is_some() {
        let cached = fs::read(cache_path)
            .await
            .map_err(|e| cache_error(cache_path, e))?;
        return Ok(Bytes::from(cached));
    }
    if !(200..400).contains(&code) || code == 304 {
        return Err(FetchError::Status(code));
    }

    fs::write(cache_path, &result.body)
        .await
        .map_err(|e| cache_error(cache_path, e))?;
    if let Some(last_modified) = result.headers.get_str("Last-Modified").and_then(parse_http_date) {
        set_mtime(cache_path, SystemTime::from(last_modified)).await?;
    }
    Ok(result.body)
}

async fn set_mtime(path: &Path, mtime: SystemTime) -> Result<(), FetchError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&owned)?
            .set_modified(mtime)
    })
    .await
    .map_err(|e| FetchError::Cache(e.to_string()))?
    .map_err(|e| cache_error(path, e))
}
