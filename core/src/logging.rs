/*
 * logging.rs
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

//! Log sink for protocol events. The surrounding application owns format and destination;
//! the default sink forwards to the `log` facade.

use log::Level;

/// Target used for everything this crate logs.
pub const LOG_TARGET: &str = "httpfetch";

/// Receives protocol events: `(level, message, optional detail)`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str, detail: Option<&str>);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str, _detail: Option<&str>) {}
}

/// Forwards to the `log` crate under target `httpfetch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => log::log!(target: LOG_TARGET, level, "{}: {}", message, detail),
            None => log::log!(target: LOG_TARGET, level, "{}", message),
        }
    }
}
