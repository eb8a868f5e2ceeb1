/*
 * date.rs
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

//! HTTP-date parsing (RFC 7231 section 7.1.1.1): IMF-fixdate, obsolete RFC 850 and asctime.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Parse an HTTP-date. Returns None on parse failure.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_obsolete_date(value)
}

/// RFC 850 ("Sunday, 06-Nov-94 08:49:37 GMT") and asctime ("Sun Nov  6 08:49:37 1994").
/// Both are always UTC.
fn parse_obsolete_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let value = value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))
        .unwrap_or(&value);
    const FORMATS: &[&str] = &[
        "%A, %d-%b-%y %H:%M:%S",
        "%a, %d-%b-%Y %H:%M:%S",
        "%a %b %d %H:%M:%S %Y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format as IMF-fixdate, e.g. "Sun, 06 Nov 1994 08:49:37 GMT".
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Retry-After` is either an HTTP-date or a number of seconds from `now`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u32>() {
        return Some(now + Duration::seconds(i64::from(secs)));
    }
    parse_http_date(value)
}
