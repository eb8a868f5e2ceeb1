/*
 * transcode.rs
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

//! Byte-level charset conversion. UTF-8 is the pivot: every source is decoded to a `String`,
//! then encoded into the target. Malformed sequences become U+FFFD, except that UTF-8 input
//! converted to UTF-8 is passed through with only its BOM removed.

use crate::error::CharsetError;

const BOM_UTF8: &[u8] = b"\xef\xbb\xbf";
const BOM_UTF16_LE: &[u8] = b"\xff\xfe";
const BOM_UTF16_BE: &[u8] = b"\xfe\xff";
const BOM_UTF32_LE: &[u8] = b"\xff\xfe\x00\x00";
const BOM_UTF32_BE: &[u8] = b"\x00\x00\xfe\xff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    /// `None`: byte order comes from the BOM.
    Utf16(Option<ByteOrder>),
    Utf32(Option<ByteOrder>),
    Latin1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

fn lookup(name: &str) -> Option<Encoding> {
    let encoding = match name {
        "utf-8" | "utf8" => Encoding::Utf8,
        "utf-16" | "ucs-2" => Encoding::Utf16(None),
        "utf-16le" | "ucs-2le" => Encoding::Utf16(Some(ByteOrder::Little)),
        "utf-16be" | "ucs-2be" => Encoding::Utf16(Some(ByteOrder::Big)),
        "utf-32" | "ucs-4" => Encoding::Utf32(None),
        "utf-32le" | "ucs-4le" => Encoding::Utf32(Some(ByteOrder::Little)),
        "utf-32be" | "ucs-4be" => Encoding::Utf32(Some(ByteOrder::Big)),
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" | "us-ascii" | "ascii" => {
            Encoding::Latin1
        }
        _ => return None,
    };
    Some(encoding)
}

/// Convert `data` from `source` into UTF-8. UTF-8 input is returned as is, minus a BOM.
pub fn transcode(data: &[u8], source: &str) -> Result<Vec<u8>, CharsetError> {
    if lookup(&source.trim().to_ascii_lowercase()) == Some(Encoding::Utf8) {
        return Ok(strip_bom8(data).to_vec());
    }
    decode(data, source).map(String::into_bytes)
}

/// Convert `data` into UTF-8, taking the encoding from its byte order mark.
pub fn transcode_auto(data: &[u8]) -> Result<Vec<u8>, CharsetError> {
    if bom32(data).is_none() && bom16(data).is_none() {
        if let Some(rest) = data.strip_prefix(BOM_UTF8) {
            return Ok(rest.to_vec());
        }
    }
    decode_by_bom(data).map(String::into_bytes)
}

fn strip_bom8(data: &[u8]) -> &[u8] {
    data.strip_prefix(BOM_UTF8).unwrap_or(data)
}

/// Convert between any two supported encodings. `source` of `None` sniffs the BOM.
/// A `+bom` suffix on `target` prepends a byte order mark; `utf-16`/`utf-32` targets are
/// big-endian and always carry one.
pub fn convert(data: &[u8], source: Option<&str>, target: &str) -> Result<Vec<u8>, CharsetError> {
    let text = match source {
        Some(source) => decode(data, source)?,
        None => decode_by_bom(data)?,
    };
    let target = target.trim().to_ascii_lowercase();
    let (name, with_bom) = match target.strip_suffix("+bom") {
        Some(name) => (name, true),
        None => (target.as_str(), false),
    };
    let encoding = lookup(name).ok_or_else(|| CharsetError::Unsupported(target.clone()))?;
    Ok(encode(&text, encoding, with_bom))
}

fn decode(data: &[u8], source: &str) -> Result<String, CharsetError> {
    let name = source.trim().to_ascii_lowercase();
    let encoding = lookup(&name).ok_or_else(|| CharsetError::Unsupported(name.clone()))?;
    let text = match encoding {
        Encoding::Utf8 => decode_utf8(strip_bom8(data)),
        Encoding::Utf16(Some(order)) => decode_utf16(strip_bom16(data, order), order),
        Encoding::Utf16(None) => {
            let order = bom16(data).ok_or(CharsetError::MissingByteOrderMark(name))?;
            decode_utf16(&data[2..], order)
        }
        Encoding::Utf32(Some(order)) => decode_utf32(strip_bom32(data, order), order),
        Encoding::Utf32(None) => {
            let order = bom32(data).ok_or(CharsetError::MissingByteOrderMark(name))?;
            decode_utf32(&data[4..], order)
        }
        Encoding::Latin1 => data.iter().map(|&b| b as char).collect(),
    };
    Ok(text)
}

fn decode_by_bom(data: &[u8]) -> Result<String, CharsetError> {
    // UTF-32LE before UTF-16LE: FF FE 00 00 starts with the UTF-16LE mark.
    if let Some(order) = bom32(data) {
        return Ok(decode_utf32(&data[4..], order));
    }
    if let Some(order) = bom16(data) {
        return Ok(decode_utf16(&data[2..], order));
    }
    if let Some(rest) = data.strip_prefix(BOM_UTF8) {
        return Ok(decode_utf8(rest));
    }
    Err(CharsetError::MissingByteOrderMark("auto".to_string()))
}

fn bom16(data: &[u8]) -> Option<ByteOrder> {
    if data.starts_with(BOM_UTF16_LE) {
        Some(ByteOrder::Little)
    } else if data.starts_with(BOM_UTF16_BE) {
        Some(ByteOrder::Big)
    } else {
        None
    }
}

fn bom32(data: &[u8]) -> Option<ByteOrder> {
    if data.starts_with(BOM_UTF32_LE) {
        Some(ByteOrder::Little)
    } else if data.starts_with(BOM_UTF32_BE) {
        Some(ByteOrder::Big)
    } else {
        None
    }
}

fn strip_bom16(data: &[u8], order: ByteOrder) -> &[u8] {
    let bom = match order {
        ByteOrder::Little => BOM_UTF16_LE,
        ByteOrder::Big => BOM_UTF16_BE,
    };
    data.strip_prefix(bom).unwrap_or(data)
}

fn strip_bom32(data: &[u8], order: ByteOrder) -> &[u8] {
    let bom = match order {
        ByteOrder::Little => BOM_UTF32_LE,
        ByteOrder::Big => BOM_UTF32_BE,
    };
    data.strip_prefix(bom).unwrap_or(data)
}

fn decode_utf8(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn decode_utf16(data: &[u8], order: ByteOrder) -> String {
    let units = data.chunks_exact(2).map(|pair| match order {
        ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
        ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
    });
    let mut text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if data.len() % 2 != 0 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf32(data: &[u8], order: ByteOrder) -> String {
    let mut text: String = data
        .chunks_exact(4)
        .map(|quad| {
            let bytes = [quad[0], quad[1], quad[2], quad[3]];
            let value = match order {
                ByteOrder::Little => u32::from_le_bytes(bytes),
                ByteOrder::Big => u32::from_be_bytes(bytes),
            };
            char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    if data.len() % 4 != 0 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn encode(text: &str, encoding: Encoding, with_bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    match encoding {
        Encoding::Utf8 => {
            if with_bom {
                out.extend_from_slice(BOM_UTF8);
            }
            out.extend_from_slice(text.as_bytes());
        }
        Encoding::Utf16(order) => {
            let (order, with_bom) = match order {
                Some(order) => (order, with_bom),
                None => (ByteOrder::Big, true),
            };
            if with_bom {
                out.extend_from_slice(match order {
                    ByteOrder::Little => BOM_UTF16_LE,
                    ByteOrder::Big => BOM_UTF16_BE,
                });
            }
            for unit in text.encode_utf16() {
                match order {
                    ByteOrder::Little => out.extend_from_slice(&unit.to_le_bytes()),
                    ByteOrder::Big => out.extend_from_slice(&unit.to_be_bytes()),
                }
            }
        }
        Encoding::Utf32(order) => {
            let (order, with_bom) = match order {
                Some(order) => (order, with_bom),
                None => (ByteOrder::Big, true),
            };
            if with_bom {
                out.extend_from_slice(match order {
                    ByteOrder::Little => BOM_UTF32_LE,
                    ByteOrder::Big => BOM_UTF32_BE,
                });
            }
            for c in text.chars() {
                match order {
                    ByteOrder::Little => out.extend_from_slice(&(c as u32).to_le_bytes()),
                    ByteOrder::Big => out.extend_from_slice(&(c as u32).to_be_bytes()),
                }
            }
        }
        Encoding::Latin1 => {
            out.extend(text.chars().map(|c| u8::try_from(c as u32).unwrap_or(b'?')));
        }
    }
    out
}
