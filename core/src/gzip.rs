/*
 * gzip.rs
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

//! Gzip member decoding (RFC 1952): header flags, optional fields, header CRC16, trailer CRC32/ISIZE.
//! The container is parsed here; the raw deflate payload is inflated with flate2.

use std::io::{self, Read, Write};

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

use crate::error::GzipError;

const ID1: u8 = 0x1f;
const ID2: u8 = 0x8b;
const CM_DEFLATE: u8 = 0x08;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
/// FTEXT | FHCRC | FEXTRA | FNAME | FCOMMENT
const FLAG_MASK: u8 = 0x1f;

const HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;
/// OS byte written by `encode`: unknown.
const OS_UNKNOWN: u8 = 0xff;

fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

fn read_u16_le(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32_le(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Skip a NUL-terminated field starting at `pos`; the NUL must lie before `limit`.
fn skip_zero_terminated(data: &[u8], pos: usize, limit: usize) -> Result<usize, GzipError> {
    if pos >= limit {
        return Err(GzipError::InvalidFormat);
    }
    data[pos..limit]
        .iter()
        .position(|&b| b == 0)
        .map(|i| pos + i + 1)
        .ok_or(GzipError::InvalidFormat)
}

/// Decode one gzip member.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, GzipError> {
    if data.len() < HEADER_LEN + TRAILER_LEN || data[0] != ID1 || data[1] != ID2 {
        return Err(GzipError::InvalidFormat);
    }
    let method = data[2];
    let flags = data[3];
    if flags & !FLAG_MASK != 0 {
        return Err(GzipError::InvalidFormat);
    }
    // Optional fields may not reach into the trailer.
    let trailer_start = data.len() - TRAILER_LEN;
    let mut pos = HEADER_LEN;

    if flags & FEXTRA != 0 {
        if pos + 2 > trailer_start {
            return Err(GzipError::InvalidFormat);
        }
        let extra_len = read_u16_le(data, pos) as usize;
        pos += 2;
        if pos + extra_len > trailer_start {
            return Err(GzipError::InvalidFormat);
        }
        pos += extra_len;
    }
    if flags & FNAME != 0 {
        pos = skip_zero_terminated(data, pos, trailer_start)?;
    }
    if flags & FCOMMENT != 0 {
        pos = skip_zero_terminated(data, pos, trailer_start)?;
    }
    if flags & FHCRC != 0 {
        if pos + 2 > trailer_start {
            return Err(GzipError::InvalidFormat);
        }
        let header_crc = read_u16_le(data, pos);
        if header_crc != (crc32(&data[..pos]) & 0xffff) as u16 {
            return Err(GzipError::InvalidFormat);
        }
        pos += 2;
    }

    let expected_crc = read_u32_le(data, trailer_start);
    let expected_len = read_u32_le(data, trailer_start + 4);

    if pos >= trailer_start {
        return Err(GzipError::InvalidFormat);
    }
    if method != CM_DEFLATE {
        return Err(GzipError::UnsupportedMethod(method));
    }

    let mut out = Vec::new();
    DeflateDecoder::new(&data[pos..trailer_start])
        .read_to_end(&mut out)
        .map_err(|_| GzipError::InvalidFormat)?;

    // ISIZE is the length modulo 2^32.
    if out.len() as u32 != expected_len || crc32(&out) != expected_crc {
        return Err(GzipError::CrcMismatch);
    }
    Ok(out)
}

/// Decode a `Content-Encoding: deflate` body. Servers send a gzip member, a zlib stream or a
/// raw deflate stream under this name; try them in that order.
pub fn decode_deflate(data: &[u8]) -> Result<Vec<u8>, GzipError> {
    if data.starts_with(&[ID1, ID2]) {
        return decode(data);
    }
    let mut out = Vec::new();
    if ZlibDecoder::new(data).read_to_end(&mut out).is_ok() {
        return Ok(out);
    }
    out.clear();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| GzipError::InvalidFormat)?;
    Ok(out)
}

/// Encode `data` as a single gzip member without optional header fields.
pub fn encode(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = vec![ID1, ID2, CM_DEFLATE, 0, 0, 0, 0, 0, 0, OS_UNKNOWN];
    let mut encoder = DeflateEncoder::new(out, Compression::default());
    encoder.write_all(data)?;
    out = encoder.finish()?;
    out.extend_from_slice(&crc32(data).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deflate_raw(data: &[u8]) -> Vec<u8> {
        let mut e = DeflateEncoder::new(Vec::new(), Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    /// Build a member with every optional field present.
    fn member_with_all_fields(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![ID1, ID2, CM_DEFLATE, FEXTRA | FNAME | FCOMMENT | FHCRC, 0, 0, 0, 0, 0, 3];
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(b"ab\x00c");
        out.extend_from_slice(b"name.txt\x00");
        out.extend_from_slice(b"a comment\x00");
        let hcrc = (crc32(&out) & 0xffff) as u16;
        out.extend_from_slice(&hcrc.to_le_bytes());
        out.extend_from_slice(&deflate_raw(payload));
        out.extend_from_slice(&crc32(payload).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out
    }

    #[test]
    fn roundtrip_empty() {
        let gz = encode(b"").unwrap();
        assert_eq!(decode(&gz).unwrap(), b"");
    }

    #[test]
    fn roundtrip_with_nul_bytes() {
        let data = b"\x00abc\x00\x00def\x00";
        assert_eq!(decode(&encode(data).unwrap()).unwrap(), data);
    }

    #[test]
    fn roundtrip_large_repetitive() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(decode(&encode(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn optional_fields_are_skipped() {
        let gz = member_with_all_fields(b"hello, world");
        assert_eq!(decode(&gz).unwrap(), b"hello, world");
    }

    #[test]
    fn header_crc_mismatch() {
        let mut gz = member_with_all_fields(b"hello");
        // The two HCRC bytes follow the comment terminator.
        let hcrc_pos = gz.windows(10).position(|w| w == b"a comment\x00").unwrap() + 10;
        gz[hcrc_pos] ^= 0xff;
        assert_eq!(decode(&gz), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn bad_magic() {
        let mut gz = encode(b"hello").unwrap();
        gz[1] = 0x8c;
        assert_eq!(decode(&gz), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn too_short() {
        assert_eq!(decode(&[ID1, ID2, 8, 0, 0, 0, 0, 0, 0, 0]), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn reserved_flag_bits() {
        let mut gz = encode(b"hello").unwrap();
        gz[3] = 0x20;
        assert_eq!(decode(&gz), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn unterminated_name() {
        let mut gz = vec![ID1, ID2, CM_DEFLATE, FNAME, 0, 0, 0, 0, 0, 3];
        gz.extend_from_slice(b"no terminator here");
        gz.extend_from_slice(&[0u8; 8]);
        // The only NUL bytes are inside the trailer.
        assert_eq!(decode(&gz), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn extra_field_underflow() {
        let mut gz = vec![ID1, ID2, CM_DEFLATE, FEXTRA, 0, 0, 0, 0, 0, 3];
        gz.extend_from_slice(&1000u16.to_le_bytes());
        gz.extend_from_slice(&[0u8; 16]);
        assert_eq!(decode(&gz), Err(GzipError::InvalidFormat));
    }

    #[test]
    fn unsupported_method() {
        let mut gz = encode(b"hello").unwrap();
        gz[2] = 0x07;
        assert_eq!(decode(&gz), Err(GzipError::UnsupportedMethod(0x07)));
    }

    #[test]
    fn crc_mismatch() {
        let mut gz = encode(b"hello").unwrap();
        let n = gz.len();
        gz[n - 8] ^= 0x01;
        assert_eq!(decode(&gz), Err(GzipError::CrcMismatch));
    }

    #[test]
    fn length_mismatch() {
        let mut gz = encode(b"hello").unwrap();
        let n = gz.len();
        gz[n - 4] = 6;
        assert_eq!(decode(&gz), Err(GzipError::CrcMismatch));
    }

    #[test]
    fn deflate_accepts_zlib_raw_and_gzip() {
        let data = b"deflate me";
        let mut z = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        z.write_all(data).unwrap();
        let zlib = z.finish().unwrap();
        assert_eq!(decode_deflate(&zlib).unwrap(), data);
        assert_eq!(decode_deflate(&deflate_raw(data)).unwrap(), data);
        assert_eq!(decode_deflate(&encode(data).unwrap()).unwrap(), data);
    }
}
