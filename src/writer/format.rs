use std::io::{Read as _, Write as _};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use rayon::prelude::*;

use crate::foundation::error::{SceneportError, SceneportResult};

/// Marker prefix of compressed list payloads.
pub(crate) const ZIP_MAGIC: &str = "ZIPB";

// Payloads above this size are hex-encoded in parallel chunks.
const PAR_HEX_THRESHOLD: usize = 256 * 1024;
const PAR_HEX_CHUNK: usize = 64 * 1024;

// Upper bound on the buffer reserved from a compressed list's declared size.
const INFLATE_PREALLOC_LIMIT: usize = 1 << 20;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// List encoding of one writer instance.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Inline textual lists.
    Plain,
    /// Hex-encoded little-endian element bytes.
    #[default]
    Hex,
    /// Zlib-compressed element bytes, hex-encoded.
    Zip,
}

/// Encode a binary list payload for `Hex` or `Zip` output.
pub fn encode_blob(bytes: &[u8], format: ExportFormat) -> SceneportResult<String> {
    match format {
        ExportFormat::Plain => Err(SceneportError::encoding(
            "plain format has no binary list encoding",
        )),
        ExportFormat::Hex => Ok(hex_upper(bytes)),
        ExportFormat::Zip => {
            let raw_len = u32::try_from(bytes.len())
                .map_err(|_| SceneportError::encoding("list payload exceeds 4 GiB"))?;
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(bytes)?;
            let compressed = enc.finish()?;
            let zip_len = u32::try_from(compressed.len())
                .map_err(|_| SceneportError::encoding("compressed payload exceeds 4 GiB"))?;

            let mut out = String::with_capacity(ZIP_MAGIC.len() + 16 + compressed.len() * 2);
            out.push_str(ZIP_MAGIC);
            out.push_str(&hex_upper(&raw_len.to_le_bytes()));
            out.push_str(&hex_upper(&zip_len.to_le_bytes()));
            out.push_str(&hex_upper(&compressed));
            Ok(out)
        }
    }
}

/// Decode a payload written by [`encode_blob`] (either encoding).
pub fn decode_blob(text: &str) -> SceneportResult<Vec<u8>> {
    let Some(rest) = text.strip_prefix(ZIP_MAGIC) else {
        return hex_decode(text);
    };
    if rest.len() < 16 || !rest.is_ascii() {
        return Err(SceneportError::encoding("truncated compressed list header"));
    }
    let raw_len = read_u32_hex(&rest[0..8])? as usize;
    let zip_len = read_u32_hex(&rest[8..16])? as usize;
    let compressed = hex_decode(&rest[16..])?;
    if compressed.len() != zip_len {
        return Err(SceneportError::encoding(format!(
            "compressed list declares {zip_len} bytes but carries {}",
            compressed.len()
        )));
    }

    // Never inflate past the declared size.
    let mut out = Vec::with_capacity(raw_len.min(INFLATE_PREALLOC_LIMIT));
    ZlibDecoder::new(compressed.as_slice())
        .take(raw_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| SceneportError::encoding(format!("corrupt compressed list: {e}")))?;
    if out.len() != raw_len {
        return Err(SceneportError::encoding(format!(
            "compressed list declares {raw_len} raw bytes but inflates to {}",
            out.len()
        )));
    }
    Ok(out)
}

fn read_u32_hex(s: &str) -> SceneportResult<u32> {
    let b = hex_decode(s)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Uppercase hex of `bytes`.
pub fn hex_upper(bytes: &[u8]) -> String {
    if bytes.len() >= PAR_HEX_THRESHOLD {
        return bytes
            .par_chunks(PAR_HEX_CHUNK)
            .map(hex_chunk)
            .collect::<Vec<_>>()
            .concat();
    }
    hex_chunk(bytes)
}

fn hex_chunk(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn hex_decode(s: &str) -> SceneportResult<Vec<u8>> {
    let s = s.as_bytes();
    if !s.len().is_multiple_of(2) {
        return Err(SceneportError::encoding("hex payload has odd length"));
    }
    s.chunks_exact(2)
        .map(|p| Ok((nibble(p[0])? << 4) | nibble(p[1])?))
        .collect()
}

fn nibble(c: u8) -> SceneportResult<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(SceneportError::encoding(format!(
            "invalid hex digit '{}'",
            c as char
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/writer/format.rs"]
mod tests;
