//! RIFF/WAVE header repair.
//!
//! Providers that stream WAV audio emit the container header before the body
//! length is known, leaving both size fields wrong (often zero or a
//! placeholder). Once the full byte sequence is materialized, this filter
//! rewrites the RIFF chunk size and the first `data` subchunk size in place.
//!
//! The filter is deliberately forgiving: anything that is not a patchable
//! WAV container passes through unmodified. That outcome is observable only
//! through debug logging; it is never surfaced as an error.

use tracing::debug;

/// Smallest byte count a RIFF/WAVE container with a `fmt ` and `data` chunk
/// can occupy.
pub const MIN_WAV_LEN: usize = 44;

/// Patch the RIFF and `data` size fields of a fully materialized WAV buffer.
///
/// - Buffers shorter than [`MIN_WAV_LEN`] or without the `RIFF`/`WAVE`
///   signature are returned unchanged.
/// - The RIFF chunk size (bytes 4..8, little-endian) becomes `len - 8`.
/// - Subchunks are walked from offset 12; the first `data` subchunk's size
///   field becomes the remaining byte count. Nothing past it is touched.
/// - A truncated or malformed subchunk list yields the RIFF-patched buffer
///   best-effort.
///
/// The operation is idempotent: repairing an already-correct buffer with a
/// single `data` subchunk changes nothing.
pub fn repair_wav_header(mut audio: Vec<u8>) -> Vec<u8> {
    if audio.len() < MIN_WAV_LEN || &audio[0..4] != b"RIFF" || &audio[8..12] != b"WAVE" {
        debug!(
            len = audio.len(),
            "not a RIFF/WAVE container, passing through unmodified"
        );
        return audio;
    }

    let total = audio.len();
    let riff_size = u32::try_from(total - 8).unwrap_or(u32::MAX);
    audio[4..8].copy_from_slice(&riff_size.to_le_bytes());

    // Each subchunk: 4-byte ASCII id, 4-byte LE size, then that many bytes.
    let mut offset = 12usize;
    while offset + 8 <= total {
        if &audio[offset..offset + 4] == b"data" {
            let data_size = u32::try_from(total - offset - 8).unwrap_or(u32::MAX);
            audio[offset + 4..offset + 8].copy_from_slice(&data_size.to_le_bytes());
            return audio;
        }
        let declared = u32::from_le_bytes([
            audio[offset + 4],
            audio[offset + 5],
            audio[offset + 6],
            audio[offset + 7],
        ]) as usize;
        offset = match offset.checked_add(8 + declared) {
            Some(next) => next,
            // A declared size that overflows the walk is malformed; stop.
            None => break,
        };
    }

    debug!("no data subchunk found, returning RIFF-patched buffer");
    audio
}
