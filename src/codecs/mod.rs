//! Compressor service: one block stream in, one block stream out.
//!
//! Every supported codec is reached through [`compress_block`] and
//! [`decompress_block`], keyed by the `BLOSC_*` codec id stored in the chunk
//! header flags.

use crate::error::{Error, Result};
use crate::include::blosc2_include::*;
use std::io::{Cursor, Read, Write};

/// Highest zstd level used for clevel 9.
const ZSTD_MAX_CLEVEL: i32 = 19;

/// Whether `compcode` can be used by this build.
pub fn is_supported(compcode: u8) -> bool {
    matches!(compcode, BLOSC_LZ4 | BLOSC_SNAPPY | BLOSC_ZLIB | BLOSC_ZSTD)
}

pub fn compcode_to_compname(compcode: u8) -> Option<&'static str> {
    match compcode {
        BLOSC_BLOSCLZ => Some(BLOSC_BLOSCLZ_COMPNAME),
        BLOSC_LZ4 => Some(BLOSC_LZ4_COMPNAME),
        BLOSC_LZ4HC => Some(BLOSC_LZ4HC_COMPNAME),
        BLOSC_SNAPPY => Some(BLOSC_SNAPPY_COMPNAME),
        BLOSC_ZLIB => Some(BLOSC_ZLIB_COMPNAME),
        BLOSC_ZSTD => Some(BLOSC_ZSTD_COMPNAME),
        _ => None,
    }
}

pub fn compname_to_compcode(compname: &str) -> Option<u8> {
    match compname {
        BLOSC_BLOSCLZ_COMPNAME => Some(BLOSC_BLOSCLZ),
        BLOSC_LZ4_COMPNAME => Some(BLOSC_LZ4),
        BLOSC_LZ4HC_COMPNAME => Some(BLOSC_LZ4HC),
        BLOSC_SNAPPY_COMPNAME => Some(BLOSC_SNAPPY),
        BLOSC_ZLIB_COMPNAME => Some(BLOSC_ZLIB),
        BLOSC_ZSTD_COMPNAME => Some(BLOSC_ZSTD),
        _ => None,
    }
}

/// Library name backing a codec, as reported by `blosc2_get_complib_info`.
pub fn complib_name(compcode: u8) -> Option<&'static str> {
    match compcode {
        BLOSC_LZ4 => Some("lz4_flex"),
        BLOSC_SNAPPY => Some("snap"),
        BLOSC_ZLIB => Some("flate2"),
        BLOSC_ZSTD => Some("zstd"),
        _ => None,
    }
}

/// Worst-case output size of [`compress_block`] for `len` input bytes.
pub fn max_compressed_len(compcode: u8, len: usize) -> usize {
    match compcode {
        BLOSC_LZ4 => lz4_flex::block::get_maximum_output_size(len),
        BLOSC_SNAPPY => snap::raw::max_compress_len(len),
        BLOSC_ZSTD => zstd::zstd_safe::compress_bound(len),
        // zlib stored blocks: 5 bytes per 16K plus header and adler32
        _ => len + (len / 16383 + 1) * 5 + 6 + 64,
    }
}

fn zstd_level(clevel: u8) -> i32 {
    if clevel < 9 {
        clevel as i32 * 2 - 1
    } else {
        ZSTD_MAX_CLEVEL
    }
}

fn compress_unbounded(compcode: u8, clevel: u8, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    match compcode {
        BLOSC_LZ4 => Ok(lz4_flex::block::compress_into(src, dest).unwrap_or(0)),
        BLOSC_SNAPPY => Ok(snap::raw::Encoder::new().compress(src, dest).unwrap_or(0)),
        BLOSC_ZLIB => {
            let cursor = Cursor::new(dest);
            let mut encoder = flate2::write::ZlibEncoder::new(
                cursor,
                flate2::Compression::new(clevel as u32),
            );
            if encoder.write_all(src).is_err() {
                return Ok(0);
            }
            match encoder.finish() {
                Ok(cursor) => Ok(cursor.position() as usize),
                Err(_) => Ok(0),
            }
        }
        BLOSC_ZSTD => {
            Ok(zstd::bulk::compress_to_buffer(src, dest, zstd_level(clevel)).unwrap_or(0))
        }
        _ => Err(Error::UnsupportedCodec(compcode)),
    }
}

/// Compress `src` into `dest` with the codec `compcode` at `clevel` (1..=9).
///
/// Returns the number of bytes written, or 0 when the result does not fit
/// in `dest`.
pub fn compress_block(compcode: u8, clevel: u8, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let bound = max_compressed_len(compcode, src.len());
    if dest.len() >= bound || compcode == BLOSC_ZLIB || compcode == BLOSC_ZSTD {
        return compress_unbounded(compcode, clevel, src, dest);
    }
    // lz4 and snappy refuse destinations below their worst case
    let mut scratch = vec![0u8; bound];
    let csize = compress_unbounded(compcode, clevel, src, &mut scratch)?;
    if csize == 0 || csize > dest.len() {
        return Ok(0);
    }
    dest[..csize].copy_from_slice(&scratch[..csize]);
    Ok(csize)
}

/// Decompress one stream into `dest`, which must be exactly the stream's
/// decoded length.
pub fn decompress_block(compcode: u8, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let decoded = match compcode {
        BLOSC_LZ4 => lz4_flex::block::decompress_into(src, dest)
            .map_err(|e| Error::codec(BLOSC2_ERROR_DATA, format!("lz4: {e}")))?,
        BLOSC_SNAPPY => snap::raw::Decoder::new()
            .decompress(src, dest)
            .map_err(|e| Error::codec(BLOSC2_ERROR_DATA, format!("snappy: {e}")))?,
        BLOSC_ZLIB => {
            let mut decoder = flate2::read::ZlibDecoder::new(src);
            decoder
                .read_exact(dest)
                .map_err(|e| Error::codec(BLOSC2_ERROR_DATA, format!("zlib: {e}")))?;
            dest.len()
        }
        BLOSC_ZSTD => zstd::bulk::decompress_to_buffer(src, dest)
            .map_err(|e| Error::codec(BLOSC2_ERROR_DATA, format!("zstd: {e}")))?,
        _ => return Err(Error::UnsupportedCodec(compcode)),
    };
    if decoded != dest.len() {
        return Err(Error::SizeMismatch {
            expected: dest.len(),
            actual: decoded,
        });
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..10_000u32).flat_map(|i| (i / 7).to_le_bytes()).collect()
    }

    #[test]
    fn every_supported_codec_shrinks_and_restores() {
        let src = sample();
        for compcode in [BLOSC_LZ4, BLOSC_SNAPPY, BLOSC_ZLIB, BLOSC_ZSTD] {
            let mut compressed = vec![0u8; max_compressed_len(compcode, src.len())];
            let csize = compress_block(compcode, 5, &src, &mut compressed).unwrap();
            assert!(csize > 0 && csize < src.len(), "codec {compcode}");
            let mut restored = vec![0u8; src.len()];
            decompress_block(compcode, &compressed[..csize], &mut restored).unwrap();
            assert_eq!(restored, src, "codec {compcode}");
        }
    }

    #[test]
    fn tiny_destination_reports_no_fit() {
        let src = sample();
        let mut dest = [0u8; 4];
        for compcode in [BLOSC_LZ4, BLOSC_SNAPPY, BLOSC_ZLIB, BLOSC_ZSTD] {
            assert_eq!(compress_block(compcode, 5, &src, &mut dest).unwrap(), 0);
        }
    }

    #[test]
    fn unsupported_codecs_are_rejected() {
        let mut dest = [0u8; 64];
        assert!(matches!(
            compress_block(BLOSC_BLOSCLZ, 5, b"abc", &mut dest),
            Err(Error::UnsupportedCodec(BLOSC_BLOSCLZ))
        ));
        assert!(matches!(
            decompress_block(BLOSC_LZ4HC, b"abc", &mut dest),
            Err(Error::UnsupportedCodec(BLOSC_LZ4HC))
        ));
    }

    #[test]
    fn names_round_trip() {
        for compcode in 0..BLOSC_LAST_CODEC {
            let name = compcode_to_compname(compcode).unwrap();
            assert_eq!(compname_to_compcode(name), Some(compcode));
        }
        assert_eq!(compname_to_compcode("brotli"), None);
    }
}
