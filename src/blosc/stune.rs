// Corresponds to c-blosc2/blosc/stune.c (and .h)

use crate::blosc::context::Blosc2Context;
use crate::include::blosc2_include::{
    BLOSC_ALWAYS_SPLIT, BLOSC_AUTO_SPLIT, BLOSC_DOSHUFFLE, BLOSC_FORWARD_COMPAT_SPLIT, BLOSC_LZ4,
    BLOSC_LZ4HC, BLOSC_MIN_BUFFERSIZE, BLOSC_NEVER_SPLIT, BLOSC_ZLIB, BLOSC_ZSTD, L1, MAX_STREAMS,
};

/// Whether a codec is meant for High Compression Ratios
fn is_hcr(context: &Blosc2Context) -> bool {
    matches!(context.compcode, BLOSC_LZ4HC | BLOSC_ZLIB | BLOSC_ZSTD)
}

/// Resolve the block size for a source of `nbytes` bytes.
///
/// A user supplied blocksize wins; otherwise the size is derived from the
/// L1 cache size, the codec and the compression level. The result is never
/// larger than `nbytes` and is a multiple of the typesize whenever it
/// exceeds it.
pub fn blosc_stune_next_blocksize(context: &Blosc2Context, nbytes: usize) -> usize {
    let clevel = context.clevel;
    let typesize = context.typesize;
    let user_blocksize = context.blocksize;
    let mut blocksize = nbytes;

    // Protection against very small buffers
    if nbytes < typesize {
        return nbytes.max(1);
    }

    if user_blocksize != 0 {
        blocksize = user_blocksize;
    } else {
        if nbytes >= L1 {
            blocksize = L1;

            /* For HCR codecs, increase the block sizes by a factor of 2 because they
               are meant for compressing large blocks (i.e. they show a big overhead
               when compressing small ones). */
            if is_hcr(context) {
                blocksize *= 2;
            }

            // Choose a different blocksize depending on the compression level
            match clevel {
                // Case of plain copy
                0 => blocksize /= 4,
                1 => blocksize /= 2,
                2 => {}
                3 => blocksize *= 2,
                4 | 5 => blocksize *= 4,
                6..=8 => blocksize *= 8,
                _ => {
                    blocksize *= 8;
                    if is_hcr(context) {
                        blocksize *= 2;
                    }
                }
            }
        }

        /* Now the blocksize for splittable codecs */
        if clevel > 0 && split_block(context, typesize, blocksize) {
            blocksize = match clevel {
                1..=3 => 32 * 1024,
                4..=6 => 64 * 1024,
                7 => 128 * 1024,
                8 => 256 * 1024,
                _ => 512 * 1024,
            };
            // Multiply by typesize to get proper split sizes
            blocksize *= typesize;
            // But do not exceed 4 MB per thread
            blocksize = blocksize.clamp(32 * 1024, 4 * 1024 * 1024);
        }
    }

    /* Check that blocksize is not too large */
    if blocksize > nbytes {
        blocksize = nbytes;
    }

    // blocksize *must absolutely* be a multiple of the typesize
    if blocksize > typesize {
        blocksize = blocksize / typesize * typesize;
    }

    log::trace!(
        "compcode: {}, clevel: {}, blocksize: {}, splitmode: {}, typesize: {}",
        context.compcode,
        clevel,
        blocksize,
        context.splitmode,
        typesize
    );
    blocksize
}

/// Conditions for splitting a block before compressing with a codec.
pub fn split_block(context: &Blosc2Context, typesize: usize, blocksize: usize) -> bool {
    match context.splitmode {
        BLOSC_ALWAYS_SPLIT => return true,
        BLOSC_NEVER_SPLIT => return false,
        BLOSC_FORWARD_COMPAT_SPLIT | BLOSC_AUTO_SPLIT => {}
        other => {
            log::warn!("unrecognized split mode {other}, defaulting to forward compatible");
        }
    }

    // Fast codecs like lz4 seem to prefer to split
    (context.compcode == BLOSC_LZ4
        // and low levels of zstd too
        || (context.compcode == BLOSC_ZSTD && context.clevel <= 5))
        // ...but split seems to harm cratio too much when not using shuffle
        && (context.filter_flags & BLOSC_DOSHUFFLE) != 0
        && typesize <= MAX_STREAMS
        && blocksize / typesize >= BLOSC_MIN_BUFFERSIZE
}
