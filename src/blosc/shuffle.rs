// Corresponds to c-blosc2/blosc/shuffle.c (and .h)

use super::bitshuffle_generic::{bshuf_trans_bit_elem, bshuf_untrans_bit_elem};
use super::shuffle_generic::{shuffle_generic, unshuffle_generic};
use std::sync::OnceLock;

/* An implementation of shuffle/unshuffle routines. */
struct ShuffleImplementation {
    /* Name of this implementation. */
    name: &'static str,
    shuffle: fn(usize, &[u8], &mut [u8]),
    unshuffle: fn(usize, &[u8], &mut [u8]),
    bitshuffle: fn(&[u8], &mut [u8], usize, usize),
    bitunshuffle: fn(&[u8], &mut [u8], usize, usize),
}

/* Only the generic routines are provided; hardware-specific variants would
   be selected here. */
fn get_shuffle_implementation() -> ShuffleImplementation {
    ShuffleImplementation {
        name: "generic",
        shuffle: shuffle_generic,
        unshuffle: unshuffle_generic,
        bitshuffle: bshuf_trans_bit_elem,
        bitunshuffle: bshuf_untrans_bit_elem,
    }
}

static HOST_IMPLEMENTATION: OnceLock<ShuffleImplementation> = OnceLock::new();

fn host_implementation() -> &'static ShuffleImplementation {
    HOST_IMPLEMENTATION.get_or_init(|| {
        let implementation = get_shuffle_implementation();
        log::debug!("using {} shuffle implementation", implementation.name);
        implementation
    })
}

/// Shuffle a block. `dest` must be at least as long as `src`.
pub fn shuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let dest = &mut dest[..src.len()];
    if typesize <= 1 {
        dest.copy_from_slice(src);
        return;
    }
    (host_implementation().shuffle)(typesize, src, dest);
}

/// Unshuffle a block. `dest` must be at least as long as `src`.
pub fn unshuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let dest = &mut dest[..src.len()];
    if typesize <= 1 {
        dest.copy_from_slice(src);
        return;
    }
    (host_implementation().unshuffle)(typesize, src, dest);
}

/// Number of leading bytes of a `blocksize` block that take part in a
/// bitshuffle: whole elements, in groups of 8.
fn bitshuffle_extent(typesize: usize, blocksize: usize) -> usize {
    let nelems = blocksize / typesize;
    (nelems - nelems % 8) * typesize
}

/// Bit-shuffle a block. Trailing elements that do not complete a group of
/// 8 (and trailing bytes of a partial element) are copied verbatim.
pub fn bitshuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let extent = bitshuffle_extent(typesize, blocksize);
    if extent > 0 {
        (host_implementation().bitshuffle)(
            &src[..extent],
            &mut dest[..extent],
            extent / typesize,
            typesize,
        );
    }
    dest[extent..blocksize].copy_from_slice(&src[extent..]);
}

/// Inverse of [`bitshuffle`].
pub fn bitunshuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let extent = bitshuffle_extent(typesize, blocksize);
    if extent > 0 {
        (host_implementation().bitunshuffle)(
            &src[..extent],
            &mut dest[..extent],
            extent / typesize,
            typesize,
        );
    }
    dest[extent..blocksize].copy_from_slice(&src[extent..]);
}
