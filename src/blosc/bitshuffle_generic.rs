// Corresponds to c-blosc2/blosc/bitshuffle-generic.c (and .h)

/// Transpose 8x8 bit array packed into a single quadword.
///
/// Byte `r` of the input becomes bit `r` of every output byte; the transform
/// is its own inverse.
#[inline]
fn trans_bit_8x8(mut x: u64) -> u64 {
    let mut t;
    t = (x ^ (x >> 7)) & 0x00AA00AA00AA00AA;
    x = x ^ t ^ (t << 7);
    t = (x ^ (x >> 14)) & 0x0000CCCC0000CCCC;
    x = x ^ t ^ (t << 14);
    t = (x ^ (x >> 28)) & 0x00000000F0F0F0F0;
    x = x ^ t ^ (t << 28);
    x
}

/// Transpose bits within elements.
///
/// `size` elements of `elem_size` bytes are rewritten as `8 * elem_size` bit
/// planes of `size / 8` bytes each; plane `8 * j + r` holds bit `r` of byte
/// `j` of every element. `size` must be a multiple of 8.
pub fn bshuf_trans_bit_elem(input: &[u8], output: &mut [u8], size: usize, elem_size: usize) {
    debug_assert_eq!(size % 8, 0);
    let plane_len = size / 8;
    for j in 0..elem_size {
        for g in 0..plane_len {
            let mut x = 0u64;
            for k in 0..8 {
                x |= (input[(g * 8 + k) * elem_size + j] as u64) << (8 * k);
            }
            let x = trans_bit_8x8(x);
            for r in 0..8 {
                output[(j * 8 + r) * plane_len + g] = (x >> (8 * r)) as u8;
            }
        }
    }
}

/// Inverse of [`bshuf_trans_bit_elem`].
pub fn bshuf_untrans_bit_elem(input: &[u8], output: &mut [u8], size: usize, elem_size: usize) {
    debug_assert_eq!(size % 8, 0);
    let plane_len = size / 8;
    for j in 0..elem_size {
        for g in 0..plane_len {
            let mut x = 0u64;
            for r in 0..8 {
                x |= (input[(j * 8 + r) * plane_len + g] as u64) << (8 * r);
            }
            let x = trans_bit_8x8(x);
            for k in 0..8 {
                output[(g * 8 + k) * elem_size + j] = (x >> (8 * k)) as u8;
            }
        }
    }
}
