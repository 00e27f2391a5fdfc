// Corresponds to c-blosc2/blosc/shuffle-generic.c (and .h)

/// Generic (non-hardware-accelerated) shuffle routine.
///
/// Byte `j` of element `i` is moved to `dest[j * nelems + i]`, grouping the
/// bytes of equal significance together. Bytes past the last whole element
/// are copied without shuffling.
pub fn shuffle_generic(type_size: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let neblock_quot = blocksize / type_size;
    let neblock_rem = blocksize % type_size;

    for j in 0..type_size {
        let plane = &mut dest[j * neblock_quot..(j + 1) * neblock_quot];
        for (i, byte) in plane.iter_mut().enumerate() {
            *byte = src[i * type_size + j];
        }
    }

    let start = blocksize - neblock_rem;
    dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
}

/// Generic (non-hardware-accelerated) unshuffle routine, the inverse of
/// [`shuffle_generic`].
pub fn unshuffle_generic(type_size: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let neblock_quot = blocksize / type_size;
    let neblock_rem = blocksize % type_size;

    for i in 0..neblock_quot {
        let elem = &mut dest[i * type_size..(i + 1) * type_size];
        for (j, byte) in elem.iter_mut().enumerate() {
            *byte = src[j * neblock_quot + i];
        }
    }

    let start = blocksize - neblock_rem;
    dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
}
