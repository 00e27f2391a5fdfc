// Corresponds to c-blosc2/blosc/blosc-private.h

/*********************************************************************

  Utility functions meant to be used internally.

*********************************************************************/

/// Byte-order correction for one scalar width.
type SwapFn = fn(&mut [u8], &[u8]);

fn swap1(dest: &mut [u8], src: &[u8]) {
    dest[0] = src[0];
}

fn swap2(dest: &mut [u8], src: &[u8]) {
    dest[0] = src[1];
    dest[1] = src[0];
}

fn swap4(dest: &mut [u8], src: &[u8]) {
    dest[0] = src[3];
    dest[1] = src[2];
    dest[2] = src[1];
    dest[3] = src[0];
}

fn swap8(dest: &mut [u8], src: &[u8]) {
    for (i, b) in src[..8].iter().rev().enumerate() {
        dest[i] = *b;
    }
}

fn copy_n(dest: &mut [u8], src: &[u8]) {
    dest[..src.len()].copy_from_slice(src);
}

/// The swap routine for a scalar of `size` bytes, `None` for unsupported widths.
fn swap_fn(size: usize) -> Option<SwapFn> {
    match size {
        1 => Some(swap1),
        2 => Some(swap2),
        4 => Some(swap4),
        8 => Some(swap8),
        _ => None,
    }
}

/// Return true if platform is little endian; else false
pub fn is_little_endian() -> bool {
    cfg!(target_endian = "little")
}

/// Copy `size` bytes from `src` to `dest`, converting between host order and
/// the requested byte order (`little` = little endian storage).
///
/// Returns false for widths other than 1, 2, 4 or 8.
fn endian_handler(little: bool, dest: &mut [u8], src: &[u8], size: usize) -> bool {
    let Some(swap) = swap_fn(size) else {
        log::warn!("Unhandled size: {}", size);
        return false;
    };
    if is_little_endian() == little {
        copy_n(dest, &src[..size]);
    } else {
        swap(dest, src);
    }
    true
}

pub fn to_big(dest: &mut [u8], src: &[u8], itemsize: usize) -> bool {
    endian_handler(false, dest, src, itemsize)
}

pub fn from_big(dest: &mut [u8], src: &[u8], itemsize: usize) -> bool {
    endian_handler(false, dest, src, itemsize)
}

/// Read a little endian i32 at `offset`.
pub fn sw32(src: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&src[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

/// Write `value` as a little endian i32 at `offset`.
pub fn _sw32(dest: &mut [u8], offset: usize, value: i32) {
    dest[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_roundtrip_all_widths() {
        let value: i64 = 0x0102_0304_0506_0708;
        let host = value.to_ne_bytes();
        let mut stored = [0u8; 8];
        assert!(to_big(&mut stored, &host, 8));
        assert_eq!(stored, value.to_be_bytes());

        let mut back = [0u8; 8];
        assert!(from_big(&mut back, &stored, 8));
        assert_eq!(i64::from_ne_bytes(back), value);

        let v32: i32 = -123456;
        let mut s32 = [0u8; 4];
        to_big(&mut s32, &v32.to_ne_bytes(), 4);
        assert_eq!(s32, v32.to_be_bytes());

        let v16: u16 = 0xBEEF;
        let mut s16 = [0u8; 2];
        to_big(&mut s16, &v16.to_ne_bytes(), 2);
        assert_eq!(s16, v16.to_be_bytes());

        let mut s8 = [0u8; 1];
        to_big(&mut s8, &[0x7f], 1);
        assert_eq!(s8, [0x7f]);
    }

    #[test]
    fn unsupported_width_is_rejected() {
        let mut dest = [0u8; 3];
        assert!(!to_big(&mut dest, &[1, 2, 3], 3));
    }

    #[test]
    fn sw32_roundtrip() {
        let mut buf = [0u8; 8];
        _sw32(&mut buf, 4, -42);
        assert_eq!(sw32(&buf, 4), -42);
    }
}
