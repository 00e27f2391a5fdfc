// Corresponds to c-blosc2/blosc/trunc-prec.c (and .h)

use crate::error::{Error, Result};
use crate::include::blosc2_include::BLOSC_TRUNC_PREC;

// Mantissa widths of IEEE 754 single and double precision
const BITS_MANTISSA_FLOAT: i8 = 23;
const BITS_MANTISSA_DOUBLE: i8 = 52;

/// Number of low mantissa bits to clear for `prec_bits`.
///
/// Clearing every mantissa bit would turn NaNs into infinities, so at least
/// one bit always survives.
fn zeroed_bits(prec_bits: i8, mantissa_bits: i8) -> Result<u32> {
    if prec_bits.unsigned_abs() > mantissa_bits as u8 {
        return Err(Error::invalid_param(format!(
            "the precision cannot be larger than {} bits (asking for {} bits)",
            mantissa_bits, prec_bits
        )));
    }
    let zeroed = if prec_bits >= 0 {
        mantissa_bits - prec_bits
    } else {
        -prec_bits
    };
    if zeroed >= mantissa_bits {
        return Err(Error::invalid_param(format!(
            "the reduction in precision cannot be larger or equal than {} bits (asking for {} bits)",
            mantissa_bits, zeroed
        )));
    }
    Ok(zeroed as u32)
}

/// Truncate the mantissa of every `typesize`-wide float in `src` into `dest`.
///
/// Positive values of `prec_bits` set the number of mantissa bits kept,
/// negative values give the number of bits removed. Only typesizes 4 and 8
/// are handled; trailing bytes of a partial element are copied as is.
pub fn truncate_precision(prec_bits: i8, typesize: usize, src: &[u8], dest: &mut [u8]) -> Result<()> {
    let dest = &mut dest[..src.len()];
    match typesize {
        4 => {
            let mask = !((1u32 << zeroed_bits(prec_bits, BITS_MANTISSA_FLOAT)?) - 1);
            for (s, d) in src.chunks_exact(4).zip(dest.chunks_exact_mut(4)) {
                let value = u32::from_le_bytes([s[0], s[1], s[2], s[3]]) & mask;
                d.copy_from_slice(&value.to_le_bytes());
            }
        }
        8 => {
            let mask = !((1u64 << zeroed_bits(prec_bits, BITS_MANTISSA_DOUBLE)?) - 1);
            for (s, d) in src.chunks_exact(8).zip(dest.chunks_exact_mut(8)) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(s);
                let value = u64::from_le_bytes(raw) & mask;
                d.copy_from_slice(&value.to_le_bytes());
            }
        }
        _ => {
            log::error!(
                "trunc-prec filter: precision for typesize {} not handled",
                typesize
            );
            return Err(Error::UnsupportedTypeSize {
                filter: BLOSC_TRUNC_PREC,
                typesize,
            });
        }
    }
    let tail = src.len() - src.len() % typesize;
    dest[tail..].copy_from_slice(&src[tail..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_requested_float_bits() {
        let values = [1.0f32 + f32::EPSILON, 3.141_592_7, -2.5e-3];
        let src: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut dest = vec![0u8; src.len()];
        truncate_precision(10, 4, &src, &mut dest).unwrap();
        for (chunk, original) in dest.chunks_exact(4).zip(values) {
            let bits = u32::from_le_bytes(chunk.try_into().unwrap());
            assert_eq!(bits & 0x1fff, 0);
            let truncated = f32::from_bits(bits);
            assert!((truncated - original).abs() <= original.abs() / 1024.0);
        }
    }

    #[test]
    fn negative_prec_removes_bits() {
        let src = 1.234_567_890_123f64.to_le_bytes();
        let mut dest = [0u8; 8];
        truncate_precision(-20, 8, &src, &mut dest).unwrap();
        let bits = u64::from_le_bytes(dest);
        assert_eq!(bits & 0xf_ffff, 0);
        assert_eq!(bits >> 20, u64::from_le_bytes(src) >> 20);
    }

    #[test]
    fn rejects_bad_precision_and_typesize() {
        let src = [0u8; 16];
        let mut dest = [0u8; 16];
        assert!(matches!(
            truncate_precision(24, 4, &src, &mut dest),
            Err(Error::InvalidParam(_))
        ));
        assert!(matches!(
            truncate_precision(0, 4, &src, &mut dest),
            Err(Error::InvalidParam(_))
        ));
        assert!(matches!(
            truncate_precision(8, 2, &src, &mut dest),
            Err(Error::UnsupportedTypeSize { typesize: 2, .. })
        ));
    }
}
