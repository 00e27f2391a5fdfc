use super::{Filter, FilterParams};
use crate::blosc::shuffle::{bitshuffle, bitunshuffle, shuffle, unshuffle};
use crate::blosc::trunc_prec::truncate_precision;
use crate::error::Result;

/// Byte shuffle: groups bytes of equal significance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shuffle;

impl Filter for Shuffle {
    fn forward(&self, input: &[u8], output: &mut [u8], _meta: u8, params: &FilterParams) -> Result<()> {
        shuffle(params.typesize, input, output);
        Ok(())
    }

    fn backward(&self, input: &[u8], output: &mut [u8], _meta: u8, params: &FilterParams) -> Result<()> {
        unshuffle(params.typesize, input, output);
        Ok(())
    }
}

/// Bit shuffle: transposes the bit matrix of each group of 8 elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitShuffle;

impl Filter for BitShuffle {
    fn forward(&self, input: &[u8], output: &mut [u8], _meta: u8, params: &FilterParams) -> Result<()> {
        bitshuffle(params.typesize, input, output);
        Ok(())
    }

    fn backward(&self, input: &[u8], output: &mut [u8], _meta: u8, params: &FilterParams) -> Result<()> {
        bitunshuffle(params.typesize, input, output);
        Ok(())
    }
}

/// Mantissa truncation. `meta` is read as signed precision bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncPrec;

impl Filter for TruncPrec {
    fn forward(&self, input: &[u8], output: &mut [u8], meta: u8, params: &FilterParams) -> Result<()> {
        truncate_precision(meta as i8, params.typesize, input, output)
    }

    fn backward(&self, input: &[u8], output: &mut [u8], _meta: u8, _params: &FilterParams) -> Result<()> {
        output.copy_from_slice(input);
        Ok(())
    }
}
