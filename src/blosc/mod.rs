pub mod b2nd;
pub mod b2nd_utils;
mod bitshuffle_generic;
pub mod blosc2;
pub mod blosc_private;
pub mod context;
pub mod frame;
pub mod schunk;
pub mod shuffle;
mod shuffle_generic;
pub mod stune;
pub mod trunc_prec;
