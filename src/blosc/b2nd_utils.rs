// Corresponds to c-blosc2/blosc/b2nd_utils.c and plugins/plugin_utils.c

use crate::include::b2nd_include::B2ND_MAX_DIM;

/// Per-axis values for up to [`B2ND_MAX_DIM`] dimensions. Axes at or above
/// `ndim` are ignored by every function in this module.
pub type DimArray = [i64; B2ND_MAX_DIM];

/// Row-major strides for `extents`, fastest-varying axis last.
///
/// `strides[ndim - 1] = 1` and `strides[j] = extents[j + 1] * strides[j + 1]`.
pub fn strides(ndim: usize, extents: &[i64]) -> DimArray {
    debug_assert!((1..=B2ND_MAX_DIM).contains(&ndim));
    let mut strides = [1i64; B2ND_MAX_DIM];
    for j in (0..ndim - 1).rev() {
        strides[j] = extents[j + 1] * strides[j + 1];
    }
    strides
}

/// Convert a linear offset inside a region of `extents` into per-axis coordinates.
///
/// Preconditions (not checked in release builds): `ndim` is in `1..=8`,
/// `extents` holds at least `ndim` positive values and
/// `0 <= linear < product(extents[..ndim])`.
pub fn linear_to_multi(ndim: usize, extents: &[i64], linear: i64) -> DimArray {
    debug_assert!(linear >= 0);
    let strides = strides(ndim, extents);
    let mut index = [0i64; B2ND_MAX_DIM];
    index[0] = linear / strides[0];
    for j in 1..ndim {
        index[j] = (linear % strides[j - 1]) / strides[j];
    }
    index
}

/// Convert per-axis coordinates into a linear offset: the dot product of
/// `index` and `strides` over the first `ndim` axes.
pub fn multi_to_linear(index: &[i64], strides: &[i64], ndim: usize) -> i64 {
    index[..ndim]
        .iter()
        .zip(&strides[..ndim])
        .map(|(i, s)| i * s)
        .sum()
}

/// Number of items in a region of `extents`.
pub fn nitems(ndim: usize, extents: &[i64]) -> i64 {
    extents[..ndim].iter().product()
}

/// `ceil(a / b)` for positive `b`.
pub fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}
