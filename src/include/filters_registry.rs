// Corresponds to c-blosc2/include/blosc2/filters-registry.h

// Simple filter for replacing content of a NDim cell with its mean value.
// The cell side length (in items) is set in the `filters_meta` slot.
// See https://github.com/Blosc/c-blosc2/blob/main/plugins/filters/ndmean/README.md
pub const BLOSC_FILTER_NDMEAN: u8 = 33;
