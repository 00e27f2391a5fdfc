// Corresponds to c-blosc2/include/b2nd.h

/// Version of the geometry metalayer format.
pub const B2ND_METALAYER_VERSION: u8 = 0;
/// Maximum number of dimensions of a geometry.
pub const B2ND_MAX_DIM: usize = crate::include::blosc2_include::BLOSC2_MAX_DIM;

/// Name of the metalayer holding the array geometry.
pub const B2ND_METALAYER_NAME: &str = "b2nd";
/// Legacy name of the geometry metalayer (pre-b2nd arrays).
pub const CATERVA_METALAYER_NAME: &str = "caterva";

// msgpack-style tags used by the geometry metalayer.

/// Fixed array with up to 15 elements: `FIXARRAY_TAG + len`.
pub const FIXARRAY_TAG: u8 = 0x90;
/// Big-endian signed 32-bit integer.
pub const INT32_TAG: u8 = 0xd2;
/// Big-endian signed 64-bit integer.
pub const INT64_TAG: u8 = 0xd3;
/// String with a 32-bit big-endian length prefix.
pub const STR32_TAG: u8 = 0xdb;

/// Number of entries in the legacy (caterva) geometry array.
pub const GEOMETRY_NFIELDS: u8 = 5;
/// Number of entries in a b2nd geometry array carrying dtype information.
pub const GEOMETRY_NFIELDS_DTYPE: u8 = 7;
