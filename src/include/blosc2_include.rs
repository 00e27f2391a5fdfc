//! Format and protocol constants, following `c-blosc2/include/blosc2.h`.

// Version numbers

/// Crate-level format major version.
pub const BLOSC2_VERSION_MAJOR: u8 = 2;
/// Crate-level format minor version.
pub const BLOSC2_VERSION_MINOR: u8 = 22;
/// Full version string.
pub const BLOSC2_VERSION_STRING: &str = "2.22.1.dev";

/// Maximum number of dimensions for NDim geometries.
pub const BLOSC2_MAX_DIM: usize = 8;

// Chunk format version identifiers (1 byte each).

/// Chunk format version for Blosc 2.x stable.
pub const BLOSC2_VERSION_FORMAT_STABLE: u8 = 5;
/// Current chunk format version.
pub const BLOSC2_VERSION_FORMAT: u8 = BLOSC2_VERSION_FORMAT_STABLE;
/// Version of the codec format written in the `versionlz` header byte.
pub const BLOSC2_VERSION_LZ: u8 = 1;

/// Current version of the contiguous frame format.
pub const BLOSC2_VERSION_FRAME_FORMAT: u8 = 2;

/// Minimum header length (Blosc1 layout).
pub const BLOSC_MIN_HEADER_LENGTH: usize = 16;
/// Extended header length (Blosc2 layout, with filter pipeline).
pub const BLOSC_EXTENDED_HEADER_LENGTH: usize = 32;
/// Maximum overhead of a compressed chunk over its logical size.
///
/// Any chunk fits in `nbytes + BLOSC2_MAX_OVERHEAD` because the memcpyed
/// representation is always available as a fallback.
pub const BLOSC2_MAX_OVERHEAD: usize = BLOSC_EXTENDED_HEADER_LENGTH;

pub const INT_MAX: usize = 2147483647;
pub const UINT8_MAX: usize = 255;

/// Maximum size of a source buffer.
pub const BLOSC2_MAX_BUFFERSIZE: usize = INT_MAX - BLOSC2_MAX_OVERHEAD;
/// Maximum typesize before considering the source as a stream of bytes.
pub const BLOSC_MAX_TYPESIZE: usize = UINT8_MAX;
/// Minimum buffer size to be compressed.
pub const BLOSC_MIN_BUFFERSIZE: usize = 32;
/// Maximum number of streams a block can be split into.
pub const MAX_STREAMS: usize = 16;

/// L1 cache size used by the automatic blocksize tuner.
pub const L1: usize = 32 * 1024;
/// L2 cache size.
pub const L2: usize = 256 * 1024;

/// Default upper bound on the number of chunks in a super-chunk.
pub const BLOSC2_MAX_CHUNKS: usize = i32::MAX as usize;
/// Maximum number of fixed-slot metalayers in a super-chunk.
pub const BLOSC2_MAX_METALAYERS: usize = 16;
/// Maximum length of a metalayer name.
pub const BLOSC2_METALAYER_NAME_MAXLEN: usize = 31;

// Filter ID ranges.

/// Start of built-in filter IDs.
pub const BLOSC2_DEFINED_FILTERS_START: u8 = 0;
/// End of built-in filter IDs.
pub const BLOSC2_DEFINED_FILTERS_STOP: u8 = 31;
/// Start of globally registered filter IDs.
pub const BLOSC2_GLOBAL_REGISTERED_FILTERS_START: u8 = 32;
/// End of globally registered filter IDs.
pub const BLOSC2_GLOBAL_REGISTERED_FILTERS_STOP: u8 = 159;
/// Start of user-registered filter IDs.
pub const BLOSC2_USER_REGISTERED_FILTERS_START: u8 = 160;
/// End of user-registered filter IDs.
pub const BLOSC2_USER_REGISTERED_FILTERS_STOP: u8 = 255;

/// Maximum number of filters in the filter pipeline.
pub const BLOSC2_MAX_FILTERS: usize = 6;

// Filter codes

/// No shuffle (for compatibility with Blosc1).
pub const BLOSC_NOSHUFFLE: u8 = 0;
/// No filter.
pub const BLOSC_NOFILTER: u8 = 0;
/// Byte-wise shuffle.
pub const BLOSC_SHUFFLE: u8 = 1;
/// Bit-wise shuffle.
pub const BLOSC_BITSHUFFLE: u8 = 2;
/// Truncate mantissa precision.
/// Positive values in `filters_meta` keep bits; negative values zero bits.
pub const BLOSC_TRUNC_PREC: u8 = 4;

// Internal flags (header byte 2)

/// Byte-wise shuffle applied. Set together with [`BLOSC_DOBITSHUFFLE`] it marks an extended header.
pub const BLOSC_DOSHUFFLE: u8 = 0x1;
/// Plain copy, no compression.
pub const BLOSC_MEMCPYED: u8 = 0x2;
/// Bit-wise shuffle applied.
pub const BLOSC_DOBITSHUFFLE: u8 = 0x4;
/// Blocks are stored as a single stream (no split).
pub const BLOSC_DONT_SPLIT: u8 = 0x10;

// Codec IDs

/// BloscLZ codec (not provided by this crate).
pub const BLOSC_BLOSCLZ: u8 = 0;
/// LZ4 codec.
pub const BLOSC_LZ4: u8 = 1;
/// LZ4HC codec (not provided by this crate).
pub const BLOSC_LZ4HC: u8 = 2;
/// Snappy codec.
pub const BLOSC_SNAPPY: u8 = 3;
/// Zlib codec.
pub const BLOSC_ZLIB: u8 = 4;
/// Zstandard codec.
pub const BLOSC_ZSTD: u8 = 5;
/// Sentinel: one past the last built-in codec.
pub const BLOSC_LAST_CODEC: u8 = 6;

pub const BLOSC_BLOSCLZ_COMPNAME: &str = "blosclz";
pub const BLOSC_LZ4_COMPNAME: &str = "lz4";
pub const BLOSC_LZ4HC_COMPNAME: &str = "lz4hc";
pub const BLOSC_SNAPPY_COMPNAME: &str = "snappy";
pub const BLOSC_ZLIB_COMPNAME: &str = "zlib";
pub const BLOSC_ZSTD_COMPNAME: &str = "zstd";

// Split mode

/// Always split blocks into one stream per byte of the type.
pub const BLOSC_ALWAYS_SPLIT: u8 = 1;
/// Never split blocks.
pub const BLOSC_NEVER_SPLIT: u8 = 2;
/// Let the tuner decide.
pub const BLOSC_AUTO_SPLIT: u8 = 3;
/// Forward compatible split (same heuristics as auto).
pub const BLOSC_FORWARD_COMPAT_SPLIT: u8 = 4;

// Offsets into the chunk header.

pub const BLOSC2_CHUNK_VERSION: usize = 0x0;
pub const BLOSC2_CHUNK_VERSIONLZ: usize = 0x1;
pub const BLOSC2_CHUNK_FLAGS: usize = 0x2;
pub const BLOSC2_CHUNK_TYPESIZE: usize = 0x3;
pub const BLOSC2_CHUNK_NBYTES: usize = 0x4;
pub const BLOSC2_CHUNK_BLOCKSIZE: usize = 0x8;
pub const BLOSC2_CHUNK_CBYTES: usize = 0xc;
pub const BLOSC2_CHUNK_FILTER_CODES: usize = 0x10;
pub const BLOSC2_CHUNK_UDCOMPCODE: usize = 0x16;
pub const BLOSC2_CHUNK_COMPCODE_META: usize = 0x17;
pub const BLOSC2_CHUNK_FILTER_META: usize = 0x18;
pub const BLOSC2_CHUNK_BLOSC2_FLAGS: usize = 0x1F;

// Special chunk values, stored in bits 4..6 of the blosc2 flags byte.

/// Regular chunk.
pub const BLOSC2_NO_SPECIAL: u8 = 0x0;
/// Chunk made of zeros.
pub const BLOSC2_SPECIAL_ZERO: u8 = 0x1;
/// Chunk made of NaNs.
pub const BLOSC2_SPECIAL_NAN: u8 = 0x2;
/// Chunk made of a repeated value.
pub const BLOSC2_SPECIAL_VALUE: u8 = 0x3;
/// Chunk with uninitialized content.
pub const BLOSC2_SPECIAL_UNINIT: u8 = 0x4;
pub const BLOSC2_SPECIAL_MASK: u8 = 0x7;

// Error codes.

/// Success.
pub const BLOSC2_ERROR_SUCCESS: i32 = 0;
/// Generic failure.
pub const BLOSC2_ERROR_FAILURE: i32 = -1;
/// Bad stream.
pub const BLOSC2_ERROR_STREAM: i32 = -2;
/// Invalid data.
pub const BLOSC2_ERROR_DATA: i32 = -3;
/// Memory allocation failure.
pub const BLOSC2_ERROR_MEMORY_ALLOC: i32 = -4;
/// Not enough space to read.
pub const BLOSC2_ERROR_READ_BUFFER: i32 = -5;
/// Not enough space to write.
pub const BLOSC2_ERROR_WRITE_BUFFER: i32 = -6;
/// Codec not supported.
pub const BLOSC2_ERROR_CODEC_SUPPORT: i32 = -7;
/// Invalid parameter supplied to codec.
pub const BLOSC2_ERROR_CODEC_PARAM: i32 = -8;
/// Version not supported.
pub const BLOSC2_ERROR_VERSION_SUPPORT: i32 = -10;
/// Invalid value in header.
pub const BLOSC2_ERROR_INVALID_HEADER: i32 = -11;
/// Invalid parameter supplied to function.
pub const BLOSC2_ERROR_INVALID_PARAM: i32 = -12;
/// File read failure.
pub const BLOSC2_ERROR_FILE_READ: i32 = -13;
/// File write failure.
pub const BLOSC2_ERROR_FILE_WRITE: i32 = -14;
/// File open failure.
pub const BLOSC2_ERROR_FILE_OPEN: i32 = -15;
/// Not found.
pub const BLOSC2_ERROR_NOT_FOUND: i32 = -16;
/// Filter pipeline error.
pub const BLOSC2_ERROR_FILTER_PIPELINE: i32 = -18;
/// Chunk append failure.
pub const BLOSC2_ERROR_CHUNK_APPEND: i32 = -20;
/// Chunk update failure.
pub const BLOSC2_ERROR_CHUNK_UPDATE: i32 = -21;
/// Thread or thread context creation failure.
pub const BLOSC2_ERROR_THREAD_CREATE: i32 = -26;
/// Invalid index.
pub const BLOSC2_ERROR_INVALID_INDEX: i32 = -33;
/// Metalayer not found.
pub const BLOSC2_ERROR_METALAYER_NOT_FOUND: i32 = -34;
/// Max buffer size exceeded.
pub const BLOSC2_ERROR_MAX_BUFSIZE_EXCEEDED: i32 = -35;
