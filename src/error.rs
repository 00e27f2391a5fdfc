use crate::include::blosc2_include::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by codec contexts, filters and super-chunks.
///
/// Every variant maps to one of the negative `BLOSC2_ERROR_*` codes through
/// [`Error::code`], so callers porting code that inspects integer sentinels
/// can keep doing so.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed geometry metadata: {0}")]
    MalformedGeometry(String),
    #[error("codec error ({code}): {message}")]
    Codec { code: i32, message: String },
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("super-chunk cannot hold more than {0} chunks")]
    CapacityExceeded(usize),
    #[error("metalayer '{name}' content ({len} bytes) exceeds its reserved slot ({capacity} bytes)")]
    MetalayerTooLarge {
        name: String,
        len: usize,
        capacity: usize,
    },
    #[error("metalayer '{0}' not found")]
    MetalayerNotFound(String),
    #[error("metalayer '{0}' already exists")]
    MetalayerExists(String),
    #[error("chunk index {index} out of range (nchunks = {nchunks})")]
    ChunkOutOfRange { index: usize, nchunks: usize },
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("codec {0} is not supported")]
    UnsupportedCodec(u8),
    #[error("filter {0} is not registered")]
    FilterNotRegistered(u8),
    #[error("filter {filter} does not support typesize {typesize}")]
    UnsupportedTypeSize { filter: u8, typesize: usize },
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParam(message.into())
    }

    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    pub fn malformed_geometry(message: impl Into<String>) -> Self {
        Self::MalformedGeometry(message.into())
    }

    pub fn codec(code: i32, message: impl Into<String>) -> Self {
        Self::Codec {
            code,
            message: message.into(),
        }
    }

    /// The negative sentinel that c-blosc2 would have returned for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::MalformedGeometry(_) => BLOSC2_ERROR_INVALID_HEADER,
            Self::Codec { code, .. } => *code,
            Self::SizeMismatch { .. } => BLOSC2_ERROR_WRITE_BUFFER,
            Self::CapacityExceeded(_) => BLOSC2_ERROR_CHUNK_APPEND,
            Self::MetalayerTooLarge { .. } => BLOSC2_ERROR_INVALID_PARAM,
            Self::MetalayerNotFound(_) => BLOSC2_ERROR_METALAYER_NOT_FOUND,
            Self::MetalayerExists(_) => BLOSC2_ERROR_INVALID_PARAM,
            Self::ChunkOutOfRange { .. } => BLOSC2_ERROR_INVALID_INDEX,
            Self::InvalidParam(_) => BLOSC2_ERROR_INVALID_PARAM,
            Self::InvalidHeader(_) => BLOSC2_ERROR_INVALID_HEADER,
            Self::UnsupportedCodec(_) => BLOSC2_ERROR_CODEC_SUPPORT,
            Self::FilterNotRegistered(_) => BLOSC2_ERROR_FILTER_PIPELINE,
            Self::UnsupportedTypeSize { .. } => BLOSC2_ERROR_FILTER_PIPELINE,
            Self::ThreadPool(_) => BLOSC2_ERROR_THREAD_CREATE,
            Self::Io(_) => BLOSC2_ERROR_FILE_WRITE,
        }
    }
}
