//! Filter plugins and the registry that resolves filter ids.
//!
//! A filter transforms one block before compression ([`Filter::forward`])
//! and undoes the transform after decompression ([`Filter::backward`]).
//! Contexts look filters up in the [`FilterRegistry`] they were created
//! with; there is no process-wide table.

use crate::blosc::b2nd::Geometry;
use crate::error::{Error, Result};
use crate::include::blosc2_include::*;
use crate::include::filters_registry::BLOSC_FILTER_NDMEAN;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod builtin;
pub mod ndmean;

pub use builtin::{BitShuffle, Shuffle, TruncPrec};
pub use ndmean::NdMean;

/// Per-block information handed to every filter call.
#[derive(Debug, Clone, Copy)]
pub struct FilterParams<'a> {
    /// Bytes per element.
    pub typesize: usize,
    /// Nominal block size of the chunk. The block being filtered may be
    /// shorter when it is the leftover block.
    pub blocksize: usize,
    /// Byte offset of this block inside the chunk.
    pub offset: usize,
    /// Index of the chunk inside its super-chunk.
    pub nchunk: i64,
    /// Array geometry, when the data carries a `b2nd` metalayer.
    pub geometry: Option<&'a Geometry>,
}

impl FilterParams<'_> {
    /// Index of the block being filtered.
    pub fn nblock(&self) -> usize {
        if self.blocksize == 0 {
            0
        } else {
            self.offset / self.blocksize
        }
    }
}

/// A reversible (or documented lossy) block transform.
///
/// `input` and `output` always have the same length. Implementations must
/// write every byte of `output` and must not keep references to either
/// buffer.
pub trait Filter: Send + Sync {
    fn forward(&self, input: &[u8], output: &mut [u8], meta: u8, params: &FilterParams) -> Result<()>;

    fn backward(&self, input: &[u8], output: &mut [u8], meta: u8, params: &FilterParams) -> Result<()>;
}

/// Maps filter ids to implementations.
///
/// `FilterRegistry::default()` holds the built-in filters
/// ([`BLOSC_SHUFFLE`], [`BLOSC_BITSHUFFLE`], [`BLOSC_TRUNC_PREC`]) and the
/// cell-mean filter under [`BLOSC_FILTER_NDMEAN`].
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<u8, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// A registry with the built-in filters only.
    pub fn builtin() -> Self {
        let mut filters: HashMap<u8, Arc<dyn Filter>> = HashMap::new();
        filters.insert(BLOSC_SHUFFLE, Arc::new(Shuffle));
        filters.insert(BLOSC_BITSHUFFLE, Arc::new(BitShuffle));
        filters.insert(BLOSC_TRUNC_PREC, Arc::new(TruncPrec));
        FilterRegistry { filters }
    }

    /// Register a plugin under `id`.
    ///
    /// Ids below [`BLOSC2_GLOBAL_REGISTERED_FILTERS_START`] are reserved for
    /// built-in filters and an id can only be registered once.
    pub fn register(&mut self, id: u8, filter: Arc<dyn Filter>) -> Result<()> {
        if id < BLOSC2_GLOBAL_REGISTERED_FILTERS_START {
            return Err(Error::invalid_param(format!(
                "filter id {id} is reserved for built-in filters"
            )));
        }
        if self.filters.contains_key(&id) {
            return Err(Error::invalid_param(format!(
                "filter id {id} is already registered"
            )));
        }
        log::debug!("registering filter {id}");
        self.filters.insert(id, filter);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Result<&Arc<dyn Filter>> {
        self.filters.get(&id).ok_or(Error::FilterNotRegistered(id))
    }

    pub fn contains(&self, id: u8) -> bool {
        self.filters.contains_key(&id)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::builtin();
        registry
            .filters
            .insert(BLOSC_FILTER_NDMEAN, Arc::new(NdMean));
        registry
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.filters.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("FilterRegistry").field("ids", &ids).finish()
    }
}
