// Corresponds to c-blosc2/blosc/context.h

use crate::blosc::b2nd::Geometry;
use crate::blosc::blosc2::{Blosc2Cparams, Blosc2Dparams};
use crate::filters::FilterRegistry;
use crate::include::blosc2_include::*;

/// Thread context for individual thread operations.
///
/// Scratch buffers for one worker, reused for every block that worker
/// handles within a chunk.
pub struct ThreadContext {
    /// Filter pipeline ping buffer
    pub tmp: Vec<u8>,
    /// Filter pipeline pong buffer
    pub tmp2: Vec<u8>,
    /// Codec output or input for one stream
    pub tmp3: Vec<u8>,
    /// The blocksize for different temporaries
    pub tmp_blocksize: usize,
}

impl ThreadContext {
    pub fn new(blocksize: usize, ebsize: usize) -> Self {
        ThreadContext {
            tmp: vec![0; blocksize],
            tmp2: vec![0; blocksize],
            tmp3: vec![0; ebsize],
            tmp_blocksize: blocksize,
        }
    }
}

/// Main compression/decompression context.
///
/// Built once by [`blosc2_create_cctx`](crate::blosc::blosc2::blosc2_create_cctx)
/// or [`blosc2_create_dctx`](crate::blosc::blosc2::blosc2_create_dctx) and
/// reused for every chunk. Chunk operations only borrow it immutably, so the
/// parameters never change while blocks are in flight.
pub struct Blosc2Context {
    /// Whether this context compresses (true) or decompresses (false)
    pub(crate) do_compress: bool,
    /// Compressor code to use
    pub(crate) compcode: u8,
    /// The metainfo for the compressor code
    pub(crate) compcode_meta: u8,
    /// Compression level (0-9)
    pub(crate) clevel: u8,
    /// Type size
    pub(crate) typesize: usize,
    /// Requested block size, 0 for automatic
    pub(crate) blocksize: usize,
    /// Whether the blocks should be split or not
    pub(crate) splitmode: u8,
    /// The (sequence of) filters
    pub(crate) filters: [u8; BLOSC2_MAX_FILTERS],
    /// The metainfo for filters
    pub(crate) filters_meta: [u8; BLOSC2_MAX_FILTERS],
    /// Header flags derived from the filter pipeline
    pub(crate) filter_flags: u8,
    /// Array geometry used by n-dimensional filters
    pub(crate) geometry: Option<Geometry>,
    /// Filters this context can resolve
    pub(crate) registry: FilterRegistry,
    pub(crate) nthreads: usize,
    /// Worker pool, only present when nthreads > 1
    pub(crate) pool: Option<rayon::ThreadPool>,
}

impl Blosc2Context {
    pub fn is_compression(&self) -> bool {
        self.do_compress
    }

    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    pub fn typesize(&self) -> usize {
        self.typesize
    }

    pub fn blocksize(&self) -> usize {
        self.blocksize
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Attach an array geometry. When no explicit blocksize was requested the
    /// block shape decides it.
    pub fn set_geometry(&mut self, geometry: Option<Geometry>) {
        if let Some(geometry) = &geometry {
            if self.blocksize == 0 && self.do_compress {
                self.blocksize = geometry.block_nitems() as usize * self.typesize;
            }
        }
        self.geometry = geometry;
    }

    /// The parameters this context was created with.
    pub fn cparams(&self) -> Blosc2Cparams {
        Blosc2Cparams {
            compcode: self.compcode,
            compcode_meta: self.compcode_meta,
            clevel: self.clevel,
            typesize: self.typesize,
            nthreads: self.nthreads,
            blocksize: self.blocksize,
            splitmode: self.splitmode,
            filters: self.filters,
            filters_meta: self.filters_meta,
            geometry: self.geometry,
            registry: self.registry.clone(),
        }
    }

    pub fn dparams(&self) -> Blosc2Dparams {
        Blosc2Dparams {
            nthreads: self.nthreads,
            geometry: self.geometry,
            registry: self.registry.clone(),
        }
    }
}

impl std::fmt::Debug for Blosc2Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blosc2Context")
            .field("do_compress", &self.do_compress)
            .field("compcode", &self.compcode)
            .field("clevel", &self.clevel)
            .field("typesize", &self.typesize)
            .field("blocksize", &self.blocksize)
            .field("splitmode", &self.splitmode)
            .field("filters", &self.filters)
            .field("filters_meta", &self.filters_meta)
            .field("geometry", &self.geometry)
            .field("nthreads", &self.nthreads)
            .finish()
    }
}

/// Storage properties of a super-chunk.
#[derive(Debug, Clone)]
pub struct Blosc2Storage {
    pub cparams: Blosc2Cparams,
    pub dparams: Blosc2Dparams,
    /// Largest number of chunks the super-chunk accepts
    pub max_chunks: usize,
}

impl Default for Blosc2Storage {
    fn default() -> Self {
        Blosc2Storage {
            cparams: Blosc2Cparams::default(),
            dparams: Blosc2Dparams::default(),
            max_chunks: BLOSC2_MAX_CHUNKS,
        }
    }
}
