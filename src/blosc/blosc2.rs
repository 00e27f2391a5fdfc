// Corresponds to c-blosc2/blosc/blosc2.c

use crate::blosc::b2nd::Geometry;
use crate::blosc::blosc_private::{_sw32, sw32};
use crate::blosc::context::{Blosc2Context, ThreadContext};
use crate::blosc::stune::{blosc_stune_next_blocksize, split_block};
use crate::codecs;
use crate::error::{Error, Result};
use crate::filters::{FilterParams, FilterRegistry};
use crate::include::blosc2_include::*;
use rayon::prelude::*;

const MAX_FILTERS: usize = BLOSC2_MAX_FILTERS;
const HEADER_LEN: usize = BLOSC_EXTENDED_HEADER_LENGTH;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BloscHeader {
    pub version: u8,
    pub versionlz: u8,
    pub flags: u8,
    pub typesize: u8,
    pub nbytes: i32,
    pub blocksize: i32,
    pub cbytes: i32,
    pub filters: [u8; MAX_FILTERS],
    pub udcompcode: u8,
    pub compcode_meta: u8,
    pub filters_meta: [u8; MAX_FILTERS],
    pub reserved2: u8,
    pub blosc2_flags: u8,
}

impl BloscHeader {
    /// Codec id, stored in the top three bits of the flags.
    pub fn compcode(&self) -> u8 {
        self.flags >> 5
    }

    pub fn special_type(&self) -> u8 {
        (self.blosc2_flags >> 4) & BLOSC2_SPECIAL_MASK
    }

    pub fn memcpyed(&self) -> bool {
        self.flags & BLOSC_MEMCPYED != 0
    }

    pub fn split(&self) -> bool {
        self.flags & BLOSC_DONT_SPLIT == 0
    }

    pub fn nbytes(&self) -> usize {
        self.nbytes as usize
    }

    pub fn cbytes(&self) -> usize {
        self.cbytes as usize
    }

    pub fn blocksize(&self) -> usize {
        self.blocksize as usize
    }

    pub fn typesize(&self) -> usize {
        self.typesize as usize
    }

    pub fn nblocks(&self) -> usize {
        if self.blocksize == 0 {
            0
        } else {
            self.nbytes().div_ceil(self.blocksize())
        }
    }

    fn write(&self, dest: &mut [u8]) {
        dest[BLOSC2_CHUNK_VERSION] = self.version;
        dest[BLOSC2_CHUNK_VERSIONLZ] = self.versionlz;
        dest[BLOSC2_CHUNK_FLAGS] = self.flags;
        dest[BLOSC2_CHUNK_TYPESIZE] = self.typesize;
        _sw32(dest, BLOSC2_CHUNK_NBYTES, self.nbytes);
        _sw32(dest, BLOSC2_CHUNK_BLOCKSIZE, self.blocksize);
        _sw32(dest, BLOSC2_CHUNK_CBYTES, self.cbytes);
        dest[BLOSC2_CHUNK_FILTER_CODES..BLOSC2_CHUNK_FILTER_CODES + MAX_FILTERS]
            .copy_from_slice(&self.filters);
        dest[BLOSC2_CHUNK_UDCOMPCODE] = self.udcompcode;
        dest[BLOSC2_CHUNK_COMPCODE_META] = self.compcode_meta;
        dest[BLOSC2_CHUNK_FILTER_META..BLOSC2_CHUNK_FILTER_META + MAX_FILTERS]
            .copy_from_slice(&self.filters_meta);
        dest[BLOSC2_CHUNK_FILTER_META + MAX_FILTERS] = self.reserved2;
        dest[BLOSC2_CHUNK_BLOSC2_FLAGS] = self.blosc2_flags;
    }
}

/// Parse and validate the extended header at the start of `src`.
///
/// Only the header itself is inspected; callers that need the whole chunk
/// check `cbytes` against the buffer they hold.
pub fn read_chunk_header(src: &[u8]) -> Result<BloscHeader> {
    if src.len() < HEADER_LEN {
        return Err(Error::invalid_header(format!(
            "{} bytes is shorter than the {HEADER_LEN} byte header",
            src.len()
        )));
    }

    let mut header = BloscHeader {
        version: src[BLOSC2_CHUNK_VERSION],
        versionlz: src[BLOSC2_CHUNK_VERSIONLZ],
        flags: src[BLOSC2_CHUNK_FLAGS],
        typesize: src[BLOSC2_CHUNK_TYPESIZE],
        nbytes: sw32(src, BLOSC2_CHUNK_NBYTES),
        blocksize: sw32(src, BLOSC2_CHUNK_BLOCKSIZE),
        cbytes: sw32(src, BLOSC2_CHUNK_CBYTES),
        ..Default::default()
    };

    if header.version > BLOSC2_VERSION_FORMAT {
        return Err(Error::codec(
            BLOSC2_ERROR_VERSION_SUPPORT,
            format!("chunk format version {} is not supported", header.version),
        ));
    }
    let extended = BLOSC_DOSHUFFLE | BLOSC_DOBITSHUFFLE;
    if header.flags & extended != extended {
        return Err(Error::invalid_header("not an extended header"));
    }
    if header.typesize == 0 {
        return Err(Error::invalid_header("typesize is zero"));
    }
    if header.nbytes < 0 || header.blocksize < 0 || header.cbytes < HEADER_LEN as i32 {
        return Err(Error::invalid_header(format!(
            "inconsistent sizes: nbytes {}, blocksize {}, cbytes {}",
            header.nbytes, header.blocksize, header.cbytes
        )));
    }
    if header.nbytes > 0 && (header.blocksize == 0 || header.blocksize > header.nbytes) {
        return Err(Error::invalid_header(format!(
            "blocksize {} does not fit nbytes {}",
            header.blocksize, header.nbytes
        )));
    }

    header
        .filters
        .copy_from_slice(&src[BLOSC2_CHUNK_FILTER_CODES..BLOSC2_CHUNK_FILTER_CODES + MAX_FILTERS]);
    header.udcompcode = src[BLOSC2_CHUNK_UDCOMPCODE];
    header.compcode_meta = src[BLOSC2_CHUNK_COMPCODE_META];
    header
        .filters_meta
        .copy_from_slice(&src[BLOSC2_CHUNK_FILTER_META..BLOSC2_CHUNK_FILTER_META + MAX_FILTERS]);
    header.reserved2 = src[BLOSC2_CHUNK_FILTER_META + MAX_FILTERS];
    header.blosc2_flags = src[BLOSC2_CHUNK_BLOSC2_FLAGS];

    // split blocks hold one stream per byte of the type
    if header.nbytes > 0
        && header.split()
        && !header.memcpyed()
        && (header.blocksize() < header.typesize() || header.blocksize() % header.typesize() != 0)
    {
        return Err(Error::invalid_header(format!(
            "split blocksize {} is not a multiple of typesize {}",
            header.blocksize, header.typesize
        )));
    }

    Ok(header)
}

/// Compression parameters.
#[derive(Debug, Clone)]
pub struct Blosc2Cparams {
    pub compcode: u8,
    pub compcode_meta: u8,
    pub clevel: u8,
    pub typesize: usize,
    pub nthreads: usize,
    /// 0 selects the block size automatically
    pub blocksize: usize,
    pub splitmode: u8,
    pub filters: [u8; MAX_FILTERS],
    pub filters_meta: [u8; MAX_FILTERS],
    /// Array geometry for n-dimensional filters
    pub geometry: Option<Geometry>,
    pub registry: FilterRegistry,
}

impl Default for Blosc2Cparams {
    fn default() -> Self {
        let mut filters = [BLOSC_NOFILTER; MAX_FILTERS];
        filters[MAX_FILTERS - 1] = BLOSC_SHUFFLE;
        Blosc2Cparams {
            compcode: BLOSC_LZ4,
            compcode_meta: 0,
            clevel: 5,
            typesize: 8,
            nthreads: 1,
            blocksize: 0,
            splitmode: BLOSC_FORWARD_COMPAT_SPLIT,
            filters,
            filters_meta: [0; MAX_FILTERS],
            geometry: None,
            registry: FilterRegistry::default(),
        }
    }
}

/// Decompression parameters.
#[derive(Debug, Clone)]
pub struct Blosc2Dparams {
    pub nthreads: usize,
    pub geometry: Option<Geometry>,
    pub registry: FilterRegistry,
}

impl Default for Blosc2Dparams {
    fn default() -> Self {
        Blosc2Dparams {
            nthreads: 1,
            geometry: None,
            registry: FilterRegistry::default(),
        }
    }
}

fn build_pool(nthreads: usize) -> Result<Option<rayon::ThreadPool>> {
    if nthreads == 0 {
        return Err(Error::invalid_param("nthreads must be at least 1"));
    }
    if nthreads == 1 {
        return Ok(None);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nthreads)
        .thread_name(|i| format!("blosc2-worker-{i}"))
        .build()?;
    Ok(Some(pool))
}

fn filter_flags(filters: &[u8; MAX_FILTERS]) -> u8 {
    filters.iter().fold(0, |flags, &filter| match filter {
        BLOSC_SHUFFLE => flags | BLOSC_DOSHUFFLE,
        BLOSC_BITSHUFFLE => flags | BLOSC_DOBITSHUFFLE,
        _ => flags,
    })
}

/// Create a context for compressing chunks with `cparams`.
pub fn blosc2_create_cctx(cparams: Blosc2Cparams) -> Result<Blosc2Context> {
    if cparams.typesize == 0 || cparams.typesize > BLOSC_MAX_TYPESIZE {
        return Err(Error::invalid_param(format!(
            "typesize must be in 1..={BLOSC_MAX_TYPESIZE}, got {}",
            cparams.typesize
        )));
    }
    if cparams.clevel > 9 {
        return Err(Error::invalid_param(format!(
            "clevel must be in 0..=9, got {}",
            cparams.clevel
        )));
    }
    if !codecs::is_supported(cparams.compcode) {
        return Err(Error::UnsupportedCodec(cparams.compcode));
    }
    for &filter in &cparams.filters {
        if filter != BLOSC_NOFILTER && !cparams.registry.contains(filter) {
            return Err(Error::FilterNotRegistered(filter));
        }
    }

    let mut context = Blosc2Context {
        do_compress: true,
        compcode: cparams.compcode,
        compcode_meta: cparams.compcode_meta,
        clevel: cparams.clevel,
        typesize: cparams.typesize,
        blocksize: cparams.blocksize,
        splitmode: cparams.splitmode,
        filters: cparams.filters,
        filters_meta: cparams.filters_meta,
        filter_flags: filter_flags(&cparams.filters),
        geometry: None,
        registry: cparams.registry,
        nthreads: cparams.nthreads,
        pool: build_pool(cparams.nthreads)?,
    };
    context.set_geometry(cparams.geometry);
    log::debug!("created compression context: {:?}", context);
    Ok(context)
}

/// Create a context for decompressing chunks with `dparams`.
pub fn blosc2_create_dctx(dparams: Blosc2Dparams) -> Result<Blosc2Context> {
    let context = Blosc2Context {
        do_compress: false,
        compcode: BLOSC_LZ4,
        compcode_meta: 0,
        clevel: 0,
        typesize: 1,
        blocksize: 0,
        splitmode: BLOSC_FORWARD_COMPAT_SPLIT,
        filters: [BLOSC_NOFILTER; MAX_FILTERS],
        filters_meta: [0; MAX_FILTERS],
        filter_flags: 0,
        geometry: dparams.geometry,
        registry: dparams.registry,
        nthreads: dparams.nthreads,
        pool: build_pool(dparams.nthreads)?,
    };
    log::debug!("created decompression context: {:?}", context);
    Ok(context)
}

/// Block partitioning of one chunk.
#[derive(Debug, Clone, Copy)]
struct ChunkLayout {
    nbytes: usize,
    blocksize: usize,
    nblocks: usize,
    leftover: usize,
    split: bool,
}

impl ChunkLayout {
    fn block_len(&self, nblock: usize) -> usize {
        if nblock + 1 == self.nblocks && self.leftover > 0 {
            self.leftover
        } else {
            self.blocksize
        }
    }

    fn nstreams(&self, bsize: usize, typesize: usize) -> usize {
        // the leftover block is never split
        if self.split && bsize == self.blocksize {
            typesize
        } else {
            1
        }
    }
}

fn base_header(typesize: usize, nbytes: usize) -> Result<BloscHeader> {
    if nbytes > BLOSC2_MAX_BUFFERSIZE {
        return Err(Error::codec(
            BLOSC2_ERROR_MAX_BUFSIZE_EXCEEDED,
            format!("{nbytes} bytes exceeds the maximum buffer size {BLOSC2_MAX_BUFFERSIZE}"),
        ));
    }
    Ok(BloscHeader {
        version: BLOSC2_VERSION_FORMAT,
        versionlz: BLOSC2_VERSION_LZ,
        flags: BLOSC_DOSHUFFLE | BLOSC_DOBITSHUFFLE,
        typesize: typesize as u8,
        nbytes: nbytes as i32,
        ..Default::default()
    })
}

impl Blosc2Context {
    fn check_compress(&self) -> Result<()> {
        if self.do_compress {
            Ok(())
        } else {
            Err(Error::invalid_param(
                "context was created for decompression",
            ))
        }
    }

    fn header_for(&self, layout: &ChunkLayout) -> Result<BloscHeader> {
        let mut header = base_header(self.typesize, layout.nbytes)?;
        header.flags |= self.compcode << 5;
        if !layout.split {
            header.flags |= BLOSC_DONT_SPLIT;
        }
        header.blocksize = layout.blocksize as i32;
        header.filters = self.filters;
        header.filters_meta = self.filters_meta;
        header.udcompcode = self.compcode;
        header.compcode_meta = self.compcode_meta;
        Ok(header)
    }

    /// Compress `src` as chunk 0. See [`Blosc2Context::compress_chunk`].
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>> {
        self.compress_chunk(0, src)
    }

    /// Compress `src`, the data of chunk `nchunk`, into a new chunk.
    ///
    /// The result never exceeds `src.len() + BLOSC2_MAX_OVERHEAD` bytes: data
    /// that does not compress is stored verbatim behind the header.
    pub fn compress_chunk(&self, nchunk: i64, src: &[u8]) -> Result<Vec<u8>> {
        self.check_compress()?;
        let nbytes = src.len();
        base_header(self.typesize, nbytes)?;
        if nbytes == 0 {
            let layout = ChunkLayout {
                nbytes,
                blocksize: 0,
                nblocks: 0,
                leftover: 0,
                split: false,
            };
            return self.memcpyed_chunk(&layout, src);
        }

        let blocksize = blosc_stune_next_blocksize(self, nbytes);
        let layout = ChunkLayout {
            nbytes,
            blocksize,
            nblocks: nbytes.div_ceil(blocksize),
            leftover: nbytes % blocksize,
            split: blocksize >= self.typesize
                && blocksize % self.typesize == 0
                && split_block(self, self.typesize, blocksize),
        };

        if self.clevel == 0 {
            return self.memcpyed_chunk(&layout, src);
        }

        let ebsize = codecs::max_compressed_len(self.compcode, blocksize);
        let blocks: Vec<Vec<u8>> = match &self.pool {
            Some(pool) => pool.install(|| {
                (0..layout.nblocks)
                    .into_par_iter()
                    .map_init(
                        || ThreadContext::new(blocksize, ebsize),
                        |thread, nblock| self.blosc_c(thread, &layout, nchunk, nblock, src),
                    )
                    .collect::<Result<Vec<_>>>()
            })?,
            None => {
                let mut thread = ThreadContext::new(blocksize, ebsize);
                (0..layout.nblocks)
                    .map(|nblock| self.blosc_c(&mut thread, &layout, nchunk, nblock, src))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let bstarts_len = layout.nblocks * 4;
        let cbytes = HEADER_LEN + bstarts_len + blocks.iter().map(Vec::len).sum::<usize>();
        if cbytes >= nbytes + HEADER_LEN {
            log::debug!(
                "chunk {nchunk} does not compress ({cbytes} >= {}), storing it verbatim",
                nbytes + HEADER_LEN
            );
            return self.memcpyed_chunk(&layout, src);
        }

        let mut header = self.header_for(&layout)?;
        header.cbytes = cbytes as i32;
        let mut chunk = vec![0u8; HEADER_LEN + bstarts_len];
        header.write(&mut chunk);
        chunk.reserve(cbytes - chunk.len());
        for (nblock, block) in blocks.iter().enumerate() {
            let bstart = chunk.len() as i32;
            _sw32(&mut chunk, HEADER_LEN + nblock * 4, bstart);
            chunk.extend_from_slice(block);
        }
        log::debug!(
            "compressed chunk {nchunk}: {nbytes} -> {cbytes} bytes in {} blocks",
            layout.nblocks
        );
        Ok(chunk)
    }

    fn memcpyed_chunk(&self, layout: &ChunkLayout, src: &[u8]) -> Result<Vec<u8>> {
        let mut header = self.header_for(layout)?;
        header.flags |= BLOSC_MEMCPYED;
        header.cbytes = (HEADER_LEN + src.len()) as i32;
        let mut chunk = vec![0u8; HEADER_LEN];
        header.write(&mut chunk);
        chunk.extend_from_slice(src);
        Ok(chunk)
    }

    /// Compress `src` into `dest`.
    ///
    /// Returns the compressed size, or 0 when the result does not fit in
    /// `dest` (the buffer is uncompressible at this size).
    pub fn compress_into(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        self.compress_chunk_into(0, src, dest)
    }

    pub fn compress_chunk_into(&self, nchunk: i64, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        let chunk = self.compress_chunk(nchunk, src)?;
        if chunk.len() > dest.len() {
            log::debug!(
                "buffer is uncompressible: {} bytes needed, {} available",
                chunk.len(),
                dest.len()
            );
            return Ok(0);
        }
        dest[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn filter_params(&self, typesize: usize, blocksize: usize, offset: usize, nchunk: i64) -> FilterParams<'_> {
        FilterParams {
            typesize,
            blocksize,
            offset,
            nchunk,
            geometry: self.geometry.as_ref(),
        }
    }

    /// Run the forward filters in slot order. The result lives in `src`,
    /// `tmp` or `tmp2`.
    fn pipeline_forward<'a>(
        &self,
        params: &FilterParams,
        src: &'a [u8],
        tmp: &'a mut [u8],
        tmp2: &'a mut [u8],
    ) -> Result<&'a [u8]> {
        let len = src.len();
        // None: data still in src, Some(false): in tmp, Some(true): in tmp2
        let mut current: Option<bool> = None;
        for (&id, &meta) in self.filters.iter().zip(&self.filters_meta) {
            if id == BLOSC_NOFILTER {
                continue;
            }
            let filter = self.registry.get(id)?;
            match current {
                None => filter.forward(src, &mut tmp[..len], meta, params)?,
                Some(false) => filter.forward(&tmp[..len], &mut tmp2[..len], meta, params)?,
                Some(true) => filter.forward(&tmp2[..len], &mut tmp[..len], meta, params)?,
            }
            current = match current {
                None | Some(true) => Some(false),
                Some(false) => Some(true),
            };
        }
        Ok(match current {
            None => src,
            Some(false) => &tmp[..len],
            Some(true) => &tmp2[..len],
        })
    }

    /// Filter and compress block `nblock`, returning its encoded streams.
    fn blosc_c(
        &self,
        thread: &mut ThreadContext,
        layout: &ChunkLayout,
        nchunk: i64,
        nblock: usize,
        src: &[u8],
    ) -> Result<Vec<u8>> {
        let offset = nblock * layout.blocksize;
        let bsize = layout.block_len(nblock);
        let block = &src[offset..offset + bsize];
        let params = self.filter_params(self.typesize, layout.blocksize, offset, nchunk);
        let filtered = self.pipeline_forward(&params, block, &mut thread.tmp, &mut thread.tmp2)?;

        let nstreams = layout.nstreams(bsize, self.typesize);
        let neblock = bsize / nstreams;
        let mut out = Vec::with_capacity(bsize + 4 * nstreams);
        for stream in filtered.chunks_exact(neblock).take(nstreams) {
            let csize = codecs::compress_block(self.compcode, self.clevel, stream, &mut thread.tmp3)?;
            if csize == 0 || csize >= neblock {
                // Incompressible stream: store it raw
                out.extend_from_slice(&(neblock as i32).to_le_bytes());
                out.extend_from_slice(stream);
            } else {
                out.extend_from_slice(&(csize as i32).to_le_bytes());
                out.extend_from_slice(&thread.tmp3[..csize]);
            }
        }
        log::trace!("block {nblock}: {bsize} -> {} bytes ({nstreams} streams)", out.len());
        Ok(out)
    }

    /// Decompress chunk 0. See [`Blosc2Context::decompress_chunk`].
    pub fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        self.decompress_chunk(0, src, dest)
    }

    /// Decompress `src`, the data of chunk `nchunk`, into `dest`.
    ///
    /// Returns the number of bytes written, which is the logical size of the
    /// chunk. `dest` must be at least that large.
    pub fn decompress_chunk(&self, nchunk: i64, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        let header = read_chunk_header(src)?;
        let nbytes = header.nbytes();
        if src.len() < header.cbytes() {
            return Err(Error::invalid_header(format!(
                "chunk declares {} bytes but only {} are available",
                header.cbytes,
                src.len()
            )));
        }
        if dest.len() < nbytes {
            return Err(Error::SizeMismatch {
                expected: nbytes,
                actual: dest.len(),
            });
        }
        let dest = &mut dest[..nbytes];
        if nbytes == 0 {
            return Ok(0);
        }

        if header.special_type() != BLOSC2_NO_SPECIAL {
            fill_special(&header, src, dest)?;
            return Ok(nbytes);
        }
        if header.memcpyed() {
            if header.cbytes() != HEADER_LEN + nbytes {
                return Err(Error::invalid_header("memcpyed chunk with wrong cbytes"));
            }
            dest.copy_from_slice(&src[HEADER_LEN..HEADER_LEN + nbytes]);
            return Ok(nbytes);
        }

        let bstarts = read_bstarts(&header, src)?;
        let blocksize = header.blocksize();
        match &self.pool {
            Some(pool) => pool.install(|| {
                dest.par_chunks_mut(blocksize).enumerate().try_for_each_init(
                    || ThreadContext::new(blocksize, 0),
                    |thread, (nblock, block)| {
                        self.blosc_d(thread, &header, src, nchunk, nblock, bstarts[nblock], block)
                    },
                )
            })?,
            None => {
                let mut thread = ThreadContext::new(blocksize, 0);
                for (nblock, block) in dest.chunks_mut(blocksize).enumerate() {
                    self.blosc_d(&mut thread, &header, src, nchunk, nblock, bstarts[nblock], block)?;
                }
            }
        }
        log::debug!(
            "decompressed chunk {nchunk}: {} -> {nbytes} bytes",
            header.cbytes
        );
        Ok(nbytes)
    }

    /// Decompress block `nblock` of `src` into `dest`, which has the block's
    /// length, then undo the filters in reverse slot order.
    #[allow(clippy::too_many_arguments)]
    fn blosc_d(
        &self,
        thread: &mut ThreadContext,
        header: &BloscHeader,
        src: &[u8],
        nchunk: i64,
        nblock: usize,
        bstart: usize,
        dest: &mut [u8],
    ) -> Result<()> {
        let bsize = dest.len();
        let typesize = header.typesize();
        let cbytes = header.cbytes();
        let nstreams = if header.split() && bsize == header.blocksize() {
            typesize
        } else {
            1
        };
        let neblock = bsize / nstreams;

        let buffer = &mut thread.tmp[..bsize];
        let mut pos = bstart;
        for stream in buffer.chunks_exact_mut(neblock).take(nstreams) {
            if pos + 4 > cbytes {
                return Err(Error::invalid_header(format!(
                    "block {nblock} runs past the end of the chunk"
                )));
            }
            let csize = sw32(src, pos);
            pos += 4;
            if csize <= 0 || pos + csize as usize > cbytes {
                return Err(Error::invalid_header(format!(
                    "block {nblock} has a stream of invalid size {csize}"
                )));
            }
            let payload = &src[pos..pos + csize as usize];
            if csize as usize == neblock {
                stream.copy_from_slice(payload);
            } else {
                codecs::decompress_block(header.compcode(), payload, stream)?;
            }
            pos += csize as usize;
        }

        let params = self.filter_params(typesize, header.blocksize(), nblock * header.blocksize(), nchunk);
        let len = bsize;
        // false: data in tmp, true: in tmp2
        let mut in_tmp2 = false;
        for i in (0..MAX_FILTERS).rev() {
            let id = header.filters[i];
            if id == BLOSC_NOFILTER {
                continue;
            }
            let filter = self.registry.get(id)?;
            let meta = header.filters_meta[i];
            if in_tmp2 {
                filter.backward(&thread.tmp2[..len], &mut thread.tmp[..len], meta, &params)?;
            } else {
                filter.backward(&thread.tmp[..len], &mut thread.tmp2[..len], meta, &params)?;
            }
            in_tmp2 = !in_tmp2;
        }
        if in_tmp2 {
            dest.copy_from_slice(&thread.tmp2[..len]);
        } else {
            dest.copy_from_slice(&thread.tmp[..len]);
        }
        Ok(())
    }

    /// Copy `nitems` items starting at item `start` of chunk `src` into `dest`.
    /// See [`Blosc2Context::getitem_chunk`].
    pub fn getitem(&self, src: &[u8], start: usize, nitems: usize, dest: &mut [u8]) -> Result<usize> {
        self.getitem_chunk(0, src, start, nitems, dest)
    }

    /// Copy `nitems` items starting at item `start` of chunk `nchunk` into
    /// `dest`.
    ///
    /// Only the blocks overlapping the requested range are decompressed.
    pub fn getitem_chunk(
        &self,
        nchunk: i64,
        src: &[u8],
        start: usize,
        nitems: usize,
        dest: &mut [u8],
    ) -> Result<usize> {
        let header = read_chunk_header(src)?;
        let typesize = header.typesize();
        let nbytes = header.nbytes();
        let start_byte = start * typesize;
        let stop_byte = (start + nitems) * typesize;
        if stop_byte > nbytes {
            return Err(Error::invalid_param(format!(
                "items {start}..{} are out of the chunk's {} items",
                start + nitems,
                nbytes / typesize
            )));
        }
        let len = stop_byte - start_byte;
        if dest.len() < len {
            return Err(Error::SizeMismatch {
                expected: len,
                actual: dest.len(),
            });
        }
        if src.len() < header.cbytes() {
            return Err(Error::invalid_header("chunk is truncated"));
        }
        let dest = &mut dest[..len];
        if len == 0 {
            return Ok(0);
        }

        if header.special_type() != BLOSC2_NO_SPECIAL {
            fill_special(&header, src, dest)?;
            return Ok(len);
        }
        if header.memcpyed() {
            if header.cbytes() != HEADER_LEN + nbytes {
                return Err(Error::invalid_header("memcpyed chunk with wrong cbytes"));
            }
            dest.copy_from_slice(&src[HEADER_LEN + start_byte..HEADER_LEN + stop_byte]);
            return Ok(len);
        }

        let bstarts = read_bstarts(&header, src)?;
        let blocksize = header.blocksize();
        let mut thread = ThreadContext::new(blocksize, 0);
        let mut block = vec![0u8; blocksize];
        for nblock in start_byte / blocksize..stop_byte.div_ceil(blocksize) {
            let block_start = nblock * blocksize;
            let bsize = blocksize.min(nbytes - block_start);
            self.blosc_d(&mut thread, &header, src, nchunk, nblock, bstarts[nblock], &mut block[..bsize])?;
            let from = start_byte.max(block_start);
            let to = stop_byte.min(block_start + bsize);
            dest[from - start_byte..to - start_byte]
                .copy_from_slice(&block[from - block_start..to - block_start]);
        }
        Ok(len)
    }
}

fn read_bstarts(header: &BloscHeader, src: &[u8]) -> Result<Vec<usize>> {
    let nblocks = header.nblocks();
    let table_end = HEADER_LEN + nblocks * 4;
    if table_end > header.cbytes() {
        return Err(Error::invalid_header("block offsets run past the chunk"));
    }
    (0..nblocks)
        .map(|nblock| {
            let bstart = sw32(src, HEADER_LEN + nblock * 4);
            if bstart < table_end as i32 || bstart as usize >= header.cbytes() {
                Err(Error::invalid_header(format!(
                    "block {nblock} starts at invalid offset {bstart}"
                )))
            } else {
                Ok(bstart as usize)
            }
        })
        .collect()
}

/// Fill `dest` with the contents of a special (header only) chunk.
fn fill_special(header: &BloscHeader, src: &[u8], dest: &mut [u8]) -> Result<()> {
    let typesize = header.typesize();
    match header.special_type() {
        BLOSC2_SPECIAL_ZERO | BLOSC2_SPECIAL_UNINIT => dest.fill(0),
        BLOSC2_SPECIAL_NAN => match typesize {
            4 => fill_pattern(dest, &f32::NAN.to_ne_bytes()),
            8 => fill_pattern(dest, &f64::NAN.to_ne_bytes()),
            _ => {
                return Err(Error::invalid_header(format!(
                    "NaN chunk with typesize {typesize}"
                )))
            }
        },
        BLOSC2_SPECIAL_VALUE => {
            if header.cbytes() < HEADER_LEN + typesize {
                return Err(Error::invalid_header("repeated value chunk without a value"));
            }
            fill_pattern(dest, &src[HEADER_LEN..HEADER_LEN + typesize]);
        }
        other => {
            return Err(Error::invalid_header(format!("unknown special type {other}")));
        }
    }
    Ok(())
}

fn fill_pattern(dest: &mut [u8], pattern: &[u8]) {
    for item in dest.chunks_mut(pattern.len()) {
        item.copy_from_slice(&pattern[..item.len()]);
    }
}

fn special_chunk(typesize: usize, nbytes: usize, special: u8, value: &[u8]) -> Result<Vec<u8>> {
    if typesize == 0 || typesize > BLOSC_MAX_TYPESIZE {
        return Err(Error::invalid_param(format!("invalid typesize {typesize}")));
    }
    if nbytes % typesize != 0 {
        return Err(Error::invalid_param(format!(
            "nbytes {nbytes} is not a multiple of typesize {typesize}"
        )));
    }
    let mut header = base_header(typesize, nbytes)?;
    header.blocksize = nbytes as i32;
    header.cbytes = (HEADER_LEN + value.len()) as i32;
    header.blosc2_flags = special << 4;
    let mut chunk = vec![0u8; HEADER_LEN];
    header.write(&mut chunk);
    chunk.extend_from_slice(value);
    Ok(chunk)
}

/// A header only chunk of `nbytes` zeros.
pub fn blosc2_chunk_zeros(cparams: &Blosc2Cparams, nbytes: usize) -> Result<Vec<u8>> {
    special_chunk(cparams.typesize, nbytes, BLOSC2_SPECIAL_ZERO, &[])
}

/// A header only chunk of NaNs; typesize must be 4 or 8.
pub fn blosc2_chunk_nans(cparams: &Blosc2Cparams, nbytes: usize) -> Result<Vec<u8>> {
    if cparams.typesize != 4 && cparams.typesize != 8 {
        return Err(Error::invalid_param(format!(
            "NaN chunks need typesize 4 or 8, got {}",
            cparams.typesize
        )));
    }
    special_chunk(cparams.typesize, nbytes, BLOSC2_SPECIAL_NAN, &[])
}

/// A chunk repeating `repeatval` (one item) `nbytes / typesize` times.
pub fn blosc2_chunk_repeatval(cparams: &Blosc2Cparams, nbytes: usize, repeatval: &[u8]) -> Result<Vec<u8>> {
    if repeatval.len() != cparams.typesize {
        return Err(Error::invalid_param(format!(
            "repeated value has {} bytes, typesize is {}",
            repeatval.len(),
            cparams.typesize
        )));
    }
    special_chunk(cparams.typesize, nbytes, BLOSC2_SPECIAL_VALUE, repeatval)
}

/// A header only chunk whose content is unspecified (reads as zeros).
pub fn blosc2_chunk_uninit(cparams: &Blosc2Cparams, nbytes: usize) -> Result<Vec<u8>> {
    special_chunk(cparams.typesize, nbytes, BLOSC2_SPECIAL_UNINIT, &[])
}

/// `(nbytes, cbytes, blocksize)` of a chunk.
pub fn blosc2_cbuffer_sizes(cbuffer: &[u8]) -> Result<(usize, usize, usize)> {
    let header = read_chunk_header(cbuffer)?;
    Ok((header.nbytes(), header.cbytes(), header.blocksize()))
}

/// `(typesize, flags)` of a chunk.
pub fn blosc1_cbuffer_metainfo(cbuffer: &[u8]) -> Result<(usize, u8)> {
    let header = read_chunk_header(cbuffer)?;
    Ok((header.typesize(), header.flags))
}

/// Check that `cbuffer` is a chunk of exactly `cbytes` bytes and return its
/// logical size.
pub fn blosc1_cbuffer_validate(cbuffer: &[u8], cbytes: usize) -> Result<usize> {
    let header = read_chunk_header(cbuffer)?;
    if header.cbytes() != cbytes {
        return Err(Error::invalid_header(format!(
            "header declares {} compressed bytes, expected {cbytes}",
            header.cbytes
        )));
    }
    if header.nbytes() > BLOSC2_MAX_BUFFERSIZE {
        return Err(Error::codec(
            BLOSC2_ERROR_MAX_BUFSIZE_EXCEEDED,
            "chunk is larger than the maximum buffer size",
        ));
    }
    Ok(header.nbytes())
}

/// `(library name, codec id)` backing the codec called `compname`.
pub fn blosc2_get_complib_info(compname: &str) -> Option<(&'static str, u8)> {
    let compcode = codecs::compname_to_compcode(compname)?;
    codecs::complib_name(compcode).map(|lib| (lib, compcode))
}

pub fn blosc2_compress_ctx(context: &Blosc2Context, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    context.compress_into(src, dest)
}

pub fn blosc2_decompress_ctx(context: &Blosc2Context, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    context.decompress(src, dest)
}

/// One-shot compression with default parameters. `doshuffle` goes into the
/// last filter slot.
pub fn blosc2_compress(
    clevel: u8,
    doshuffle: u8,
    typesize: usize,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    let mut cparams = Blosc2Cparams {
        clevel,
        typesize,
        ..Default::default()
    };
    cparams.filters[MAX_FILTERS - 1] = doshuffle;
    let context = blosc2_create_cctx(cparams)?;
    context.compress_into(src, dest)
}

/// One-shot decompression with default parameters.
pub fn blosc2_decompress(src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let context = blosc2_create_dctx(Blosc2Dparams::default())?;
    context.decompress(src, dest)
}

/// One-shot [`Blosc2Context::getitem`] with default parameters.
pub fn blosc1_getitem(cbuffer: &[u8], start: usize, nitems: usize, dest: &mut [u8]) -> Result<usize> {
    let context = blosc2_create_dctx(Blosc2Dparams::default())?;
    context.getitem(cbuffer, start, nitems, dest)
}
