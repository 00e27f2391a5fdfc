// Corresponds to the metalayer part of c-blosc2/blosc/b2nd.c

use crate::blosc::b2nd_utils::{ceil_div, linear_to_multi, nitems, DimArray};
use crate::blosc::blosc_private::{from_big, to_big};
use crate::error::{Error, Result};
use crate::include::b2nd_include::*;

/// Shape, chunk shape and block shape of an n-dimensional array.
///
/// Axes at or above `ndim` always hold 1. A `Geometry` can only be obtained
/// through [`Geometry::new`] or [`decode_geometry`], both of which validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    ndim: u8,
    shape: [i64; B2ND_MAX_DIM],
    chunkshape: [i32; B2ND_MAX_DIM],
    blockshape: [i32; B2ND_MAX_DIM],
}

impl Geometry {
    pub fn new(shape: &[i64], chunkshape: &[i32], blockshape: &[i32]) -> Result<Self> {
        let ndim = shape.len();
        if !(1..=B2ND_MAX_DIM).contains(&ndim) {
            return Err(Error::malformed_geometry(format!(
                "ndim must be in 1..={B2ND_MAX_DIM}, got {ndim}"
            )));
        }
        if chunkshape.len() != ndim || blockshape.len() != ndim {
            return Err(Error::malformed_geometry(format!(
                "shape has {ndim} dims but chunkshape has {} and blockshape {}",
                chunkshape.len(),
                blockshape.len()
            )));
        }
        let mut geometry = Geometry {
            ndim: ndim as u8,
            shape: [1; B2ND_MAX_DIM],
            chunkshape: [1; B2ND_MAX_DIM],
            blockshape: [1; B2ND_MAX_DIM],
        };
        geometry.shape[..ndim].copy_from_slice(shape);
        geometry.chunkshape[..ndim].copy_from_slice(chunkshape);
        geometry.blockshape[..ndim].copy_from_slice(blockshape);
        geometry.validate()?;
        Ok(geometry)
    }

    fn validate(&self) -> Result<()> {
        for i in 0..self.ndim() {
            if self.shape[i] < 0 {
                return Err(Error::malformed_geometry(format!(
                    "shape[{i}] = {} is negative",
                    self.shape[i]
                )));
            }
            if self.chunkshape[i] <= 0 || self.blockshape[i] <= 0 {
                return Err(Error::malformed_geometry(format!(
                    "chunkshape[{i}] = {} and blockshape[{i}] = {} must be positive",
                    self.chunkshape[i], self.blockshape[i]
                )));
            }
            if self.blockshape[i] > self.chunkshape[i] {
                return Err(Error::malformed_geometry(format!(
                    "blockshape[{i}] = {} exceeds chunkshape[{i}] = {}",
                    self.blockshape[i], self.chunkshape[i]
                )));
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.ndim as usize
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape[..self.ndim()]
    }

    pub fn chunkshape(&self) -> &[i32] {
        &self.chunkshape[..self.ndim()]
    }

    pub fn blockshape(&self) -> &[i32] {
        &self.blockshape[..self.ndim()]
    }

    fn widen(values: &[i32; B2ND_MAX_DIM]) -> DimArray {
        values.map(i64::from)
    }

    /// Number of chunks along each axis.
    pub fn chunks_in_array(&self) -> DimArray {
        let mut out = [1i64; B2ND_MAX_DIM];
        for i in 0..self.ndim() {
            out[i] = ceil_div(self.shape[i], self.chunkshape[i] as i64);
        }
        out
    }

    /// Total number of chunks of the array.
    pub fn nchunks(&self) -> i64 {
        nitems(self.ndim(), &self.chunks_in_array())
    }

    /// Number of blocks along each axis of a chunk.
    pub fn blocks_in_chunk(&self) -> DimArray {
        let mut out = [1i64; B2ND_MAX_DIM];
        for i in 0..self.ndim() {
            out[i] = ceil_div(self.chunkshape[i] as i64, self.blockshape[i] as i64);
        }
        out
    }

    /// Items in one block.
    pub fn block_nitems(&self) -> i64 {
        nitems(self.ndim(), &Self::widen(&self.blockshape))
    }

    /// Items in one chunk buffer, which is laid out block after block and
    /// therefore padded up to a whole number of blocks on every axis.
    pub fn extchunk_nitems(&self) -> i64 {
        let blocks = self.blocks_in_chunk();
        self.block_nitems() * nitems(self.ndim(), &blocks)
    }

    /// Extent of the valid (non padding) region of chunk `nchunk` on each axis.
    ///
    /// The last chunk along an axis is truncated to `shape mod chunkshape`
    /// unless the chunk shape divides the shape evenly.
    pub fn chunk_valid_shape(&self, nchunk: i64) -> DimArray {
        let ndim = self.ndim();
        let coord = linear_to_multi(ndim, &self.chunks_in_array(), nchunk);
        let mut out = [1i64; B2ND_MAX_DIM];
        for i in 0..ndim {
            let start = coord[i] * self.chunkshape[i] as i64;
            out[i] = (self.shape[i] - start).clamp(0, self.chunkshape[i] as i64);
        }
        out
    }

    /// Extent of the valid region of block `nblock` inside chunk `nchunk`.
    /// Axes entirely in padding report 0.
    pub fn block_valid_shape(&self, nchunk: i64, nblock: i64) -> DimArray {
        let ndim = self.ndim();
        let chunk_valid = self.chunk_valid_shape(nchunk);
        let coord = linear_to_multi(ndim, &self.blocks_in_chunk(), nblock);
        let mut out = [1i64; B2ND_MAX_DIM];
        for i in 0..ndim {
            let start = coord[i] * self.blockshape[i] as i64;
            out[i] = (chunk_valid[i] - start).clamp(0, self.blockshape[i] as i64);
        }
        out
    }

    /// Block shape widened to `i64`, with unit axes above `ndim`.
    pub fn blockshape_i64(&self) -> DimArray {
        Self::widen(&self.blockshape)
    }
}

/// Serialize `geometry` into the compact metalayer blob.
///
/// The layout is a 5-entry msgpack array: version, ndim, and three fixed
/// arrays (shape as int64, chunkshape and blockshape as int32), every
/// scalar stored big endian behind its own tag.
pub fn encode_geometry(geometry: &Geometry) -> Vec<u8> {
    let ndim = geometry.ndim();
    let len = 3 + 3 + ndim * (1 + 8) + 2 * ndim * (1 + 4);
    let mut smeta = Vec::with_capacity(len);

    smeta.push(FIXARRAY_TAG + GEOMETRY_NFIELDS);
    smeta.push(B2ND_METALAYER_VERSION);
    smeta.push(ndim as u8);

    smeta.push(FIXARRAY_TAG + ndim as u8);
    for value in geometry.shape() {
        push_scalar(&mut smeta, INT64_TAG, &value.to_ne_bytes());
    }
    smeta.push(FIXARRAY_TAG + ndim as u8);
    for value in geometry.chunkshape() {
        push_scalar(&mut smeta, INT32_TAG, &value.to_ne_bytes());
    }
    smeta.push(FIXARRAY_TAG + ndim as u8);
    for value in geometry.blockshape() {
        push_scalar(&mut smeta, INT32_TAG, &value.to_ne_bytes());
    }

    debug_assert_eq!(smeta.len(), len);
    smeta
}

fn push_scalar(smeta: &mut Vec<u8>, tag: u8, host: &[u8]) {
    smeta.push(tag);
    let mut buf = [0u8; 8];
    to_big(&mut buf, host, host.len());
    smeta.extend_from_slice(&buf[..host.len()]);
}

struct MetaReader<'a> {
    smeta: &'a [u8],
    pos: usize,
}

impl<'a> MetaReader<'a> {
    fn u8(&mut self, what: &str) -> Result<u8> {
        let byte = *self.smeta.get(self.pos).ok_or_else(|| {
            Error::malformed_geometry(format!("blob ends before {what} (offset {})", self.pos))
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect_tag(&mut self, tag: u8, what: &str) -> Result<()> {
        let found = self.u8(what)?;
        if found != tag {
            return Err(Error::malformed_geometry(format!(
                "expected tag {tag:#04x} for {what} at offset {}, found {found:#04x}",
                self.pos - 1
            )));
        }
        Ok(())
    }

    fn scalar<const N: usize>(&mut self, tag: u8, what: &str) -> Result<[u8; N]> {
        self.expect_tag(tag, what)?;
        let end = self.pos + N;
        let stored = self.smeta.get(self.pos..end).ok_or_else(|| {
            Error::malformed_geometry(format!("blob ends inside {what} (offset {})", self.pos))
        })?;
        let mut host = [0u8; N];
        from_big(&mut host, stored, N);
        self.pos = end;
        Ok(host)
    }
}

/// Decode the geometry metalayer written by [`encode_geometry`] (or by a
/// b2nd array, whose trailing dtype entries are ignored).
pub fn decode_geometry(smeta: &[u8]) -> Result<Geometry> {
    let mut reader = MetaReader { smeta, pos: 0 };

    let container = reader.u8("container tag")?;
    if container != FIXARRAY_TAG + GEOMETRY_NFIELDS
        && container != FIXARRAY_TAG + GEOMETRY_NFIELDS_DTYPE
    {
        return Err(Error::malformed_geometry(format!(
            "unexpected container tag {container:#04x}"
        )));
    }
    let version = reader.u8("version")?;
    if version > 0x7f {
        return Err(Error::malformed_geometry(format!(
            "version {version:#04x} is not a positive fixint"
        )));
    }
    let ndim = reader.u8("ndim")? as usize;
    if !(1..=B2ND_MAX_DIM).contains(&ndim) {
        return Err(Error::malformed_geometry(format!(
            "ndim must be in 1..={B2ND_MAX_DIM}, got {ndim}"
        )));
    }

    let needed = reader.pos + 3 + ndim * (1 + 8) + 2 * ndim * (1 + 4);
    if smeta.len() < needed {
        return Err(Error::malformed_geometry(format!(
            "blob has {} bytes, at least {needed} required for ndim = {ndim}",
            smeta.len()
        )));
    }

    let mut geometry = Geometry {
        ndim: ndim as u8,
        shape: [1; B2ND_MAX_DIM],
        chunkshape: [1; B2ND_MAX_DIM],
        blockshape: [1; B2ND_MAX_DIM],
    };

    reader.expect_tag(FIXARRAY_TAG + ndim as u8, "shape array")?;
    for i in 0..ndim {
        geometry.shape[i] = i64::from_ne_bytes(reader.scalar::<8>(INT64_TAG, "shape item")?);
    }
    reader.expect_tag(FIXARRAY_TAG + ndim as u8, "chunkshape array")?;
    for i in 0..ndim {
        geometry.chunkshape[i] =
            i32::from_ne_bytes(reader.scalar::<4>(INT32_TAG, "chunkshape item")?);
    }
    reader.expect_tag(FIXARRAY_TAG + ndim as u8, "blockshape array")?;
    for i in 0..ndim {
        geometry.blockshape[i] =
            i32::from_ne_bytes(reader.scalar::<4>(INT32_TAG, "blockshape item")?);
    }

    geometry.validate()?;
    Ok(geometry)
}
