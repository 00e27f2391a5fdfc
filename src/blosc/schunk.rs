// Corresponds to c-blosc2/blosc/schunk.c

use crate::blosc::b2nd::{decode_geometry, Geometry};
use crate::blosc::blosc2::{
    blosc1_cbuffer_validate, blosc2_chunk_zeros, blosc2_create_cctx, blosc2_create_dctx,
    read_chunk_header, Blosc2Cparams, Blosc2Dparams,
};
use crate::blosc::context::{Blosc2Context, Blosc2Storage};
use crate::error::{Error, Result};
use crate::include::b2nd_include::{B2ND_METALAYER_NAME, CATERVA_METALAYER_NAME};
use crate::include::blosc2_include::*;
use std::borrow::Cow;

/// One slot of a super-chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoredChunk {
    /// A compressed chunk owned by the super-chunk.
    Data(Vec<u8>),
    /// A chunk of zeros that is only materialized on request.
    Zeros { nbytes: usize },
    /// A slot reserved by [`Blosc2Schunk::empty`] and not written yet.
    Empty,
}

impl StoredChunk {
    /// `(nbytes, cbytes)` this slot contributes to the super-chunk totals.
    pub(crate) fn sizes(&self) -> (usize, usize) {
        match self {
            StoredChunk::Data(chunk) => match read_chunk_header(chunk) {
                Ok(header) => (header.nbytes(), chunk.len()),
                Err(_) => (0, chunk.len()),
            },
            StoredChunk::Zeros { nbytes } => (*nbytes, BLOSC_EXTENDED_HEADER_LENGTH),
            StoredChunk::Empty => (0, 0),
        }
    }
}

/// A named metadata blob with a slot reserved at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blosc2Metalayer {
    pub(crate) name: String,
    pub(crate) content: Vec<u8>,
    /// Largest content the slot accepts, fixed when the metalayer is added.
    pub(crate) capacity: usize,
}

impl Blosc2Metalayer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A super-chunk: an ordered sequence of independently compressed chunks
/// plus metalayers and one usermeta blob.
///
/// Mutating operations validate everything and compute the new byte
/// counters before touching the container, so a failed call leaves it as
/// it was.
pub struct Blosc2Schunk {
    pub(crate) chunks: Vec<StoredChunk>,
    pub(crate) chunksize: Option<usize>,
    pub(crate) nbytes: usize,
    pub(crate) cbytes: usize,
    pub(crate) metalayers: Vec<Blosc2Metalayer>,
    pub(crate) usermeta: Option<Vec<u8>>,
    pub(crate) max_chunks: usize,
    pub(crate) cctx: Blosc2Context,
    pub(crate) dctx: Blosc2Context,
}

impl std::fmt::Debug for Blosc2Schunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blosc2Schunk")
            .field("nchunks", &self.chunks.len())
            .field("chunksize", &self.chunksize)
            .field("nbytes", &self.nbytes)
            .field("cbytes", &self.cbytes)
            .field("metalayers", &self.metalayers.len())
            .field("cctx", &self.cctx)
            .finish()
    }
}

fn checked(value: Option<usize>) -> Result<usize> {
    value.ok_or_else(|| Error::invalid_param("super-chunk byte counters overflow"))
}

impl Blosc2Schunk {
    /// Create an empty super-chunk owning contexts built from `storage`.
    pub fn new(storage: Blosc2Storage) -> Result<Self> {
        let Blosc2Storage {
            cparams,
            dparams,
            max_chunks,
        } = storage;
        let cctx = blosc2_create_cctx(cparams)?;
        let dctx = blosc2_create_dctx(dparams)?;
        log::debug!("new super-chunk, typesize {}", cctx.typesize());
        Ok(Blosc2Schunk {
            chunks: Vec::new(),
            chunksize: None,
            nbytes: 0,
            cbytes: 0,
            metalayers: Vec::new(),
            usermeta: None,
            max_chunks,
            cctx,
            dctx,
        })
    }

    /// Create a super-chunk with `nchunks` reserved slots that are filled
    /// later with [`update_chunk`](Self::update_chunk). Reserved slots read
    /// back as zero-length chunks.
    pub fn empty(storage: Blosc2Storage, nchunks: usize) -> Result<Self> {
        let mut schunk = Self::new(storage)?;
        if nchunks > schunk.max_chunks {
            return Err(Error::CapacityExceeded(schunk.max_chunks));
        }
        schunk.chunks = vec![StoredChunk::Empty; nchunks];
        Ok(schunk)
    }

    /// Append `nchunks` chunks of `chunksize` zero bytes without compressing
    /// anything. Returns the new number of chunks.
    pub fn fill_zeros(&mut self, nchunks: usize, chunksize: usize) -> Result<usize> {
        if chunksize % self.cctx.typesize() != 0 {
            return Err(Error::invalid_param(format!(
                "chunksize {chunksize} is not a multiple of typesize {}",
                self.cctx.typesize()
            )));
        }
        let total = checked(self.chunks.len().checked_add(nchunks))?;
        if total > self.max_chunks {
            return Err(Error::CapacityExceeded(self.max_chunks));
        }
        let nbytes = checked(
            chunksize
                .checked_mul(nchunks)
                .and_then(|n| n.checked_add(self.nbytes)),
        )?;
        let cbytes = checked(
            BLOSC_EXTENDED_HEADER_LENGTH
                .checked_mul(nchunks)
                .and_then(|n| n.checked_add(self.cbytes)),
        )?;
        let mut chunksize_after = self.chunksize;
        if nchunks > 0 {
            chunksize_after = self.next_chunksize(chunksize);
        }

        self.chunks
            .extend(std::iter::repeat(StoredChunk::Zeros { nbytes: chunksize }).take(nchunks));
        self.nbytes = nbytes;
        self.cbytes = cbytes;
        self.chunksize = chunksize_after;
        Ok(self.chunks.len())
    }

    /// Chunk size after appending a chunk of `nbytes` logical bytes. 0 means
    /// the chunks have different sizes.
    fn next_chunksize(&self, nbytes: usize) -> Option<usize> {
        match self.chunksize {
            None => Some(nbytes),
            Some(0) => Some(0),
            Some(chunksize) => {
                let last_is_partial = self
                    .chunks
                    .last()
                    .map(|chunk| chunk.sizes().0 < chunksize)
                    .unwrap_or(false);
                if nbytes > chunksize || last_is_partial {
                    Some(0)
                } else {
                    Some(chunksize)
                }
            }
        }
    }

    /// Validate `chunk` and return `(nbytes, cbytes)` from its header.
    pub(crate) fn inspect(chunk: &[u8]) -> Result<(usize, usize)> {
        let header = read_chunk_header(chunk)?;
        let cbytes = header.cbytes();
        if chunk.len() < cbytes {
            return Err(Error::invalid_header(format!(
                "chunk declares {cbytes} bytes but holds {}",
                chunk.len()
            )));
        }
        let nbytes = blosc1_cbuffer_validate(&chunk[..cbytes], cbytes)?;
        Ok((nbytes, cbytes))
    }

    /// Append a compressed chunk, taking ownership of it. Returns the new
    /// number of chunks.
    pub fn append_chunk(&mut self, mut chunk: Vec<u8>) -> Result<usize> {
        let (nbytes, cbytes) = Self::inspect(&chunk)?;
        if self.chunks.len() >= self.max_chunks {
            return Err(Error::CapacityExceeded(self.max_chunks));
        }
        let new_nbytes = checked(self.nbytes.checked_add(nbytes))?;
        let new_cbytes = checked(self.cbytes.checked_add(cbytes))?;
        let chunksize = self.next_chunksize(nbytes);

        chunk.truncate(cbytes);
        self.chunks.push(StoredChunk::Data(chunk));
        self.nbytes = new_nbytes;
        self.cbytes = new_cbytes;
        self.chunksize = chunksize;
        log::trace!("appended chunk {} ({nbytes} -> {cbytes} bytes)", self.chunks.len() - 1);
        Ok(self.chunks.len())
    }

    /// Append a copy of a compressed chunk.
    pub fn append_chunk_copy(&mut self, chunk: &[u8]) -> Result<usize> {
        let (_, cbytes) = Self::inspect(chunk)?;
        self.append_chunk(chunk[..cbytes].to_vec())
    }

    /// Compress `src` with the super-chunk's compression context and append
    /// the result.
    pub fn append_buffer(&mut self, src: &[u8]) -> Result<usize> {
        if self.chunks.len() >= self.max_chunks {
            return Err(Error::CapacityExceeded(self.max_chunks));
        }
        let chunk = self.cctx.compress_chunk(self.chunks.len() as i64, src)?;
        self.append_chunk(chunk)
    }

    fn check_index(&self, nchunk: usize) -> Result<()> {
        if nchunk >= self.chunks.len() {
            return Err(Error::ChunkOutOfRange {
                index: nchunk,
                nchunks: self.chunks.len(),
            });
        }
        Ok(())
    }

    /// Replace chunk `nchunk`, taking ownership of `chunk`. Returns the
    /// number of chunks.
    pub fn update_chunk(&mut self, nchunk: usize, mut chunk: Vec<u8>) -> Result<usize> {
        self.check_index(nchunk)?;
        let (nbytes, cbytes) = Self::inspect(&chunk)?;
        let (old_nbytes, old_cbytes) = self.chunks[nchunk].sizes();
        let new_nbytes = checked((self.nbytes - old_nbytes).checked_add(nbytes))?;
        let new_cbytes = checked((self.cbytes - old_cbytes).checked_add(cbytes))?;
        let chunksize = match self.chunksize {
            None => Some(nbytes),
            Some(chunksize) if chunksize != 0 && nbytes > chunksize => Some(0),
            other => other,
        };

        chunk.truncate(cbytes);
        self.chunks[nchunk] = StoredChunk::Data(chunk);
        self.nbytes = new_nbytes;
        self.cbytes = new_cbytes;
        self.chunksize = chunksize;
        log::trace!("updated chunk {nchunk} ({nbytes} -> {cbytes} bytes)");
        Ok(self.chunks.len())
    }

    /// Replace chunk `nchunk` with a copy of `chunk`; later changes to the
    /// caller's buffer do not affect the super-chunk.
    pub fn update_chunk_copy(&mut self, nchunk: usize, chunk: &[u8]) -> Result<usize> {
        self.check_index(nchunk)?;
        let (_, cbytes) = Self::inspect(chunk)?;
        self.update_chunk(nchunk, chunk[..cbytes].to_vec())
    }

    /// Get chunk `nchunk`.
    ///
    /// `Cow::Borrowed` chunks are owned by the super-chunk; `Cow::Owned` ones
    /// were materialized for this call (zero chunks added by
    /// [`fill_zeros`](Self::fill_zeros)). A reserved slot that was never
    /// written yields an empty chunk.
    pub fn get_chunk(&self, nchunk: usize) -> Result<Cow<'_, [u8]>> {
        self.check_index(nchunk)?;
        match &self.chunks[nchunk] {
            StoredChunk::Data(chunk) => Ok(Cow::Borrowed(chunk)),
            StoredChunk::Zeros { nbytes } => {
                Ok(Cow::Owned(blosc2_chunk_zeros(&self.cctx.cparams(), *nbytes)?))
            }
            StoredChunk::Empty => Ok(Cow::Borrowed(&[])),
        }
    }

    /// Decompress chunk `nchunk` into `dest`, returning the bytes written.
    pub fn decompress_chunk(&self, nchunk: usize, dest: &mut [u8]) -> Result<usize> {
        self.check_index(nchunk)?;
        match &self.chunks[nchunk] {
            StoredChunk::Data(chunk) => self.dctx.decompress_chunk(nchunk as i64, chunk, dest),
            StoredChunk::Zeros { nbytes } => {
                if dest.len() < *nbytes {
                    return Err(Error::SizeMismatch {
                        expected: *nbytes,
                        actual: dest.len(),
                    });
                }
                dest[..*nbytes].fill(0);
                Ok(*nbytes)
            }
            StoredChunk::Empty => Ok(0),
        }
    }

    /// Index of the metalayer called `name`, if any.
    pub fn meta_exists(&self, name: &str) -> Option<usize> {
        self.metalayers.iter().position(|meta| meta.name == name)
    }

    fn refresh_geometry(&mut self, name: &str, content: &[u8]) -> Result<()> {
        if name == B2ND_METALAYER_NAME || name == CATERVA_METALAYER_NAME {
            let geometry = decode_geometry(content)?;
            log::debug!("super-chunk geometry from '{name}': {geometry:?}");
            self.cctx.set_geometry(Some(geometry));
            self.dctx.set_geometry(Some(geometry));
        }
        Ok(())
    }

    fn check_geometry_blob(name: &str, content: &[u8]) -> Result<()> {
        if name == B2ND_METALAYER_NAME || name == CATERVA_METALAYER_NAME {
            decode_geometry(content)?;
        }
        Ok(())
    }

    /// Add a metalayer. Its slot is sized to `content`; later updates may
    /// not exceed it. Returns the metalayer index.
    pub fn add_metalayer(&mut self, name: &str, content: &[u8]) -> Result<usize> {
        if name.is_empty() || name.len() > BLOSC2_METALAYER_NAME_MAXLEN {
            return Err(Error::invalid_param(format!(
                "metalayer names must have 1..={BLOSC2_METALAYER_NAME_MAXLEN} bytes, got '{name}'"
            )));
        }
        if self.meta_exists(name).is_some() {
            return Err(Error::MetalayerExists(name.to_string()));
        }
        if self.metalayers.len() >= BLOSC2_MAX_METALAYERS {
            return Err(Error::invalid_param(format!(
                "cannot add more than {BLOSC2_MAX_METALAYERS} metalayers"
            )));
        }
        Self::check_geometry_blob(name, content)?;

        self.metalayers.push(Blosc2Metalayer {
            name: name.to_string(),
            content: content.to_vec(),
            capacity: content.len(),
        });
        self.refresh_geometry(name, content)?;
        Ok(self.metalayers.len() - 1)
    }

    /// Replace the content of an existing metalayer.
    pub fn update_metalayer(&mut self, name: &str, content: &[u8]) -> Result<usize> {
        let index = self
            .meta_exists(name)
            .ok_or_else(|| Error::MetalayerNotFound(name.to_string()))?;
        let capacity = self.metalayers[index].capacity;
        if content.len() > capacity {
            return Err(Error::MetalayerTooLarge {
                name: name.to_string(),
                len: content.len(),
                capacity,
            });
        }
        Self::check_geometry_blob(name, content)?;

        self.metalayers[index].content = content.to_vec();
        self.refresh_geometry(name, content)?;
        Ok(index)
    }

    /// Content of the metalayer called `name`.
    pub fn get_metalayer(&self, name: &str) -> Result<&[u8]> {
        self.metalayers
            .iter()
            .find(|meta| meta.name == name)
            .map(|meta| meta.content.as_slice())
            .ok_or_else(|| Error::MetalayerNotFound(name.to_string()))
    }

    pub fn metalayers(&self) -> &[Blosc2Metalayer] {
        &self.metalayers
    }

    /// Replace the user metadata blob.
    pub fn set_usermeta(&mut self, content: &[u8]) {
        self.usermeta = Some(content.to_vec());
    }

    pub fn usermeta(&self) -> Option<&[u8]> {
        self.usermeta.as_deref()
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    /// Logical size of every chunk, `Some(0)` when chunks differ in size and
    /// `None` before the first chunk.
    pub fn chunksize(&self) -> Option<usize> {
        self.chunksize
    }

    /// Sum of the logical sizes of all chunks.
    pub fn nbytes(&self) -> usize {
        self.nbytes
    }

    /// Sum of the compressed sizes of all chunks.
    pub fn cbytes(&self) -> usize {
        self.cbytes
    }

    pub fn typesize(&self) -> usize {
        self.cctx.typesize()
    }

    pub fn blocksize(&self) -> usize {
        self.cctx.blocksize()
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Array geometry taken from the `b2nd` (or `caterva`) metalayer.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.cctx.geometry()
    }

    pub fn cctx(&self) -> &Blosc2Context {
        &self.cctx
    }

    pub fn dctx(&self) -> &Blosc2Context {
        &self.dctx
    }

    pub fn cparams(&self) -> Blosc2Cparams {
        self.cctx.cparams()
    }

    pub fn dparams(&self) -> Blosc2Dparams {
        self.dctx.dparams()
    }

    /// Release the super-chunk and everything it owns.
    pub fn destroy(self) {
        log::debug!("destroying super-chunk with {} chunks", self.chunks.len());
    }
}
