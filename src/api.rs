use crate::blosc::b2nd::{decode_geometry, encode_geometry, Geometry};
use crate::blosc::schunk::Blosc2Schunk;
use crate::error::Result;
use crate::filters::FilterRegistry;
use std::borrow::Cow;
use std::path::Path;

pub use crate::blosc::blosc2::{
    blosc1_cbuffer_metainfo, blosc1_cbuffer_validate, blosc1_getitem, blosc2_cbuffer_sizes,
    blosc2_chunk_nans, blosc2_chunk_repeatval, blosc2_chunk_uninit, blosc2_chunk_zeros,
    blosc2_compress, blosc2_compress_ctx, blosc2_create_cctx, blosc2_create_dctx,
    blosc2_decompress, blosc2_decompress_ctx, blosc2_get_complib_info, Blosc2Cparams,
    Blosc2Dparams, BloscHeader,
};
pub use crate::blosc::context::{Blosc2Context, Blosc2Storage};

// Super-chunks

pub fn blosc2_schunk_new(storage: Blosc2Storage) -> Result<Blosc2Schunk> {
    Blosc2Schunk::new(storage)
}

/// A super-chunk with `nchunks` reserved slots to be filled with
/// [`blosc2_schunk_update_chunk`].
pub fn blosc2_schunk_empty(storage: Blosc2Storage, nchunks: usize) -> Result<Blosc2Schunk> {
    Blosc2Schunk::empty(storage, nchunks)
}

pub fn blosc2_schunk_free(schunk: Blosc2Schunk) {
    schunk.destroy()
}

pub fn blosc2_schunk_append_buffer(schunk: &mut Blosc2Schunk, src: &[u8]) -> Result<usize> {
    schunk.append_buffer(src)
}

pub fn blosc2_schunk_append_chunk(schunk: &mut Blosc2Schunk, chunk: Vec<u8>) -> Result<usize> {
    schunk.append_chunk(chunk)
}

pub fn blosc2_schunk_append_chunk_copy(schunk: &mut Blosc2Schunk, chunk: &[u8]) -> Result<usize> {
    schunk.append_chunk_copy(chunk)
}

pub fn blosc2_schunk_update_chunk(
    schunk: &mut Blosc2Schunk,
    nchunk: usize,
    chunk: Vec<u8>,
) -> Result<usize> {
    schunk.update_chunk(nchunk, chunk)
}

pub fn blosc2_schunk_update_chunk_copy(
    schunk: &mut Blosc2Schunk,
    nchunk: usize,
    chunk: &[u8],
) -> Result<usize> {
    schunk.update_chunk_copy(nchunk, chunk)
}

pub fn blosc2_schunk_fill_zeros(
    schunk: &mut Blosc2Schunk,
    nchunks: usize,
    chunksize: usize,
) -> Result<usize> {
    schunk.fill_zeros(nchunks, chunksize)
}

pub fn blosc2_schunk_get_chunk(schunk: &Blosc2Schunk, nchunk: usize) -> Result<Cow<'_, [u8]>> {
    schunk.get_chunk(nchunk)
}

pub fn blosc2_schunk_decompress_chunk(
    schunk: &Blosc2Schunk,
    nchunk: usize,
    dest: &mut [u8],
) -> Result<usize> {
    schunk.decompress_chunk(nchunk, dest)
}

pub fn blosc2_schunk_to_buffer(schunk: &Blosc2Schunk) -> Result<Vec<u8>> {
    schunk.to_frame()
}

pub fn blosc2_schunk_from_buffer(frame: &[u8], registry: &FilterRegistry) -> Result<Blosc2Schunk> {
    Blosc2Schunk::from_frame(frame, registry)
}

pub fn blosc2_schunk_save(schunk: &Blosc2Schunk, urlpath: impl AsRef<Path>) -> Result<usize> {
    schunk.save(urlpath)
}

pub fn blosc2_schunk_open(urlpath: impl AsRef<Path>, registry: &FilterRegistry) -> Result<Blosc2Schunk> {
    Blosc2Schunk::open(urlpath, registry)
}

// Metalayers

/// Index of the metalayer called `name`, if any.
pub fn blosc2_meta_exists(schunk: &Blosc2Schunk, name: &str) -> Option<usize> {
    schunk.meta_exists(name)
}

pub fn blosc2_meta_add(schunk: &mut Blosc2Schunk, name: &str, content: &[u8]) -> Result<usize> {
    schunk.add_metalayer(name, content)
}

pub fn blosc2_meta_update(schunk: &mut Blosc2Schunk, name: &str, content: &[u8]) -> Result<usize> {
    schunk.update_metalayer(name, content)
}

pub fn blosc2_meta_get<'a>(schunk: &'a Blosc2Schunk, name: &str) -> Result<&'a [u8]> {
    schunk.get_metalayer(name)
}

pub fn blosc2_update_usermeta(schunk: &mut Blosc2Schunk, content: &[u8]) {
    schunk.set_usermeta(content)
}

pub fn blosc2_get_usermeta(schunk: &Blosc2Schunk) -> Option<&[u8]> {
    schunk.usermeta()
}

// b2nd geometry metalayer

/// Encode an array geometry as a `b2nd` metalayer blob.
pub fn b2nd_serialize_meta(shape: &[i64], chunkshape: &[i32], blockshape: &[i32]) -> Result<Vec<u8>> {
    let geometry = Geometry::new(shape, chunkshape, blockshape)?;
    Ok(encode_geometry(&geometry))
}

pub fn b2nd_deserialize_meta(smeta: &[u8]) -> Result<Geometry> {
    decode_geometry(smeta)
}
