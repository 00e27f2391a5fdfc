// Corresponds to c-blosc2/blosc/frame.c (and .h)

/*********************************************************************

  Contiguous frames: a super-chunk serialized into one buffer.

  All integers are little endian.

    magic               8 bytes  "b2frame\0"
    version             u8
    typesize            u32
    blocksize           u32
    chunksize           i64      -1 when unknown
    clevel              u8
    compcode            u8
    compcode_meta       u8
    splitmode           u8
    nthreads (c, d)     u16, u16 clamped to the host's parallelism on open
    filters             [u8; 6]
    filters_meta        [u8; 6]
    nbytes, cbytes      u64, u64
    nchunks             u64
    max_chunks          u64
    geometry            u32 length + b2nd blob (length 0 means none)
    metalayers          u16 count, then per metalayer:
                          u8 name length, name, u32 slot capacity,
                          u32 content length, content
    usermeta            u8 present flag, u32 length, bytes
    chunk index         per chunk: u8 kind, u64, u64
                          data:  offset into the data section, length
                          zeros: logical size, 0
                          empty: 0, 0
    chunk data

*********************************************************************/

use crate::blosc::b2nd::{decode_geometry, encode_geometry};
use crate::blosc::blosc2::{Blosc2Cparams, Blosc2Dparams};
use crate::blosc::context::Blosc2Storage;
use crate::blosc::schunk::{Blosc2Metalayer, Blosc2Schunk, StoredChunk};
use crate::error::{Error, Result};
use crate::filters::FilterRegistry;
use crate::include::b2nd_include::{B2ND_METALAYER_NAME, CATERVA_METALAYER_NAME};
use crate::include::blosc2_include::*;
use std::path::Path;

const FRAME_MAGIC: &[u8; 8] = b"b2frame\0";

const CHUNK_KIND_DATA: u8 = 0;
const CHUNK_KIND_ZEROS: u8 = 1;
const CHUNK_KIND_EMPTY: u8 = 2;

/// Size of one entry of the chunk index
const CHUNK_ENTRY_LEN: usize = 1 + 8 + 8;

struct FrameWriter {
    buf: Vec<u8>,
}

impl FrameWriter {
    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: usize) -> Result<()> {
        let value = u32::try_from(value)
            .map_err(|_| Error::invalid_param(format!("{value} does not fit a frame field")))?;
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn u64(&mut self, value: usize) {
        self.buf.extend_from_slice(&(value as u64).to_le_bytes());
    }

    fn i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }
}

struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                Error::invalid_header(format!(
                    "frame truncated: need {n} bytes at offset {}, frame has {}",
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.array()?) as usize)
    }

    fn u64(&mut self) -> Result<usize> {
        let value = u64::from_le_bytes(self.array()?);
        usize::try_from(value)
            .map_err(|_| Error::invalid_header(format!("frame field {value} overflows usize")))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }
}

impl Blosc2Schunk {
    /// Serialize the super-chunk into a contiguous frame.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let cparams = self.cctx.cparams();
        let mut w = FrameWriter {
            buf: Vec::with_capacity(self.cbytes + 256),
        };

        w.bytes(FRAME_MAGIC);
        w.u8(BLOSC2_VERSION_FRAME_FORMAT);
        w.u32(cparams.typesize)?;
        w.u32(cparams.blocksize)?;
        w.i64(self.chunksize.map(|c| c as i64).unwrap_or(-1));
        w.u8(cparams.clevel);
        w.u8(cparams.compcode);
        w.u8(cparams.compcode_meta);
        w.u8(cparams.splitmode);
        w.u16(u16::try_from(self.cctx.nthreads()).unwrap_or(u16::MAX));
        w.u16(u16::try_from(self.dctx.nthreads()).unwrap_or(u16::MAX));
        w.bytes(&cparams.filters);
        w.bytes(&cparams.filters_meta);
        w.u64(self.nbytes);
        w.u64(self.cbytes);
        w.u64(self.chunks.len());
        w.u64(self.max_chunks);

        match &cparams.geometry {
            Some(geometry) => {
                let blob = encode_geometry(geometry);
                w.u32(blob.len())?;
                w.bytes(&blob);
            }
            None => w.u32(0)?,
        }

        w.u16(self.metalayers.len() as u16);
        for meta in &self.metalayers {
            w.u8(meta.name.len() as u8);
            w.bytes(meta.name.as_bytes());
            w.u32(meta.capacity)?;
            w.u32(meta.content.len())?;
            w.bytes(&meta.content);
        }

        match &self.usermeta {
            Some(usermeta) => {
                w.u8(1);
                w.u32(usermeta.len())?;
                w.bytes(usermeta);
            }
            None => {
                w.u8(0);
                w.u32(0)?;
            }
        }

        let mut offset = 0;
        for chunk in &self.chunks {
            match chunk {
                StoredChunk::Data(data) => {
                    w.u8(CHUNK_KIND_DATA);
                    w.u64(offset);
                    w.u64(data.len());
                    offset += data.len();
                }
                StoredChunk::Zeros { nbytes } => {
                    w.u8(CHUNK_KIND_ZEROS);
                    w.u64(*nbytes);
                    w.u64(0);
                }
                StoredChunk::Empty => {
                    w.u8(CHUNK_KIND_EMPTY);
                    w.u64(0);
                    w.u64(0);
                }
            }
        }
        for chunk in &self.chunks {
            if let StoredChunk::Data(data) = chunk {
                w.bytes(data);
            }
        }

        log::debug!(
            "serialized super-chunk with {} chunks into a {} byte frame",
            self.chunks.len(),
            w.buf.len()
        );
        Ok(w.buf)
    }

    /// Rebuild a super-chunk from a frame made by [`to_frame`](Self::to_frame).
    ///
    /// `registry` must contain every filter the frame's pipeline names.
    pub fn from_frame(frame: &[u8], registry: &FilterRegistry) -> Result<Self> {
        let mut r = FrameReader { buf: frame, pos: 0 };

        if r.take(FRAME_MAGIC.len())? != FRAME_MAGIC {
            return Err(Error::invalid_header("not a b2frame"));
        }
        let version = r.u8()?;
        if version > BLOSC2_VERSION_FRAME_FORMAT {
            return Err(Error::invalid_header(format!(
                "frame format version {version} is newer than supported {BLOSC2_VERSION_FRAME_FORMAT}"
            )));
        }

        let typesize = r.u32()?;
        let blocksize = r.u32()?;
        let chunksize = r.i64()?;
        let clevel = r.u8()?;
        let compcode = r.u8()?;
        let compcode_meta = r.u8()?;
        let splitmode = r.u8()?;
        let nthreads_c = host_nthreads(r.u16()?);
        let nthreads_d = host_nthreads(r.u16()?);
        let filters = r.array::<BLOSC2_MAX_FILTERS>()?;
        let filters_meta = r.array::<BLOSC2_MAX_FILTERS>()?;
        let nbytes = r.u64()?;
        let cbytes = r.u64()?;
        let nchunks = r.u64()?;
        let max_chunks = r.u64()?;

        let geometry_len = r.u32()?;
        let geometry = if geometry_len > 0 {
            Some(decode_geometry(r.take(geometry_len)?)?)
        } else {
            None
        };

        let storage = Blosc2Storage {
            cparams: Blosc2Cparams {
                compcode,
                compcode_meta,
                clevel,
                typesize,
                nthreads: nthreads_c,
                blocksize,
                splitmode,
                filters,
                filters_meta,
                geometry,
                registry: registry.clone(),
            },
            dparams: Blosc2Dparams {
                nthreads: nthreads_d,
                geometry,
                registry: registry.clone(),
            },
            max_chunks,
        };
        let mut schunk = Blosc2Schunk::new(storage)?;

        let nmeta = r.u16()? as usize;
        if nmeta > BLOSC2_MAX_METALAYERS {
            return Err(Error::invalid_header(format!(
                "frame holds {nmeta} metalayers, at most {BLOSC2_MAX_METALAYERS} allowed"
            )));
        }
        for _ in 0..nmeta {
            let name_len = r.u8()? as usize;
            let name = std::str::from_utf8(r.take(name_len)?)
                .map_err(|_| Error::invalid_header("metalayer name is not utf-8"))?
                .to_string();
            let capacity = r.u32()?;
            let content_len = r.u32()?;
            if content_len > capacity {
                return Err(Error::invalid_header(format!(
                    "metalayer '{name}' content exceeds its slot"
                )));
            }
            let content = r.take(content_len)?.to_vec();
            if name == B2ND_METALAYER_NAME || name == CATERVA_METALAYER_NAME {
                let geometry = decode_geometry(&content)?;
                schunk.cctx.set_geometry(Some(geometry));
                schunk.dctx.set_geometry(Some(geometry));
            }
            schunk.metalayers.push(Blosc2Metalayer {
                name,
                content,
                capacity,
            });
        }

        let has_usermeta = r.u8()? != 0;
        let usermeta_len = r.u32()?;
        let usermeta = r.take(usermeta_len)?;
        if has_usermeta {
            schunk.usermeta = Some(usermeta.to_vec());
        }

        let index_len = nchunks
            .checked_mul(CHUNK_ENTRY_LEN)
            .ok_or_else(|| Error::invalid_header("chunk index overflows"))?;
        let mut index = FrameReader {
            buf: r.take(index_len)?,
            pos: 0,
        };
        let data = &frame[r.pos..];

        let mut chunks = Vec::with_capacity(nchunks);
        let (mut total_nbytes, mut total_cbytes) = (0usize, 0usize);
        for nchunk in 0..nchunks {
            let kind = index.u8()?;
            let a = index.u64()?;
            let b = index.u64()?;
            let chunk = match kind {
                CHUNK_KIND_DATA => {
                    let mut reader = FrameReader { buf: data, pos: a };
                    let bytes = reader.take(b)?;
                    let (_, chunk_cbytes) = Blosc2Schunk::inspect(bytes)?;
                    if chunk_cbytes != bytes.len() {
                        return Err(Error::invalid_header(format!(
                            "chunk {nchunk} length {} disagrees with its header ({chunk_cbytes})",
                            bytes.len()
                        )));
                    }
                    StoredChunk::Data(bytes.to_vec())
                }
                CHUNK_KIND_ZEROS => StoredChunk::Zeros { nbytes: a },
                CHUNK_KIND_EMPTY => StoredChunk::Empty,
                other => {
                    return Err(Error::invalid_header(format!(
                        "unknown chunk kind {other} for chunk {nchunk}"
                    )))
                }
            };
            let (n, c) = chunk.sizes();
            total_nbytes += n;
            total_cbytes += c;
            chunks.push(chunk);
        }
        if (total_nbytes, total_cbytes) != (nbytes, cbytes) {
            return Err(Error::invalid_header(format!(
                "frame counters ({nbytes}, {cbytes}) disagree with its chunks ({total_nbytes}, {total_cbytes})"
            )));
        }

        schunk.chunks = chunks;
        schunk.nbytes = nbytes;
        schunk.cbytes = cbytes;
        schunk.chunksize = usize::try_from(chunksize).ok();
        log::debug!("restored super-chunk with {nchunks} chunks from frame");
        Ok(schunk)
    }

    /// Write the super-chunk as a frame to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<usize> {
        let frame = self.to_frame()?;
        std::fs::write(path.as_ref(), &frame)?;
        log::debug!("saved frame to {}", path.as_ref().display());
        Ok(frame.len())
    }

    /// Read a super-chunk saved with [`save`](Self::save).
    pub fn open(path: impl AsRef<Path>, registry: &FilterRegistry) -> Result<Self> {
        let frame = std::fs::read(path.as_ref())?;
        Self::from_frame(&frame, registry)
    }
}

/// Thread count recorded in a frame, limited to what this host can run.
fn host_nthreads(stored: u16) -> usize {
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    (stored as usize).clamp(1, available)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schunk() -> Blosc2Schunk {
        let mut schunk = Blosc2Schunk::new(Blosc2Storage {
            cparams: Blosc2Cparams {
                typesize: 4,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let data: Vec<u8> = (0..2000u32).flat_map(|i| i.to_le_bytes()).collect();
        schunk.append_buffer(&data).unwrap();
        schunk.fill_zeros(1, 8000).unwrap();
        schunk.add_metalayer("info", b"abc").unwrap();
        schunk
    }

    #[test]
    fn frame_restores_counters_and_chunks() {
        let original = schunk();
        let frame = original.to_frame().unwrap();
        let restored = Blosc2Schunk::from_frame(&frame, &FilterRegistry::default()).unwrap();
        assert_eq!(restored.nchunks(), 2);
        assert_eq!(restored.nbytes(), original.nbytes());
        assert_eq!(restored.cbytes(), original.cbytes());
        assert_eq!(restored.chunksize(), Some(8000));
        assert_eq!(restored.get_metalayer("info").unwrap(), b"abc");
        assert_eq!(restored.usermeta(), None);
        assert_eq!(
            restored.get_chunk(0).unwrap().as_ref(),
            original.get_chunk(0).unwrap().as_ref()
        );
    }

    #[test]
    fn bad_frames_are_rejected() {
        let frame = schunk().to_frame().unwrap();
        let registry = FilterRegistry::default();

        let mut bad_magic = frame.clone();
        bad_magic[0] = b'x';
        assert!(matches!(
            Blosc2Schunk::from_frame(&bad_magic, &registry),
            Err(Error::InvalidHeader(_))
        ));
        for len in [0, 7, 40, frame.len() - 1] {
            assert!(
                matches!(
                    Blosc2Schunk::from_frame(&frame[..len], &registry),
                    Err(Error::InvalidHeader(_))
                ),
                "truncated at {len}"
            );
        }
    }

    #[test]
    fn frame_thread_counts_are_clamped() {
        let mut frame = schunk().to_frame().unwrap();
        // nthreads_c and nthreads_d follow magic, version, sizes and codec bytes
        let offset = FRAME_MAGIC.len() + 1 + 4 + 4 + 8 + 4;
        frame[offset..offset + 4].copy_from_slice(&[0xff; 4]);
        let restored = Blosc2Schunk::from_frame(&frame, &FilterRegistry::default()).unwrap();
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        assert!(restored.cctx().nthreads() <= available);
        assert!(restored.dctx().nthreads() <= available);
        assert_eq!(restored.nchunks(), 2);

        frame[offset..offset + 4].copy_from_slice(&[0; 4]);
        let restored = Blosc2Schunk::from_frame(&frame, &FilterRegistry::default()).unwrap();
        assert_eq!(restored.cctx().nthreads(), 1);
    }
}
