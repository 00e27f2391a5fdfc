/// Super-chunk behaviour, starting from c-blosc2/tests/test_empty_schunk.c.
use blusc_nd::api::{
    blosc2_cbuffer_sizes, blosc2_compress_ctx, blosc2_get_usermeta, blosc2_meta_add,
    blosc2_meta_exists, blosc2_meta_get, blosc2_meta_update, blosc2_schunk_decompress_chunk,
    blosc2_schunk_empty, blosc2_schunk_free, blosc2_schunk_get_chunk, blosc2_schunk_new,
    blosc2_schunk_update_chunk, blosc2_schunk_update_chunk_copy, blosc2_update_usermeta,
    Blosc2Cparams, Blosc2Dparams, Blosc2Storage,
};
use blusc_nd::{Error, BLOSC2_MAX_METALAYERS, BLOSC2_MAX_OVERHEAD, BLOSC_LZ4};
use std::borrow::Cow;

const CHUNKSIZE: usize = 200 * 1000;
const NTHREADS: usize = 2;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn storage() -> Blosc2Storage {
    Blosc2Storage {
        cparams: Blosc2Cparams {
            typesize: std::mem::size_of::<i32>(),
            compcode: BLOSC_LZ4,
            clevel: 5,
            nthreads: NTHREADS,
            ..Default::default()
        },
        dparams: Blosc2Dparams {
            nthreads: NTHREADS,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn chunk_data(nchunk: usize) -> Vec<i32> {
    (0..CHUNKSIZE).map(|i| (i + nchunk * CHUNKSIZE) as i32).collect()
}

fn run_empty_schunk(nchunks: usize, copy: bool) {
    init();
    let mut schunk = blosc2_schunk_empty(storage(), nchunks).unwrap();

    blosc2_meta_add(&mut schunk, "metalayer1", b"my metalayer1\0").unwrap();
    blosc2_meta_add(&mut schunk, "metalayer2", b"my metalayer1\0").unwrap();

    let chunk = blosc2_schunk_get_chunk(&schunk, nchunks / 2).unwrap();
    assert!(chunk.is_empty(), "reserved slot should read back empty");

    let datasize = std::mem::size_of::<i32>() * CHUNKSIZE;
    let chunksize = datasize + BLOSC2_MAX_OVERHEAD;

    for nchunk in 0..nchunks {
        let data = chunk_data(nchunk);
        let mut chunk = vec![0u8; chunksize];
        let csize =
            blosc2_compress_ctx(schunk.cctx(), bytemuck::cast_slice(&data), &mut chunk).unwrap();
        assert!(csize > 0, "chunk cannot be compressed");

        if copy {
            let n = blosc2_schunk_update_chunk_copy(&mut schunk, nchunk, &chunk).unwrap();
            assert_eq!(n, nchunks);
            // Later changes to the caller's buffer do not reach the super-chunk
            chunk[40..].fill(0xff);
            let n = blosc2_schunk_update_chunk_copy(&mut schunk, nchunk, &chunk[..0]);
            assert!(n.is_err());
        } else {
            let again = chunk.clone();
            let n = blosc2_schunk_update_chunk(&mut schunk, nchunk, chunk).unwrap();
            assert_eq!(n, nchunks);
            let ptr = again.as_ptr();
            let n = blosc2_schunk_update_chunk(&mut schunk, nchunk, again).unwrap();
            assert_eq!(n, nchunks);
            match blosc2_schunk_get_chunk(&schunk, nchunk).unwrap() {
                Cow::Borrowed(stored) => assert_eq!(stored.as_ptr(), ptr),
                Cow::Owned(_) => panic!("an adopted chunk must be borrowed back"),
            }
        }
    }

    blosc2_meta_update(&mut schunk, "metalayer2", b"my metalayer2\0").unwrap();
    blosc2_update_usermeta(&mut schunk, &b"testing the usermeta"[..16]);

    if nchunks > 0 {
        assert!(
            schunk.nbytes() > 10 * schunk.cbytes(),
            "bad compression ratio: {} / {}",
            schunk.nbytes(),
            schunk.cbytes()
        );
    }

    let (mut nbytes, mut cbytes) = (0, 0);
    for nchunk in 0..nchunks {
        let chunk = blosc2_schunk_get_chunk(&schunk, nchunk).unwrap();
        let (nbytes_, cbytes_, _) = blosc2_cbuffer_sizes(&chunk).unwrap();
        assert_eq!(cbytes_, chunk.len());
        nbytes += nbytes_;
        cbytes += cbytes_;
    }
    assert_eq!(nbytes, schunk.nbytes());
    assert_eq!(cbytes, schunk.cbytes());
    if nchunks > 0 {
        assert_eq!(schunk.chunksize(), Some(datasize));
    }

    let mut data_dest = vec![0i32; CHUNKSIZE];
    for nchunk in 0..nchunks {
        let dsize = blosc2_schunk_decompress_chunk(
            &schunk,
            nchunk,
            bytemuck::cast_slice_mut(&mut data_dest),
        )
        .unwrap();
        assert_eq!(dsize, datasize);
        assert_eq!(data_dest, chunk_data(nchunk), "bad roundtrip in chunk {nchunk}");
    }

    assert_eq!(blosc2_meta_get(&schunk, "metalayer1").unwrap(), b"my metalayer1\0");
    assert_eq!(blosc2_meta_get(&schunk, "metalayer2").unwrap(), b"my metalayer2\0");
    assert_eq!(blosc2_meta_exists(&schunk, "metalayer2"), Some(1));

    let usermeta = blosc2_get_usermeta(&schunk).unwrap();
    assert_eq!(usermeta, b"testing the user");
    assert_eq!(usermeta.len(), 16);

    blosc2_schunk_free(schunk);
}

#[test]
fn empty_schunk_6_chunks_copy() {
    run_empty_schunk(6, true);
}

#[test]
fn empty_schunk_22_chunks_adopt() {
    run_empty_schunk(22, false);
}

#[test]
fn empty_schunk_10_chunks_copy() {
    run_empty_schunk(10, true);
}

#[test]
fn append_and_read_back() {
    init();
    let mut schunk = blosc2_schunk_new(storage()).unwrap();
    for nchunk in 0..5 {
        let data = chunk_data(nchunk);
        assert_eq!(schunk.append_buffer(bytemuck::cast_slice(&data)).unwrap(), nchunk + 1);
    }
    let copy = schunk.get_chunk(2).unwrap().into_owned();
    assert_eq!(schunk.append_chunk_copy(&copy).unwrap(), 6);
    assert_eq!(schunk.nbytes(), 6 * CHUNKSIZE * 4);

    let mut dest = vec![0i32; CHUNKSIZE];
    schunk
        .decompress_chunk(5, bytemuck::cast_slice_mut(&mut dest))
        .unwrap();
    assert_eq!(dest, chunk_data(2));

    let mut short = vec![0u8; CHUNKSIZE * 4 - 1];
    assert!(matches!(
        schunk.decompress_chunk(0, &mut short),
        Err(Error::SizeMismatch { .. })
    ));
    assert!(matches!(
        schunk.get_chunk(6),
        Err(Error::ChunkOutOfRange { index: 6, nchunks: 6 })
    ));
}

#[test]
fn missing_metalayer_differs_from_empty_one() {
    init();
    let mut schunk = blosc2_schunk_new(storage()).unwrap();
    schunk.add_metalayer("empty", b"").unwrap();
    assert_eq!(schunk.get_metalayer("empty").unwrap(), b"");
    assert!(matches!(
        schunk.get_metalayer("missing"),
        Err(Error::MetalayerNotFound(name)) if name == "missing"
    ));
    assert_eq!(schunk.meta_exists("missing"), None);
    assert!(matches!(
        schunk.update_metalayer("missing", b"x"),
        Err(Error::MetalayerNotFound(_))
    ));
}

#[test]
fn metalayer_slots_and_limits() {
    init();
    let mut schunk = blosc2_schunk_new(storage()).unwrap();
    schunk.add_metalayer("slot", b"12345").unwrap();
    assert!(matches!(
        schunk.add_metalayer("slot", b"other"),
        Err(Error::MetalayerExists(_))
    ));
    assert!(matches!(
        schunk.update_metalayer("slot", b"123456"),
        Err(Error::MetalayerTooLarge { len: 6, capacity: 5, .. })
    ));
    assert_eq!(schunk.get_metalayer("slot").unwrap(), b"12345");
    schunk.update_metalayer("slot", b"abc").unwrap();
    assert_eq!(schunk.get_metalayer("slot").unwrap(), b"abc");
    // The slot keeps its original capacity
    schunk.update_metalayer("slot", b"abcde").unwrap();

    assert!(schunk.add_metalayer(&"n".repeat(32), b"").is_err());
    for i in 1..BLOSC2_MAX_METALAYERS {
        schunk.add_metalayer(&format!("meta{i}"), &[i as u8]).unwrap();
    }
    assert_eq!(schunk.metalayers().len(), BLOSC2_MAX_METALAYERS);
    assert!(schunk.add_metalayer("one-too-many", b"").is_err());
}
