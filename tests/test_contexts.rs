/// Context based compression: blosc2_create_cctx / blosc2_compress_ctx /
/// blosc2_create_dctx / blosc2_decompress_ctx, single and multi threaded.
use blusc_nd::api::{
    blosc1_getitem, blosc2_cbuffer_sizes, blosc2_compress_ctx, blosc2_create_cctx,
    blosc1_cbuffer_metainfo, blosc2_create_dctx, blosc2_decompress_ctx, Blosc2Cparams,
    Blosc2Dparams, Blosc2Storage,
};
use blusc_nd::{
    Blosc2Schunk, Error, BLOSC2_MAX_OVERHEAD, BLOSC_ALWAYS_SPLIT, BLOSC_BITSHUFFLE, BLOSC_LZ4, BLOSC_MEMCPYED,
    BLOSC_NEVER_SPLIT, BLOSC_SHUFFLE, BLOSC_SNAPPY, BLOSC_ZLIB, BLOSC_ZSTD,
};

const SIZE: usize = 500 * 1000;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cparams(compcode: u8, nthreads: usize) -> Blosc2Cparams {
    let mut cparams = Blosc2Cparams {
        typesize: std::mem::size_of::<i32>(),
        compcode,
        clevel: 5,
        nthreads,
        ..Default::default()
    };
    cparams.filters[5] = BLOSC_SHUFFLE;
    cparams
}

#[test]
fn context_compress_decompress_i32() {
    init();
    let src: Vec<i32> = (0..SIZE as i32).collect();
    let src_bytes: &[u8] = bytemuck::cast_slice(&src);
    let isize = src_bytes.len();

    let cctx = blosc2_create_cctx(cparams(BLOSC_LZ4, 1)).unwrap();
    let mut compressed = vec![0u8; isize + BLOSC2_MAX_OVERHEAD];
    let csize = blosc2_compress_ctx(&cctx, src_bytes, &mut compressed).unwrap();
    assert!(csize > 0, "context compression did not fit");
    assert!(csize < isize, "sequential data should compress");
    compressed.truncate(csize);

    let (nbytes, cbytes, _) = blosc2_cbuffer_sizes(&compressed).unwrap();
    assert_eq!((nbytes, cbytes), (isize, csize));

    let dctx = blosc2_create_dctx(Blosc2Dparams::default()).unwrap();
    let mut decompressed = vec![0u8; isize];
    let dsize = blosc2_decompress_ctx(&dctx, &compressed, &mut decompressed).unwrap();
    assert_eq!(dsize, isize);
    assert_eq!(src_bytes, &decompressed[..]);

    let mut subset = vec![0u8; 5 * 4];
    let gsize = blosc1_getitem(&compressed, 5, 5, &mut subset).unwrap();
    assert_eq!(gsize, subset.len());
    let expected: Vec<i32> = (5..10).collect();
    assert_eq!(&subset[..], bytemuck::cast_slice::<i32, u8>(&expected));

    // An item range crossing a block boundary
    let blocksize = blosc2_cbuffer_sizes(&compressed).unwrap().2;
    let start = blocksize / 4 - 3;
    let mut subset = vec![0u8; 6 * 4];
    dctx.getitem(&compressed, start, 6, &mut subset).unwrap();
    let expected: Vec<i32> = (start as i32..start as i32 + 6).collect();
    assert_eq!(&subset[..], bytemuck::cast_slice::<i32, u8>(&expected));
}

#[test]
fn multithreaded_output_matches_single_thread() {
    init();
    let src: Vec<i32> = (0..SIZE as i32).map(|i| i / 3).collect();
    let src_bytes: &[u8] = bytemuck::cast_slice(&src);

    for compcode in [BLOSC_LZ4, BLOSC_SNAPPY, BLOSC_ZLIB, BLOSC_ZSTD] {
        let single = blosc2_create_cctx(cparams(compcode, 1)).unwrap();
        let multi = blosc2_create_cctx(cparams(compcode, 4)).unwrap();
        let a = single.compress(src_bytes).unwrap();
        let b = multi.compress(src_bytes).unwrap();
        assert_eq!(a, b, "codec {compcode}: thread count changed the chunk");

        let dctx = blosc2_create_dctx(Blosc2Dparams {
            nthreads: 3,
            ..Default::default()
        })
        .unwrap();
        let mut out = vec![0u8; src_bytes.len()];
        dctx.decompress(&b, &mut out).unwrap();
        assert_eq!(out, src_bytes);
    }
}

#[test]
fn split_modes_and_bitshuffle_roundtrip() {
    init();
    let src: Vec<f64> = (0..100_000).map(|i| (i as f64 * 0.001).sin()).collect();
    let src_bytes: &[u8] = bytemuck::cast_slice(&src);
    for splitmode in [BLOSC_ALWAYS_SPLIT, BLOSC_NEVER_SPLIT] {
        for filter in [BLOSC_SHUFFLE, BLOSC_BITSHUFFLE] {
            let mut params = Blosc2Cparams {
                typesize: 8,
                splitmode,
                nthreads: 2,
                ..Default::default()
            };
            params.filters[5] = filter;
            let cctx = blosc2_create_cctx(params).unwrap();
            let chunk = cctx.compress(src_bytes).unwrap();
            let dctx = blosc2_create_dctx(Blosc2Dparams::default()).unwrap();
            let mut out = vec![0u8; src_bytes.len()];
            assert_eq!(dctx.decompress(&chunk, &mut out).unwrap(), src_bytes.len());
            assert_eq!(out, src_bytes, "splitmode {splitmode}, filter {filter}");
        }
    }
}

#[test]
fn random_data_falls_back_to_memcpy() {
    init();
    // xorshift noise does not compress
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let src: Vec<u8> = (0..64 * 1024)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect();

    let mut params = cparams(BLOSC_LZ4, 1);
    params.typesize = 1;
    let cctx = blosc2_create_cctx(params).unwrap();
    let chunk = cctx.compress(&src).unwrap();
    assert_eq!(chunk.len(), src.len() + BLOSC2_MAX_OVERHEAD);
    let (_, flags) = blusc_nd::api::blosc1_cbuffer_metainfo(&chunk).unwrap();
    assert_ne!(flags & BLOSC_MEMCPYED, 0);

    let dctx = blosc2_create_dctx(Blosc2Dparams::default()).unwrap();
    let mut out = vec![0u8; src.len()];
    dctx.decompress(&chunk, &mut out).unwrap();
    assert_eq!(out, src);

    // A destination without room for the header overhead reports 0
    let mut small = vec![0u8; src.len()];
    assert_eq!(cctx.compress_into(&src, &mut small).unwrap(), 0);
}

#[test]
fn decompress_into_short_buffer_fails() {
    init();
    let src: Vec<i32> = (0..1000).collect();
    let cctx = blosc2_create_cctx(cparams(BLOSC_LZ4, 1)).unwrap();
    let chunk = cctx.compress(bytemuck::cast_slice(&src)).unwrap();
    let dctx = blosc2_create_dctx(Blosc2Dparams::default()).unwrap();
    let mut out = vec![0u8; 3999];
    assert!(matches!(
        dctx.decompress(&chunk, &mut out),
        Err(Error::SizeMismatch { expected: 4000, actual: 3999 })
    ));
}

#[test]
fn invalid_parameters_are_rejected() {
    init();
    let zero_typesize = Blosc2Cparams {
        typesize: 0,
        ..Default::default()
    };
    assert!(matches!(
        blosc2_create_cctx(zero_typesize),
        Err(Error::InvalidParam(_))
    ));
    let bad_clevel = Blosc2Cparams {
        clevel: 10,
        ..Default::default()
    };
    assert!(blosc2_create_cctx(bad_clevel).is_err());
    let blosclz = Blosc2Cparams {
        compcode: blusc_nd::BLOSC_BLOSCLZ,
        ..Default::default()
    };
    assert!(matches!(
        blosc2_create_cctx(blosclz),
        Err(Error::UnsupportedCodec(_))
    ));
    let mut unknown_filter = Blosc2Cparams::default();
    unknown_filter.filters[0] = 200;
    assert!(matches!(
        blosc2_create_cctx(unknown_filter),
        Err(Error::FilterNotRegistered(200))
    ));
}

#[test]
fn corrupted_split_header_is_rejected() {
    init();
    let cctx = blosc2_create_cctx(Blosc2Cparams {
        typesize: 4,
        blocksize: 128,
        splitmode: BLOSC_ALWAYS_SPLIT,
        clevel: 5,
        ..Default::default()
    })
    .unwrap();
    let src = vec![7u8; 4096];
    let chunk = cctx.compress(&src).unwrap();
    let (_, flags) = blosc1_cbuffer_metainfo(&chunk).unwrap();
    assert_eq!(flags & BLOSC_MEMCPYED, 0);

    let dctx = blosc2_create_dctx(Blosc2Dparams::default()).unwrap();
    let mut dest = vec![0u8; src.len()];
    // typesize larger than the blocksize, then one that does not divide it
    for typesize in [200u8, 3] {
        let mut corrupted = chunk.clone();
        corrupted[3] = typesize;
        assert!(matches!(
            dctx.decompress(&corrupted, &mut dest),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            blosc1_getitem(&corrupted, 0, 4, &mut dest),
            Err(Error::InvalidHeader(_))
        ));

        let mut schunk = Blosc2Schunk::new(Blosc2Storage::default()).unwrap();
        assert!(matches!(
            schunk.append_chunk(corrupted),
            Err(Error::InvalidHeader(_))
        ));
        assert_eq!(schunk.nchunks(), 0);
    }
}

#[test]
fn getitem_checks_memcpyed_cbytes() {
    init();
    let mut cparams = cparams(BLOSC_LZ4, 1);
    cparams.clevel = 0;
    let cctx = blosc2_create_cctx(cparams).unwrap();
    let src: Vec<i32> = (0..64).collect();
    let mut chunk = cctx.compress(bytemuck::cast_slice(&src)).unwrap();

    let mut dest = vec![0i32; 8];
    blosc1_getitem(&chunk, 56, 8, bytemuck::cast_slice_mut(&mut dest)).unwrap();
    assert_eq!(dest, src[56..]);

    // claim a chunk holding only the first item
    chunk[12..16].copy_from_slice(&(32i32 + 4).to_le_bytes());
    assert!(matches!(
        blosc1_getitem(&chunk, 56, 8, bytemuck::cast_slice_mut(&mut dest)),
        Err(Error::InvalidHeader(_))
    ));
}
