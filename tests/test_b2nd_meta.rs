/// The b2nd geometry metalayer and the multi-index translator.
use blusc_nd::api::{b2nd_deserialize_meta, b2nd_serialize_meta, Blosc2Cparams, Blosc2Storage};
use blusc_nd::blosc::b2nd_utils::{linear_to_multi, multi_to_linear, nitems, strides};
use blusc_nd::{Blosc2Schunk, Error, Geometry, B2ND_METALAYER_NAME};

#[test]
fn serialized_meta_layout() {
    let smeta = b2nd_serialize_meta(&[10], &[5], &[2]).unwrap();
    assert_eq!(
        smeta,
        vec![
            0x95, 0x00, 0x01, // array of 5, version 0, ndim 1
            0x91, 0xd3, 0, 0, 0, 0, 0, 0, 0, 10, // shape
            0x91, 0xd2, 0, 0, 0, 5, // chunkshape
            0x91, 0xd2, 0, 0, 0, 2, // blockshape
        ]
    );
    let geometry = b2nd_deserialize_meta(&smeta).unwrap();
    assert_eq!(geometry.shape(), &[10]);
    assert_eq!(geometry.chunkshape(), &[5]);
    assert_eq!(geometry.blockshape(), &[2]);
}

#[test]
fn meta_roundtrip_up_to_eight_dims() {
    for ndim in 1..=8usize {
        let shape: Vec<i64> = (0..ndim).map(|i| 3 + i as i64 * 5).collect();
        let chunkshape: Vec<i32> = (0..ndim).map(|i| 2 + i as i32).collect();
        let blockshape: Vec<i32> = (0..ndim).map(|_| 2).collect();
        let geometry = Geometry::new(&shape, &chunkshape, &blockshape).unwrap();
        let smeta = b2nd_serialize_meta(&shape, &chunkshape, &blockshape).unwrap();
        assert_eq!(b2nd_deserialize_meta(&smeta).unwrap(), geometry, "ndim {ndim}");
    }
}

#[test]
fn malformed_meta_is_rejected() {
    assert!(matches!(
        b2nd_deserialize_meta(&[0x95, 0x00]),
        Err(Error::MalformedGeometry(_))
    ));
    let mut smeta = b2nd_serialize_meta(&[10, 10], &[5, 5], &[2, 2]).unwrap();
    smeta[2] = 9;
    assert!(matches!(
        b2nd_deserialize_meta(&smeta),
        Err(Error::MalformedGeometry(_))
    ));
    assert!(b2nd_serialize_meta(&[10], &[5], &[6]).is_err());
    assert!(b2nd_serialize_meta(&[10, 2], &[5], &[2]).is_err());
}

#[test]
fn schunk_geometry_follows_its_metalayer() {
    let mut schunk = Blosc2Schunk::new(Blosc2Storage {
        cparams: Blosc2Cparams {
            typesize: 4,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    assert!(schunk.geometry().is_none());

    // A bad blob leaves the super-chunk untouched
    assert!(matches!(
        schunk.add_metalayer(B2ND_METALAYER_NAME, b"not msgpack"),
        Err(Error::MalformedGeometry(_))
    ));
    assert_eq!(schunk.meta_exists(B2ND_METALAYER_NAME), None);

    let first = b2nd_serialize_meta(&[100, 100], &[50, 50], &[10, 10]).unwrap();
    schunk.add_metalayer(B2ND_METALAYER_NAME, &first).unwrap();
    let geometry = schunk.geometry().copied().unwrap();
    assert_eq!(geometry.nchunks(), 4);
    assert_eq!(geometry.block_nitems(), 100);
    assert_eq!(schunk.blocksize(), 400);

    let second = b2nd_serialize_meta(&[90, 100], &[50, 50], &[10, 10]).unwrap();
    schunk.update_metalayer(B2ND_METALAYER_NAME, &second).unwrap();
    assert_eq!(schunk.geometry().unwrap().shape(), &[90, 100]);
    assert_eq!(schunk.geometry().unwrap().chunk_valid_shape(2)[0], 40);
}

#[test]
fn multi_index_roundtrip() {
    for ndim in 1..=8usize {
        let mut extents = [1i64; 8];
        for (i, extent) in extents.iter_mut().enumerate().take(ndim) {
            *extent = 2 + (i as i64 % 3);
        }
        let strides = strides(ndim, &extents);
        for linear in 0..nitems(ndim, &extents) {
            let index = linear_to_multi(ndim, &extents, linear);
            for i in 0..ndim {
                assert!(index[i] < extents[i]);
            }
            assert_eq!(multi_to_linear(&index, &strides, ndim), linear);
        }
    }
}
