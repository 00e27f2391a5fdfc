use blusc_nd::api::{blosc2_compress, blosc2_decompress};
use blusc_nd::{BLOSC2_MAX_OVERHEAD, BLOSC_BITSHUFFLE, BLOSC_NOSHUFFLE, BLOSC_SHUFFLE};

struct TestCase {
    type_size: usize,
    num_elements: usize,
    clevel: u8,
    doshuffle: u8,
}

#[test]
fn test_compress_roundtrip_cases() {
    let cases = vec![
        // Small buffers
        TestCase { type_size: 1, num_elements: 7, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
        TestCase { type_size: 2, num_elements: 7, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
        TestCase { type_size: 4, num_elements: 7, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
        TestCase { type_size: 8, num_elements: 7, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },

        // Larger buffers
        TestCase { type_size: 1, num_elements: 10000, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
        TestCase { type_size: 4, num_elements: 10000, clevel: 5, doshuffle: BLOSC_SHUFFLE },
        TestCase { type_size: 8, num_elements: 10000, clevel: 5, doshuffle: BLOSC_BITSHUFFLE },

        // Different compression levels
        TestCase { type_size: 4, num_elements: 5000, clevel: 0, doshuffle: BLOSC_SHUFFLE },
        TestCase { type_size: 4, num_elements: 5000, clevel: 1, doshuffle: BLOSC_SHUFFLE },
        TestCase { type_size: 4, num_elements: 5000, clevel: 9, doshuffle: BLOSC_SHUFFLE },

        // Odd sizes
        TestCase { type_size: 3, num_elements: 1000, clevel: 5, doshuffle: BLOSC_SHUFFLE },
        TestCase { type_size: 16, num_elements: 1000, clevel: 5, doshuffle: BLOSC_SHUFFLE },
        TestCase { type_size: 33, num_elements: 100, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
        TestCase { type_size: 1, num_elements: 702713, clevel: 5, doshuffle: BLOSC_NOSHUFFLE },
    ];

    for case in &cases {
        run_roundtrip(case);
    }
}

fn run_roundtrip(case: &TestCase) {
    let buffer_size = case.type_size * case.num_elements;
    let original: Vec<u8> = (0..buffer_size).map(|j| (j % 255) as u8).collect();

    let mut intermediate = vec![0u8; buffer_size + BLOSC2_MAX_OVERHEAD];
    let mut result = vec![0u8; buffer_size];

    let csize = blosc2_compress(
        case.clevel,
        case.doshuffle,
        case.type_size,
        &original,
        &mut intermediate,
    )
    .unwrap();
    assert!(
        csize > 0,
        "compression did not fit: type_size={} num_elements={}",
        case.type_size,
        case.num_elements
    );

    let dsize = blosc2_decompress(&intermediate[..csize], &mut result).unwrap();
    assert_eq!(dsize, buffer_size);
    assert_eq!(
        original, result,
        "mismatch: type_size={} num_elements={} clevel={} doshuffle={}",
        case.type_size, case.num_elements, case.clevel, case.doshuffle
    );
}

#[test]
fn test_empty_buffer() {
    let mut dest = vec![0u8; BLOSC2_MAX_OVERHEAD];
    let csize = blosc2_compress(5, BLOSC_SHUFFLE, 4, &[], &mut dest).unwrap();
    assert_eq!(csize, BLOSC2_MAX_OVERHEAD);
    let mut out = [0u8; 0];
    assert_eq!(blosc2_decompress(&dest[..csize], &mut out).unwrap(), 0);
}
