// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::{Cursor, Write};
use std::thread;

use filecoin_commp_merkle::ZERO_NODE;
use proptest::prelude::*;

use super::*;
use crate::ErrorKind;
use crate::test_utils::{commit_chunks, pattern_payload, random_payload};

fn commit(payload: &[u8]) -> PieceCommitment {
    piece_commitment(payload).unwrap()
}

/// Golden vectors for `pattern_payload(n)`
#[test]
fn test_commp_golden() {
    let expected = [
        (127, "b817099547b8c59060fede17e8fef01cd2e5871fcc83cb2cf492000001a97216", 128),
        (254, "f31e0cd7efce2226e300b71f1e86c6140eb4a88b065c489122bf59343abe7e29", 256),
        (381, "0ed70ac53d4aa049b1b54b005255559ba2e22d4b5ac16b995554edbbaa57b520", 512),
        (1016, "23b71f6dd110fc8fb2e5e5940a2c946032bd77e79ce137d8aa887e3a2937a226", 1024),
        (12_700, "5fe26392b5043ee5ebf2c24496eaedc281072e53b2b7a8f926e0b222f940e727", 16_384),
        (127_000, "c086c6bc8e9cc3c8d1f1dc21e1e0e9ab80bf3328675c90de919f5c1576cd6d3e", 131_072),
    ];

    for (len, expected_hex, padded_size) in expected {
        let res = commit(&pattern_payload(len));
        assert_eq!(expected_hex, res.to_string(), "mismatch for {} bytes", len);
        assert_eq!(res.padded_size.get(), padded_size);
        assert_eq!(res.payload_size, len as u64);
    }
}

#[test]
fn test_zero_payload_is_zero_subtree() {
    let zeros = ZeroCache::new();
    for (quads, height) in [(1usize, 2u32), (2, 3), (3, 4), (4, 4)] {
        let res = commit(&vec![0u8; quads * UNPADDED_QUAD]);
        assert_eq!(res.comm_p, zeros.get(height).unwrap(), "{} quads", quads);
        assert_eq!(res.padded_size.get(), 32 << height);
    }

    let res = commit(&[0u8; UNPADDED_QUAD]);
    assert_eq!(
        res.to_string(),
        "3731bb99ac689f66eef5973e4a94da188f4ddcae580724fc6f3fd60dfd488333"
    );
    assert_eq!(res.unpadded_size().get(), 127);
}

#[test]
fn test_split_write_across_leaf_boundary() {
    let whole = commit(&[0u8; 254]);

    let mut acc = Accumulator::new();
    acc.write(&[0u8; 100]).unwrap();
    acc.write(&[0u8; 154]).unwrap();
    assert_eq!(acc.finalize().unwrap(), whole);
}

#[test]
fn test_chunk_sizes_do_not_matter() {
    let payload = random_payload(1, UNPADDED_QUAD * 37);
    let whole = commit(&payload);

    for chunk in [1, 2, 31, 32, 33, 126, 127, 128, 1000] {
        let res = commit_chunks(AccumulatorConfig::default(), payload.chunks(chunk)).unwrap();
        assert_eq!(res, whole, "chunk size {}", chunk);
    }

    let res = commit_chunks(
        AccumulatorConfig::default(),
        [&payload[..0], &payload[..5], &[][..], &payload[5..]],
    )
    .unwrap();
    assert_eq!(res, whole);
}

#[test]
fn test_determinism_across_instances() {
    let payload = random_payload(2, UNPADDED_QUAD * 9);
    assert_eq!(commit(&payload), commit(&payload));
    assert_ne!(commit(&payload), commit(&random_payload(3, UNPADDED_QUAD * 9)));
}

#[test]
fn test_finalize_empty_input_fails() {
    let mut acc = Accumulator::new();
    let err = acc.finalize().unwrap_err();
    assert_eq!(err, CommPError::EmptyInput);
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(acc.is_finalized());

    let mut acc = Accumulator::new();
    acc.write(&[]).unwrap();
    assert_eq!(acc.finalize(), Err(CommPError::EmptyInput));
}

#[test]
fn test_terminal_state() {
    let mut acc = Accumulator::new();
    acc.write(&pattern_payload(UNPADDED_QUAD)).unwrap();
    acc.finalize().unwrap();

    assert_eq!(acc.write(&[1]), Err(CommPError::WriteAfterFinalize));
    assert_eq!(acc.write(&[]), Err(CommPError::WriteAfterFinalize));
    assert_eq!(acc.finalize(), Err(CommPError::AlreadyFinalized));
    assert_eq!(acc.bytes_written(), UNPADDED_QUAD as u64);
}

#[test]
fn test_unaligned_tail_rejected_by_default() {
    let mut acc = Accumulator::new();
    acc.write(&pattern_payload(200)).unwrap();
    let err = acc.finalize().unwrap_err();
    assert_eq!(err, CommPError::UnalignedTail { remainder: 73 });
    assert_eq!(err.kind(), ErrorKind::Usage);

    // A failed finalize still spends the accumulator
    assert_eq!(acc.write(&[0; 54]), Err(CommPError::WriteAfterFinalize));
    assert_eq!(acc.finalize(), Err(CommPError::AlreadyFinalized));
}

#[test]
fn test_zero_fill_tail() {
    let config = AccumulatorConfig::default().with_tail(TailPolicy::ZeroFill);
    let expected = [
        (65, "5f6fdf721ee45657f563f7640e34812fc7d90175a77086c631c4a840cadb8734", 128),
        (200, "5788146918017291a2c0f697064e672fa10257de1f211678796d1352b7175430", 256),
        (300, "706a09d1e6ede6ef333f527a607f33cd0e9cf19a0a11370be43c8ae451b0092b", 512),
    ];

    for (len, expected_hex, padded_size) in expected {
        let payload = pattern_payload(len);
        let res = commit_chunks(config, [payload.as_slice()]).unwrap();
        assert_eq!(expected_hex, res.to_string(), "mismatch for {} bytes", len);
        assert_eq!(res.padded_size.get(), padded_size);
        assert_eq!(res.payload_size, len as u64);

        let mut filled = payload.clone();
        filled.resize(len.div_ceil(UNPADDED_QUAD) * UNPADDED_QUAD, 0);
        assert_eq!(res.comm_p, commit(&filled).comm_p);
    }

    // Aligned input is unaffected by the policy
    let payload = pattern_payload(381);
    assert_eq!(
        commit_chunks(config, [payload.as_slice()]).unwrap(),
        commit(&payload)
    );
    let mut acc = Accumulator::with_config(config).unwrap();
    assert_eq!(acc.finalize(), Err(CommPError::EmptyInput));
}

#[test]
fn test_config_validation() {
    for depth in [0, 1, MAX_SUPPORTED_DEPTH + 1, u32::MAX] {
        let config = AccumulatorConfig::default().with_max_depth(depth);
        let err = Accumulator::with_config(config).unwrap_err();
        assert_eq!(
            err,
            CommPError::UnsupportedDepth {
                depth,
                min: MIN_DEPTH,
                max: MAX_SUPPORTED_DEPTH
            }
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    let config = AccumulatorConfig::default();
    assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(config.max_payload(), 68_182_605_824);
    assert_eq!(
        AccumulatorConfig::default().with_max_depth(MIN_DEPTH).max_payload(),
        127
    );
}

#[test]
fn test_payload_too_large() {
    let config = AccumulatorConfig::default().with_max_depth(3);
    let mut acc = Accumulator::with_config(config).unwrap();
    let payload = pattern_payload(254);

    acc.write(&payload[..200]).unwrap();
    acc.write(&payload[200..]).unwrap();
    let err = acc.write(&[0]).unwrap_err();
    assert_eq!(err, CommPError::PayloadTooLarge { size: 255, max: 254 });
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // The rejected write left the accumulator untouched
    assert_eq!(acc.bytes_written(), 254);
    assert_eq!(acc.finalize().unwrap(), commit(&payload));

    let mut acc = Accumulator::with_config(config).unwrap();
    assert_eq!(
        acc.write(&[0u8; 300]),
        Err(CommPError::PayloadTooLarge { size: 300, max: 254 })
    );
    assert_eq!(acc.bytes_written(), 0);
}

#[test]
fn test_io_write_adapter() {
    let payload = random_payload(4, UNPADDED_QUAD * 20);
    let mut acc = Accumulator::new();
    let copied = std::io::copy(&mut Cursor::new(&payload), &mut acc).unwrap();
    acc.flush().unwrap();
    assert_eq!(copied, payload.len() as u64);
    assert_eq!(acc.finalize().unwrap(), commit(&payload));

    let err = Write::write(&mut acc, &[1]).unwrap_err();
    let inner = err.get_ref().and_then(|e| e.downcast_ref::<CommPError>());
    assert_eq!(inner, Some(&CommPError::WriteAfterFinalize));
}

#[test]
fn test_leaf_count_and_progress() {
    let mut acc = Accumulator::new();
    acc.write(&[0u8; 31]).unwrap();
    assert_eq!(acc.leaves(), 0);
    acc.write(&[0u8; 1]).unwrap();
    assert_eq!(acc.leaves(), 1);
    acc.write(&[0u8; 95]).unwrap();
    assert_eq!(acc.leaves(), 4);
    assert_eq!(acc.bytes_written(), 127);
}

#[test]
fn test_private_zero_cache() -> anyhow::Result<()> {
    let zeros = Arc::new(ZeroCache::new());
    let payload = pattern_payload(UNPADDED_QUAD * 5);

    let mut acc = Accumulator::with_cache(AccumulatorConfig::default(), Arc::clone(&zeros))?;
    acc.write(&payload)?;
    let res = acc.finalize()?;

    assert_eq!(res, commit(&payload));
    assert!(zeros.computed_levels() > 1);
    Ok(())
}

#[test]
fn test_concurrent_accumulators() {
    let handles: Vec<_> = (0..6u64)
        .map(|seed| {
            thread::spawn(move || {
                let payload = random_payload(seed, UNPADDED_QUAD * (seed as usize * 7 + 3));
                (payload.clone(), commit(&payload))
            })
        })
        .collect();

    for handle in handles {
        let (payload, res) = handle.join().unwrap();
        assert_eq!(res, commit(&payload));
    }
}

#[test]
fn test_leaves_match_padder() {
    // The commitment of a single quad is the tree over its four padded words
    let payload = pattern_payload(UNPADDED_QUAD);
    let padded = crate::fr32::pad_quad(&payload.as_slice().try_into().unwrap());
    let leaves: Vec<Node> = padded
        .chunks_exact(32)
        .map(|w| w.try_into().unwrap())
        .collect();
    let root = filecoin_commp_merkle::tree(&leaves).unwrap();
    assert_eq!(commit(&payload).comm_p, root.root);
    assert_ne!(root.root, ZERO_NODE);
}

proptest! {
    #[test]
    fn prop_chunk_independence(
        seed in any::<u64>(),
        quads in 1usize..12,
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let payload = random_payload(seed, quads * UNPADDED_QUAD);
        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(payload.len() + 1)).collect();
        points.sort_unstable();

        let mut chunks = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(&payload[start..point]);
            start = point;
        }
        chunks.push(&payload[start..]);

        let split = commit_chunks(AccumulatorConfig::default(), chunks).unwrap();
        prop_assert_eq!(split, commit(&payload));
    }

    #[test]
    fn prop_padded_size_is_minimal(quads in 1u64..300) {
        let res = commit(&vec![0xabu8; quads as usize * UNPADDED_QUAD]);
        let leaves = quads * 4;
        let padded = res.padded_size.get();
        prop_assert!(padded.is_power_of_two());
        prop_assert!(padded >= leaves * 32);
        prop_assert!(padded < leaves * 64);
        prop_assert!(filecoin_commp_merkle::is_field_constrained(&res.comm_p));
    }
}
