// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::{Accumulator, AccumulatorConfig, CommPError, PieceCommitment};

/// Deterministic payload `0, 1, .., 250, 0, 1, ..`
pub fn pattern_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Pseudo-random payload reproducible from `seed`
pub fn random_payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut payload = vec![0u8; len];
    rng.fill_bytes(&mut payload);
    payload
}

/// Feeds `chunks` to a fresh accumulator in order and finalizes it
pub fn commit_chunks<'a>(
    config: AccumulatorConfig,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> Result<PieceCommitment, CommPError> {
    let mut acc = Accumulator::with_config(config)?;
    for chunk in chunks {
        acc.write(chunk)?;
    }
    acc.finalize()
}
