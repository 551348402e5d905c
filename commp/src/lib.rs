// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Streaming Filecoin piece commitment (commP) computation.
//!
//! This crate computes the same piece commitment as `go-fil-commp-hashhash`:
//! - the payload is Fr32-padded, turning every 127 raw bytes into four 32-byte
//!   leaves that are valid BLS12-381 scalars
//! - the leaves are folded into a SHA2-254 merkle tree, padded on the right with
//!   zero subtrees up to the next power of two
//!
//! Key components:
//! - [`Accumulator`]: write-oriented front end, also usable as an [`std::io::Write`] sink
//! - [`fr32`]: the padding transform, streaming and per quad
//! - [`PieceCommitment`]: the resulting root with its padded and unpadded sizes
//!
//! Memory use is bounded by one partial leaf plus one pending node per tree
//! level, regardless of payload size.

mod accumulator;
mod error;
pub mod fr32;
mod piece;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use accumulator::{
    Accumulator, AccumulatorConfig, DEFAULT_MAX_DEPTH, MIN_DEPTH, PieceCommitment, TailPolicy,
    piece_commitment,
};
pub use error::{CommPError, ErrorKind};
pub use piece::{PaddedPieceSize, UnpaddedPieceSize};

// re-exports
pub use filecoin_commp_merkle::{MAX_SUPPORTED_DEPTH, MerkleError, Node, ZeroCache};
