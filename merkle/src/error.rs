// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// No leaf was ever pushed, so there is no root to report.
    #[error("merkle tree has no leaves")]
    EmptyTree,

    /// The tree would need more levels than it was configured for.
    #[error("tree depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: u32, max: u32 },

    /// A zero subtree was requested beyond the supported range.
    #[error("zero subtree level {level} out of range (max {max})")]
    LevelOutOfRange { level: u32, max: u32 },

    /// Stack occupancy no longer mirrors the binary representation of the leaf count.
    ///
    /// This is a defect in the accumulator, never a consequence of caller input.
    #[error("merkle stack corrupted at level {level} after {leaves} leaves")]
    StackCorrupted { level: u32, leaves: u64 },
}
