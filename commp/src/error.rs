// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use filecoin_commp_merkle::MerkleError;
use thiserror::Error;

/// Broad classification of a [`CommPError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller drove the accumulator through an illegal sequence of calls
    Usage,
    /// The input does not fit the configured accumulator
    Configuration,
    /// Internal state is inconsistent; this is a bug, not a recoverable condition
    Invariant,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommPError {
    #[error("write after finalize")]
    WriteAfterFinalize,

    #[error("accumulator already finalized")]
    AlreadyFinalized,

    /// Error when finalizing without ever having written a byte.
    #[error("commP is not defined for empty input")]
    EmptyInput,

    /// Error when the payload ends partway through a 127-byte quad.
    #[error("{remainder} trailing bytes do not complete a 127-byte quad")]
    UnalignedTail { remainder: u64 },

    #[error("unsupported tree depth {depth}: must be within {min}..={max}")]
    UnsupportedDepth { depth: u32, min: u32, max: u32 },

    /// Error when a write would take the payload past what the configured depth can hold.
    #[error("payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("invalid piece size: {0}")]
    InvalidPieceSize(Cow<'static, str>),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),
}

impl CommPError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommPError::WriteAfterFinalize
            | CommPError::AlreadyFinalized
            | CommPError::EmptyInput
            | CommPError::UnalignedTail { .. } => ErrorKind::Usage,
            CommPError::UnsupportedDepth { .. }
            | CommPError::PayloadTooLarge { .. }
            | CommPError::InvalidPieceSize(_) => ErrorKind::Configuration,
            CommPError::Merkle(MerkleError::DepthExceeded { .. }) => ErrorKind::Configuration,
            CommPError::Merkle(MerkleError::EmptyTree) => ErrorKind::Usage,
            CommPError::Merkle(_) => ErrorKind::Invariant,
        }
    }
}
