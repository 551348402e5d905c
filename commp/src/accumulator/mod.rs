// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

#[cfg(test)]
mod tests;

use std::fmt;
use std::io;
use std::sync::Arc;

use filecoin_commp_merkle::{MAX_SUPPORTED_DEPTH, MerkleStack, Node, ZeroCache};
use tracing::{debug, warn};

use crate::fr32::{Fr32Padder, UNPADDED_QUAD};
use crate::{CommPError, PaddedPieceSize, UnpaddedPieceSize};

/// Default maximum tree depth: a 64 GiB padded piece, the largest Filecoin sector
pub const DEFAULT_MAX_DEPTH: u32 = 31;

/// Smallest usable depth; a single quad already produces four leaves
pub const MIN_DEPTH: u32 = 2;

/// What `finalize` does with input that ends partway through a 127-byte quad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Fail with [`CommPError::UnalignedTail`]
    #[default]
    Reject,
    /// Complete the quad with zero bytes before building the tree
    ZeroFill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorConfig {
    /// Maximum tree depth; bounds the payload at `2^(max_depth - 2) * 127` bytes
    pub max_depth: u32,
    pub tail: TailPolicy,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            tail: TailPolicy::default(),
        }
    }
}

impl AccumulatorConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_tail(mut self, tail: TailPolicy) -> Self {
        self.tail = tail;
        self
    }

    pub fn validate(&self) -> Result<(), CommPError> {
        if !(MIN_DEPTH..=MAX_SUPPORTED_DEPTH).contains(&self.max_depth) {
            return Err(CommPError::UnsupportedDepth {
                depth: self.max_depth,
                min: MIN_DEPTH,
                max: MAX_SUPPORTED_DEPTH,
            });
        }
        Ok(())
    }

    /// Largest raw payload, in bytes, that fits in a tree of `max_depth` levels
    pub fn max_payload(&self) -> u64 {
        (1u64 << self.max_depth.saturating_sub(MIN_DEPTH)) * UNPADDED_QUAD as u64
    }
}

/// Finalized piece commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceCommitment {
    /// Root of the padded SHA2-254 tree
    pub comm_p: Node,
    /// Size of the padded tree's leaf layer
    pub padded_size: PaddedPieceSize,
    /// Raw bytes written by the caller, excluding any zero fill
    pub payload_size: u64,
}

impl PieceCommitment {
    pub fn unpadded_size(&self) -> UnpaddedPieceSize {
        self.padded_size.unpadded()
    }
}

impl fmt::Display for PieceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.comm_p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finalized,
}

/// Streaming piece commitment (commP) accumulator
///
/// Bytes written are Fr32-padded into leaves which are folded into a merkle
/// stack as they complete, so memory stays logarithmic in the input size. The
/// accumulator is a two-state machine: it accepts writes while open and is
/// spent by the first call to [`Accumulator::finalize`], whatever its outcome.
///
/// ```
/// use filecoin_commp::Accumulator;
///
/// let mut acc = Accumulator::new();
/// acc.write(&[0u8; 100])?;
/// acc.write(&[0u8; 154])?;
/// let commitment = acc.finalize()?;
/// assert_eq!(commitment.padded_size.get(), 256);
/// # Ok::<(), filecoin_commp::CommPError>(())
/// ```
#[derive(Debug)]
pub struct Accumulator {
    config: AccumulatorConfig,
    padder: Fr32Padder,
    stack: MerkleStack,
    zeros: Option<Arc<ZeroCache>>,
    state: State,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    /// Creates an accumulator with the default configuration
    pub fn new() -> Self {
        let config = AccumulatorConfig::default();
        Self {
            config,
            padder: Fr32Padder::new(),
            stack: MerkleStack::new(config.max_depth),
            zeros: None,
            state: State::Open,
        }
    }

    pub fn with_config(config: AccumulatorConfig) -> Result<Self, CommPError> {
        config.validate()?;
        Ok(Self {
            config,
            padder: Fr32Padder::new(),
            stack: MerkleStack::new(config.max_depth),
            zeros: None,
            state: State::Open,
        })
    }

    /// Like [`Accumulator::with_config`], but completes trees from a private zero table
    pub fn with_cache(config: AccumulatorConfig, zeros: Arc<ZeroCache>) -> Result<Self, CommPError> {
        let mut acc = Self::with_config(config)?;
        acc.zeros = Some(zeros);
        Ok(acc)
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }

    /// Raw bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.padder.bytes_consumed()
    }

    /// Padded leaves completed so far
    pub fn leaves(&self) -> u64 {
        self.stack.leaves()
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    /// Appends raw bytes to the piece
    ///
    /// A write that would take the payload past the configured maximum is
    /// rejected as a whole and leaves the accumulator unchanged.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), CommPError> {
        if self.state == State::Finalized {
            return Err(CommPError::WriteAfterFinalize);
        }

        let max = self.config.max_payload();
        let size = self
            .padder
            .bytes_consumed()
            .saturating_add(bytes.len() as u64);
        if size > max {
            return Err(CommPError::PayloadTooLarge { size, max });
        }

        let stack = &mut self.stack;
        self.padder.write(bytes, |leaf| stack.push_leaf(leaf))?;
        Ok(())
    }

    /// Completes the tree and returns the piece commitment
    ///
    /// The accumulator is finalized even when this fails; any further call
    /// to `write` or `finalize` is rejected.
    pub fn finalize(&mut self) -> Result<PieceCommitment, CommPError> {
        if self.state == State::Finalized {
            return Err(CommPError::AlreadyFinalized);
        }
        self.state = State::Finalized;

        let payload_size = self.padder.bytes_consumed();
        if payload_size == 0 {
            return Err(CommPError::EmptyInput);
        }

        if !self.padder.is_aligned() {
            match self.config.tail {
                TailPolicy::Reject => {
                    return Err(CommPError::UnalignedTail {
                        remainder: payload_size % UNPADDED_QUAD as u64,
                    });
                }
                TailPolicy::ZeroFill => {
                    let stack = &mut self.stack;
                    let filled = self.padder.zero_fill(|leaf| stack.push_leaf(leaf))?;
                    warn!(payload_size, filled, "zero-filled unaligned tail");
                }
            }
        }

        let zeros = self.zeros.as_deref().unwrap_or(ZeroCache::shared());
        let root = self.stack.finish(zeros)?;
        let padded_size = PaddedPieceSize::new(root.padded_size())?;
        debug!(
            payload_size,
            leaves = self.stack.leaves(),
            height = root.height,
            zero_fills = root.zero_fills,
            padded_size = padded_size.get(),
            "computed piece commitment"
        );

        Ok(PieceCommitment {
            comm_p: root.root,
            padded_size,
            payload_size,
        })
    }
}

impl io::Write for Accumulator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Accumulator::write(self, buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Computes the piece commitment of an in-memory payload with the default configuration
pub fn piece_commitment(bytes: &[u8]) -> Result<PieceCommitment, CommPError> {
    let mut acc = Accumulator::new();
    acc.write(bytes)?;
    acc.finalize()
}
