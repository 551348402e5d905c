// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tracing::trace;

use crate::{MAX_SUPPORTED_DEPTH, MerkleError, NODE_SIZE, Node, ZeroCache, combine};

/// Root produced by [`MerkleStack::finish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRoot {
    /// Root of the padded tree
    pub root: Node,
    /// Level of the root; the padded tree holds `2^height` leaves
    pub height: u32,
    /// Number of zero subtrees spliced in to complete the tree
    pub zero_fills: u32,
}

impl StackRoot {
    /// Size in bytes of the padded tree's leaf layer
    pub fn padded_size(&self) -> u64 {
        (NODE_SIZE as u64) << self.height
    }
}

/// Incremental merkle tree builder with one pending node per level
///
/// Pushing a leaf behaves like incrementing a binary counter: a node arriving
/// at an occupied level is merged with the older node (older on the left) and
/// the result carries into the next level. The occupied levels therefore
/// always spell out the number of leaves pushed so far.
#[derive(Debug, Clone)]
pub struct MerkleStack {
    slots: Vec<Option<Node>>,
    leaves: u64,
    max_depth: u32,
}

impl MerkleStack {
    /// Creates an empty stack able to hold up to `2^max_depth` leaves
    ///
    /// Depths above [`MAX_SUPPORTED_DEPTH`] are capped to it.
    pub fn new(max_depth: u32) -> Self {
        let max_depth = max_depth.min(MAX_SUPPORTED_DEPTH);
        Self {
            slots: vec![None; max_depth as usize + 1],
            leaves: 0,
            max_depth,
        }
    }

    /// Maximum number of leaves this stack accepts
    pub fn capacity(&self) -> u64 {
        1u64 << self.max_depth
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of leaves pushed so far
    pub fn leaves(&self) -> u64 {
        self.leaves
    }

    /// Height of the smallest complete tree covering the leaves pushed so far
    pub fn height(&self) -> u32 {
        self.leaves.next_power_of_two().trailing_zeros()
    }

    /// Pending node at `level`, if any
    pub fn pending(&self, level: u32) -> Option<&Node> {
        self.slots.get(level as usize).and_then(Option::as_ref)
    }

    /// Appends a leaf and merges completed subtrees upwards
    pub fn push_leaf(&mut self, leaf: Node) -> Result<(), MerkleError> {
        if self.leaves >= self.capacity() {
            return Err(MerkleError::DepthExceeded {
                depth: self.max_depth + 1,
                max: self.max_depth,
            });
        }

        let leaves = self.leaves;
        let mut node = leaf;
        let mut level = 0;
        loop {
            let slot = self
                .slots
                .get_mut(level)
                .ok_or(MerkleError::StackCorrupted {
                    level: level as u32,
                    leaves,
                })?;
            match slot.take() {
                Some(left) => {
                    node = combine(&left, &node);
                    level += 1;
                }
                None => {
                    *slot = Some(node);
                    break;
                }
            }
        }
        self.leaves += 1;
        Ok(())
    }

    /// Verifies that occupied levels match the binary representation of the leaf count
    pub fn check_invariants(&self) -> Result<(), MerkleError> {
        for (level, slot) in self.slots.iter().enumerate() {
            let expected = (self.leaves >> level) & 1 == 1;
            if slot.is_some() != expected {
                return Err(MerkleError::StackCorrupted {
                    level: level as u32,
                    leaves: self.leaves,
                });
            }
        }
        Ok(())
    }

    /// Completes the tree with zero subtrees and returns its root
    ///
    /// Pending nodes are folded from the lowest level up. A pending node with
    /// nothing to its right is paired with the zero subtree of its level, and
    /// real data is never reordered. With a power-of-two leaf count the root is
    /// already on the stack and no zero subtree is used.
    pub fn finish(&self, zeros: &ZeroCache) -> Result<StackRoot, MerkleError> {
        if self.leaves == 0 {
            return Err(MerkleError::EmptyTree);
        }
        self.check_invariants()?;

        let height = self.height();
        if self.leaves.is_power_of_two() {
            let root = self.pending(height).ok_or(MerkleError::StackCorrupted {
                level: height,
                leaves: self.leaves,
            })?;
            return Ok(StackRoot {
                root: *root,
                height,
                zero_fills: 0,
            });
        }

        let mut zero_fills = 0;
        let mut carry: Option<Node> = None;
        for (level, slot) in self.slots.iter().enumerate().take(height as usize) {
            carry = match (slot, carry) {
                (Some(left), Some(right)) => Some(combine(left, &right)),
                (Some(left), None) => {
                    zero_fills += 1;
                    Some(combine(left, &zeros.get(level as u32)?))
                }
                (None, Some(left)) => {
                    zero_fills += 1;
                    Some(combine(&left, &zeros.get(level as u32)?))
                }
                (None, None) => None,
            };
        }

        let root = carry.ok_or(MerkleError::EmptyTree)?;
        trace!(leaves = self.leaves, height, zero_fills, "folded merkle stack");
        Ok(StackRoot {
            root,
            height,
            zero_fills,
        })
    }
}
