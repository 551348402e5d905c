// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Merkle tree implementation matching Filecoin's piece commitment tree
//!
//! Nodes are 32-byte little-endian field elements. Internal nodes are
//! `SHA2-256(left || right)` with the two most significant bits of the last
//! byte cleared ("SHA2-254"), so every node stays below the BLS12-381 scalar
//! field modulus. Trees are padded on the right with all-zero subtrees up to
//! the next power of two.
//!
//! The tree is built incrementally with [`MerkleStack`], which keeps at most one
//! pending node per level, so memory stays logarithmic in the number of leaves.


mod error;
mod stack;
mod zero;

use sha2::{Digest, Sha256};

pub use error::MerkleError;
pub use stack::{MerkleStack, StackRoot};
pub use zero::ZeroCache;

/// 32-byte tree node (a leaf or the root of a subtree)
pub type Node = [u8; 32];

/// Size of a node in bytes
pub const NODE_SIZE: usize = 32;

/// Zero node (32 zero bytes), the leaf used to pad incomplete trees
pub const ZERO_NODE: Node = [0u8; 32];

/// Mask applied to the most significant byte of a node to keep it below the field modulus
pub const FR32_MASK: u8 = 0b0011_1111;

/// Largest tree depth whose padded size (`32 << depth`) still fits in a `u64`
pub const MAX_SUPPORTED_DEPTH: u32 = 58;

/// Combines two sibling nodes into their parent: `trunc254(SHA2-256(left || right))`
pub fn combine(left: &Node, right: &Node) -> Node {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let result = hasher.finalize();
    let mut digest = ZERO_NODE;
    digest.copy_from_slice(&result);
    digest[NODE_SIZE - 1] &= FR32_MASK;
    digest
}

/// Returns true if the two most significant bits of the node are clear
pub fn is_field_constrained(node: &Node) -> bool {
    node[NODE_SIZE - 1] & !FR32_MASK == 0
}

/// Computes the root of a tree over a complete list of leaves, using the shared zero table
///
/// This is a convenience over [`MerkleStack`] for callers that already hold every leaf.
pub fn tree(leaves: &[Node]) -> Result<StackRoot, MerkleError> {
    let depth = calculate_depth(leaves.len());
    if depth > MAX_SUPPORTED_DEPTH {
        return Err(MerkleError::DepthExceeded {
            depth,
            max: MAX_SUPPORTED_DEPTH,
        });
    }

    let mut stack = MerkleStack::new(depth);
    for leaf in leaves {
        stack.push_leaf(*leaf)?;
    }
    stack.finish(ZeroCache::shared())
}

/// Calculates the depth of the smallest complete tree holding `length` leaves
fn calculate_depth(length: usize) -> u32 {
    if length <= 1 {
        return 0;
    }

    let bits_len = (length - 1).leading_zeros();
    usize::BITS - bits_len
}
