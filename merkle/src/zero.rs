// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::LazyLock;

use parking_lot::RwLock;
use tracing::trace;

use crate::{MAX_SUPPORTED_DEPTH, MerkleError, Node, ZERO_NODE, combine};

static SHARED: LazyLock<ZeroCache> = LazyLock::new(ZeroCache::new);

/// Lazily populated table of all-zero subtree roots, indexed by level
///
/// Level 0 is the zero leaf and level `k` is `combine(z[k - 1], z[k - 1])`.
/// Entries are a pure function of the level, so a table can be shared between
/// any number of accumulators and threads.
#[derive(Debug)]
pub struct ZeroCache {
    levels: RwLock<Vec<Node>>,
}

impl Default for ZeroCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ZeroCache {
    pub fn new() -> Self {
        Self {
            levels: RwLock::new(vec![ZERO_NODE]),
        }
    }

    /// Process-wide table used when no private table is supplied
    pub fn shared() -> &'static ZeroCache {
        &SHARED
    }

    /// Returns the root of an all-zero subtree covering `2^level` leaves
    pub fn get(&self, level: u32) -> Result<Node, MerkleError> {
        if level > MAX_SUPPORTED_DEPTH {
            return Err(MerkleError::LevelOutOfRange {
                level,
                max: MAX_SUPPORTED_DEPTH,
            });
        }
        let index = level as usize;

        if let Some(node) = self.levels.read().get(index) {
            return Ok(*node);
        }

        // Another writer may have extended the table while we waited for the lock
        let mut levels = self.levels.write();
        while levels.len() <= index {
            let below = levels[levels.len() - 1];
            levels.push(combine(&below, &below));
            trace!(level = levels.len() - 1, "extended zero subtree table");
        }
        Ok(levels[index])
    }

    /// Number of levels computed so far
    pub fn computed_levels(&self) -> usize {
        self.levels.read().len()
    }
}
