// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;
use std::fmt;

use crate::CommPError;
use crate::fr32::{PADDED_QUAD, UNPADDED_QUAD};

/// Size of a padded piece: a power of two, at least one quad (128 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaddedPieceSize(u64);

/// Size of the payload a padded piece can carry: `padded / 128 * 127`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnpaddedPieceSize(u64);

impl PaddedPieceSize {
    pub const MIN: u64 = PADDED_QUAD as u64;

    pub fn new(size: u64) -> Result<Self, CommPError> {
        if size < Self::MIN {
            return Err(CommPError::InvalidPieceSize(Cow::Owned(format!(
                "padded size {} is below the minimum of {}",
                size,
                Self::MIN
            ))));
        }
        if !size.is_power_of_two() {
            return Err(CommPError::InvalidPieceSize(Cow::Owned(format!(
                "padded size {} is not a power of two",
                size
            ))));
        }
        Ok(Self(size))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn unpadded(self) -> UnpaddedPieceSize {
        UnpaddedPieceSize(self.0 / PADDED_QUAD as u64 * UNPADDED_QUAD as u64)
    }
}

impl UnpaddedPieceSize {
    pub fn new(size: u64) -> Result<Self, CommPError> {
        if size % UNPADDED_QUAD as u64 != 0 {
            return Err(CommPError::InvalidPieceSize(Cow::Owned(format!(
                "unpadded size {} is not a multiple of {}",
                size, UNPADDED_QUAD
            ))));
        }
        PaddedPieceSize::new(size / UNPADDED_QUAD as u64 * PADDED_QUAD as u64)
            .map(PaddedPieceSize::unpadded)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn padded(self) -> PaddedPieceSize {
        PaddedPieceSize(self.0 / UNPADDED_QUAD as u64 * PADDED_QUAD as u64)
    }
}

impl fmt::Display for PaddedPieceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for UnpaddedPieceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
