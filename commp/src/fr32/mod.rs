// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fr32 padding.
//!
//! Raw bytes are read as a little-endian bit stream and cut into 254-bit
//! groups. Each group becomes one 32-byte word whose two most significant bits
//! are zero, so the word is a valid BLS12-381 scalar. 127 raw bytes (1016 bits)
//! make exactly four words (128 bytes), after which the bit phase is back at zero.


use filecoin_commp_merkle::{FR32_MASK, NODE_SIZE, Node, ZERO_NODE};

/// Raw bytes consumed per padding period
pub const UNPADDED_QUAD: usize = 127;

/// Padded bytes produced per padding period
pub const PADDED_QUAD: usize = 128;

/// Leaves produced per padding period
pub const LEAVES_PER_QUAD: usize = PADDED_QUAD / NODE_SIZE;

/// Payload bits carried by one padded word
pub const WORD_BITS: usize = 254;

/// Pads one full quad of raw bytes
pub fn pad_quad(input: &[u8; UNPADDED_QUAD]) -> [u8; PADDED_QUAD] {
    let mut out = [0u8; PADDED_QUAD];

    // word 0: bits 0..254 are the first 31.75 bytes verbatim
    out[..31].copy_from_slice(&input[..31]);
    out[31] = input[31] & FR32_MASK;

    // word 1: shifted left by 2
    let mut carry = input[31] >> 6;
    for i in 32..64 {
        out[i] = (input[i] << 2) | carry;
        carry = input[i] >> 6;
    }
    out[63] &= FR32_MASK;

    // word 2: shifted left by 4
    carry = input[63] >> 4;
    for i in 64..96 {
        out[i] = (input[i] << 4) | carry;
        carry = input[i] >> 4;
    }
    out[95] &= FR32_MASK;

    // word 3: shifted left by 6
    carry = input[95] >> 2;
    for i in 96..127 {
        out[i] = (input[i] << 6) | carry;
        carry = input[i] >> 2;
    }
    out[127] = carry & FR32_MASK;

    out
}

/// Recovers the raw bytes of one padded quad, ignoring the padding bits
pub fn unpad_quad(padded: &[u8; PADDED_QUAD]) -> [u8; UNPADDED_QUAD] {
    let mut out = [0u8; UNPADDED_QUAD];
    for bit in 0..UNPADDED_QUAD * 8 {
        let src = (bit / WORD_BITS) * NODE_SIZE * 8 + bit % WORD_BITS;
        if padded[src / 8] >> (src % 8) & 1 == 1 {
            out[bit / 8] |= 1 << (bit % 8);
        }
    }
    out
}

/// Streaming Fr32 padder
///
/// Accepts raw bytes in chunks of any size and hands every completed 32-byte
/// word to a sink. The only state carried between calls is the partially
/// filled word and its bit offset, so chunk boundaries never affect the output.
#[derive(Debug, Clone)]
pub struct Fr32Padder {
    word: Node,
    bits: usize,
    consumed: u64,
}

impl Default for Fr32Padder {
    fn default() -> Self {
        Self::new()
    }
}

impl Fr32Padder {
    pub fn new() -> Self {
        Self {
            word: ZERO_NODE,
            bits: 0,
            consumed: 0,
        }
    }

    /// Total raw bytes consumed
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Payload bits held in the partially filled word
    pub fn pending_bits(&self) -> usize {
        self.bits
    }

    /// True when no partial word is pending, i.e. the input so far is a whole number of quads
    pub fn is_aligned(&self) -> bool {
        self.bits == 0
    }

    /// Pads `bytes`, passing each completed word to `emit` in stream order
    pub fn write<E>(
        &mut self,
        mut bytes: &[u8],
        mut emit: impl FnMut(Node) -> Result<(), E>,
    ) -> Result<(), E> {
        loop {
            if self.bits == 0 {
                if let Some((quad, rest)) = bytes.split_first_chunk::<UNPADDED_QUAD>() {
                    let padded = pad_quad(quad);
                    for word in padded.chunks_exact(NODE_SIZE) {
                        let mut leaf = ZERO_NODE;
                        leaf.copy_from_slice(word);
                        emit(leaf)?;
                    }
                    self.consumed += UNPADDED_QUAD as u64;
                    bytes = rest;
                    continue;
                }
            }

            let Some((&byte, rest)) = bytes.split_first() else {
                return Ok(());
            };
            self.push_byte(byte, &mut emit)?;
            bytes = rest;
        }
    }

    /// Completes the current quad with zero bytes, returning how many were added
    pub fn zero_fill<E>(&mut self, emit: impl FnMut(Node) -> Result<(), E>) -> Result<usize, E> {
        let partial = (self.consumed % UNPADDED_QUAD as u64) as usize;
        if partial == 0 {
            return Ok(0);
        }
        let missing = UNPADDED_QUAD - partial;
        self.write(&[0u8; UNPADDED_QUAD][..missing], emit)?;
        Ok(missing)
    }

    fn push_byte<E>(
        &mut self,
        byte: u8,
        emit: &mut impl FnMut(Node) -> Result<(), E>,
    ) -> Result<(), E> {
        let offset = self.bits;
        let (index, shift) = (offset / 8, offset % 8);
        self.word[index] |= byte << shift;
        if shift > 0 && index + 1 < NODE_SIZE {
            self.word[index + 1] |= byte >> (8 - shift);
        }
        self.consumed += 1;

        let filled = offset + 8;
        if filled < WORD_BITS {
            self.bits = filled;
            return Ok(());
        }

        // Bits that landed past the 254th belong to the next word
        let mut leaf = std::mem::replace(&mut self.word, ZERO_NODE);
        leaf[NODE_SIZE - 1] &= FR32_MASK;
        let spill = filled - WORD_BITS;
        if spill > 0 {
            self.word[0] = byte >> (8 - spill);
        }
        self.bits = spill;
        emit(leaf)
    }
}
