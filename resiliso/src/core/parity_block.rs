//! # Resiliso ParityBlock Module
//!
//! A single `block_size` buffer holding the XOR of every padded block:
//!
//! ```text
//! parity = pad(block[0]) ^ pad(block[1]) ^ ... ^ pad(block[n-1])
//! ```
//!
//! XOR is commutative and associative, so accumulation order does not matter, and it
//! is its own inverse: any one block can be rebuilt as `parity ^ (all other blocks)`.
//! Only a single erasure per set is recoverable.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::resiliso_errors::ResilisoError;
use super::super::utils::xor_into;
use super::block_splitter::{Block, validate_block_size};
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityBlock {
    pub data: Vec<u8>, // exactly block_size bytes
}

impl ParityBlock {
    /// All-zero parity, the identity for accumulation.
    pub fn new(block_size: usize) -> Result<Self> {
        validate_block_size(block_size)?;
        Ok(Self { data: vec![0; block_size] })
    }

    pub fn from_blocks(blocks: &[Block], block_size: usize) -> Result<Self> {
        let mut parity = Self::new(block_size)?;
        for block in blocks {
            parity.accumulate(&block.data);
        }
        Ok(parity)
    }

    pub fn block_size(&self) -> usize {
        self.data.len()
    }

    /// `parity ^= pad(block)`. Padding bytes are zero and leave parity unchanged,
    /// so the unpadded block can be folded in directly.
    pub fn accumulate(&mut self, block: &[u8]) {
        xor_into(&mut self.data, block);
    }

    /// Rebuilds one erased block from parity and every other block.
    ///
    /// `others` must hold the content of all blocks except the erased one; with more
    /// than one erasure the result is silently wrong.
    pub fn reconstruct<'a, I>(&self, others: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut recovered = self.data.clone();
        for block in others {
            xor_into(&mut recovered, block);
        }
        recovered
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn from_bytes(data: &[u8], block_size: usize) -> Result<Self> {
        validate_block_size(block_size)?;
        if data.len() != block_size {
            return Err(ResilisoError::InvalidParityLength {
                expected: block_size,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self { data: data.to_vec() })
    }
}
