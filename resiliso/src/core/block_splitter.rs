//! # Resiliso Block Splitter Module
//!
//! Divides a payload into fixed-size blocks, the unit of hashing, parity and recovery.
//!
//! Each `Block` keeps only the bytes actually taken from the payload: the last block
//! of a payload whose length is not a multiple of the block size is shorter than
//! `block_size`. Zero padding is applied virtually through [`Block::padded`] wherever
//! hashing or parity needs exactly `block_size` bytes.
//!
//! ## Layout
//! ```text
//! payload: [ block 0 (B) | block 1 (B) | ... | block n-1 (<= B) ]
//! padded : [ block 0 (B) | block 1 (B) | ... | block n-1 + zeros (B) ]
//! ```
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::constants::{BLOCK_PREFIX, BLOCK_SUFFIX};
use super::super::resiliso_errors::ResilisoError;
use super::super::utils::pad_block;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub data: Vec<u8>, // unpadded bytes, as stored on disk
}

impl Block {
    pub fn new(index: usize, data: &[u8]) -> Self {
        Self { index, data: data.to_vec() }
    }

    /// Block content zero-padded to `block_size`.
    pub fn padded(&self, block_size: usize) -> Vec<u8> {
        pad_block(&self.data, block_size)
    }

    pub fn file_name(&self) -> String {
        block_file_name(self.index)
    }
}

/// File name of the block at `index`: `block_000.blk`, `block_001.blk`, ...
pub fn block_file_name(index: usize) -> String {
    format!("{BLOCK_PREFIX}{index:03}{BLOCK_SUFFIX}")
}

pub fn validate_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(ResilisoError::InvalidBlockSize(block_size).into());
    }
    Ok(())
}

/// Splits `payload` into `ceil(len / block_size)` blocks. An empty payload yields no blocks.
pub fn split(payload: &[u8], block_size: usize) -> Result<Vec<Block>> {
    validate_block_size(block_size)?;

    let blocks = payload
        .chunks(block_size)
        .enumerate()
        .map(|(index, chunk)| Block::new(index, chunk))
        .collect();

    Ok(blocks)
}

/// Concatenates blocks in index order and trims the result to `length` bytes.
pub fn join(blocks: &[Block], block_size: usize, length: usize) -> Vec<u8> {
    let mut ordered: Vec<&Block> = blocks.iter().collect();
    ordered.sort_by_key(|block| block.index);

    let mut payload = Vec::with_capacity(ordered.len() * block_size);
    for block in ordered {
        payload.extend_from_slice(&block.padded(block_size));
    }
    payload.truncate(length);
    payload
}
