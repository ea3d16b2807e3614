//! # Resiliso Hash Chain Module
//!
//! Builds and verifies the tamper-evident digest chain over padded blocks:
//!
//! ```text
//! digest[0] = SHA-256(pad(block[0]))
//! digest[i] = SHA-256(digest[i-1] || pad(block[i]))
//! ```
//!
//! Because every digest folds in its predecessor, a bit-flip, insertion, deletion or
//! reordering of block `i` changes `digest[j]` for every `j >= i` while leaving earlier
//! digests untouched.
//!
//! Verification is strictly sequential and stops at the first broken link: later
//! digests depend on the broken one and cannot be validated independently.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::constants::Digest;
use super::block_splitter::{Block, validate_block_size};
use super::super::utils::pad_block;
use anyhow::Result;
use sha2::{Digest as _, Sha256};

/// `SHA-256(prev || padded)`, with `prev` empty for the first block.
pub fn chain_digest(prev: Option<&Digest>, padded: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev {
        hasher.update(prev);
    }
    hasher.update(padded);
    hasher.finalize().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Missing,
    Mismatch,
}

/// The first position where the chain could not be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFault {
    pub index: usize,
    pub kind: FaultKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChain {
    pub block_size: usize,
    pub digests: Vec<Digest>,
}

impl HashChain {
    /// Hashes `blocks` in index order.
    pub fn build(blocks: &[Block], block_size: usize) -> Result<Self> {
        validate_block_size(block_size)?;

        let mut digests: Vec<Digest> = Vec::with_capacity(blocks.len());
        for block in blocks {
            let digest = chain_digest(digests.last(), &block.padded(block_size));
            digests.push(digest);
        }

        Ok(Self { block_size, digests })
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Recomputes the chain over `blocks` (unpadded, `None` for an absent block)
    /// and returns the first missing block or digest mismatch, whichever comes first.
    pub fn locate_fault(&self, blocks: &[Option<Vec<u8>>]) -> Option<ChainFault> {
        locate_fault(&self.digests, blocks, self.block_size)
    }
}

/// Sequential verification of `blocks` against `expected` digests.
///
/// A block list shorter than `expected` reports the first absent position as missing.
pub fn locate_fault(expected: &[Digest], blocks: &[Option<Vec<u8>>], block_size: usize) -> Option<ChainFault> {
    let mut prev: Option<Digest> = None;

    for (index, expected_digest) in expected.iter().enumerate() {
        let Some(Some(data)) = blocks.get(index) else {
            return Some(ChainFault { index, kind: FaultKind::Missing });
        };

        let digest = chain_digest(prev.as_ref(), &pad_block(data, block_size));
        if &digest != expected_digest {
            return Some(ChainFault { index, kind: FaultKind::Mismatch });
        }
        prev = Some(digest);
    }

    None
}

#[cfg(test)]
mod test {
    use super::super::block_splitter::split;
    use super::*;
    use sha2::Digest as _;

    fn stored(blocks: &[Block]) -> Vec<Option<Vec<u8>>> {
        blocks.iter().map(|b| Some(b.data.clone())).collect()
    }

    #[test]
    fn first_digest_has_no_predecessor() {
        let blocks = split(&[1, 2, 3], 4).unwrap();
        let chain = HashChain::build(&blocks, 4).unwrap();

        let expected: Digest = Sha256::digest([1u8, 2, 3, 0]).into();
        assert_eq!(chain.digests[0], expected);
    }

    #[test]
    fn intact_chain_has_no_fault() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let blocks = split(&payload, 4096).unwrap();
        let chain = HashChain::build(&blocks, 4096).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.locate_fault(&stored(&blocks)), None);
    }

    #[test]
    fn bit_flip_changes_only_later_digests() {
        let payload: Vec<u8> = (0..64u8).collect();
        let blocks = split(&payload, 8).unwrap();
        let original = HashChain::build(&blocks, 8).unwrap();

        for i in 0..blocks.len() {
            for bit in [0u8, 3, 7] {
                let mut tampered = blocks.clone();
                let len = tampered[i].data.len();
                tampered[i].data[bit as usize % len] ^= 1 << bit;
                let chain = HashChain::build(&tampered, 8).unwrap();

                for j in 0..blocks.len() {
                    if j < i {
                        assert_eq!(chain.digests[j], original.digests[j], "digest {j} changed for flip in {i}");
                    } else {
                        assert_ne!(chain.digests[j], original.digests[j], "digest {j} unchanged for flip in {i}");
                    }
                }
            }
        }
    }

    #[test]
    fn reordering_is_detected() {
        let payload: Vec<u8> = (0..32u8).collect();
        let blocks = split(&payload, 8).unwrap();
        let chain = HashChain::build(&blocks, 8).unwrap();

        let mut swapped = stored(&blocks);
        swapped.swap(1, 2);
        assert_eq!(
            chain.locate_fault(&swapped),
            Some(ChainFault { index: 1, kind: FaultKind::Mismatch })
        );
    }

    #[test]
    fn missing_block_reported_before_later_mismatch() {
        let payload: Vec<u8> = (0..32u8).collect();
        let blocks = split(&payload, 8).unwrap();
        let chain = HashChain::build(&blocks, 8).unwrap();

        let mut faulty = stored(&blocks);
        faulty[1] = None;
        faulty[3].as_mut().unwrap()[0] ^= 0xFF;
        assert_eq!(
            chain.locate_fault(&faulty),
            Some(ChainFault { index: 1, kind: FaultKind::Missing })
        );
    }

    #[test]
    fn stored_tail_block_verifies_without_padding() {
        let blocks = split(&[9u8; 10], 4).unwrap();
        let chain = HashChain::build(&blocks, 4).unwrap();

        let mut padded_tail = stored(&blocks);
        padded_tail[2] = Some(vec![9, 9, 0, 0]);
        assert_eq!(chain.locate_fault(&padded_tail), None);
    }
}
