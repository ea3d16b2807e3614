//! # Resiliso Manifest Module
//!
//! The manifest records the block size and, in index order, every block's file name
//! and expected chained digest. Entry order is significant: chain semantics depend
//! on position.
//!
//! ## Text Layout
//! ```text
//! blocksize=<N>
//! <block-file-name> <64 hex chars>
//! <block-file-name> <64 hex chars> <true length>    (short tail block only)
//! ```
//!
//! The optional third column carries the unpadded length of a short tail block so a
//! recovered tail can be trimmed back to its stored size.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::constants::{DIGEST_SIZE, Digest, MANIFEST_HEADER_KEY};
use super::super::resiliso_errors::ResilisoError;
use super::super::utils::is_plain_file_name;
use super::block_splitter::{Block, validate_block_size};
use super::hash_chain::HashChain;
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file_name: String,
    pub digest: Digest,
    pub length: Option<usize>, // only recorded when shorter than block_size
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub block_size: usize,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(blocks: &[Block], chain: &HashChain) -> Self {
        let entries = blocks
            .iter()
            .zip(&chain.digests)
            .map(|(block, digest)| ManifestEntry {
                file_name: block.file_name(),
                digest: *digest,
                length: (block.data.len() < chain.block_size).then_some(block.data.len()),
            })
            .collect();

        Self {
            block_size: chain.block_size,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn digests(&self) -> Vec<Digest> {
        self.entries.iter().map(|entry| entry.digest).collect()
    }

    /// Stored length of the block at `index`: the recorded tail length, else `block_size`.
    pub fn stored_length(&self, index: usize) -> usize {
        self.entries
            .get(index)
            .and_then(|entry| entry.length)
            .unwrap_or(self.block_size)
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().ok_or(ResilisoError::InvalidManifestHeader)?;
        let block_size = header
            .trim()
            .strip_prefix(MANIFEST_HEADER_KEY)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .ok_or(ResilisoError::InvalidManifestHeader)?;
        validate_block_size(block_size)?;

        let mut entries = Vec::new();
        for (number, line) in lines {
            let line_number = number + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 && fields.len() != 3 {
                return Err(ResilisoError::InvalidManifestEntry(line_number).into());
            }

            if !is_plain_file_name(fields[0]) {
                return Err(ResilisoError::UnsafeFileName(fields[0].to_string()).into());
            }

            let digest = parse_digest(fields[1]).ok_or(ResilisoError::InvalidDigest(line_number))?;
            let length = match fields.get(2) {
                Some(value) => {
                    let length = value
                        .parse::<usize>()
                        .map_err(|_| ResilisoError::InvalidManifestEntry(line_number))?;
                    if length > block_size {
                        return Err(ResilisoError::InvalidManifestEntry(line_number).into());
                    }
                    Some(length)
                }
                None => None,
            };

            entries.push(ManifestEntry {
                file_name: fields[0].to_string(),
                digest,
                length,
            });
        }

        Ok(Self { block_size, entries })
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{MANIFEST_HEADER_KEY}={}", self.block_size)?;
        for entry in &self.entries {
            write!(f, "{} {}", entry.file_name, hex::encode(entry.digest))?;
            if let Some(length) = entry.length {
                write!(f, " {length}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn parse_digest(text: &str) -> Option<Digest> {
    let bytes = hex::decode(text).ok()?;
    if bytes.len() != DIGEST_SIZE {
        return None;
    }
    bytes.try_into().ok()
}

#[cfg(test)]
mod test {
    use super::super::block_splitter::split;
    use super::*;

    fn sample() -> Manifest {
        let payload = vec![0xABu8; 10_000];
        let blocks = split(&payload, 4096).unwrap();
        let chain = HashChain::build(&blocks, 4096).unwrap();
        Manifest::new(&blocks, &chain)
    }

    #[test]
    fn text_layout() {
        let manifest = sample();
        let text = manifest.to_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "blocksize=4096");
        assert!(lines[1].starts_with("block_000.blk "));
        assert_eq!(lines[1].split(' ').nth(1).unwrap().len(), 64);
        assert_eq!(lines[2].split(' ').count(), 2);
        assert!(lines[3].starts_with("block_002.blk "));
        assert!(lines[3].ends_with(" 1808"));
    }

    #[test]
    fn parse_written_manifest() {
        let manifest = sample();
        let parsed = Manifest::from_text(&manifest.to_text()).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.stored_length(0), 4096);
        assert_eq!(parsed.stored_length(2), 1808);
    }

    #[test]
    fn empty_payload_manifest_is_header_only() {
        let blocks = split(&[], 4096).unwrap();
        let chain = HashChain::build(&blocks, 4096).unwrap();
        let manifest = Manifest::new(&blocks, &chain);
        assert_eq!(manifest.to_text(), "blocksize=4096\n");
        assert!(Manifest::from_text("blocksize=4096\n").unwrap().is_empty());
    }

    #[test]
    fn parse_accepts_two_column_lines() {
        let text = format!("blocksize=16\nblock_000.blk {}\n", "00".repeat(32));
        let manifest = Manifest::from_text(&text).unwrap();
        assert_eq!(manifest.entries[0].length, None);
        assert_eq!(manifest.stored_length(0), 16);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        let bad_header = Manifest::from_text("block=4096\n").unwrap_err();
        assert!(matches!(
            bad_header.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::InvalidManifestHeader)
        ));

        let zero = Manifest::from_text("blocksize=0\n").unwrap_err();
        assert!(matches!(
            zero.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::InvalidBlockSize(0))
        ));

        let short_digest = Manifest::from_text("blocksize=16\nblock_000.blk abcd\n").unwrap_err();
        assert!(matches!(
            short_digest.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::InvalidDigest(2))
        ));

        let zeros = "00".repeat(32);
        let escaping = format!("blocksize=16\nblock_000.blk {zeros}\n../escaped.blk {zeros}\n");
        let escaping = Manifest::from_text(&escaping).unwrap_err();
        assert!(matches!(
            escaping.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::UnsafeFileName(name)) if name == "../escaped.blk"
        ));

        let extra = format!("blocksize=16\nblock_000.blk {} 4 extra\n", "00".repeat(32));
        let extra = Manifest::from_text(&extra).unwrap_err();
        assert!(matches!(
            extra.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::InvalidManifestEntry(2))
        ));
    }
}
