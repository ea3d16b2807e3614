//! # Resiliso Redundancy Set Module
//!
//! This module persists and repairs a redundancy set: the block files, the manifest
//! and the parity file that protect one payload against a single corrupted or
//! missing block.
//!
//! ## Key Responsibilities
//! - Encode a payload into blocks, chain digests and parity, and write them to a directory
//! - Open an existing set through its manifest (the immutable oracle)
//! - Verify the on-disk blocks against the chain without writing anything
//! - Recover the first missing/corrupted block from parity and the other blocks
//! - Simulate bit-rot by flipping bytes in a stored block
//!
//! ## Directory Layout
//! ```text
//! <dir>/block_000.blk ... block_NNN.blk   raw unpadded block bytes
//! <dir>/manifest.txt                      blocksize + (name, chained digest) per block
//! <dir>/parity.bin                        XOR of all padded blocks, blocksize bytes
//! ```
//!
//! ## Limitations
//! Only one erasure per set can be repaired. With two or more faulty blocks the
//! reconstruction is wrong; the set is re-verified after every repair and the report
//! says so instead of claiming success.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{BLOCK_PREFIX, BLOCK_SUFFIX, CORRUPTION_SPAN, MANIFEST_FILE, PARITY_FILE};
use crate::core::block_splitter::{Block, split};
use crate::core::hash_chain::{ChainFault, FaultKind, HashChain, locate_fault};
use crate::core::manifest::Manifest;
use crate::core::parity_block::ParityBlock;
use crate::resiliso_errors::ResilisoError;
use crate::utils::{read_optional, write_file};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Blocks, chain manifest and parity computed from one payload, before they touch disk.
#[derive(Debug, Clone)]
pub struct EncodedSet {
    pub blocks: Vec<Block>,
    pub manifest: Manifest,
    pub parity: ParityBlock,
}

impl EncodedSet {
    pub fn encode(payload: &[u8], block_size: usize) -> Result<Self> {
        let blocks = split(payload, block_size)?;
        let chain = HashChain::build(&blocks, block_size)?;
        let manifest = Manifest::new(&blocks, &chain);
        let parity = ParityBlock::from_blocks(&blocks, block_size)?;

        Ok(Self { blocks, manifest, parity })
    }

    /// Every artifact as `(file name, content)`: blocks in index order, then the
    /// manifest and the parity file.
    pub fn artifacts(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = self
            .blocks
            .iter()
            .map(|block| (block.file_name(), block.data.clone()))
            .collect();
        files.push((MANIFEST_FILE.to_string(), self.manifest.to_text().into_bytes()));
        files.push((PARITY_FILE.to_string(), self.parity.to_bytes()));
        files
    }

    /// Total size of `artifacts()` without copying any of them.
    pub fn artifact_bytes(&self) -> usize {
        self.blocks.iter().map(|block| block.data.len()).sum::<usize>()
            + self.manifest.to_text().len()
            + self.parity.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryReport {
    /// Every block verified; nothing was written.
    Clean,
    Recovered {
        index: usize,
        kind: FaultKind,
        path: PathBuf,
        /// Whether the whole chain verifies after the repair. `false` means more
        /// than one block was faulty and the rebuilt content is not trustworthy.
        verified: bool,
    },
}

#[derive(Debug, Clone)]
pub struct RedundancySet {
    pub dir: PathBuf,
    pub manifest: Manifest,
}

impl RedundancySet {
    /// Encodes `payload` and writes blocks, manifest and parity into `dir`.
    /// Stale block files left by an earlier build are removed first.
    pub fn write<P: AsRef<Path>>(dir: P, payload: &[u8], block_size: usize) -> Result<Self> {
        let encoded = EncodedSet::encode(payload, block_size)?;
        Self::write_encoded(dir, &encoded)
    }

    pub fn write_encoded<P: AsRef<Path>>(dir: P, encoded: &EncodedSet) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        remove_stale_blocks(&dir)?;

        for (name, data) in encoded.artifacts() {
            write_file(dir.join(&name), &data)?;
            debug!(file = %name, bytes = data.len(), "wrote redundancy artifact");
        }

        info!(
            blocks = encoded.blocks.len(),
            block_size = encoded.manifest.block_size,
            dir = %dir.display(),
            "stored redundancy set"
        );

        Ok(Self {
            dir,
            manifest: encoded.manifest.clone(),
        })
    }

    /// Opens an existing set. A missing manifest is fatal: without it neither the
    /// expected digests nor the block order are known.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let manifest_path = dir.join(MANIFEST_FILE);
        let Some(text) = read_optional(&manifest_path)? else {
            return Err(ResilisoError::ManifestMissing(manifest_path).into());
        };
        let text = String::from_utf8(text).with_context(|| format!("decoding {}", manifest_path.display()))?;
        let manifest = Manifest::from_text(&text)?;

        Ok(Self { dir, manifest })
    }

    pub fn block_path(&self, index: usize) -> Option<PathBuf> {
        self.manifest.entries.get(index).map(|entry| self.dir.join(&entry.file_name))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn parity_path(&self) -> PathBuf {
        self.dir.join(PARITY_FILE)
    }

    /// Loads the parity file. A missing parity file is fatal for recovery.
    pub fn load_parity(&self) -> Result<ParityBlock> {
        let path = self.parity_path();
        let Some(data) = read_optional(&path)? else {
            return Err(ResilisoError::ParityMissing(path).into());
        };
        ParityBlock::from_bytes(&data, self.manifest.block_size)
    }

    /// Current on-disk content of every block named in the manifest, `None` when absent.
    pub fn read_blocks(&self) -> Result<Vec<Option<Vec<u8>>>> {
        self.manifest
            .entries
            .iter()
            .map(|entry| read_optional(self.dir.join(&entry.file_name)))
            .collect()
    }

    /// Re-derives the chain and reports the first missing or mismatching block.
    pub fn verify(&self) -> Result<Option<ChainFault>> {
        let blocks = self.read_blocks()?;
        let fault = locate_fault(&self.manifest.digests(), &blocks, self.manifest.block_size);
        if let Some(fault) = fault {
            warn!(index = fault.index, kind = ?fault.kind, "redundancy set is damaged");
        }
        Ok(fault)
    }

    /// Like `verify`, but a damaged set is an error carrying the faulty index.
    pub fn ensure_intact(&self) -> Result<()> {
        match self.verify()? {
            Some(fault) => Err(ResilisoError::ChainMismatch(fault.index).into()),
            None => Ok(()),
        }
    }

    /// Locates the first faulty block and rebuilds it as
    /// `parity ^ (every other block)`, then re-verifies the set.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let parity = self.load_parity()?;
        let block_size = self.manifest.block_size;
        let digests = self.manifest.digests();
        let blocks = self.read_blocks()?;

        let Some(fault) = locate_fault(&digests, &blocks, block_size) else {
            info!("no corruption detected");
            return Ok(RecoveryReport::Clean);
        };
        warn!(index = fault.index, kind = ?fault.kind, "rebuilding block from parity");

        // blocks after the fault are trusted for their raw content only
        let others = blocks
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != fault.index)
            .filter_map(|(_, block)| block.as_deref());
        let mut recovered = parity.reconstruct(others);
        recovered.truncate(self.manifest.stored_length(fault.index));

        let path = self.dir.join(&self.manifest.entries[fault.index].file_name);
        write_file(&path, &recovered)?;

        let verified = locate_fault(&digests, &self.read_blocks()?, block_size).is_none();
        if verified {
            info!(index = fault.index, path = %path.display(), "recovered block");
        } else {
            warn!(
                index = fault.index,
                path = %path.display(),
                "rebuilt block does not verify; more than one block is damaged"
            );
        }

        Ok(RecoveryReport::Recovered {
            index: fault.index,
            kind: fault.kind,
            path,
            verified,
        })
    }

    /// Flips the bytes of block `index` starting at its midpoint, leaving manifest
    /// and parity untouched.
    pub fn corrupt_block(&self, index: usize) -> Result<PathBuf> {
        let count = self.manifest.len();
        let Some(path) = self.block_path(index) else {
            return Err(ResilisoError::BlockIndexOutOfRange { index, count }.into());
        };

        let mut data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        if data.is_empty() {
            return Err(ResilisoError::EmptyBlock(index).into());
        }

        let mid = data.len() / 2;
        let end = (mid + CORRUPTION_SPAN).min(data.len());
        for byte in &mut data[mid..end] {
            *byte ^= 0xFF;
        }
        write_file(&path, &data)?;

        warn!(index, path = %path.display(), bytes = end - mid, "corrupted block");
        Ok(path)
    }
}

fn remove_stale_blocks(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(BLOCK_PREFIX) && name.ends_with(BLOCK_SUFFIX) && entry.file_type()?.is_file() {
            fs::remove_file(entry.path()).with_context(|| format!("removing {}", entry.path().display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn sample_payload() -> Vec<u8> {
        (0..10_000u32).map(|i| (i * 31 % 256) as u8).collect()
    }

    #[test]
    fn write_creates_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();

        assert_eq!(set.manifest.len(), 3);
        for name in ["block_000.blk", "block_001.blk", "block_002.blk", "manifest.txt", "parity.bin"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        assert_eq!(fs::read(dir.path().join("block_002.blk")).unwrap().len(), 1808);
        assert_eq!(fs::read(dir.path().join("parity.bin")).unwrap().len(), 4096);
        assert_eq!(set.verify().unwrap(), None);
    }

    #[test]
    fn artifact_bytes_matches_artifacts() {
        let encoded = EncodedSet::encode(&sample_payload(), 4096).unwrap();
        let total: usize = encoded.artifacts().iter().map(|(_, data)| data.len()).sum();
        assert_eq!(encoded.artifact_bytes(), total);
        assert_eq!(EncodedSet::encode(&[], 512).unwrap().artifact_bytes(), "blocksize=512\n".len() + 512);
    }

    #[test]
    fn rewrite_removes_stale_blocks() {
        let dir = TempDir::new().unwrap();
        RedundancySet::write(dir.path(), &sample_payload(), 1024).unwrap();
        assert!(dir.path().join("block_009.blk").exists());

        RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        assert!(!dir.path().join("block_009.blk").exists());
        assert!(dir.path().join("block_002.blk").exists());
    }

    #[test]
    fn open_requires_manifest() {
        let dir = TempDir::new().unwrap();
        let err = RedundancySet::open(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::ManifestMissing(_))
        ));
    }

    #[test]
    fn open_rejects_names_outside_the_directory() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        let text = fs::read_to_string(set.manifest_path()).unwrap();
        fs::write(set.manifest_path(), text.replace("block_001.blk", "../escaped.blk")).unwrap();

        let err = RedundancySet::open(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::UnsafeFileName(name)) if name == "../escaped.blk"
        ));
        assert!(!dir.path().parent().unwrap().join("escaped.blk").exists());
    }

    #[test]
    fn recover_requires_parity() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        fs::remove_file(set.parity_path()).unwrap();

        let err = set.recover().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::ParityMissing(_))
        ));
    }

    #[test]
    fn recover_clean_set_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        let before: Vec<_> = (0..3).map(|i| fs::metadata(set.block_path(i).unwrap()).unwrap().modified().unwrap()).collect();

        assert_eq!(set.recover().unwrap(), RecoveryReport::Clean);
        assert_eq!(set.recover().unwrap(), RecoveryReport::Clean);

        let after: Vec<_> = (0..3).map(|i| fs::metadata(set.block_path(i).unwrap()).unwrap().modified().unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn recover_every_single_corruption() {
        let payload = sample_payload();
        for index in 0..3 {
            let dir = TempDir::new().unwrap();
            let set = RedundancySet::write(dir.path(), &payload, 4096).unwrap();
            let original = fs::read(set.block_path(index).unwrap()).unwrap();

            set.corrupt_block(index).unwrap();
            assert_ne!(fs::read(set.block_path(index).unwrap()).unwrap(), original);

            let report = set.recover().unwrap();
            assert!(matches!(
                report,
                RecoveryReport::Recovered { index: i, kind: FaultKind::Mismatch, verified: true, .. } if i == index
            ));
            assert_eq!(fs::read(set.block_path(index).unwrap()).unwrap(), original);
        }
    }

    #[test]
    fn recover_deleted_tail_block_to_stored_length() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        let original = fs::read(set.block_path(2).unwrap()).unwrap();
        fs::remove_file(set.block_path(2).unwrap()).unwrap();

        let report = set.recover().unwrap();
        assert!(matches!(
            report,
            RecoveryReport::Recovered { index: 2, kind: FaultKind::Missing, verified: true, .. }
        ));
        assert_eq!(fs::read(set.block_path(2).unwrap()).unwrap(), original);
    }

    #[test]
    fn double_fault_is_not_reported_as_verified() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();
        set.corrupt_block(0).unwrap();
        set.corrupt_block(1).unwrap();

        assert!(matches!(
            set.ensure_intact().unwrap_err().downcast_ref::<ResilisoError>(),
            Some(ResilisoError::ChainMismatch(0))
        ));

        let report = set.recover().unwrap();
        assert!(matches!(report, RecoveryReport::Recovered { index: 0, verified: false, .. }));
        assert!(set.verify().unwrap().is_some());
    }

    #[test]
    fn corrupt_rejects_bad_index_and_empty_block() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &sample_payload(), 4096).unwrap();

        let err = set.corrupt_block(3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResilisoError>(),
            Some(ResilisoError::BlockIndexOutOfRange { index: 3, count: 3 })
        ));

        fs::write(set.block_path(1).unwrap(), b"").unwrap();
        let err = set.corrupt_block(1).unwrap_err();
        assert!(matches!(err.downcast_ref::<ResilisoError>(), Some(ResilisoError::EmptyBlock(1))));
    }

    #[test]
    fn corrupt_flips_bytes_at_midpoint() {
        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &[0u8; 100], 4096).unwrap();
        set.corrupt_block(0).unwrap();

        let data = fs::read(set.block_path(0).unwrap()).unwrap();
        for (i, byte) in data.iter().enumerate() {
            let expected = if (50..58).contains(&i) { 0xFF } else { 0x00 };
            assert_eq!(*byte, expected, "byte {i}");
        }
    }
}
