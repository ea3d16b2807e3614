//! # Resiliso Error Definitions Module
//!
//! This module defines all the structured errors used across the redundancy engine
//! and the disc image assembler. It centralizes the failure cases into a single enum
//! (`ResilisoError`) so callers can match on them after propagation through
//! `anyhow::Result`.
//!
//! ## Example
//! ```rust
//! use resiliso::prelude::ResilisoError;
//!
//! fn validate_block_size(block_size: usize) -> Result<(), ResilisoError> {
//!     if block_size == 0 {
//!         return Err(ResilisoError::InvalidBlockSize(block_size));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Categories
//! - **Configuration Errors**: block size, block index, volume identifier, free space
//! - **Integrity Errors**: chain mismatch (recoverable, triggers recovery)
//! - **Unrecoverable Errors**: missing manifest or parity
//! - **Manifest Format Errors**: malformed header, entry or digest
//! - **Format-Assembly Errors**: extent bounds/overlap and field overflows; these are
//!   programming errors and abort image construction
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResilisoError {
    #[error("Invalid block size {0}: must be greater than zero")]
    InvalidBlockSize(usize),

    #[error("Block index {index} out of range ({count} blocks)")]
    BlockIndexOutOfRange { index: usize, count: usize },

    #[error("Block {0} is empty, nothing to corrupt")]
    EmptyBlock(usize),

    #[error("Invalid volume identifier {0:?}: expected 1..=32 ISO d-characters")]
    InvalidVolumeId(String),

    #[error("Invalid file identifier {0:?}")]
    InvalidFileIdentifier(String),

    #[error("File name {0:?} is not a plain name inside the target directory")]
    UnsafeFileName(String),

    #[error("Boot image is empty")]
    EmptyBootImage,

    #[error("Not enough free space at {path:?}: need {needed} bytes, {available} available")]
    InsufficientSpace { path: PathBuf, needed: u64, available: u64 },

    #[error("Chain digest mismatch at block {0}")]
    ChainMismatch(usize),

    #[error("Manifest missing at {0:?}")]
    ManifestMissing(PathBuf),

    #[error("Parity file missing at {0:?}")]
    ParityMissing(PathBuf),

    #[error("Parity length {actual} does not match block size {expected}")]
    InvalidParityLength { expected: usize, actual: usize },

    #[error("Manifest header must be `blocksize=<N>`")]
    InvalidManifestHeader,

    #[error("Invalid manifest entry on line {0}")]
    InvalidManifestEntry(usize),

    #[error("Invalid digest on manifest line {0}")]
    InvalidDigest(usize),

    #[error("Extent at LBA {lba} ({sectors} sectors) exceeds the volume of {total} sectors")]
    ExtentOutOfBounds { lba: u32, sectors: u32, total: u32 },

    #[error("Extent at LBA {lba} overlaps an extent already written at LBA {existing}")]
    ExtentOverlap { lba: u32, existing: u32 },

    #[error("Value {value} does not fit the {field} field")]
    FieldOverflow { field: &'static str, value: u64 },

    #[error("Directory record for {0:?} exceeds one sector")]
    DirectoryRecordTooLong(String),

    #[error("Unexpected volume descriptor at LBA {0}")]
    DescriptorMismatch(u32),
}
