//! # Resiliso Constants Module
//!
//! This file contains the core constants used throughout the redundancy engine
//! and the disc image assembler. Every fixed offset, sector address and file name
//! lives here so that layout changes touch a single place.
//!
//! The digest primitive is isolated behind `DIGEST_SIZE` / `Digest` so it can be
//! swapped for another 256-bit hash without touching the chain logic.
//!
//! ## Purpose
//! - Centralize on-disk layout definitions (ISO 9660 + El Torito)
//! - Centralize redundancy artifact naming
//! - Keep magic numbers out of the encoders
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

pub const DIGEST_SIZE: usize = 32;
pub type Digest = [u8; DIGEST_SIZE];

pub const DEFAULT_BLOCK_SIZE: usize = 4096;

pub const MANIFEST_FILE: &str = "manifest.txt";
pub const PARITY_FILE: &str = "parity.bin";
pub const BLOCK_PREFIX: &str = "block_";
pub const BLOCK_SUFFIX: &str = ".blk";
pub const MANIFEST_HEADER_KEY: &str = "blocksize";

// bytes flipped by the corruption simulator, starting at the block midpoint
pub const CORRUPTION_SPAN: usize = 8;

pub const SECTOR_SIZE: usize = 2048;
pub const SYSTEM_AREA_SECTORS: u32 = 16;

pub const PVD_LBA: u32 = 16;
pub const BOOT_RECORD_LBA: u32 = 17;
pub const TERMINATOR_LBA: u32 = 18;
pub const L_PATH_TABLE_LBA: u32 = 19;
pub const M_PATH_TABLE_LBA: u32 = 20;
pub const BOOT_CATALOG_LBA: u32 = 21;
pub const ROOT_DIR_LBA: u32 = 22;

pub const STANDARD_ID: &[u8; 5] = b"CD001";
pub const DESCRIPTOR_VERSION: u8 = 1;
pub const DESCRIPTOR_TYPE_BOOT: u8 = 0;
pub const DESCRIPTOR_TYPE_PRIMARY: u8 = 1;
pub const DESCRIPTOR_TYPE_TERMINATOR: u8 = 255;

pub const EL_TORITO_ID: &[u8] = b"EL TORITO SPECIFICATION";
pub const BOOT_CATALOG_POINTER_OFFSET: usize = 0x47;

pub const CATALOG_ENTRY_SIZE: usize = 32;
pub const VIRTUAL_SECTOR_SIZE: usize = 512;

pub const FLOPPY_1_2M: usize = 1_228_800;
pub const FLOPPY_1_44M: usize = 1_474_560;
pub const FLOPPY_2_88M: usize = 2_949_120;

pub const ROOT_RECORD_SIZE: usize = 34;
pub const PATH_TABLE_ROOT_SIZE: u32 = 10;

pub const BOOT_IMAGE_NAME: &str = "BOOT.IMG";
pub const DEFAULT_VOLUME_ID: &str = "RESILISO";
pub const DEFAULT_CATALOG_ID: &str = "RESILISO BOOT CATALOG";
pub const DEFAULT_CONFIG_FILE: &str = "Resiliso.toml";
