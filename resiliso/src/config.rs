//! # Resiliso Configuration Module
//!
//! This module defines the persistent build configuration: block size, whether the
//! redundancy set is embedded in the image, volume naming and output paths.
//!
//! The configuration is stored as a TOML file (`Resiliso.toml` by default). Fields
//! missing from the file fall back to their defaults, so a partial file is valid.
//!
//! ## Features
//! - Serialize and deserialize the configuration with `serde` + `toml`
//! - Validate block size and volume identifier before any output is produced
//! - Pre-flight free-space check on the output location using `sysinfo`
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use crate::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_CATALOG_ID, DEFAULT_VOLUME_ID};
use crate::core::block_splitter::validate_block_size;
use crate::core::volume_descriptor::validate_volume_id;
use crate::resiliso_errors::ResilisoError;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResilisoConfig {
    pub block_size: usize,
    pub include_redundancy: bool,
    pub volume_id: String,
    pub boot_catalog_id: String,
    pub image_path: PathBuf,
    pub redundancy_dir: PathBuf,
}

impl Default for ResilisoConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            include_redundancy: true,
            volume_id: DEFAULT_VOLUME_ID.to_string(),
            boot_catalog_id: DEFAULT_CATALOG_ID.to_string(),
            image_path: PathBuf::from("output.iso"),
            redundancy_dir: PathBuf::from("iso/boot/REDUNDANCY"),
        }
    }
}

impl ResilisoConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() { Self::load(path) } else { Ok(Self::default()) }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string(self).context("serializing configuration")?;
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;
        validate_volume_id(&self.volume_id)
    }
}

/// Fails with `InsufficientSpace` when the disk holding `path` reports less than
/// `needed` free bytes. Passes when no mounted disk contains `path`.
pub fn ensure_space<P: AsRef<Path>>(path: P, needed: u64) -> Result<()> {
    let path = absolute(path.as_ref());
    match free_space(&path) {
        Some(available) if available < needed => Err(ResilisoError::InsufficientSpace {
            path,
            needed,
            available,
        }
        .into()),
        _ => Ok(()),
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map(|dir| dir.join(path)).unwrap_or_else(|_| path.to_path_buf())
}

/// Free space of the most specific mount point containing `path`.
fn free_space(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();

    disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}
