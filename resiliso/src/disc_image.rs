//! # Resiliso Disc Image Module
//!
//! This module assembles a bootable ISO 9660 image with an El Torito boot catalog and
//! reads the layout of such an image back.
//!
//! ## Key Responsibilities
//! - Own the image as one byte arena sized up front (`ImageBuilder`) and hand out
//!   bounded, non-overlapping sector ranges to each emitter
//! - Plan every extent (`DiscLayout`) before a single byte is written
//! - Emit descriptors, path tables, boot catalog, root directory and file extents
//! - Parse an image back into its descriptors and directory (`DiscImage`)
//!
//! ## Sector Layout
//! ```text
//! LBA 0..16   system area (zeros)
//! LBA 16      Primary Volume Descriptor
//! LBA 17      El Torito Boot Record
//! LBA 18      Volume Descriptor Set Terminator
//! LBA 19      L-type path table
//! LBA 20      M-type path table
//! LBA 21      boot catalog
//! LBA 22..    root directory (as many sectors as the records need)
//! next        boot image extent
//! next...     embedded file extents, one per file, sector aligned
//! ```
//!
//! The boot image is also listed in the root directory as `BOOT.IMG;1`; its record
//! points at the same extent as the boot catalog's initial entry.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    BOOT_CATALOG_LBA, BOOT_IMAGE_NAME, BOOT_RECORD_LBA, L_PATH_TABLE_LBA, M_PATH_TABLE_LBA,
    PATH_TABLE_ROOT_SIZE, PVD_LBA, ROOT_DIR_LBA, SECTOR_SIZE, TERMINATOR_LBA,
};
use crate::core::boot_catalog::{BootCatalog, InitialEntry, PlatformId};
use crate::core::directory_record::{
    DirectoryRecord, Endian, PARENT_IDENTIFIER, PathTableEntry, SELF_IDENTIFIER, file_identifier,
};
use crate::core::volume_descriptor::{
    BootRecordDescriptor, PrimaryVolumeDescriptor, TerminatorDescriptor, validate_volume_id,
};
use crate::resiliso_errors::ResilisoError;
use crate::utils::{is_plain_file_name, write_file};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Number of whole sectors needed for `len` bytes.
pub fn sectors_for(len: usize) -> Result<u32> {
    u32::try_from(len.div_ceil(SECTOR_SIZE)).map_err(|_| {
        ResilisoError::FieldOverflow {
            field: "sector count",
            value: len as u64,
        }
        .into()
    })
}

fn byte_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ResilisoError::FieldOverflow {
            field: "data length",
            value: len as u64,
        }
        .into()
    })
}

/// Byte arena for a whole image. Every write goes through `region`, which rejects
/// ranges past the end of the volume or overlapping an earlier claim.
#[derive(Debug)]
pub struct ImageBuilder {
    arena: Vec<u8>,
    total_sectors: u32,
    claimed: Vec<(u32, u32)>, // (lba, sectors)
}

impl ImageBuilder {
    pub fn new(total_sectors: u32) -> Self {
        Self {
            arena: vec![0u8; total_sectors as usize * SECTOR_SIZE],
            total_sectors,
            claimed: Vec::new(),
        }
    }

    pub fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    /// Claims `sectors` sectors starting at `lba` and returns them for writing.
    pub fn region(&mut self, lba: u32, sectors: u32) -> Result<&mut [u8]> {
        let end = lba
            .checked_add(sectors)
            .filter(|end| *end <= self.total_sectors)
            .ok_or(ResilisoError::ExtentOutOfBounds {
                lba,
                sectors,
                total: self.total_sectors,
            })?;

        if sectors > 0 {
            if let Some(&(existing, _)) = self
                .claimed
                .iter()
                .find(|(start, count)| lba < start + count && *start < end)
            {
                return Err(ResilisoError::ExtentOverlap { lba, existing }.into());
            }
            self.claimed.push((lba, sectors));
        }

        let start = lba as usize * SECTOR_SIZE;
        Ok(&mut self.arena[start..end as usize * SECTOR_SIZE])
    }

    /// Copies `data` into a fresh extent at `lba`; the tail of the last sector stays zero.
    pub fn write_extent(&mut self, lba: u32, data: &[u8]) -> Result<()> {
        let sectors = sectors_for(data.len())?;
        let region = self.region(lba, sectors)?;
        region[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.arena
    }
}

/// A file placed in the root directory under its ISO 9660 identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    pub identifier: String,
    pub data: Vec<u8>,
}

impl EmbeddedFile {
    /// `host_name` is mapped to an identifier (`manifest.txt` becomes `MANIFEST.TXT;1`).
    pub fn new(host_name: &str, data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            identifier: file_identifier(host_name)?,
            data,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub lba: u32,
    pub length: u32, // bytes
}

/// Where everything goes, decided before the arena is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscLayout {
    pub root_dir_sectors: u32,
    pub boot: Extent,
    pub files: Vec<(String, Extent)>, // in input order
    pub records: Vec<DirectoryRecord>, // root directory, `.` and `..` first
    pub total_sectors: u32,
}

impl DiscLayout {
    pub fn plan(boot_image_len: usize, files: &[EmbeddedFile]) -> Result<Self> {
        // a zero-length extent would leave the catalog pointing at the next file
        if boot_image_len == 0 {
            return Err(ResilisoError::EmptyBootImage.into());
        }
        let boot_identifier = file_identifier(BOOT_IMAGE_NAME)?;

        let mut identifiers: Vec<&str> = files.iter().map(|file| file.identifier.as_str()).collect();
        identifiers.push(&boot_identifier);
        identifiers.sort_unstable();
        if let Some(pair) = identifiers.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ResilisoError::InvalidFileIdentifier(pair[0].to_string()).into());
        }

        // record sizes do not depend on extents, so the directory can be sized first
        let mut sized: Vec<DirectoryRecord> = files
            .iter()
            .map(|file| DirectoryRecord::file(0, 0, &file.identifier))
            .collect();
        sized.push(DirectoryRecord::file(0, 0, &boot_identifier));
        let root_dir_sectors = pack_sectors(&sized);

        let boot = Extent {
            lba: ROOT_DIR_LBA + root_dir_sectors,
            length: byte_length(boot_image_len)?,
        };
        let mut next_lba = checked_end(boot.lba, boot_image_len)?;

        let mut placed = Vec::with_capacity(files.len());
        for file in files {
            let extent = Extent {
                lba: next_lba,
                length: byte_length(file.data.len())?,
            };
            next_lba = checked_end(next_lba, file.data.len())?;
            placed.push((file.identifier.clone(), extent));
        }

        let root_length = root_dir_sectors * SECTOR_SIZE as u32;
        let mut entries: Vec<DirectoryRecord> = placed
            .iter()
            .map(|(identifier, extent)| DirectoryRecord::file(extent.lba, extent.length, identifier))
            .collect();
        entries.push(DirectoryRecord::file(boot.lba, boot.length, &boot_identifier));
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let mut records = vec![
            DirectoryRecord::directory(ROOT_DIR_LBA, root_length, SELF_IDENTIFIER),
            DirectoryRecord::directory(ROOT_DIR_LBA, root_length, PARENT_IDENTIFIER),
        ];
        records.extend(entries);

        Ok(Self {
            root_dir_sectors,
            boot,
            files: placed,
            records,
            total_sectors: next_lba,
        })
    }
}

fn checked_end(lba: u32, len: usize) -> Result<u32> {
    let sectors = sectors_for(len)?;
    lba.checked_add(sectors).ok_or_else(|| {
        ResilisoError::FieldOverflow {
            field: "volume space size",
            value: u64::from(lba) + u64::from(sectors),
        }
        .into()
    })
}

/// Sectors needed for `files` plus `.` and `..`, never splitting a record.
fn pack_sectors(files: &[DirectoryRecord]) -> u32 {
    let mut lens = vec![
        DirectoryRecord::directory(0, 0, SELF_IDENTIFIER).encoded_len(),
        DirectoryRecord::directory(0, 0, PARENT_IDENTIFIER).encoded_len(),
    ];
    lens.extend(files.iter().map(DirectoryRecord::encoded_len));

    let mut sectors = 1u32;
    let mut used = 0usize;
    for len in lens {
        if used + len > SECTOR_SIZE {
            sectors += 1;
            used = 0;
        }
        used += len;
    }
    sectors
}

/// Encodes `records` into `sectors` directory sectors.
fn encode_directory(records: &[DirectoryRecord], sectors: u32) -> Result<Vec<u8>> {
    let mut extent = vec![0u8; sectors as usize * SECTOR_SIZE];
    let mut sector = 0usize;
    let mut used = 0usize;

    for record in records {
        let bytes = record.to_bytes()?;
        if used + bytes.len() > SECTOR_SIZE {
            sector += 1;
            used = 0;
        }
        let start = sector * SECTOR_SIZE + used;
        extent
            .get_mut(start..start + bytes.len())
            .ok_or_else(|| ResilisoError::DirectoryRecordTooLong(record.name()))?
            .copy_from_slice(&bytes);
        used += bytes.len();
    }

    Ok(extent)
}

/// Builds the complete image: descriptors, path tables, catalog, root directory,
/// boot image and every embedded file.
pub fn assemble(volume_id: &str, catalog_id: &str, boot_image: &[u8], files: &[EmbeddedFile]) -> Result<Vec<u8>> {
    validate_volume_id(volume_id)?;
    let layout = DiscLayout::plan(boot_image.len(), files)?;
    let mut builder = ImageBuilder::new(layout.total_sectors);
    let root_length = layout.root_dir_sectors * SECTOR_SIZE as u32;

    let pvd = PrimaryVolumeDescriptor::new(
        volume_id,
        layout.total_sectors,
        PATH_TABLE_ROOT_SIZE,
        L_PATH_TABLE_LBA,
        M_PATH_TABLE_LBA,
        ROOT_DIR_LBA,
        root_length,
    );
    builder.write_extent(PVD_LBA, &pvd.to_bytes()?)?;
    builder.write_extent(BOOT_RECORD_LBA, &BootRecordDescriptor::new(BOOT_CATALOG_LBA).to_bytes())?;
    builder.write_extent(TERMINATOR_LBA, &TerminatorDescriptor.to_bytes())?;

    let root_path = PathTableEntry::root(ROOT_DIR_LBA);
    builder.write_extent(L_PATH_TABLE_LBA, &root_path.to_bytes(Endian::Little))?;
    builder.write_extent(M_PATH_TABLE_LBA, &root_path.to_bytes(Endian::Big))?;

    let initial = InitialEntry::for_image(layout.boot.lba, boot_image.len());
    let catalog = BootCatalog::new(PlatformId::X86, catalog_id, initial);
    builder.write_extent(BOOT_CATALOG_LBA, &catalog.to_bytes())?;
    debug!(media = ?initial.media_type, sectors = initial.sector_count, lba = initial.load_lba, "boot catalog");

    let directory = encode_directory(&layout.records, layout.root_dir_sectors)?;
    builder.write_extent(ROOT_DIR_LBA, &directory)?;

    builder.write_extent(layout.boot.lba, boot_image)?;
    for (file, (identifier, extent)) in files.iter().zip(&layout.files) {
        builder.write_extent(extent.lba, &file.data)?;
        debug!(file = %identifier, lba = extent.lba, bytes = extent.length, "embedded file");
    }

    info!(
        volume = volume_id,
        sectors = layout.total_sectors,
        files = files.len(),
        "assembled disc image"
    );
    Ok(builder.finish())
}

/// Layout read back from an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscImage {
    pub primary: PrimaryVolumeDescriptor,
    pub boot_record: BootRecordDescriptor,
    pub catalog: BootCatalog,
    pub path_table: PathTableEntry,
    pub entries: Vec<DirectoryRecord>, // root directory without `.` and `..`
}

impl DiscImage {
    pub fn parse_layout(image: &[u8]) -> Result<Self> {
        let primary = PrimaryVolumeDescriptor::from_bytes(sector(image, PVD_LBA)?, PVD_LBA)?;
        let boot_record = BootRecordDescriptor::from_bytes(sector(image, BOOT_RECORD_LBA)?, BOOT_RECORD_LBA)?;
        TerminatorDescriptor::from_bytes(sector(image, TERMINATOR_LBA)?, TERMINATOR_LBA)?;

        let catalog = BootCatalog::from_bytes(sector(image, boot_record.catalog_lba)?, boot_record.catalog_lba)?;
        let path_table = PathTableEntry::from_bytes(sector(image, primary.l_path_table_lba)?, Endian::Little)
            .ok_or(ResilisoError::DescriptorMismatch(primary.l_path_table_lba))?;

        let root = &primary.root;
        let root_sectors = sectors_for(root.data_length as usize)?;
        let mut entries = Vec::new();
        for offset in 0..root_sectors {
            let data = sector(image, root.extent_lba + offset)?;
            let mut used = 0usize;
            while let Some((record, len)) = DirectoryRecord::from_bytes(&data[used..])? {
                used += len;
                if record.identifier != SELF_IDENTIFIER && record.identifier != PARENT_IDENTIFIER {
                    entries.push(record);
                }
            }
        }

        Ok(Self {
            primary,
            boot_record,
            catalog,
            path_table,
            entries,
        })
    }

    /// Looks a file up by name, without the `;1` suffix (`MANIFEST.TXT`).
    pub fn find(&self, name: &str) -> Option<&DirectoryRecord> {
        self.entries.iter().find(|record| record.name() == name)
    }

    /// The bytes of `record`'s extent, trimmed to its data length.
    pub fn file_data<'a>(&self, image: &'a [u8], record: &DirectoryRecord) -> Result<&'a [u8]> {
        let start = record.extent_lba as usize * SECTOR_SIZE;
        let end = start + record.data_length as usize;
        image.get(start..end).ok_or_else(|| {
            ResilisoError::ExtentOutOfBounds {
                lba: record.extent_lba,
                sectors: sectors_for(record.data_length as usize).unwrap_or(u32::MAX),
                total: (image.len() / SECTOR_SIZE) as u32,
            }
            .into()
        })
    }

    /// Copies every file out of the image into `dir` under its lowercase host name
    /// (`BLOCK_000.BLK;1` becomes `block_000.blk`).
    pub fn extract_to<P: AsRef<Path>>(&self, image: &[u8], dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.entries.len());
        for record in self.entries.iter().filter(|record| !record.is_directory()) {
            let name = record.name().trim_end_matches('.').to_ascii_lowercase();
            if !is_plain_file_name(&name) {
                return Err(ResilisoError::UnsafeFileName(name).into());
            }
            let path = dir.join(name);
            write_file(&path, self.file_data(image, record)?)?;
            written.push(path);
        }
        Ok(written)
    }
}

fn sector(image: &[u8], lba: u32) -> Result<&[u8]> {
    let start = lba as usize * SECTOR_SIZE;
    image.get(start..start + SECTOR_SIZE).ok_or_else(|| {
        ResilisoError::ExtentOutOfBounds {
            lba,
            sectors: 1,
            total: (image.len() / SECTOR_SIZE) as u32,
        }
        .into()
    })
}
