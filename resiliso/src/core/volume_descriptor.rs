//! # Resiliso VolumeDescriptor Module
//!
//! The volume descriptor set at the start of an ISO 9660 volume. Each descriptor
//! fills exactly one 2048-byte sector and starts with the same 7-byte header:
//!
//! ```text
//! [0]    descriptor type (0 = boot record, 1 = primary, 255 = terminator)
//! [1..6] standard identifier "CD001"
//! [6]    version (1)
//! ```
//!
//! ## Primary Volume Descriptor (fields used here)
//! ```text
//! [8..40]    system identifier (space padded)
//! [40..72]   volume identifier (space padded)
//! [80..88]   volume space size in sectors (both-endian u32)
//! [120..124] volume set size (both-endian u16)
//! [124..128] volume sequence number (both-endian u16)
//! [128..132] logical block size (both-endian u16)
//! [132..140] path table size (both-endian u32)
//! [140..144] L-type path table LBA (little-endian u32)
//! [148..152] M-type path table LBA (big-endian u32)
//! [156..190] root directory record
//! [190..813] identifier strings (space padded)
//! [813..881] four date/time fields ("unspecified")
//! [881]      file structure version (1)
//! ```
//!
//! ## El Torito Boot Record
//! ```text
//! [7..39]    boot system identifier "EL TORITO SPECIFICATION" (zero padded)
//! [0x47..]   boot catalog LBA (little-endian u32)
//! ```
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::constants::{
    BOOT_CATALOG_POINTER_OFFSET, DESCRIPTOR_TYPE_BOOT, DESCRIPTOR_TYPE_PRIMARY, DESCRIPTOR_TYPE_TERMINATOR,
    DESCRIPTOR_VERSION, EL_TORITO_ID, ROOT_RECORD_SIZE, SECTOR_SIZE, STANDARD_ID,
};
use super::super::resiliso_errors::ResilisoError;
use super::super::utils::{get_u16_both, get_u32_both, put_padded, put_u16_both, put_u32_both};
use super::directory_record::{DirectoryRecord, SELF_IDENTIFIER};
use anyhow::Result;

const VOLUME_ID_LEN: usize = 32;
const ROOT_RECORD_OFFSET: usize = 156;
const DATE_FIELDS: [usize; 4] = [813, 830, 847, 864];
const DATE_FIELD_LEN: usize = 17;

/// Volume identifiers are 1..=32 ISO d-characters (`A-Z`, `0-9`, `_`).
pub fn validate_volume_id(volume_id: &str) -> Result<()> {
    let valid = !volume_id.is_empty()
        && volume_id.len() <= VOLUME_ID_LEN
        && volume_id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
    if !valid {
        return Err(ResilisoError::InvalidVolumeId(volume_id.to_string()).into());
    }
    Ok(())
}

fn write_header(sector: &mut [u8], descriptor_type: u8) {
    sector[0] = descriptor_type;
    sector[1..6].copy_from_slice(STANDARD_ID);
    sector[6] = DESCRIPTOR_VERSION;
}

fn check_header(sector: &[u8], descriptor_type: u8) -> bool {
    sector.len() == SECTOR_SIZE
        && sector[0] == descriptor_type
        && &sector[1..6] == STANDARD_ID
        && sector[6] == DESCRIPTOR_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryVolumeDescriptor {
    pub volume_id: String,
    pub volume_space_size: u32, // total sectors in the volume
    pub logical_block_size: u16,
    pub path_table_size: u32,
    pub l_path_table_lba: u32,
    pub m_path_table_lba: u32,
    pub root: DirectoryRecord,
}

impl PrimaryVolumeDescriptor {
    pub fn new(
        volume_id: &str,
        volume_space_size: u32,
        path_table_size: u32,
        l_path_table_lba: u32,
        m_path_table_lba: u32,
        root_lba: u32,
        root_length: u32,
    ) -> Self {
        Self {
            volume_id: volume_id.to_string(),
            volume_space_size,
            logical_block_size: SECTOR_SIZE as u16,
            path_table_size,
            l_path_table_lba,
            m_path_table_lba,
            root: DirectoryRecord::directory(root_lba, root_length, SELF_IDENTIFIER),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_volume_id(&self.volume_id)?;
        let mut sector = vec![0u8; SECTOR_SIZE];
        write_header(&mut sector, DESCRIPTOR_TYPE_PRIMARY);

        put_padded(&mut sector[8..40], b"", b' ');
        put_padded(&mut sector[40..72], self.volume_id.as_bytes(), b' ');
        put_u32_both(&mut sector[80..88], self.volume_space_size);
        put_u16_both(&mut sector[120..124], 1);
        put_u16_both(&mut sector[124..128], 1);
        put_u16_both(&mut sector[128..132], self.logical_block_size);
        put_u32_both(&mut sector[132..140], self.path_table_size);
        sector[140..144].copy_from_slice(&self.l_path_table_lba.to_le_bytes());
        sector[148..152].copy_from_slice(&self.m_path_table_lba.to_be_bytes());

        let root = self.root.to_bytes()?;
        sector[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + ROOT_RECORD_SIZE].copy_from_slice(&root);

        put_padded(&mut sector[190..813], b"", b' ');
        for offset in DATE_FIELDS {
            // sixteen '0' digits and a zero GMT offset: date not specified
            sector[offset..offset + DATE_FIELD_LEN - 1].fill(b'0');
            sector[offset + DATE_FIELD_LEN - 1] = 0;
        }
        sector[881] = 1;

        Ok(sector)
    }

    pub fn from_bytes(sector: &[u8], lba: u32) -> Result<Self> {
        if !check_header(sector, DESCRIPTOR_TYPE_PRIMARY) {
            return Err(ResilisoError::DescriptorMismatch(lba).into());
        }

        let mismatch = || ResilisoError::DescriptorMismatch(lba);
        let volume_id = String::from_utf8_lossy(&sector[40..72]).trim_end().to_string();
        let volume_space_size = get_u32_both(&sector[80..88]).ok_or_else(mismatch)?;
        let logical_block_size = get_u16_both(&sector[128..132]).ok_or_else(mismatch)?;
        let path_table_size = get_u32_both(&sector[132..140]).ok_or_else(mismatch)?;
        let l_path_table_lba = u32::from_le_bytes(sector[140..144].try_into()?);
        let m_path_table_lba = u32::from_be_bytes(sector[148..152].try_into()?);
        let (root, _) = DirectoryRecord::from_bytes(&sector[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + ROOT_RECORD_SIZE])?
            .ok_or_else(mismatch)?;

        Ok(Self {
            volume_id,
            volume_space_size,
            logical_block_size,
            path_table_size,
            l_path_table_lba,
            m_path_table_lba,
            root,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootRecordDescriptor {
    pub catalog_lba: u32,
}

impl BootRecordDescriptor {
    pub fn new(catalog_lba: u32) -> Self {
        Self { catalog_lba }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sector = vec![0u8; SECTOR_SIZE];
        write_header(&mut sector, DESCRIPTOR_TYPE_BOOT);
        put_padded(&mut sector[7..39], EL_TORITO_ID, 0);
        sector[BOOT_CATALOG_POINTER_OFFSET..BOOT_CATALOG_POINTER_OFFSET + 4]
            .copy_from_slice(&self.catalog_lba.to_le_bytes());
        sector
    }

    pub fn from_bytes(sector: &[u8], lba: u32) -> Result<Self> {
        if !check_header(sector, DESCRIPTOR_TYPE_BOOT) || !sector[7..39].starts_with(EL_TORITO_ID) {
            return Err(ResilisoError::DescriptorMismatch(lba).into());
        }
        let catalog_lba = u32::from_le_bytes(
            sector[BOOT_CATALOG_POINTER_OFFSET..BOOT_CATALOG_POINTER_OFFSET + 4].try_into()?,
        );
        Ok(Self { catalog_lba })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminatorDescriptor;

impl TerminatorDescriptor {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sector = vec![0u8; SECTOR_SIZE];
        write_header(&mut sector, DESCRIPTOR_TYPE_TERMINATOR);
        sector
    }

    pub fn from_bytes(sector: &[u8], lba: u32) -> Result<Self> {
        if !check_header(sector, DESCRIPTOR_TYPE_TERMINATOR) {
            return Err(ResilisoError::DescriptorMismatch(lba).into());
        }
        Ok(Self)
    }
}
