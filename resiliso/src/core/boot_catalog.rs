//! # Resiliso BootCatalog Module
//!
//! El Torito boot catalog: a validation entry followed by the initial/default entry,
//! 32 bytes each, at the start of the sector named by the boot record descriptor.
//!
//! ## Validation Entry
//! ```text
//! [0]      header id (0x01)
//! [1]      platform id
//! [2..4]   reserved
//! [4..28]  id string (zero padded)
//! [28..30] checksum: all sixteen 16-bit LE words of the entry sum to 0 mod 65536
//! [30..32] key bytes 0x55 0xAA
//! ```
//!
//! ## Initial/Default Entry
//! ```text
//! [0]      boot indicator (0x88 bootable, 0x00 not bootable)
//! [1]      boot media type
//! [2..4]   load segment (0 = default 0x7C0)
//! [4]      system type
//! [6..8]   sector count (512-byte virtual sectors)
//! [8..12]  load RBA: LBA of the boot image
//! ```
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::constants::{
    CATALOG_ENTRY_SIZE, FLOPPY_1_2M, FLOPPY_1_44M, FLOPPY_2_88M, SECTOR_SIZE, VIRTUAL_SECTOR_SIZE,
};
use super::super::resiliso_errors::ResilisoError;
use super::super::utils::put_padded;
use anyhow::Result;

const HEADER_ID: u8 = 0x01;
const KEY_BYTES: [u8; 2] = [0x55, 0xAA];
const ID_STRING_LEN: usize = 24;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformId {
    #[default]
    X86 = 0x00,
    PowerPc = 0x01,
    Mac = 0x02,
    Efi = 0xEF,
}

impl PlatformId {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::X86),
            0x01 => Some(Self::PowerPc),
            0x02 => Some(Self::Mac),
            0xEF => Some(Self::Efi),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootMediaType {
    #[default]
    NoEmulation = 0x00,
    Floppy1_2M = 0x01,
    Floppy1_44M = 0x02,
    Floppy2_88M = 0x03,
    HardDisk = 0x04,
}

impl BootMediaType {
    /// Floppy emulation for the three standard floppy sizes, no emulation otherwise.
    pub fn for_image_len(len: usize) -> Self {
        match len {
            FLOPPY_1_2M => Self::Floppy1_2M,
            FLOPPY_1_44M => Self::Floppy1_44M,
            FLOPPY_2_88M => Self::Floppy2_88M,
            _ => Self::NoEmulation,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::NoEmulation),
            0x01 => Some(Self::Floppy1_2M),
            0x02 => Some(Self::Floppy1_44M),
            0x03 => Some(Self::Floppy2_88M),
            0x04 => Some(Self::HardDisk),
            _ => None,
        }
    }

    pub fn is_emulated(&self) -> bool {
        *self != Self::NoEmulation
    }
}

/// Sum of the sixteen little-endian 16-bit words of a catalog entry, mod 65536.
pub fn word_sum(entry: &[u8]) -> u16 {
    entry
        .chunks_exact(2)
        .fold(0u16, |sum, word| sum.wrapping_add(u16::from_le_bytes([word[0], word[1]])))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEntry {
    pub platform: PlatformId,
    pub id_string: [u8; ID_STRING_LEN],
}

impl ValidationEntry {
    pub fn new(platform: PlatformId, id_string: &str) -> Self {
        let mut id = [0u8; ID_STRING_LEN];
        put_padded(&mut id, id_string.as_bytes(), 0);
        Self { platform, id_string: id }
    }

    pub fn to_bytes(&self) -> [u8; CATALOG_ENTRY_SIZE] {
        let mut entry = [0u8; CATALOG_ENTRY_SIZE];
        entry[0] = HEADER_ID;
        entry[1] = self.platform as u8;
        entry[4..28].copy_from_slice(&self.id_string);
        entry[30..32].copy_from_slice(&KEY_BYTES);

        let checksum = 0u16.wrapping_sub(word_sum(&entry));
        entry[28..30].copy_from_slice(&checksum.to_le_bytes());
        entry
    }

    pub fn from_bytes(entry: &[u8], catalog_lba: u32) -> Result<Self> {
        if entry.len() != CATALOG_ENTRY_SIZE {
            return Err(ResilisoError::DescriptorMismatch(catalog_lba).into());
        }
        let valid = entry[0] == HEADER_ID && entry[30..32] == KEY_BYTES && word_sum(entry) == 0;

        match PlatformId::from_byte(entry[1]).filter(|_| valid) {
            Some(platform) => Ok(Self {
                platform,
                id_string: entry[4..28].try_into()?,
            }),
            None => Err(ResilisoError::DescriptorMismatch(catalog_lba).into()),
        }
    }

    pub fn id(&self) -> String {
        String::from_utf8_lossy(&self.id_string).trim_end_matches('\0').to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialEntry {
    pub bootable: bool,
    pub media_type: BootMediaType,
    pub load_segment: u16,
    pub system_type: u8,
    pub sector_count: u16,
    pub load_lba: u32,
}

impl InitialEntry {
    pub const BOOTABLE: u8 = 0x88;
    pub const NOT_BOOTABLE: u8 = 0x00;

    /// Bootable entry for an image of `image_len` bytes stored at `load_lba`.
    ///
    /// Floppy emulation loads a single virtual sector; without emulation the whole
    /// image is counted in 512-byte virtual sectors, clamped to the 16-bit field.
    pub fn for_image(load_lba: u32, image_len: usize) -> Self {
        let media_type = BootMediaType::for_image_len(image_len);
        let sector_count = if media_type.is_emulated() {
            1
        } else {
            image_len.div_ceil(VIRTUAL_SECTOR_SIZE).clamp(1, u16::MAX as usize) as u16
        };

        Self {
            bootable: true,
            media_type,
            load_segment: 0,
            system_type: 0,
            sector_count,
            load_lba,
        }
    }

    pub fn to_bytes(&self) -> [u8; CATALOG_ENTRY_SIZE] {
        let mut entry = [0u8; CATALOG_ENTRY_SIZE];
        entry[0] = if self.bootable { Self::BOOTABLE } else { Self::NOT_BOOTABLE };
        entry[1] = self.media_type as u8;
        entry[2..4].copy_from_slice(&self.load_segment.to_le_bytes());
        entry[4] = self.system_type;
        entry[6..8].copy_from_slice(&self.sector_count.to_le_bytes());
        entry[8..12].copy_from_slice(&self.load_lba.to_le_bytes());
        entry
    }

    pub fn from_bytes(entry: &[u8], catalog_lba: u32) -> Result<Self> {
        let mismatch = ResilisoError::DescriptorMismatch(catalog_lba);
        if entry.len() != CATALOG_ENTRY_SIZE {
            return Err(mismatch.into());
        }
        let bootable = match entry[0] {
            Self::BOOTABLE => true,
            Self::NOT_BOOTABLE => false,
            _ => return Err(mismatch.into()),
        };
        let Some(media_type) = BootMediaType::from_byte(entry[1]) else {
            return Err(mismatch.into());
        };

        Ok(Self {
            bootable,
            media_type,
            load_segment: u16::from_le_bytes([entry[2], entry[3]]),
            system_type: entry[4],
            sector_count: u16::from_le_bytes([entry[6], entry[7]]),
            load_lba: u32::from_le_bytes(entry[8..12].try_into()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootCatalog {
    pub validation: ValidationEntry,
    pub initial: InitialEntry,
}

impl BootCatalog {
    pub fn new(platform: PlatformId, id_string: &str, initial: InitialEntry) -> Self {
        Self {
            validation: ValidationEntry::new(platform, id_string),
            initial,
        }
    }

    /// The catalog sector: validation entry, initial entry, zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sector = vec![0u8; SECTOR_SIZE];
        sector[..CATALOG_ENTRY_SIZE].copy_from_slice(&self.validation.to_bytes());
        sector[CATALOG_ENTRY_SIZE..2 * CATALOG_ENTRY_SIZE].copy_from_slice(&self.initial.to_bytes());
        sector
    }

    pub fn from_bytes(sector: &[u8], catalog_lba: u32) -> Result<Self> {
        if sector.len() < 2 * CATALOG_ENTRY_SIZE {
            return Err(ResilisoError::DescriptorMismatch(catalog_lba).into());
        }
        Ok(Self {
            validation: ValidationEntry::from_bytes(&sector[..CATALOG_ENTRY_SIZE], catalog_lba)?,
            initial: InitialEntry::from_bytes(&sector[CATALOG_ENTRY_SIZE..2 * CATALOG_ENTRY_SIZE], catalog_lba)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation_entry_words_sum_to_zero() {
        for id in ["", "RESILISO BOOT CATALOG", "PYTHON-MADE-BOOTCATALOG", "\u{7f}\u{7f}\u{7f}"] {
            let bytes = ValidationEntry::new(PlatformId::X86, id).to_bytes();
            let mut sum: u32 = 0;
            for word in bytes.chunks_exact(2) {
                sum += u16::from_le_bytes([word[0], word[1]]) as u32;
            }
            assert_eq!(sum & 0xFFFF, 0, "checksum failed for {id:?}");
            assert_eq!(bytes[0], 0x01);
            assert_eq!(&bytes[30..32], &[0x55, 0xAA]);
        }
    }

    #[test]
    fn validation_entry_detects_tampering() {
        let mut bytes = ValidationEntry::new(PlatformId::X86, "TEST").to_bytes();
        assert_eq!(ValidationEntry::from_bytes(&bytes, 21).unwrap().id(), "TEST");

        bytes[5] ^= 0x01;
        assert!(ValidationEntry::from_bytes(&bytes, 21).is_err());
    }

    #[test]
    fn initial_entry_for_floppy_image() {
        let entry = InitialEntry::for_image(23, FLOPPY_1_44M);
        let bytes = entry.to_bytes();
        assert_eq!(bytes[0], 0x88);
        assert_eq!(bytes[1], BootMediaType::Floppy1_44M as u8);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 23);
    }

    #[test]
    fn initial_entry_without_emulation() {
        let entry = InitialEntry::for_image(100, 2048);
        assert_eq!(entry.media_type, BootMediaType::NoEmulation);
        assert_eq!(entry.sector_count, 4);

        assert_eq!(InitialEntry::for_image(1, 1).sector_count, 1);
        assert_eq!(InitialEntry::for_image(1, 64 * 1024 * 1024).sector_count, u16::MAX);
    }

    #[test]
    fn catalog_sector_decodes_back() {
        let catalog = BootCatalog::new(PlatformId::X86, "RESILISO", InitialEntry::for_image(40, 512));
        let sector = catalog.to_bytes();
        assert_eq!(sector.len(), SECTOR_SIZE);
        assert!(sector[64..].iter().all(|&b| b == 0));
        assert_eq!(BootCatalog::from_bytes(&sector, 21).unwrap(), catalog);
    }
}
