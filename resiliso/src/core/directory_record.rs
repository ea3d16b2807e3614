//! # Resiliso DirectoryRecord Module
//!
//! Directory records and path table entries of an ISO 9660 volume. Unlike the volume
//! descriptors these are variable-length and several of them are packed into one
//! sector; a record never straddles a sector boundary.
//!
//! ## Directory Record Layout
//! ```text
//! [0]      record length
//! [1]      extended attribute record length (0)
//! [2..10]  extent LBA (both-endian u32)
//! [10..18] data length (both-endian u32)
//! [18..25] recording date/time (zeros: unspecified)
//! [25]     flags (0x02 = directory)
//! [26]     file unit size (0)
//! [27]     interleave gap (0)
//! [28..32] volume sequence number (both-endian u16)
//! [32]     identifier length
//! [33..]   identifier, plus one pad byte when its length is even
//! ```
//!
//! ## Path Table Entry Layout
//! ```text
//! [0]    identifier length
//! [1]    extended attribute record length
//! [2..6] extent LBA (little-endian for L-type, big-endian for M-type)
//! [6..8] parent directory number (same endianness)
//! [8..]  identifier, plus one pad byte when its length is odd
//! ```
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use super::super::resiliso_errors::ResilisoError;
use super::super::utils::{get_u32_both, put_u16_both, put_u32_both};
use anyhow::Result;

pub const FLAG_DIRECTORY: u8 = 0x02;
pub const SELF_IDENTIFIER: &[u8] = b"\x00";
pub const PARENT_IDENTIFIER: &[u8] = b"\x01";

const FIXED_PART: usize = 33;
const MAX_IDENTIFIER: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub extent_lba: u32,
    pub data_length: u32,
    pub flags: u8,
    pub identifier: Vec<u8>,
}

impl DirectoryRecord {
    pub fn file(extent_lba: u32, data_length: u32, identifier: &str) -> Self {
        Self {
            extent_lba,
            data_length,
            flags: 0,
            identifier: identifier.as_bytes().to_vec(),
        }
    }

    pub fn directory(extent_lba: u32, data_length: u32, identifier: &[u8]) -> Self {
        Self {
            extent_lba,
            data_length,
            flags: FLAG_DIRECTORY,
            identifier: identifier.to_vec(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }

    /// Identifier as text, with the `;1` version suffix removed.
    pub fn name(&self) -> String {
        let text = String::from_utf8_lossy(&self.identifier);
        text.split(';').next().unwrap_or_default().to_string()
    }

    pub fn encoded_len(&self) -> usize {
        let name_len = self.identifier.len();
        FIXED_PART + name_len + usize::from(name_len % 2 == 0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let record_len = self.encoded_len();
        if self.identifier.is_empty() || record_len > u8::MAX as usize {
            return Err(ResilisoError::DirectoryRecordTooLong(self.name()).into());
        }

        let mut encoded = vec![0u8; record_len];
        encoded[0] = record_len as u8;
        put_u32_both(&mut encoded[2..10], self.extent_lba);
        put_u32_both(&mut encoded[10..18], self.data_length);
        encoded[25] = self.flags;
        put_u16_both(&mut encoded[28..32], 1);
        encoded[32] = self.identifier.len() as u8;
        encoded[FIXED_PART..FIXED_PART + self.identifier.len()].copy_from_slice(&self.identifier);

        Ok(encoded)
    }

    /// Decodes the record at the start of `data`. Returns `None` on a zero length
    /// byte, which marks the unused tail of a directory sector.
    pub fn from_bytes(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let Some(&record_len) = data.first() else {
            return Ok(None);
        };
        if record_len == 0 {
            return Ok(None);
        }

        let record_len = record_len as usize;
        if record_len < FIXED_PART + 1 || record_len > data.len() {
            return Err(ResilisoError::DirectoryRecordTooLong(format!("record of {record_len} bytes")).into());
        }

        let extent_lba = get_u32_both(&data[2..10]).ok_or(ResilisoError::FieldOverflow {
            field: "directory extent",
            value: u64::from(u32::from_le_bytes([data[2], data[3], data[4], data[5]])),
        })?;
        let data_length = get_u32_both(&data[10..18]).ok_or(ResilisoError::FieldOverflow {
            field: "directory data length",
            value: u64::from(u32::from_le_bytes([data[10], data[11], data[12], data[13]])),
        })?;
        let name_len = data[32] as usize;
        if FIXED_PART + name_len > record_len {
            return Err(ResilisoError::DirectoryRecordTooLong(format!("identifier of {name_len} bytes")).into());
        }

        let record = Self {
            extent_lba,
            data_length,
            flags: data[25],
            identifier: data[FIXED_PART..FIXED_PART + name_len].to_vec(),
        };
        Ok(Some((record, record_len)))
    }
}

/// Maps a host file name to an ISO 9660 file identifier: uppercase d-characters,
/// a single separator dot and the `;1` version suffix (`block_000.blk` becomes
/// `BLOCK_000.BLK;1`).
pub fn file_identifier(name: &str) -> Result<String> {
    let upper: String = name
        .to_ascii_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect();

    let (stem, extension) = match upper.rfind('.') {
        Some(dot) => (upper[..dot].replace('.', "_"), upper[dot + 1..].to_string()),
        None => (upper.clone(), String::new()),
    };

    if (stem.is_empty() && extension.is_empty()) || stem.len() + extension.len() > MAX_IDENTIFIER {
        return Err(ResilisoError::InvalidFileIdentifier(name.to_string()).into());
    }

    Ok(format!("{stem}.{extension};1"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTableEntry {
    pub extent_lba: u32,
    pub parent: u16,
    pub identifier: Vec<u8>,
}

impl PathTableEntry {
    /// The root directory entry; the root is its own parent (directory number 1).
    pub fn root(extent_lba: u32) -> Self {
        Self {
            extent_lba,
            parent: 1,
            identifier: SELF_IDENTIFIER.to_vec(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        8 + self.identifier.len() + self.identifier.len() % 2
    }

    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        let mut encoded = vec![0u8; self.encoded_len()];
        encoded[0] = self.identifier.len() as u8;
        match endian {
            Endian::Little => {
                encoded[2..6].copy_from_slice(&self.extent_lba.to_le_bytes());
                encoded[6..8].copy_from_slice(&self.parent.to_le_bytes());
            }
            Endian::Big => {
                encoded[2..6].copy_from_slice(&self.extent_lba.to_be_bytes());
                encoded[6..8].copy_from_slice(&self.parent.to_be_bytes());
            }
        }
        encoded[8..8 + self.identifier.len()].copy_from_slice(&self.identifier);
        encoded
    }

    pub fn from_bytes(data: &[u8], endian: Endian) -> Option<Self> {
        let name_len = *data.first()? as usize;
        if name_len == 0 || data.len() < 8 + name_len {
            return None;
        }
        let lba: [u8; 4] = data[2..6].try_into().ok()?;
        let parent: [u8; 2] = data[6..8].try_into().ok()?;
        let (extent_lba, parent) = match endian {
            Endian::Little => (u32::from_le_bytes(lba), u16::from_le_bytes(parent)),
            Endian::Big => (u32::from_be_bytes(lba), u16::from_be_bytes(parent)),
        };
        Some(Self {
            extent_lba,
            parent,
            identifier: data[8..8 + name_len].to_vec(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_record_layout() {
        let record = DirectoryRecord::file(40, 4096, "BLOCK_000.BLK;1");
        let bytes = record.to_bytes().unwrap();

        // 15-byte identifier is odd, so no pad byte
        assert_eq!(bytes.len(), 33 + 15);
        assert_eq!(bytes[0] as usize, bytes.len());
        assert_eq!(&bytes[2..6], &40u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &40u32.to_be_bytes());
        assert_eq!(&bytes[10..14], &4096u32.to_le_bytes());
        assert_eq!(&bytes[14..18], &4096u32.to_be_bytes());
        assert_eq!(bytes[25], 0);
        assert_eq!(bytes[32], 15);
        assert_eq!(&bytes[33..], b"BLOCK_000.BLK;1");
    }

    #[test]
    fn even_identifier_is_padded() {
        let record = DirectoryRecord::file(1, 1, "AB.C;1");
        assert_eq!(record.to_bytes().unwrap().len(), 33 + 6 + 1);

        let root = DirectoryRecord::directory(22, 2048, SELF_IDENTIFIER);
        let bytes = root.to_bytes().unwrap();
        assert_eq!(bytes.len(), 34);
        assert_eq!(bytes[25], FLAG_DIRECTORY);
    }

    #[test]
    fn record_decodes_back() {
        let record = DirectoryRecord::file(123, 1808, "MANIFEST.TXT;1");
        let mut sector = record.to_bytes().unwrap();
        let len = sector.len();
        sector.resize(2048, 0);

        let (decoded, consumed) = DirectoryRecord::from_bytes(&sector).unwrap().unwrap();
        assert_eq!(decoded, record);
        assert_eq!(consumed, len);
        assert_eq!(decoded.name(), "MANIFEST.TXT");
        assert!(DirectoryRecord::from_bytes(&sector[len..]).unwrap().is_none());
    }

    #[test]
    fn record_with_mismatched_endian_halves_fails() {
        let mut bytes = DirectoryRecord::file(5, 5, "A.B;1").to_bytes().unwrap();
        bytes[9] = 0xFF;
        assert!(DirectoryRecord::from_bytes(&bytes).is_err());
    }

    #[test]
    fn identifiers() {
        assert_eq!(file_identifier("block_000.blk").unwrap(), "BLOCK_000.BLK;1");
        assert_eq!(file_identifier("manifest.txt").unwrap(), "MANIFEST.TXT;1");
        assert_eq!(file_identifier("boot-img").unwrap(), "BOOT_IMG.;1");
        assert_eq!(file_identifier("a.b.c").unwrap(), "A_B.C;1");
        assert!(file_identifier("").is_err());
        assert!(file_identifier(&"x".repeat(40)).is_err());
    }

    #[test]
    fn path_table_entry_both_endians() {
        let entry = PathTableEntry::root(22);

        let little = entry.to_bytes(Endian::Little);
        assert_eq!(little, vec![1, 0, 22, 0, 0, 0, 1, 0, 0, 0]);
        let big = entry.to_bytes(Endian::Big);
        assert_eq!(big, vec![1, 0, 0, 0, 0, 22, 0, 1, 0, 0]);

        assert_eq!(PathTableEntry::from_bytes(&little, Endian::Little), Some(entry.clone()));
        assert_eq!(PathTableEntry::from_bytes(&big, Endian::Big), Some(entry));
    }
}
