//! Shared on-disk envelope for quiver-db files.
//!
//! Every persisted artifact (HNSW snapshot, metadata store) starts with
//! the same 20-byte header:
//!
//! ```text
//! [MAGIC 8B "QUIVRDB\0"][VERSION u32][SECTION u32][CHECKSUM u32]
//! ```
//!
//! The checksum is CRC32 over everything after the header. The section tag
//! prevents loading one artifact as the other.

use crate::error::{QuiverDbError, Result};

/// Magic bytes identifying a quiver-db file.
pub const MAGIC: [u8; 8] = *b"QUIVRDB\0";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Which artifact a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Section {
    /// HNSW graph snapshot.
    Hnsw = 1,
    /// Metadata record store.
    Metadata = 2,
}

impl Section {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Hnsw),
            2 => Some(Self::Metadata),
            _ => None,
        }
    }
}

/// File header structure.
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Magic bytes (must be MAGIC).
    pub magic: [u8; 8],
    /// Format version.
    pub version: u32,
    /// Artifact kind.
    pub section: Section,
    /// CRC32 checksum of the data section (everything after the header).
    pub checksum: u32,
}

impl FileHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 20;

    /// Create a new header.
    pub fn new(section: Section, checksum: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            section,
            checksum,
        }
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&(self.section as u32).to_le_bytes());
        bytes[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Deserialize header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(QuiverDbError::corrupt_format("header too small"));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        if magic != MAGIC {
            return Err(QuiverDbError::corrupt_format("invalid magic bytes"));
        }

        let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        if version > FORMAT_VERSION {
            return Err(QuiverDbError::corrupt_format(format!(
                "unsupported version {version} (max supported: {FORMAT_VERSION})"
            )));
        }

        let section_raw = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let section = Section::from_u32(section_raw)
            .ok_or_else(|| QuiverDbError::corrupt_format("unknown section tag"))?;

        let checksum = u32::from_le_bytes(bytes[16..20].try_into().unwrap());

        Ok(Self {
            magic,
            version,
            section,
            checksum,
        })
    }

    /// Verify a whole file: header shape, expected section, and checksum.
    /// Returns the data section on success.
    pub fn verify(data: &[u8], expected: Section) -> Result<&[u8]> {
        let header = Self::from_bytes(data)?;

        if header.section != expected {
            return Err(QuiverDbError::corrupt_format(format!(
                "section mismatch: expected {expected:?}, got {:?}",
                header.section
            )));
        }

        let body = &data[Self::SIZE..];
        if crc32fast::hash(body) != header.checksum {
            return Err(QuiverDbError::ChecksumMismatch);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = FileHeader::new(Section::Hnsw, 0x12345678);
        let bytes = header.to_bytes();
        let parsed = FileHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.magic, MAGIC);
        assert_eq!(parsed.version, FORMAT_VERSION);
        assert_eq!(parsed.section, Section::Hnsw);
        assert_eq!(parsed.checksum, 0x12345678);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = [0u8; FileHeader::SIZE];
        bytes[0..8].copy_from_slice(b"INVALID\0");

        assert!(FileHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_verify_section_mismatch() {
        let body = b"payload";
        let header = FileHeader::new(Section::Metadata, crc32fast::hash(body));
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(body);

        assert!(FileHeader::verify(&data, Section::Hnsw).is_err());
        assert!(FileHeader::verify(&data, Section::Metadata).is_ok());
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let body = b"payload";
        let header = FileHeader::new(Section::Metadata, crc32fast::hash(body));
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(b"payloax");

        assert!(matches!(
            FileHeader::verify(&data, Section::Metadata),
            Err(QuiverDbError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_section_from_u32() {
        assert_eq!(Section::from_u32(1), Some(Section::Hnsw));
        assert_eq!(Section::from_u32(2), Some(Section::Metadata));
        assert_eq!(Section::from_u32(99), None);
    }
}
