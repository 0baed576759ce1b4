use crate::error::{BbfError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Magic number "BBF1", written at the start of the header and the end of the footer
pub const MAGIC_NUMBER: [u8; 4] = *b"BBF1";

/// Current format version (informational only)
pub const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: magic + version
pub const HEADER_SIZE: usize = 5;

/// Asset payloads start on multiples of this many bytes
pub const SECTOR_ALIGNMENT: u64 = 4096;

/// Parent index meaning "top-level section"
pub const NO_PARENT: u32 = 0xFFFF_FFFF;

/// On-disk record sizes in bytes
pub const ASSET_ENTRY_SIZE: usize = 25;
pub const PAGE_ENTRY_SIZE: usize = 4;
pub const SECTION_ENTRY_SIZE: usize = 12;
pub const METADATA_ENTRY_SIZE: usize = 8;

/// Encoded image type of a stored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AssetType {
    Avif = 1,
    Png = 2,
}

impl AssetType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Avif),
            2 => Some(Self::Png),
            _ => None,
        }
    }

    /// Infer the type from a file extension: `.avif` is AVIF, everything else PNG
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("avif") => Self::Avif,
            _ => Self::Png,
        }
    }

    /// File extension used when extracting, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Png => "png",
        }
    }
}

/// Compute the 64-bit content hash (XXH3-64, seed 0) of an asset payload
pub fn content_hash(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data)
}

/// File header at the beginning of the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
        }
    }

    /// Write header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC_NUMBER)?;
        writer.write_all(&[self.version])?;
        Ok(())
    }

    /// Read header from a reader, rejecting a bad magic number
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_NUMBER {
            return Err(BbfError::InvalidHeaderMagic);
        }

        let version = read_u8(&mut reader)?;
        Ok(Self { version })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// One physically stored, deduplicated page payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetEntry {
    pub offset: u64,
    pub length: u64,
    pub hash: u64,
    /// Raw type byte; values other than 1 and 2 are reserved
    pub kind: u8,
}

impl AssetEntry {
    pub fn asset_type(&self) -> Option<AssetType> {
        AssetType::from_u8(self.kind)
    }

    /// Extension for extracted pages: `avif` for type 1, `png` otherwise
    pub fn extension(&self) -> &'static str {
        self.asset_type().unwrap_or(AssetType::Png).extension()
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.offset.to_le_bytes())?;
        writer.write_all(&self.length.to_le_bytes())?;
        writer.write_all(&self.hash.to_le_bytes())?;
        writer.write_all(&[self.kind])?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        Ok(Self {
            offset: read_u64(&mut reader)?,
            length: read_u64(&mut reader)?,
            hash: read_u64(&mut reader)?,
            kind: read_u8(&mut reader)?,
        })
    }
}

/// One logical page in reading order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    pub asset_index: u32,
}

impl PageEntry {
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.asset_index.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        Ok(Self {
            asset_index: read_u32(&mut reader)?,
        })
    }
}

/// Section marker as stored on disk
///
/// Sections carry no end page. The end of a section is derived from its next
/// sibling, see [`crate::sections::SectionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEntry {
    pub title_offset: u32,
    pub start_page: u32,
    pub parent: u32,
}

impl SectionEntry {
    pub fn parent_index(&self) -> Option<u32> {
        (self.parent != NO_PARENT).then_some(self.parent)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.title_offset.to_le_bytes())?;
        writer.write_all(&self.start_page.to_le_bytes())?;
        writer.write_all(&self.parent.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        Ok(Self {
            title_offset: read_u32(&mut reader)?,
            start_page: read_u32(&mut reader)?,
            parent: read_u32(&mut reader)?,
        })
    }
}

/// Key/value metadata pair, both sides pointing into the string pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key_offset: u32,
    pub value_offset: u32,
}

impl MetadataEntry {
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.key_offset.to_le_bytes())?;
        writer.write_all(&self.value_offset.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        Ok(Self {
            key_offset: read_u32(&mut reader)?,
            value_offset: read_u32(&mut reader)?,
        })
    }
}

// Helper functions for reading primitive types
pub(crate) fn read_u8<R: Read>(mut reader: R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32<R: Read>(mut reader: R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(mut reader: R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_from_u8() {
        assert_eq!(AssetType::from_u8(1), Some(AssetType::Avif));
        assert_eq!(AssetType::from_u8(2), Some(AssetType::Png));
        assert_eq!(AssetType::from_u8(0), None);
        assert_eq!(AssetType::from_u8(99), None);
    }

    #[test]
    fn test_asset_type_from_path() {
        assert_eq!(AssetType::from_path("pages/001.avif"), AssetType::Avif);
        assert_eq!(AssetType::from_path("pages/001.AVIF"), AssetType::Avif);
        assert_eq!(AssetType::from_path("pages/001.png"), AssetType::Png);
        // Unknown extensions fall back to PNG
        assert_eq!(AssetType::from_path("pages/001.jpg"), AssetType::Png);
        assert_eq!(AssetType::from_path("no_extension"), AssetType::Png);
    }

    #[test]
    fn test_reserved_type_extracts_as_png() {
        let asset = AssetEntry {
            offset: 4096,
            length: 10,
            hash: 0,
            kind: 7,
        };
        assert_eq!(asset.asset_type(), None);
        assert_eq!(asset.extension(), "png");
    }

    #[test]
    fn test_header_layout() {
        let mut buf = Vec::new();
        FileHeader::new().write_to(&mut buf).unwrap();
        assert_eq!(buf, b"BBF1\x01");
        assert_eq!(buf.len(), HEADER_SIZE);

        let parsed = FileHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed.version, FORMAT_VERSION);
    }

    #[test]
    fn test_header_bad_magic() {
        let result = FileHeader::read_from(&b"BBF2\x01"[..]);
        assert!(matches!(result, Err(BbfError::InvalidHeaderMagic)));
    }

    #[test]
    fn test_record_sizes() {
        let mut buf = Vec::new();
        AssetEntry {
            offset: 4096,
            length: 1234,
            hash: 0xDEAD_BEEF_CAFE_F00D,
            kind: AssetType::Avif as u8,
        }
        .write_to(&mut buf)
        .unwrap();
        assert_eq!(buf.len(), ASSET_ENTRY_SIZE);
        // Little-endian offset first, type byte last
        assert_eq!(&buf[..8], &4096u64.to_le_bytes());
        assert_eq!(buf[24], 1);

        buf.clear();
        PageEntry { asset_index: 3 }.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), PAGE_ENTRY_SIZE);

        buf.clear();
        SectionEntry {
            title_offset: 0,
            start_page: 5,
            parent: NO_PARENT,
        }
        .write_to(&mut buf)
        .unwrap();
        assert_eq!(buf.len(), SECTION_ENTRY_SIZE);
        assert_eq!(&buf[8..], &[0xFF; 4]);

        buf.clear();
        MetadataEntry {
            key_offset: 1,
            value_offset: 2,
        }
        .write_to(&mut buf)
        .unwrap();
        assert_eq!(buf.len(), METADATA_ENTRY_SIZE);
    }

    #[test]
    fn test_section_parent_sentinel() {
        let root = SectionEntry {
            title_offset: 0,
            start_page: 0,
            parent: NO_PARENT,
        };
        let child = SectionEntry { parent: 0, ..root };
        assert_eq!(root.parent_index(), None);
        assert_eq!(child.parent_index(), Some(0));
    }

    #[test]
    fn test_content_hash_is_xxh3() {
        // Reference value for XXH3-64 of the empty input with seed 0
        assert_eq!(content_hash(b""), 0x2D06_8005_38D3_94C2);
        assert_eq!(content_hash(b"page"), content_hash(b"page"));
        assert_ne!(content_hash(b"page 1"), content_hash(b"page 2"));
    }
}
