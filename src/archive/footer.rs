use crate::archive::format::{
    read_u32, read_u64, ASSET_ENTRY_SIZE, HEADER_SIZE, MAGIC_NUMBER, METADATA_ENTRY_SIZE,
    PAGE_ENTRY_SIZE, SECTION_ENTRY_SIZE,
};
use crate::error::{BbfError, Result};
use std::io::{Read, Write};

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 60;

/// Archive footer
///
/// Always the last [`FOOTER_SIZE`] bytes of the file and the sole source of
/// table locations, so readers locate everything by reading backwards from EOF.
///
/// Structure (60 bytes fixed):
/// - Magic: "BBF1" (4 bytes)
/// - String Pool Offset: uint64 (8 bytes)
/// - Asset Table Offset: uint64 (8 bytes)
/// - Page Table Offset: uint64 (8 bytes)
/// - Section Table Offset: uint64 (8 bytes)
/// - Metadata Table Offset: uint64 (8 bytes)
/// - Asset Count: uint32 (4 bytes)
/// - Page Count: uint32 (4 bytes)
/// - Section Count: uint32 (4 bytes)
/// - Metadata Count: uint32 (4 bytes)
///
/// The string pool has no recorded length: it runs from its offset up to the
/// asset table, which the writer always places directly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footer {
    pub string_pool_offset: u64,
    pub asset_table_offset: u64,
    pub page_table_offset: u64,
    pub section_table_offset: u64,
    pub metadata_table_offset: u64,
    pub asset_count: u32,
    pub page_count: u32,
    pub section_count: u32,
    pub metadata_count: u32,
}

impl Footer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte length of the string pool
    ///
    /// Only meaningful once [`Footer::validate`] has passed.
    pub fn string_pool_len(&self) -> u64 {
        self.asset_table_offset.saturating_sub(self.string_pool_offset)
    }

    /// Write footer to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(&MAGIC_NUMBER)?;

        writer.write_all(&self.string_pool_offset.to_le_bytes())?;
        writer.write_all(&self.asset_table_offset.to_le_bytes())?;
        writer.write_all(&self.page_table_offset.to_le_bytes())?;
        writer.write_all(&self.section_table_offset.to_le_bytes())?;
        writer.write_all(&self.metadata_table_offset.to_le_bytes())?;

        writer.write_all(&self.asset_count.to_le_bytes())?;
        writer.write_all(&self.page_count.to_le_bytes())?;
        writer.write_all(&self.section_count.to_le_bytes())?;
        writer.write_all(&self.metadata_count.to_le_bytes())?;

        Ok(FOOTER_SIZE)
    }

    /// Read footer from a reader
    ///
    /// Only the magic is checked here; call [`Footer::validate`] before
    /// trusting any offset.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC_NUMBER {
            return Err(BbfError::InvalidFooterMagic);
        }

        Ok(Self {
            string_pool_offset: read_u64(&mut reader)?,
            asset_table_offset: read_u64(&mut reader)?,
            page_table_offset: read_u64(&mut reader)?,
            section_table_offset: read_u64(&mut reader)?,
            metadata_table_offset: read_u64(&mut reader)?,
            asset_count: read_u32(&mut reader)?,
            page_count: read_u32(&mut reader)?,
            section_count: read_u32(&mut reader)?,
            metadata_count: read_u32(&mut reader)?,
        })
    }

    /// Check that the tables sit between the header and the footer in write
    /// order, and that each one fits before the next begins
    pub fn validate(&self, file_len: u64) -> Result<()> {
        let tables_end = file_len
            .checked_sub(FOOTER_SIZE as u64)
            .ok_or_else(|| BbfError::InvalidFormat("File too small for footer".to_string()))?;

        if self.string_pool_offset < HEADER_SIZE as u64 {
            return Err(BbfError::InvalidFormat(format!(
                "String pool offset {} overlaps the header",
                self.string_pool_offset
            )));
        }

        // (name, offset, bytes used by records); the pool fills its whole extent
        let tables = [
            ("string pool", self.string_pool_offset, 0),
            (
                "asset table",
                self.asset_table_offset,
                self.asset_count as u64 * ASSET_ENTRY_SIZE as u64,
            ),
            (
                "page table",
                self.page_table_offset,
                self.page_count as u64 * PAGE_ENTRY_SIZE as u64,
            ),
            (
                "section table",
                self.section_table_offset,
                self.section_count as u64 * SECTION_ENTRY_SIZE as u64,
            ),
            (
                "metadata table",
                self.metadata_table_offset,
                self.metadata_count as u64 * METADATA_ENTRY_SIZE as u64,
            ),
        ];

        for (position, &(name, offset, used)) in tables.iter().enumerate() {
            let (next_name, limit) = match tables.get(position + 1) {
                Some(&(next_name, next_offset, _)) => (next_name, next_offset),
                None => ("footer", tables_end),
            };

            if offset > limit {
                return Err(BbfError::InvalidFormat(format!(
                    "{} at {} lies after the {} at {}",
                    name, offset, next_name, limit
                )));
            }

            if offset.checked_add(used).map_or(true, |end| end > limit) {
                return Err(BbfError::InvalidFormat(format!(
                    "{} at {} needs {} bytes but the {} starts at {}",
                    name, offset, used, next_name, limit
                )));
            }
        }

        Ok(())
    }
}
