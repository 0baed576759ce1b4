use crate::archive::footer::{Footer, FOOTER_SIZE};
use crate::archive::format::{
    AssetEntry, FileHeader, MetadataEntry, PageEntry, SectionEntry, ASSET_ENTRY_SIZE,
    HEADER_SIZE, METADATA_ENTRY_SIZE, PAGE_ENTRY_SIZE, SECTION_ENTRY_SIZE,
};
use crate::archive::string_pool::StringPool;
use crate::error::{BbfError, Result};
use crate::sections::SectionTree;
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Archive reader
///
/// Opening validates both magic numbers and the footer's table offsets, and
/// loads the string pool. Every other table is read from disk on each call.
pub struct BookReader {
    file: File,
    path: PathBuf,
    file_len: u64,
    header: FileHeader,
    footer: Footer,
    strings: StringPool,
}

impl BookReader {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();

        if file_len < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(BbfError::InvalidFormat(format!(
                "File is {} bytes, smaller than header and footer",
                file_len
            )));
        }

        // Read header
        file.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read_from(&mut file)?;

        // Read footer from the tail
        file.seek(SeekFrom::Start(file_len - FOOTER_SIZE as u64))?;
        let footer = Footer::read_from(&mut file)?;
        footer.validate(file_len)?;

        // Load string pool; it ends where the asset table begins
        let mut bytes = vec![0u8; footer.string_pool_len() as usize];
        file.seek(SeekFrom::Start(footer.string_pool_offset))?;
        file.read_exact(&mut bytes)?;
        let strings = StringPool::from_bytes(bytes);

        tracing::debug!(
            "Opened {}: v{}, {} pages, {} assets",
            path.display(),
            header.version,
            footer.page_count,
            footer.asset_count
        );

        Ok(Self {
            file,
            path,
            file_len,
            header,
            footer,
            strings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    pub fn page_count(&self) -> u32 {
        self.footer.page_count
    }

    pub fn asset_count(&self) -> u32 {
        self.footer.asset_count
    }

    pub fn section_count(&self) -> u32 {
        self.footer.section_count
    }

    pub fn metadata_count(&self) -> u32 {
        self.footer.metadata_count
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.strings
    }

    /// String at `offset`, or the `OFFSET_ERR` placeholder when out of bounds
    pub fn string(&self, offset: u32) -> Cow<'_, str> {
        self.strings.get(offset)
    }

    /// String at `offset`, failing on an out-of-bounds offset
    pub fn lookup_string(&self, offset: u32) -> Result<Cow<'_, str>> {
        self.strings.lookup(offset)
    }

    pub fn assets(&mut self) -> Result<Vec<AssetEntry>> {
        let (offset, count) = (self.footer.asset_table_offset, self.footer.asset_count);
        self.read_table(offset, count, ASSET_ENTRY_SIZE, |r| AssetEntry::read_from(r))
    }

    pub fn pages(&mut self) -> Result<Vec<PageEntry>> {
        let (offset, count) = (self.footer.page_table_offset, self.footer.page_count);
        self.read_table(offset, count, PAGE_ENTRY_SIZE, |r| PageEntry::read_from(r))
    }

    pub fn sections(&mut self) -> Result<Vec<SectionEntry>> {
        let (offset, count) = (self.footer.section_table_offset, self.footer.section_count);
        self.read_table(offset, count, SECTION_ENTRY_SIZE, |r| SectionEntry::read_from(r))
    }

    pub fn metadata(&mut self) -> Result<Vec<MetadataEntry>> {
        let (offset, count) = (self.footer.metadata_table_offset, self.footer.metadata_count);
        self.read_table(offset, count, METADATA_ENTRY_SIZE, |r| MetadataEntry::read_from(r))
    }

    /// Metadata with keys and values resolved through the string pool
    pub fn metadata_pairs(&mut self) -> Result<Vec<(String, String)>> {
        let entries = self.metadata()?;
        Ok(entries
            .iter()
            .map(|m| {
                (
                    self.string(m.key_offset).into_owned(),
                    self.string(m.value_offset).into_owned(),
                )
            })
            .collect())
    }

    /// Load the section table and build its hierarchy
    pub fn section_tree(&mut self) -> Result<SectionTree> {
        let entries = self.sections()?;
        Ok(SectionTree::from_entries(
            &entries,
            |offset| self.string(offset).into_owned(),
            self.page_count(),
        ))
    }

    /// Read an asset's payload bytes
    pub fn read_asset(&mut self, asset: &AssetEntry) -> Result<Vec<u8>> {
        let in_bounds = asset
            .offset
            .checked_add(asset.length)
            .is_some_and(|end| end <= self.file_len);
        if !in_bounds {
            return Err(BbfError::InvalidFormat(format!(
                "Asset at {} with length {} extends past end of file ({} bytes)",
                asset.offset, asset.length, self.file_len
            )));
        }

        self.file.seek(SeekFrom::Start(asset.offset))?;
        let mut data = vec![0u8; asset.length as usize];
        self.file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read the whole table in one go and decode `count` fixed-size records
    fn read_table<T>(
        &mut self,
        offset: u64,
        count: u32,
        record_size: usize,
        read_entry: impl Fn(&mut &[u8]) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut buf = vec![0u8; count as usize * record_size];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;

        let mut cursor = &buf[..];
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(read_entry(&mut cursor)?);
        }

        Ok(entries)
    }
}
