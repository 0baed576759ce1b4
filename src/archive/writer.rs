use crate::archive::footer::Footer;
use crate::archive::format::{
    content_hash, AssetEntry, AssetType, FileHeader, MetadataEntry, PageEntry, SectionEntry,
    HEADER_SIZE, NO_PARENT, SECTOR_ALIGNMENT,
};
use crate::archive::string_pool::StringPool;
use crate::error::{BbfError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ZERO_SECTOR: [u8; SECTOR_ALIGNMENT as usize] = [0u8; SECTOR_ALIGNMENT as usize];

/// Counts and size of a finalized archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub page_count: u32,
    pub asset_count: u32,
    pub section_count: u32,
    pub metadata_count: u32,
    pub file_size: u64,
}

/// Archive writer for creating .bbf files
///
/// Pages are deduplicated by content: a page whose bytes hash (and measure)
/// the same as an earlier one only adds a page entry pointing at the stored
/// asset. New assets start on a 4096-byte boundary.
pub struct BookWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    current_offset: u64,
    assets: Vec<AssetEntry>,
    pages: Vec<PageEntry>,
    sections: Vec<SectionEntry>,
    metadata: Vec<MetadataEntry>,
    strings: StringPool,
    /// Content hash -> indices of assets carrying that hash
    dedup: HashMap<u64, Vec<u32>>,
}

impl BookWriter {
    /// Create a new archive file and write its header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        FileHeader::new().write_to(&mut writer)?;

        Ok(Self {
            writer,
            path,
            current_offset: HEADER_SIZE as u64,
            assets: Vec::new(),
            pages: Vec::new(),
            sections: Vec::new(),
            metadata: Vec::new(),
            strings: StringPool::new(),
            dedup: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn asset_count(&self) -> u32 {
        self.assets.len() as u32
    }

    pub fn section_count(&self) -> u32 {
        self.sections.len() as u32
    }

    /// Read a page image from disk and add it; returns the page index
    pub fn add_page<P: AsRef<Path>>(&mut self, source: P, kind: AssetType) -> Result<u32> {
        let data = std::fs::read(source.as_ref())?;
        tracing::debug!(
            "Adding page {} from {}",
            self.pages.len(),
            source.as_ref().display()
        );
        self.add_page_bytes(&data, kind)
    }

    /// Add a page from raw image bytes; returns the page index
    pub fn add_page_bytes(&mut self, data: &[u8], kind: AssetType) -> Result<u32> {
        let page_index = u32::try_from(self.pages.len())
            .map_err(|_| BbfError::Validation("Too many pages".to_string()))?;

        let hash = content_hash(data);
        let length = data.len() as u64;

        let asset_index = match self.find_duplicate(hash, length) {
            Some(existing) => {
                tracing::debug!("Page {} reuses asset {}", page_index, existing);
                existing
            }
            None => self.write_asset(data, hash, kind)?,
        };

        self.pages.push(PageEntry { asset_index });
        Ok(page_index)
    }

    /// Find a stored asset with the same hash and length
    fn find_duplicate(&self, hash: u64, length: u64) -> Option<u32> {
        let candidates = self.dedup.get(&hash)?;
        let found = candidates
            .iter()
            .copied()
            .find(|&idx| self.assets[idx as usize].length == length);

        if found.is_none() {
            tracing::warn!(
                "Hash collision: {:016x} already stored with a different length, keeping both",
                hash
            );
        }
        found
    }

    fn write_asset(&mut self, data: &[u8], hash: u64, kind: AssetType) -> Result<u32> {
        let asset_index = u32::try_from(self.assets.len())
            .map_err(|_| BbfError::Validation("Too many assets".to_string()))?;

        self.align_to_sector()?;

        let offset = self.current_offset;
        self.writer.write_all(data)?;
        self.current_offset += data.len() as u64;

        self.assets.push(AssetEntry {
            offset,
            length: data.len() as u64,
            hash,
            kind: kind as u8,
        });
        self.dedup.entry(hash).or_default().push(asset_index);

        Ok(asset_index)
    }

    /// Zero-pad the write cursor up to the next sector boundary
    fn align_to_sector(&mut self) -> Result<()> {
        let padding = (SECTOR_ALIGNMENT - self.current_offset % SECTOR_ALIGNMENT) % SECTOR_ALIGNMENT;
        if padding > 0 {
            self.writer.write_all(&ZERO_SECTOR[..padding as usize])?;
            self.current_offset += padding;
        }
        Ok(())
    }

    /// Add a section marker; returns the section index
    ///
    /// `start_page` is 0-based. `parent` must name a section added earlier.
    /// The start page is checked against the final page count in
    /// [`BookWriter::finalize`].
    pub fn add_section(&mut self, title: &str, start_page: u32, parent: Option<u32>) -> Result<u32> {
        let section_index = self.section_count();

        if let Some(parent) = parent {
            if parent >= section_index {
                return Err(BbfError::Validation(format!(
                    "Section '{}' names parent {} which has not been added yet",
                    title, parent
                )));
            }
        }

        let title_offset = self.strings.intern(title)?;
        self.sections.push(SectionEntry {
            title_offset,
            start_page,
            parent: parent.unwrap_or(NO_PARENT),
        });

        Ok(section_index)
    }

    /// Add a metadata key/value pair (duplicate keys are kept as-is)
    pub fn add_metadata(&mut self, key: &str, value: &str) -> Result<()> {
        let key_offset = self.strings.intern(key)?;
        let value_offset = self.strings.intern(value)?;
        self.metadata.push(MetadataEntry {
            key_offset,
            value_offset,
        });
        Ok(())
    }

    /// Finalize the archive: string pool, tables, then footer
    ///
    /// A section starting past the last page fails the build. The partially
    /// written file is deleted in that case so no footerless archive is left
    /// at the output path.
    pub fn finalize(mut self) -> Result<BuildSummary> {
        if let Err(err) = self.check_sections() {
            self.discard()?;
            return Err(err);
        }

        let string_pool_offset = self.current_offset;
        self.writer.write_all(self.strings.as_bytes())?;
        self.current_offset += self.strings.len() as u64;

        let assets = std::mem::take(&mut self.assets);
        let asset_table_offset = self.write_table(&assets, |entry, w| entry.write_to(w))?;

        let pages = std::mem::take(&mut self.pages);
        let page_table_offset = self.write_table(&pages, |entry, w| entry.write_to(w))?;

        let sections = std::mem::take(&mut self.sections);
        let section_table_offset = self.write_table(&sections, |entry, w| entry.write_to(w))?;

        let metadata = std::mem::take(&mut self.metadata);
        let metadata_table_offset = self.write_table(&metadata, |entry, w| entry.write_to(w))?;

        let footer = Footer {
            string_pool_offset,
            asset_table_offset,
            page_table_offset,
            section_table_offset,
            metadata_table_offset,
            asset_count: assets.len() as u32,
            page_count: pages.len() as u32,
            section_count: sections.len() as u32,
            metadata_count: metadata.len() as u32,
        };

        let footer_len = footer.write_to(&mut self.writer)?;
        self.current_offset += footer_len as u64;
        self.writer.flush()?;

        let summary = BuildSummary {
            page_count: footer.page_count,
            asset_count: footer.asset_count,
            section_count: footer.section_count,
            metadata_count: footer.metadata_count,
            file_size: self.current_offset,
        };

        tracing::info!(
            "Finalized {}: {} pages, {} assets, {} bytes",
            self.path.display(),
            summary.page_count,
            summary.asset_count,
            summary.file_size
        );

        Ok(summary)
    }

    /// Every section must start at or before the page count
    fn check_sections(&self) -> Result<()> {
        let page_count = self.page_count();
        match self.sections.iter().find(|s| s.start_page > page_count) {
            Some(section) => Err(BbfError::Validation(format!(
                "Section '{}' starts at page index {} but the book has {} pages",
                self.strings.get(section.title_offset),
                section.start_page,
                page_count
            ))),
            None => Ok(()),
        }
    }

    /// Close and delete the unfinished output file
    fn discard(self) -> Result<()> {
        let Self { writer, path, .. } = self;
        drop(writer);
        std::fs::remove_file(&path)?;
        tracing::warn!("Removed unfinished archive {}", path.display());
        Ok(())
    }

    /// Serialize one fixed-record table at the current offset; returns that offset
    fn write_table<T>(
        &mut self,
        entries: &[T],
        write_entry: impl Fn(&T, &mut Vec<u8>) -> Result<()>,
    ) -> Result<u64> {
        let offset = self.current_offset;
        let mut buf = Vec::new();
        for entry in entries {
            write_entry(entry, &mut buf)?;
        }

        self.writer.write_all(&buf)?;
        self.current_offset += buf.len() as u64;
        tracing::debug!("Wrote {} records ({} bytes) at {}", entries.len(), buf.len(), offset);

        Ok(offset)
    }
}
