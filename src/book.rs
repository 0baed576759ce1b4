//! Whole-archive operations: build, info, verify, extract

use crate::archive::{BookReader, BookWriter, BuildSummary};
use crate::error::{BbfError, Result};
use crate::plan::BuildPlan;
use crate::sections::{resolve_requests, PageRange};
use crate::verify::{verify_assets, VerifyReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Build an archive at `output` from a plan
///
/// Section requests are resolved before the output file is created, so an
/// invalid plan leaves nothing behind.
pub fn build<P: AsRef<Path>>(output: P, plan: &BuildPlan) -> Result<BuildSummary> {
    let page_count = u32::try_from(plan.pages.len())
        .map_err(|_| BbfError::Validation("Too many pages".to_string()))?;
    let sections = resolve_requests(&plan.sections, page_count)?;

    let mut writer = BookWriter::create(output)?;

    for page in &plan.pages {
        writer.add_page(&page.path, page.asset_type())?;
    }

    for section in &sections {
        writer.add_section(&section.title, section.start_page, section.parent)?;
    }

    for meta in &plan.metadata {
        writer.add_metadata(&meta.key, &meta.value)?;
    }

    writer.finalize()
}

/// One section as shown by [`info`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub title: String,
    /// 1-based first page
    pub start_page: u32,
    pub depth: usize,
    pub parent: Option<u32>,
}

/// One metadata pair as shown by [`info`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataInfo {
    pub key: String,
    pub value: String,
}

/// Summary of an archive's structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInfo {
    pub version: u8,
    pub page_count: u32,
    pub asset_count: u32,
    pub sections: Vec<SectionInfo>,
    pub metadata: Vec<MetadataInfo>,
}

/// Describe an archive
///
/// Bad string offsets show up as `OFFSET_ERR` instead of failing the call.
pub fn info<P: AsRef<Path>>(path: P) -> Result<BookInfo> {
    let mut reader = BookReader::open(path)?;
    let tree = reader.section_tree()?;

    let sections = tree
        .iter()
        .enumerate()
        .map(|(index, section)| SectionInfo {
            title: section.title.clone(),
            start_page: section.start_page.saturating_add(1),
            depth: tree.depth(index),
            parent: section.parent,
        })
        .collect();

    let metadata = reader
        .metadata_pairs()?
        .into_iter()
        .map(|(key, value)| MetadataInfo { key, value })
        .collect();

    Ok(BookInfo {
        version: reader.version(),
        page_count: reader.page_count(),
        asset_count: reader.asset_count(),
        sections,
        metadata,
    })
}

/// Re-hash every asset of an archive
pub fn verify<P: AsRef<Path>>(path: P) -> Result<VerifyReport> {
    let mut reader = BookReader::open(path)?;
    verify_assets(&mut reader)
}

/// Outcome of an extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    pub range: PageRange,
    pub pages_written: u32,
    pub files: Vec<PathBuf>,
}

/// Write pages to `out_dir` as `page_<n>.<ext>`, `n` being the 1-based page number
///
/// With a section title only that section's pages (including nested
/// sections) are written. An unknown title fails before anything is created.
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    section: Option<&str>,
    out_dir: Q,
) -> Result<ExtractSummary> {
    let mut reader = BookReader::open(path)?;

    let range = match section {
        Some(title) => reader.section_tree()?.range_of(title)?,
        None => PageRange {
            start: 0,
            end: reader.page_count(),
        },
    };

    let pages = reader.pages()?;
    let assets = reader.assets()?;

    // Check every page before writing any file
    let mut selected = Vec::with_capacity(range.len() as usize);
    for page_index in range.pages() {
        let page = &pages[page_index as usize];
        let asset = assets.get(page.asset_index as usize).ok_or_else(|| {
            BbfError::InvalidFormat(format!(
                "Page {} references asset {} but only {} assets exist",
                page_index + 1,
                page.asset_index,
                assets.len()
            ))
        })?;
        selected.push((page_index, *asset));
    }

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let mut files = Vec::with_capacity(selected.len());
    for (page_index, asset) in selected {
        let data = reader.read_asset(&asset)?;
        let file = out_dir.join(format!("page_{}.{}", page_index + 1, asset.extension()));
        std::fs::write(&file, &data)?;
        files.push(file);
    }

    tracing::info!(
        "Extracted pages {} to {} into {}",
        range.start + 1,
        range.end,
        out_dir.display()
    );

    Ok(ExtractSummary {
        range,
        pages_written: files.len() as u32,
        files,
    })
}
