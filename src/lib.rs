//! bbf-rs: Bound Book Format container library
//!
//! BBF packs the page images of a scanned book or comic into one seekable
//! archive:
//! - Content-addressed deduplication of identical pages (XXH3-64)
//! - 4 KiB aligned asset payloads
//! - Per-asset integrity verification
//! - A forest of named sections (volumes, chapters) for partial extraction
//! - Free-form key/value metadata
//!
//! The footer at the end of the file locates every table, so archives are
//! read backwards from EOF.
//!
//! # Example
//!
//! ```no_run
//! use bbf_rs::{AssetType, BookReader, BookWriter};
//!
//! // Create an archive
//! let mut writer = BookWriter::create("book.bbf")?;
//! writer.add_page("cover.png", AssetType::Png)?;
//! writer.add_page("001.avif", AssetType::Avif)?;
//! let volume = writer.add_section("Volume 1", 0, None)?;
//! writer.add_section("Chapter 1", 1, Some(volume))?;
//! writer.add_metadata("Title", "Akira")?;
//! writer.finalize()?;
//!
//! // Read it back
//! let mut reader = BookReader::open("book.bbf")?;
//! let range = reader.section_tree()?.range_of("Chapter 1")?;
//! assert_eq!((range.start, range.end), (1, 2));
//! # Ok::<(), bbf_rs::BbfError>(())
//! ```

// Core modules
pub mod archive;
pub mod book;
pub mod error;
pub mod plan;
pub mod sections;
pub mod verify;

// Re-export commonly used types
pub use archive::{
    content_hash, AssetEntry, AssetType, BookReader, BookWriter, BuildSummary, FileHeader,
    Footer, MetadataEntry, PageEntry, SectionEntry, FOOTER_SIZE, FORMAT_VERSION, HEADER_SIZE,
    MAGIC_NUMBER, NO_PARENT, OFFSET_ERROR, SECTOR_ALIGNMENT,
};
pub use book::{build, extract, info, verify, BookInfo, ExtractSummary, MetadataInfo, SectionInfo};
pub use error::{BbfError, Result};
pub use plan::{BuildPlan, MetadataRequest, PageSource};
pub use sections::{PageRange, Section, SectionRequest, SectionTree};
pub use verify::{AssetMismatch, VerifyReport};
