pub mod format;
mod footer;
mod reader;
mod string_pool;
mod writer;

pub use footer::{Footer, FOOTER_SIZE};
pub use format::{
    content_hash, AssetEntry, AssetType, FileHeader, MetadataEntry, PageEntry, SectionEntry,
    ASSET_ENTRY_SIZE, FORMAT_VERSION, HEADER_SIZE, MAGIC_NUMBER, METADATA_ENTRY_SIZE, NO_PARENT,
    PAGE_ENTRY_SIZE, SECTION_ENTRY_SIZE, SECTOR_ALIGNMENT,
};
pub use reader::BookReader;
pub use string_pool::{StringPool, OFFSET_ERROR};
pub use writer::{BookWriter, BuildSummary};
