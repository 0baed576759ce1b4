//! Integration tests for bbf-rs

use bbf_rs::{
    AssetType, BookReader, BookWriter, BuildPlan, SectionRequest, NO_PARENT, SECTOR_ALIGNMENT,
};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// Helper: deterministic page bytes that differ per seed
fn page_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Helper: write page images into `dir` and return their paths
fn write_pages(dir: &Path, pages: &[(&str, Vec<u8>)]) -> Vec<PathBuf> {
    pages
        .iter()
        .map(|(name, data)| {
            let path = dir.join(name);
            std::fs::write(&path, data).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_basic_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let archive_path = temp_file.path();

    let cover = page_bytes(1, 5000);
    let inner = page_bytes(2, 123);

    // Create archive
    {
        let mut writer = BookWriter::create(archive_path).unwrap();
        assert_eq!(writer.add_page_bytes(&cover, AssetType::Png).unwrap(), 0);
        assert_eq!(writer.add_page_bytes(&inner, AssetType::Avif).unwrap(), 1);
        writer.add_metadata("Title", "Akira").unwrap();
        let summary = writer.finalize().unwrap();

        assert_eq!(summary.page_count, 2);
        assert_eq!(summary.asset_count, 2);
        assert_eq!(summary.metadata_count, 1);
        assert_eq!(
            summary.file_size,
            std::fs::metadata(archive_path).unwrap().len()
        );
    }

    // Read archive
    {
        let mut reader = BookReader::open(archive_path).unwrap();
        assert_eq!(reader.version(), 1);
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.asset_count(), 2);

        let assets = reader.assets().unwrap();
        assert_eq!(assets[0].asset_type(), Some(AssetType::Png));
        assert_eq!(assets[1].asset_type(), Some(AssetType::Avif));

        assert_eq!(reader.read_asset(&assets[0]).unwrap(), cover);
        assert_eq!(reader.read_asset(&assets[1]).unwrap(), inner);

        let pairs = reader.metadata_pairs().unwrap();
        assert_eq!(pairs, vec![("Title".to_string(), "Akira".to_string())]);
    }
}

#[test]
fn test_extract_full_book_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let pages = vec![
        ("001.png", page_bytes(1, 4096)),
        ("002.avif", page_bytes(2, 10_000)),
        ("003.png", page_bytes(3, 1)),
        ("004.AVIF", page_bytes(4, 777)),
    ];
    let sources = write_pages(dir.path(), &pages);

    let archive = dir.path().join("book.bbf");
    let mut plan = BuildPlan::new();
    for source in &sources {
        plan.add_page(source);
    }
    bbf_rs::build(&archive, &plan).unwrap();

    let out_dir = dir.path().join("out");
    let summary = bbf_rs::extract(&archive, None, &out_dir).unwrap();
    assert_eq!(summary.pages_written, 4);
    assert_eq!(summary.range.start, 0);
    assert_eq!(summary.range.end, 4);

    let expected = [
        ("page_1.png", &pages[0].1),
        ("page_2.avif", &pages[1].1),
        ("page_3.png", &pages[2].1),
        ("page_4.avif", &pages[3].1),
    ];
    for (name, data) in expected {
        let extracted = std::fs::read(out_dir.join(name)).unwrap();
        assert_eq!(&extracted, data, "{} differs", name);
    }
}

#[test]
fn test_duplicate_pages_share_one_asset() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let a = page_bytes(10, 2000);
    let b = page_bytes(11, 2000);
    let c = page_bytes(12, 300);

    let mut writer = BookWriter::create(path).unwrap();
    for data in [&a, &b, &a, &c, &b, &a] {
        writer.add_page_bytes(data, AssetType::Png).unwrap();
    }
    assert_eq!(writer.asset_count(), 3);
    writer.finalize().unwrap();

    let mut reader = BookReader::open(path).unwrap();
    assert_eq!(reader.page_count(), 6);
    assert_eq!(reader.asset_count(), 3);

    let pages = reader.pages().unwrap();
    let indices: Vec<u32> = pages.iter().map(|p| p.asset_index).collect();
    assert_eq!(indices, vec![0, 1, 0, 2, 1, 0]);

    // Each distinct payload is stored once
    let assets = reader.assets().unwrap();
    assert_eq!(reader.read_asset(&assets[0]).unwrap(), a);
    assert_eq!(reader.read_asset(&assets[1]).unwrap(), b);
    assert_eq!(reader.read_asset(&assets[2]).unwrap(), c);
}

#[test]
fn test_distinct_pages_are_not_merged() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut writer = BookWriter::create(path).unwrap();
    for seed in 0..5 {
        writer
            .add_page_bytes(&page_bytes(seed, 100), AssetType::Png)
            .unwrap();
    }
    let summary = writer.finalize().unwrap();
    assert_eq!(summary.page_count, summary.asset_count);
}

#[test]
fn test_assets_are_sector_aligned() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let sizes = [1usize, 4095, 4096, 4097, 10_000, 17];
    let mut writer = BookWriter::create(path).unwrap();
    for (seed, &size) in sizes.iter().enumerate() {
        writer
            .add_page_bytes(&page_bytes(seed as u8, size), AssetType::Png)
            .unwrap();
    }
    writer.finalize().unwrap();

    let mut reader = BookReader::open(path).unwrap();
    let assets = reader.assets().unwrap();
    assert_eq!(assets.len(), sizes.len());

    for (asset, &size) in assets.iter().zip(&sizes) {
        assert_eq!(asset.offset % SECTOR_ALIGNMENT, 0);
        assert_eq!(asset.length, size as u64);
    }

    // Padding between assets is zero-filled
    let raw = std::fs::read(path).unwrap();
    let first_end = (assets[0].offset + assets[0].length) as usize;
    let second_start = assets[1].offset as usize;
    assert!(raw[first_end..second_start].iter().all(|&b| b == 0));
    assert!(raw[5..assets[0].offset as usize].iter().all(|&b| b == 0));
}

#[test]
fn test_empty_book() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let summary = BookWriter::create(path).unwrap().finalize().unwrap();
    assert_eq!(summary.page_count, 0);

    let info = bbf_rs::info(path).unwrap();
    assert_eq!(info.page_count, 0);
    assert_eq!(info.asset_count, 0);
    assert!(info.sections.is_empty());
    assert!(info.metadata.is_empty());

    assert!(bbf_rs::verify(path).unwrap().is_clean());
}

#[test]
fn test_tables_are_rereadable() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut writer = BookWriter::create(path).unwrap();
    writer.add_page_bytes(b"one", AssetType::Png).unwrap();
    writer.add_section("Only", 0, None).unwrap();
    writer.finalize().unwrap();

    let mut reader = BookReader::open(path).unwrap();
    let first = reader.sections().unwrap();
    let _ = reader.assets().unwrap();
    let second = reader.sections().unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].parent, NO_PARENT);
    assert_eq!(reader.string(first[0].title_offset), "Only");
}

#[test]
fn test_info_reports_structure() {
    let dir = TempDir::new().unwrap();
    let sources = write_pages(
        dir.path(),
        &[
            ("a.png", page_bytes(1, 50)),
            ("b.png", page_bytes(2, 50)),
            ("c.png", page_bytes(1, 50)),
        ],
    );

    let mut plan = BuildPlan::new();
    for source in &sources {
        plan.add_page(source);
    }
    plan.add_section(SectionRequest::new("Volume 1", 1))
        .add_section(SectionRequest::new("Chapter 1", 2).with_parent("Volume 1"))
        .add_metadata("Title", "Akira")
        .add_metadata("Author", "Otomo")
        .add_metadata("Title", "AKIRA");

    let archive = dir.path().join("book.bbf");
    bbf_rs::build(&archive, &plan).unwrap();

    let info = bbf_rs::info(&archive).unwrap();
    assert_eq!(info.version, 1);
    assert_eq!(info.page_count, 3);
    assert_eq!(info.asset_count, 2);

    assert_eq!(info.sections.len(), 2);
    assert_eq!(info.sections[0].title, "Volume 1");
    assert_eq!(info.sections[0].start_page, 1);
    assert_eq!(info.sections[0].depth, 0);
    assert_eq!(info.sections[1].title, "Chapter 1");
    assert_eq!(info.sections[1].start_page, 2);
    assert_eq!(info.sections[1].depth, 1);
    assert_eq!(info.sections[1].parent, Some(0));

    // Duplicate keys are kept in insertion order
    let keys: Vec<&str> = info.metadata.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["Title", "Author", "Title"]);
    assert_eq!(info.metadata[2].value, "AKIRA");
}

#[test]
fn test_build_from_toml_plan() {
    let dir = TempDir::new().unwrap();
    write_pages(
        dir.path(),
        &[("p1.png", page_bytes(1, 10)), ("p2.bin", page_bytes(2, 10))],
    );

    let plan_path = dir.path().join("book.toml");
    std::fs::write(
        &plan_path,
        r#"
        [[pages]]
        path = "p1.png"

        [[pages]]
        path = "p2.bin"
        kind = "avif"

        [[sections]]
        title = "Everything"
        page = 1
        "#,
    )
    .unwrap();

    let plan = BuildPlan::load(&plan_path).unwrap();
    let archive = dir.path().join("book.bbf");
    let summary = bbf_rs::build(&archive, &plan).unwrap();
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.section_count, 1);

    let out_dir = dir.path().join("out");
    bbf_rs::extract(&archive, Some("Everything"), &out_dir).unwrap();
    assert!(out_dir.join("page_1.png").exists());
    assert!(out_dir.join("page_2.avif").exists());
}

#[test]
fn test_missing_source_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut writer = BookWriter::create(dir.path().join("book.bbf")).unwrap();
    let result = writer.add_page(dir.path().join("missing.png"), AssetType::Png);
    assert!(matches!(result, Err(bbf_rs::BbfError::Io(_))));
}

#[test]
fn test_create_in_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let result = BookWriter::create(dir.path().join("no/such/dir/book.bbf"));
    assert!(matches!(result, Err(bbf_rs::BbfError::Io(_))));
}
