//! Generate seed corpus for fuzzing

use bbf_rs::{AssetType, BookWriter};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty book
    {
        let path = format!("{}/seed_empty.bbf", corpus_dir);
        let writer = BookWriter::create(&path)?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 2: Single page
    {
        let path = format!("{}/seed_single_page.bbf", corpus_dir);
        let mut writer = BookWriter::create(&path)?;
        writer.add_page_bytes(b"\x89PNG\r\n\x1a\nfake page", AssetType::Png)?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 3: Duplicate pages, mixed types
    {
        let path = format!("{}/seed_dedup.bbf", corpus_dir);
        let mut writer = BookWriter::create(&path)?;
        writer.add_page_bytes(b"cover", AssetType::Png)?;
        writer.add_page_bytes(b"inner page", AssetType::Avif)?;
        writer.add_page_bytes(b"cover", AssetType::Png)?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 4: Nested sections and metadata
    {
        let path = format!("{}/seed_sections.bbf", corpus_dir);
        let mut writer = BookWriter::create(&path)?;
        for i in 0..6u8 {
            writer.add_page_bytes(&[i; 32], AssetType::Png)?;
        }
        let volume = writer.add_section("Volume 1", 0, None)?;
        writer.add_section("Chapter 1", 0, Some(volume))?;
        writer.add_section("Chapter 2", 3, Some(volume))?;
        writer.add_section("Volume 2", 4, None)?;
        writer.add_metadata("Title", "Seed")?;
        writer.add_metadata("Author", "Fuzzer")?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    println!("\nGenerated 4 seed files in {}", corpus_dir);
    Ok(())
}
