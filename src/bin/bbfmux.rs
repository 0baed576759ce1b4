//! bbfmux: create, inspect, verify and extract Bound Book Format archives
//!
//! ```text
//! bbfmux <inputs...> [--section=Name:Page[:Parent]] [--meta=Key:Value] <output.bbf>
//! bbfmux <file.bbf> --info [--json]
//! bbfmux <file.bbf> --verify
//! bbfmux <file.bbf> --extract [--outdir=path] [--section=Name]
//! ```
use anyhow::{bail, Context, Result};
use bbf_rs::sections::trim_quotes;
use bbf_rs::{BookInfo, BuildPlan, MetadataRequest, PageSource, SectionRequest};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bbfmux", version, about = "Bound Book Format muxer")]
struct Cli {
    /// Image files (.png, .avif) or directories followed by the output .bbf,
    /// or a single .bbf with --info/--verify/--extract
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Display book structure and metadata
    #[arg(long)]
    info: bool,

    /// Print --info output as JSON
    #[arg(long, requires = "info")]
    json: bool,

    /// Check the XXH3 hash of every asset
    #[arg(long)]
    verify: bool,

    /// Extract pages
    #[arg(long)]
    extract: bool,

    /// Output directory for --extract
    #[arg(long, default_value = "./extracted")]
    outdir: PathBuf,

    /// Name:Page[:Parent] when building (1-based page); Name when extracting
    #[arg(long = "section")]
    sections: Vec<String>,

    /// Key:Value metadata to store
    #[arg(long = "meta")]
    metadata: Vec<String>,

    /// TOML build plan; command line pages, sections and metadata are appended
    #[arg(long)]
    plan: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.info || cli.verify || cli.extract {
        read_mode(&cli)
    } else {
        build_mode(cli)
    }
}

fn read_mode(cli: &Cli) -> Result<ExitCode> {
    let archive = &cli.inputs[0];
    let mut code = ExitCode::SUCCESS;

    if cli.info {
        let info = bbf_rs::info(archive)
            .with_context(|| format!("Failed to open {}", archive.display()))?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_info(&info);
        }
    }

    if cli.verify {
        println!("Verifying asset integrity...");
        let report = bbf_rs::verify(archive)
            .with_context(|| format!("Failed to verify {}", archive.display()))?;
        for mismatch in &report.mismatches {
            eprintln!("Mismatch in asset {}: {}", mismatch.index, mismatch.message);
        }
        if report.is_clean() {
            println!("Integrity Check Passed ({} assets).", report.assets_checked);
        } else {
            println!(
                "Integrity Check Failed: {} of {} assets damaged.",
                report.mismatches.len(),
                report.assets_checked
            );
            code = ExitCode::FAILURE;
        }
    }

    if cli.extract {
        let section = cli.sections.first().map(|s| trim_quotes(s));
        let summary = bbf_rs::extract(archive, section, &cli.outdir)
            .with_context(|| format!("Failed to extract {}", archive.display()))?;
        println!(
            "Extracted {} pages (Pages {} to {}) to {}.",
            summary.pages_written,
            summary.range.start + 1,
            summary.range.end,
            cli.outdir.display()
        );
    }

    Ok(code)
}

fn build_mode(cli: Cli) -> Result<ExitCode> {
    let mut plan = match &cli.plan {
        Some(path) => BuildPlan::load(path)
            .with_context(|| format!("Failed to load plan {}", path.display()))?,
        None => BuildPlan::new(),
    };

    let mut inputs = cli.inputs;
    let output = match inputs.pop() {
        Some(output) if !inputs.is_empty() || !plan.pages.is_empty() => output,
        _ => bail!("Provide inputs and an output filename"),
    };

    for path in collect_images(&inputs)? {
        plan.pages.push(PageSource::new(path));
    }

    for section in &cli.sections {
        plan.sections.push(section.parse::<SectionRequest>()?);
    }

    for meta in &cli.metadata {
        plan.metadata.push(meta.parse::<MetadataRequest>()?);
    }

    let summary = bbf_rs::build(&output, &plan)
        .with_context(|| format!("Failed to build {}", output.display()))?;

    println!(
        "Successfully created {} ({} pages, {} assets)",
        output.display(),
        summary.page_count,
        summary.asset_count
    );
    Ok(ExitCode::SUCCESS)
}

/// Expand directories (one level, regular files only) and sort everything by path
fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in std::fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
            {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    images.push(entry.path());
                }
            }
        } else {
            images.push(input.clone());
        }
    }
    images.sort();
    Ok(images)
}

fn print_info(info: &BookInfo) {
    println!("Bound Book Format (.bbf) Info");
    println!("------------------------------");
    println!("BBF Version: {}", info.version);
    println!("Pages:       {}", info.page_count);
    println!("Assets:      {} (Deduplicated)", info.asset_count);

    println!("\n[Sections]");
    if info.sections.is_empty() {
        println!(" No sections defined.");
    }
    for section in &info.sections {
        let indent = "  ".repeat(section.depth);
        println!(
            " {}- {:<20} (Starting Page: {})",
            indent, section.title, section.start_page
        );
    }

    println!("\n[Metadata]");
    if info.metadata.is_empty() {
        println!(" No metadata found.");
    }
    for meta in &info.metadata {
        println!(" - {:<15}{}", format!("{}:", meta.key), meta.value);
    }
    println!();
}
