//! Asset integrity verification
//!
//! Every asset is re-read and re-hashed. Failures are collected rather than
//! returned early, so one damaged asset never hides another.

use crate::archive::format::{content_hash, AssetEntry};
use crate::archive::BookReader;
use crate::error::{BbfError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// A single asset that failed verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetMismatch {
    pub index: usize,
    pub message: String,
}

/// Result of verifying every asset in an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub assets_checked: usize,
    /// Failures in asset order
    pub mismatches: Vec<AssetMismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatched_indices(&self) -> Vec<usize> {
        self.mismatches.iter().map(|m| m.index).collect()
    }
}

/// Verify all assets of an open archive
///
/// Assets are hashed in parallel, each worker reading through its own file
/// handle. The report does not depend on scheduling.
pub fn verify_assets(reader: &mut BookReader) -> Result<VerifyReport> {
    let assets = reader.assets()?;
    let path = reader.path().to_path_buf();
    let file_len = std::fs::metadata(&path)?.len();

    let mismatches: Vec<AssetMismatch> = assets
        .par_iter()
        .enumerate()
        .map_init(
            || File::open(&path),
            |file, (index, asset)| {
                let outcome = match file {
                    Ok(file) => check_asset(file, file_len, index, asset),
                    Err(err) => Err(BbfError::Io(std::io::Error::new(err.kind(), err.to_string()))),
                };
                outcome.err().map(|err| AssetMismatch {
                    index,
                    message: err.to_string(),
                })
            },
        )
        .flatten()
        .collect();

    for mismatch in &mismatches {
        tracing::warn!("Asset {} failed verification: {}", mismatch.index, mismatch.message);
    }

    Ok(VerifyReport {
        assets_checked: assets.len(),
        mismatches,
    })
}

fn check_asset(file: &mut File, file_len: u64, index: usize, asset: &AssetEntry) -> Result<()> {
    let in_bounds = asset
        .offset
        .checked_add(asset.length)
        .is_some_and(|end| end <= file_len);
    if !in_bounds {
        return Err(BbfError::InvalidFormat(format!(
            "asset {} at {}+{} extends past end of file",
            index, asset.offset, asset.length
        )));
    }

    let mut data = vec![0u8; asset.length as usize];
    file.seek(SeekFrom::Start(asset.offset))?;
    file.read_exact(&mut data)?;

    let actual = content_hash(&data);
    if actual != asset.hash {
        return Err(BbfError::IntegrityMismatch {
            index,
            expected: asset.hash,
            actual,
        });
    }

    Ok(())
}
