//! Build plans
//!
//! A [`BuildPlan`] lists everything that goes into one archive: page sources
//! in book order, section requests, and metadata. Plans can be written by
//! hand as TOML:
//!
//! ```toml
//! [[pages]]
//! path = "cover.png"
//!
//! [[pages]]
//! path = "001.avif"
//! kind = "avif"
//!
//! [[sections]]
//! title = "Volume 1"
//! page = 1
//!
//! [[sections]]
//! title = "Chapter 1"
//! page = 1
//! parent = "Volume 1"
//!
//! [[metadata]]
//! key = "Title"
//! value = "Akira"
//! ```

use crate::archive::format::AssetType;
use crate::error::{BbfError, Result};
use crate::sections::{trim_quotes, SectionRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One page image to add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSource {
    pub path: PathBuf,
    /// Encoded type; inferred from the extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssetType>,
}

impl PageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: None,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        self.kind.unwrap_or_else(|| AssetType::from_path(&self.path))
    }
}

/// Metadata key/value pair to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRequest {
    pub key: String,
    pub value: String,
}

/// Everything needed to build one archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildPlan {
    #[serde(default)]
    pub pages: Vec<PageSource>,
    #[serde(default)]
    pub sections: Vec<SectionRequest>,
    #[serde(default)]
    pub metadata: Vec<MetadataRequest>,
}

impl BuildPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a plan file; relative page paths are taken relative to the plan's directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut plan = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            for page in &mut plan.pages {
                if page.path.is_relative() {
                    page.path = base.join(&page.path);
                }
            }
        }

        Ok(plan)
    }

    pub fn add_page(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.pages.push(PageSource::new(path));
        self
    }

    pub fn add_page_with_type(&mut self, path: impl Into<PathBuf>, kind: AssetType) -> &mut Self {
        self.pages.push(PageSource {
            path: path.into(),
            kind: Some(kind),
        });
        self
    }

    pub fn add_section(&mut self, request: SectionRequest) -> &mut Self {
        self.sections.push(request);
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metadata.push(MetadataRequest {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

/// Parses `Name:Page[:Parent]`, with a 1-based page and optional quotes around names
impl FromStr for SectionRequest {
    type Err = BbfError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 {
            return Err(BbfError::Config(format!(
                "Section '{}' must look like Name:Page[:Parent]",
                s
            )));
        }

        let page = parts[1].trim().parse::<u32>().map_err(|e| {
            BbfError::Config(format!("Section '{}' has invalid page '{}': {}", s, parts[1], e))
        })?;

        Ok(Self {
            title: trim_quotes(parts[0]).to_string(),
            page,
            parent: parts
                .get(2)
                .map(|p| trim_quotes(p))
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }
}

/// Parses `Key:Value`; the value may itself contain colons
impl FromStr for MetadataRequest {
    type Err = BbfError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s.split_once(':').ok_or_else(|| {
            BbfError::Config(format!("Metadata '{}' must look like Key:Value", s))
        })?;

        Ok(Self {
            key: trim_quotes(key).to_string(),
            value: trim_quotes(value).to_string(),
        })
    }
}
