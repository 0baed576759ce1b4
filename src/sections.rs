//! Section hierarchy
//!
//! Sections form a forest stored as a flat table with back-pointers to their
//! parent. No section records its end page: a section runs until its next
//! sibling (the next later section with the same parent and a greater start
//! page) or to the end of the book, and never past the end of its parent.
//! Nested sub-sections therefore fall inside their parent's range.
//!
//! [`SectionTree`] resolves ranges on a loaded archive. [`resolve_requests`]
//! turns name-based requests into table entries at build time.

use crate::archive::format::{SectionEntry, NO_PARENT};
use crate::error::{BbfError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Strip one pair of surrounding double quotes, if present
pub fn trim_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Half-open, 0-based page range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn pages(&self) -> Range<u32> {
        self.start..self.end
    }
}

/// A section with its title resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    /// 0-based index of the first page
    pub start_page: u32,
    /// Index of the parent section; `None` for top-level sections
    pub parent: Option<u32>,
}

/// Loaded section forest with per-node child lists
///
/// Ranges and depths are computed once on load, so lookups never walk the
/// parent chain.
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    sections: Vec<Section>,
    children: Vec<Vec<u32>>,
    roots: Vec<u32>,
    ranges: Vec<PageRange>,
    depths: Vec<usize>,
    page_count: u32,
}

impl SectionTree {
    /// Build the tree from on-disk entries
    ///
    /// A parent that is neither the sentinel nor an earlier section cannot
    /// come from a well-formed archive; such sections are treated as
    /// top-level.
    pub fn from_entries(
        entries: &[SectionEntry],
        mut title_of: impl FnMut(u32) -> String,
        page_count: u32,
    ) -> Self {
        let mut sections = Vec::with_capacity(entries.len());
        let mut children = vec![Vec::new(); entries.len()];
        let mut roots = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let parent = match entry.parent {
                NO_PARENT => None,
                parent if (parent as usize) < index => Some(parent),
                parent => {
                    tracing::warn!(
                        "Section {} has invalid parent {}, treating it as top-level",
                        index,
                        parent
                    );
                    None
                }
            };

            match parent {
                Some(parent) => children[parent as usize].push(index as u32),
                None => roots.push(index as u32),
            }

            sections.push(Section {
                title: title_of(entry.title_offset),
                start_page: entry.start_page,
                parent,
            });
        }

        // End before the next later sibling that starts strictly later
        let mut sibling_end = vec![page_count; sections.len()];
        for siblings in children.iter().chain(std::iter::once(&roots)) {
            next_greater_start(siblings, &sections, page_count, &mut sibling_end);
        }

        // Parents precede children, so one forward pass sees every parent finished
        let mut ranges: Vec<PageRange> = Vec::with_capacity(sections.len());
        let mut depths: Vec<usize> = Vec::with_capacity(sections.len());
        for (index, section) in sections.iter().enumerate() {
            let (bound, depth) = match section.parent {
                Some(parent) => (ranges[parent as usize].end, depths[parent as usize] + 1),
                None => (page_count, 0),
            };

            let start = section.start_page.min(page_count);
            let end = sibling_end[index].min(bound).clamp(start, page_count);
            ranges.push(PageRange { start, end });
            depths.push(depth);
        }

        Self {
            sections,
            children,
            roots,
            ranges,
            depths,
            page_count,
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn roots(&self) -> &[u32] {
        &self.roots
    }

    pub fn children(&self, index: usize) -> &[u32] {
        &self.children[index]
    }

    /// Nesting depth; top-level sections are at depth 0
    pub fn depth(&self, index: usize) -> usize {
        self.depths[index]
    }

    /// Index of the first section whose title matches, ignoring surrounding quotes
    pub fn find(&self, title: &str) -> Result<usize> {
        let wanted = trim_quotes(title);
        self.sections
            .iter()
            .position(|s| trim_quotes(&s.title) == wanted)
            .ok_or_else(|| BbfError::SectionNotFound(wanted.to_string()))
    }

    /// Page range covered by the section at `index`, including its descendants
    ///
    /// A nested section never outlives its parent.
    pub fn range(&self, index: usize) -> PageRange {
        self.ranges[index]
    }

    /// Range of the section named `title`
    pub fn range_of(&self, title: &str) -> Result<PageRange> {
        self.find(title).map(|index| self.range(index))
    }
}

/// For each section in `siblings` (table order), record the start page of the
/// first later sibling with a strictly greater start
fn next_greater_start(
    siblings: &[u32],
    sections: &[Section],
    page_count: u32,
    sibling_end: &mut [u32],
) {
    let mut later_starts: Vec<u32> = Vec::new();
    for &index in siblings.iter().rev() {
        let start = sections[index as usize].start_page;
        while later_starts.last().is_some_and(|&s| s <= start) {
            later_starts.pop();
        }
        sibling_end[index as usize] = later_starts.last().copied().unwrap_or(page_count);
        later_starts.push(start);
    }
}

/// Name-based section request, as given on the command line or in a build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRequest {
    pub title: String,
    /// 1-based first page
    pub page: u32,
    /// Title of the parent section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl SectionRequest {
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Section ready to hand to the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSection {
    pub title: String,
    /// 0-based first page
    pub start_page: u32,
    /// Index into the resolved list; always smaller than this section's own index
    pub parent: Option<u32>,
}

/// Resolve parent names to table indices
///
/// All titles are collected first, so a parent may appear anywhere in the
/// request list. A parent name refers to the first request with that title.
/// The output keeps request order except that a parent is moved ahead of the
/// first child that needs it.
pub fn resolve_requests(requests: &[SectionRequest], page_count: u32) -> Result<Vec<ResolvedSection>> {
    // Pass 1: names
    let mut by_title: HashMap<&str, usize> = HashMap::new();
    for (index, request) in requests.iter().enumerate() {
        if request.page == 0 || request.page > page_count.saturating_add(1) {
            return Err(BbfError::Validation(format!(
                "Section '{}' starts at page {} but the book has {} pages",
                request.title, request.page, page_count
            )));
        }
        by_title.entry(request.title.as_str()).or_insert(index);
    }

    // Pass 2: parent links
    let mut parent_of = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let parent = match &request.parent {
            None => None,
            Some(name) => {
                let parent = *by_title.get(name.as_str()).ok_or_else(|| {
                    BbfError::Validation(format!(
                        "Section '{}' names unknown parent '{}'",
                        request.title, name
                    ))
                })?;
                if parent == index {
                    return Err(BbfError::Validation(format!(
                        "Section '{}' is its own parent",
                        request.title
                    )));
                }
                Some(parent)
            }
        };
        parent_of.push(parent);
    }

    // Emit parents before children
    let mut order = Vec::with_capacity(requests.len());
    let mut position: Vec<Option<u32>> = vec![None; requests.len()];
    let mut visiting = vec![false; requests.len()];
    for index in 0..requests.len() {
        emit(index, &parent_of, &mut visiting, &mut position, &mut order, requests)?;
    }

    Ok(order
        .into_iter()
        .map(|index| {
            let request = &requests[index];
            ResolvedSection {
                title: request.title.clone(),
                start_page: request.page - 1,
                parent: parent_of[index].and_then(|p| position[p]),
            }
        })
        .collect())
}

/// Place `index` in the output, pulling in any unplaced ancestors first
fn emit(
    index: usize,
    parent_of: &[Option<usize>],
    visiting: &mut [bool],
    position: &mut [Option<u32>],
    order: &mut Vec<usize>,
    requests: &[SectionRequest],
) -> Result<()> {
    // Walk up until a placed ancestor or a root
    let mut chain = Vec::new();
    let mut current = Some(index);
    while let Some(node) = current {
        if position[node].is_some() {
            break;
        }
        if visiting[node] {
            return Err(BbfError::Validation(format!(
                "Section '{}' is part of a parent cycle",
                requests[node].title
            )));
        }
        visiting[node] = true;
        chain.push(node);
        current = parent_of[node];
    }

    for &node in chain.iter().rev() {
        visiting[node] = false;
        position[node] = Some(order.len() as u32);
        order.push(node);
    }
    Ok(())
}
