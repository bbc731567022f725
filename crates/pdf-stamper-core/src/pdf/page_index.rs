//! Page indices and page selection.
//!
//! Callers address pages with 0-based `usize` indices. [`PageIndex`] is an
//! index already checked against the document's page count, and
//! [`PageSelector`] decides which pages of a document get stamped.

use std::fmt;

use crate::error::Error;

/// A validated 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(u32);

impl PageIndex {
    /// Get the index as usize for Rust collections.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Try to create a PageIndex from a usize page number.
    ///
    /// Returns an error if the page number exceeds the total page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        let invalid = || Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        };

        if page_num >= total_pages {
            return Err(invalid());
        }

        // lopdf page numbers are u32 and 1-based, so the index must leave room for +1
        let index = u32::try_from(page_num)
            .ok()
            .filter(|&i| i < u32::MAX)
            .ok_or_else(invalid)?;

        Ok(Self(index))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which pages of a document receive stamping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelector {
    /// Only page 0
    #[default]
    FirstPageOnly,
    /// Every page
    AllPages,
    /// The listed 0-based indices, in order
    Indices(Vec<usize>),
}

impl PageSelector {
    /// Resolve to concrete page indices for a document with `page_count` pages.
    ///
    /// Out-of-range and repeated indices are dropped; a zero-page document
    /// always resolves to an empty list.
    pub fn resolve(&self, page_count: usize) -> Vec<PageIndex> {
        let candidates: Vec<usize> = match self {
            Self::FirstPageOnly => vec![0],
            Self::AllPages => (0..page_count).collect(),
            Self::Indices(indices) => indices.clone(),
        };

        let mut selected: Vec<PageIndex> = Vec::with_capacity(candidates.len());
        for page in candidates {
            match PageIndex::try_from_page_num(page, page_count) {
                Ok(index) if !selected.contains(&index) => selected.push(index),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping page selection: {}", e),
            }
        }
        selected
    }
}
