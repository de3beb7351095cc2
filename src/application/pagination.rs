//! Page-number pagination shared by every listing surface.
//!
//! All listings are sliced into fixed pages of [`PAGE_SIZE`] items. Page
//! numbers resolve the way the listing contract requires: a missing or
//! unparseable number resolves to the first page, a number past the end
//! resolves to the last page, and an empty collection still yields one valid
//! empty page.

use serde::Serialize;

/// Fixed number of items per listing page.
pub const PAGE_SIZE: u32 = 10;

/// A requested page number, before clamping against the collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(u32);

impl PageNumber {
    pub fn new(number: u32) -> Self {
        Self(number.max(1))
    }

    /// Parse a raw query value; anything unusable means page one.
    pub fn from_query(raw: Option<&str>) -> Self {
        let number = raw
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(1);
        Self::new(number)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self(1)
    }
}

/// The resolved slice of a collection: which page to fetch and at what offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub offset: u64,
    pub limit: u32,
}

/// A bounded slice of an ordered listing plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Slices collections of a known total size into fixed windows.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Total number of pages; an empty collection still has one page.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        let size = u64::from(self.page_size);
        let pages = total_items.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Clamp the requested page into range and compute its fetch window.
    pub fn resolve(&self, total_items: u64, requested: PageNumber) -> PageWindow {
        let total_pages = self.total_pages(total_items);
        let number = requested.get().min(total_pages);
        PageWindow {
            number,
            offset: u64::from(number - 1) * u64::from(self.page_size),
            limit: self.page_size,
        }
    }

    /// Assemble the final page object from fetched items.
    pub fn assemble<T>(&self, items: Vec<T>, window: PageWindow, total_items: u64) -> Page<T> {
        Page {
            items,
            number: window.number,
            total_pages: self.total_pages(total_items),
            total_items,
        }
    }
}
