//! Page-number pagination over newest-first listings.
//!
//! Requests for pages outside `1..=num_pages` are clamped to the nearest valid
//! page instead of failing, and an empty listing still has one (empty) page.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

pub const DEFAULT_PAGE_SIZE: PageSize = PageSize(NonZeroU64::new(10).unwrap());

/// Number of items shown per page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSize(NonZeroU64);

impl PageSize {
    #[must_use]
    pub const fn new(size: u64) -> Option<Self> {
        match NonZeroU64::new(size) {
            Some(size) => Some(Self(size)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl Default for PageSize {
    fn default() -> Self {
        DEFAULT_PAGE_SIZE
    }
}

/// The page a client asked for, 1-indexed. Not yet checked against the
/// number of pages actually available.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(i64);

impl PageNumber {
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(number: i64) -> Self {
        Self(number)
    }

    /// Read a `page` query parameter. Anything that is not an integer means
    /// the first page.
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|raw| raw.trim().parse().ok())
            .map_or(Self::FIRST, Self)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Position of one page inside a listing of known length.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    total_count: u64,
    page_size: PageSize,
}

impl PageWindow {
    #[must_use]
    pub fn locate(total_count: u64, page_size: PageSize, requested: PageNumber) -> Self {
        let num_pages = total_count.div_ceil(page_size.get()).max(1);
        let number = u64::try_from(requested.get())
            .unwrap_or(0)
            .clamp(1, num_pages);

        Self {
            number,
            num_pages,
            total_count,
            page_size,
        }
    }

    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    #[must_use]
    pub const fn num_pages(&self) -> u64 {
        self.num_pages
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Number of items preceding this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number - 1) * self.page_size.get()
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size.get()
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total_count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Pair a window with the items fetched for it.
    #[must_use]
    pub fn new(window: PageWindow, items: Vec<T>) -> Self {
        Self {
            items,
            number: window.number(),
            num_pages: window.num_pages(),
            total_count: window.total_count(),
            has_next: window.has_next(),
            has_previous: window.has_previous(),
        }
    }
}

/// Cut the requested page out of an already ordered collection.
#[must_use]
pub fn paginate<T>(collection: Vec<T>, page_size: PageSize, requested: PageNumber) -> Page<T> {
    let total_count = collection.len() as u64;
    let window = PageWindow::locate(total_count, page_size, requested);

    let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(window.limit()).unwrap_or(usize::MAX);
    let items = collection.into_iter().skip(offset).take(limit).collect();

    Page::new(window, items)
}
