use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u32 = 100;

/// A 1-based page request as it arrives from a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Resolves the request against a known item count.
    ///
    /// Out-of-range pages land on the last page instead of returning nothing.
    pub fn resolve(&self, total_items: u64) -> ResolvedPage {
        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        let total_pages = total_pages(total_items, per_page);
        let page = self.page.clamp(1, total_pages);
        ResolvedPage {
            page,
            per_page,
            total_pages,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub offset: u64,
}

impl ResolvedPage {
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

fn total_pages(total_items: u64, per_page: u32) -> u32 {
    let pages = total_items.div_ceil(u64::from(per_page)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, resolved: ResolvedPage, total_items: u64) -> Self {
        Self {
            items,
            page: resolved.page,
            per_page: resolved.per_page,
            total_items,
            total_pages: resolved.total_pages,
            has_next: resolved.page < resolved.total_pages,
            has_previous: resolved.page > 1,
        }
    }

    /// Pages an already-sorted in-memory collection.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let resolved = request.resolve(total_items);
        let items = all
            .into_iter()
            .skip(resolved.offset as usize)
            .take(resolved.per_page as usize)
            .collect();
        Self::new(items, resolved, total_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_page_lands_on_last_page() {
        let page = Page::from_vec((1..=25).collect::<Vec<u32>>(), PageRequest::new(9, 10));
        assert_eq!(page.page, 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let page = Page::from_vec(Vec::<u32>::new(), PageRequest::new(0, 12));
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_per_page_is_clamped() {
        let request = PageRequest::new(1, 10_000);
        assert_eq!(request.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(1, 0).per_page, 1);
    }

    #[test]
    fn test_resolve_offset() {
        let resolved = PageRequest::new(2, 12).resolve(30);
        assert_eq!(resolved.offset, 12);
        assert_eq!(resolved.total_pages, 3);
    }
}
