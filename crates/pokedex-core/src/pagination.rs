//! Page arithmetic and the ellipsized page-button window.
//!
//! [`page_window`] decides which page buttons a pager shows. Short ranges are
//! listed in full; long ones keep the first page, the last page and a few
//! pages around the current one, with [`PageEntry::Ellipsis`] standing in for
//! every run of omitted pages.

use crate::{Error, Result};

/// Longest range shown without collapsing
pub const MAX_UNCOLLAPSED_PAGES: u32 = 7;

/// Sizes offered by the page size selector
pub const PAGE_SIZE_PRESETS: [u32; 5] = [5, 10, 20, 50, 100];

/// Largest custom page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// One button in the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    Page(u32),
    Ellipsis,
}

impl PageEntry {
    pub fn page(&self) -> Option<u32> {
        match self {
            PageEntry::Page(n) => Some(*n),
            PageEntry::Ellipsis => None,
        }
    }
}

/// Compute the page buttons for `current_page` out of `total_pages`.
///
/// `current_page` is clamped into `[1, total_pages]` first. Fails with
/// [`Error::InvalidArgument`] when `total_pages` is zero.
///
/// Every skipped range is marked with an ellipsis. This is stricter than
/// the older gap rule, which only looked at the distance from `current`
/// and so could drop a page silently: page 4 of 10 used to render
/// `1 3 4 5 … 10` and page 7 of 10 `1 … 6 7 8 10`. Here those become
/// `1 2 3 4 5 … 10` and `1 … 6 7 8 9 10`.
pub fn page_window(current_page: u32, total_pages: u32) -> Result<Vec<PageEntry>> {
    if total_pages < 1 {
        return Err(Error::InvalidArgument(
            "total pages must be at least 1".to_string(),
        ));
    }

    let current = current_page.clamp(1, total_pages);

    if total_pages <= MAX_UNCOLLAPSED_PAGES {
        return Ok((1..=total_pages).map(PageEntry::Page).collect());
    }

    let leading_gap = current > 4;
    let trailing_gap = current < total_pages - 3;

    // Window of current±1, stretched to reach page 5 near the start
    // and total-4 near the end
    let mut start = (current - 1).max(2).min(total_pages - 4).max(2);
    let mut end = (current + 1).min(total_pages - 1).max(5).min(total_pages - 1);

    // Without an ellipsis the window must touch the fixed page it borders
    if !leading_gap {
        start = 2;
    }
    if !trailing_gap {
        end = total_pages - 1;
    }

    let mut entries = Vec::with_capacity((end - start + 5) as usize);
    entries.push(PageEntry::Page(1));
    if leading_gap {
        entries.push(PageEntry::Ellipsis);
    }
    entries.extend((start..=end).map(PageEntry::Page));
    if trailing_gap {
        entries.push(PageEntry::Ellipsis);
    }
    entries.push(PageEntry::Page(total_pages));

    Ok(entries)
}

/// ceil(total / page_size)
pub fn total_pages(total: u64, page_size: u32) -> Result<u32> {
    if page_size == 0 {
        return Err(Error::InvalidArgument("page size must be at least 1".to_string()));
    }
    let size = u64::from(page_size);
    let pages = (total + size - 1) / size;
    Ok(u32::try_from(pages).unwrap_or(u32::MAX))
}

/// Keep `page` inside `[1, max(1, total_pages)]`
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

/// First and last item numbers shown on `page`, 1-based; `(0, 0)` when there is nothing
pub fn item_range(page: u32, page_size: u32, total: u64) -> (u64, u64) {
    if total == 0 || page_size == 0 {
        return (0, 0);
    }
    let page = u64::from(page.max(1));
    let size = u64::from(page_size);
    let first = (page - 1) * size + 1;
    if first > total {
        return (0, 0);
    }
    (first, (page * size).min(total))
}

/// "Showing 13 to 24 of 151 results"
pub fn summary(page: u32, page_size: u32, total: u64) -> String {
    let (first, last) = item_range(page, page_size, total);
    format!("Showing {} to {} of {} results", first, last, total)
}

pub fn has_previous(page: u32) -> bool {
    page > 1
}

pub fn has_next(page: u32, total_pages: u32) -> bool {
    page < total_pages
}

/// Accept a custom page size from the selector
pub fn validate_page_size(size: u32) -> Result<u32> {
    if (1..=MAX_PAGE_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(Error::InvalidArgument(format!(
            "page size must be between 1 and {}",
            MAX_PAGE_SIZE
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::PageEntry::{Ellipsis, Page};
    use super::*;

    fn pages(entries: &[PageEntry]) -> Vec<u32> {
        entries.iter().filter_map(PageEntry::page).collect()
    }

    fn ellipses(entries: &[PageEntry]) -> usize {
        entries.iter().filter(|e| **e == Ellipsis).count()
    }

    #[test]
    fn test_short_ranges_are_listed_in_full() {
        for total in 1..=7 {
            for current in 1..=total {
                let window = page_window(current, total).unwrap();
                assert_eq!(pages(&window), (1..=total).collect::<Vec<_>>());
                assert_eq!(ellipses(&window), 0);
            }
        }
    }

    #[test]
    fn test_first_page_of_ten() {
        let window = page_window(1, 10).unwrap();
        assert_eq!(window, vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]);
        assert_eq!(pages(&window).iter().filter(|p| **p == 10).count(), 1);
    }

    #[test]
    fn test_last_page_of_ten() {
        let window = page_window(10, 10).unwrap();
        assert_eq!(window, vec![Page(1), Ellipsis, Page(6), Page(7), Page(8), Page(9), Page(10)]);
    }

    #[test]
    fn test_middle_page_has_two_ellipses() {
        let window = page_window(5, 10).unwrap();
        assert_eq!(window, vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]);
    }

    #[test]
    fn test_no_unmarked_gaps_near_the_edges() {
        assert_eq!(
            page_window(4, 10).unwrap(),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_window(7, 10).unwrap(),
            vec![Page(1), Ellipsis, Page(6), Page(7), Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn test_every_gap_is_marked_and_pages_ascend() {
        for total in 8..=40 {
            for current in 1..=total {
                let window = page_window(current, total).unwrap();
                assert_eq!(window.first(), Some(&Page(1)));
                assert_eq!(window.last(), Some(&Page(total)));
                assert!(window.contains(&Page(current)));

                let mut previous = 0;
                let mut gap_open = false;
                for entry in &window {
                    match entry {
                        Page(n) => {
                            assert!(*n > previous, "pages must ascend: {:?}", window);
                            assert!(
                                *n == previous + 1 || gap_open,
                                "unmarked gap before {} in {:?}",
                                n,
                                window
                            );
                            previous = *n;
                            gap_open = false;
                        }
                        Ellipsis => gap_open = true,
                    }
                }
            }
        }
    }

    #[test]
    fn test_current_page_is_clamped() {
        assert_eq!(page_window(0, 3).unwrap(), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(page_window(99, 10).unwrap(), page_window(10, 10).unwrap());
    }

    #[test]
    fn test_zero_total_pages_is_rejected() {
        assert!(matches!(page_window(1, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_page_arithmetic() {
        assert_eq!(total_pages(0, 12).unwrap(), 0);
        assert_eq!(total_pages(24, 12).unwrap(), 2);
        assert_eq!(total_pages(25, 12).unwrap(), 3);
        assert!(total_pages(10, 0).is_err());

        assert_eq!(clamp_page(0, 0), 1);
        assert_eq!(clamp_page(9, 3), 3);

        assert_eq!(item_range(2, 12, 30), (13, 24));
        assert_eq!(item_range(3, 12, 30), (25, 30));
        assert_eq!(item_range(1, 12, 0), (0, 0));
        assert_eq!(summary(1, 10, 3), "Showing 1 to 3 of 3 results");

        assert!(!has_previous(1));
        assert!(has_next(1, 2));
        assert!(!has_next(2, 2));
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(validate_page_size(100).unwrap(), 100);
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(101).is_err());
        assert!(PAGE_SIZE_PRESETS.iter().all(|s| validate_page_size(*s).is_ok()));
    }
}
