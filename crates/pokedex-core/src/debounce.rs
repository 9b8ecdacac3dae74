// Search box debouncing and filter state transitions
use std::time::{Duration, Instant};

use tracing::debug;

use crate::filter::{FilterState, SortKey, SortOrder};
use crate::models::PokemonType;
use crate::pagination::validate_page_size;
use crate::Result;

/// Quiet period before typed text becomes the active search
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Owns the active [`FilterState`] and the not-yet-committed search text.
///
/// Time is passed in rather than read so the event loop can sleep until
/// [`FilterController::next_deadline`] and tests stay deterministic. Every
/// mutating method returns `true` when the committed filter changed, which
/// is the caller's cue to fetch.
#[derive(Debug, Clone)]
pub struct FilterController {
    pending: String,
    committed: FilterState,
    deadline: Option<Instant>,
    quiet: Duration,
}

impl FilterController {
    pub fn new(initial: FilterState, quiet: Duration) -> Self {
        Self {
            pending: initial.search.clone(),
            committed: initial,
            deadline: None,
            quiet,
        }
    }

    /// The filter the list is currently showing
    pub fn filter(&self) -> &FilterState {
        &self.committed
    }

    /// What the search box displays, committed or not
    pub fn pending_text(&self) -> &str {
        &self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Every keystroke restarts the quiet period; an empty box clears at once
    pub fn on_keystroke(&mut self, text: impl Into<String>, now: Instant) -> bool {
        self.pending = text.into();

        if self.pending.is_empty() {
            return self.clear_search();
        }

        self.deadline = Some(now + self.quiet);
        false
    }

    /// Commit pending text if the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                let text = self.pending.clone();
                debug!("Committing search '{}'", text);
                self.commit(|f| f.search = text)
            }
            _ => false,
        }
    }

    /// Commit pending text right away (Enter in the search box)
    pub fn flush(&mut self) -> bool {
        if self.deadline.take().is_none() {
            return false;
        }
        let text = self.pending.clone();
        self.commit(|f| f.search = text)
    }

    pub fn clear_search(&mut self) -> bool {
        self.pending.clear();
        self.deadline = None;
        self.commit(|f| f.search.clear())
    }

    /// Reset every narrowing filter; page size and sort survive
    pub fn clear_filters(&mut self) -> bool {
        self.pending.clear();
        self.deadline = None;
        self.commit(|f| {
            f.search.clear();
            f.pokemon_type = None;
            f.ability_ids.clear();
        })
    }

    /// Applies immediately; picking the active type turns the filter off
    pub fn select_type(&mut self, pokemon_type: Option<PokemonType>) -> bool {
        let next = match pokemon_type {
            Some(t) if self.committed.pokemon_type == Some(t) => None,
            other => other,
        };
        self.commit(|f| f.pokemon_type = next)
    }

    pub fn set_sort(&mut self, sort_by: Option<SortKey>, order: SortOrder) -> bool {
        self.commit(|f| {
            f.sort_by = sort_by;
            f.order = order;
        })
    }

    pub fn set_ability_ids(&mut self, mut ids: Vec<u32>) -> bool {
        ids.sort_unstable();
        ids.dedup();
        self.commit(|f| f.ability_ids = ids)
    }

    pub fn set_page_size(&mut self, size: u32) -> Result<bool> {
        let size = validate_page_size(size)?;
        Ok(self.commit(|f| f.page_size = size))
    }

    /// Page moves keep the rest of the filter; pages start at 1
    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if self.committed.page == page {
            return false;
        }
        self.committed.page = page;
        true
    }

    pub fn next_page(&mut self, total_pages: u32) -> bool {
        if self.committed.page >= total_pages {
            return false;
        }
        self.set_page(self.committed.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.set_page(self.committed.page.saturating_sub(1))
    }

    /// Swap in a whole state, e.g. one restored from a URL
    pub fn replace(&mut self, state: FilterState) -> bool {
        self.pending = state.search.clone();
        self.deadline = None;
        if self.committed == state {
            return false;
        }
        self.committed = state;
        true
    }

    /// Apply a filter change; narrowing changes send the view back to page 1
    fn commit<F: FnOnce(&mut FilterState)>(&mut self, change: F) -> bool {
        let mut next = self.committed.clone();
        change(&mut next);
        next.page = 1;

        let mut unchanged = self.committed.clone();
        unchanged.page = 1;
        if next == unchanged {
            return false;
        }

        self.committed = next;
        true
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new(FilterState::default(), DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_rapid_keystrokes_commit_once_with_final_value() {
        let start = Instant::now();
        let mut controller = FilterController::default();
        let mut commits = Vec::new();

        for (i, text) in ["p", "pi", "pik", "pika"].iter().enumerate() {
            let at = start + ms(i as u64 * 100);
            assert!(!controller.on_keystroke(*text, at));
            // Polling between keystrokes never commits
            if controller.poll(at + ms(99)) {
                commits.push(controller.filter().search.clone());
            }
        }

        let last = start + ms(300);
        assert!(!controller.poll(last + ms(299)));
        assert_eq!(controller.filter().search, "");

        if controller.poll(last + ms(300)) {
            commits.push(controller.filter().search.clone());
        }
        assert_eq!(commits, vec!["pika".to_string()]);
        assert!(!controller.is_pending());
        assert!(!controller.poll(last + ms(900)));
    }

    #[test]
    fn test_deadline_restarts_on_each_keystroke() {
        let start = Instant::now();
        let mut controller = FilterController::default();

        controller.on_keystroke("a", start);
        assert_eq!(controller.next_deadline(), Some(start + ms(300)));
        controller.on_keystroke("ab", start + ms(250));
        assert_eq!(controller.next_deadline(), Some(start + ms(550)));
    }

    #[test]
    fn test_clearing_bypasses_delay() {
        let start = Instant::now();
        let mut controller = FilterController::default();
        controller.on_keystroke("char", start);
        controller.poll(start + ms(300));
        assert_eq!(controller.filter().search, "char");

        controller.on_keystroke("cha", start + ms(400));
        assert!(controller.on_keystroke("", start + ms(450)));
        assert_eq!(controller.filter().search, "");
        assert!(!controller.is_pending());
    }

    #[test]
    fn test_clear_filters_resets_everything_at_once() {
        let now = Instant::now();
        let mut controller = FilterController::default();
        controller.select_type(Some(PokemonType::Fire));
        controller.on_keystroke("char", now);

        assert!(controller.clear_filters());
        assert_eq!(controller.pending_text(), "");
        assert_eq!(controller.filter().pokemon_type, None);
        assert!(!controller.poll(now + ms(1000)));
    }

    #[test]
    fn test_type_selection_toggles() {
        let mut controller = FilterController::default();
        assert!(controller.select_type(Some(PokemonType::Water)));
        assert_eq!(controller.filter().pokemon_type, Some(PokemonType::Water));

        assert!(controller.select_type(Some(PokemonType::Water)));
        assert_eq!(controller.filter().pokemon_type, None);

        assert!(!controller.select_type(None));
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut controller = FilterController::default();
        assert!(controller.set_page(4));
        assert!(controller.select_type(Some(PokemonType::Grass)));
        assert_eq!(controller.filter().page, 1);

        controller.set_page(3);
        assert!(controller.set_page_size(50).unwrap());
        assert_eq!(controller.filter().page, 1);
        assert!(controller.set_page_size(500).is_err());
    }

    #[test]
    fn test_page_navigation_bounds() {
        let mut controller = FilterController::default();
        assert!(!controller.previous_page());
        assert!(controller.next_page(2));
        assert!(!controller.next_page(2));
        assert!(controller.set_page(0));
        assert_eq!(controller.filter().page, 1);
    }

    #[test]
    fn test_flush_commits_immediately() {
        let mut controller = FilterController::default();
        controller.on_keystroke("eevee", Instant::now());
        assert!(controller.flush());
        assert_eq!(controller.filter().search, "eevee");
        assert!(!controller.flush());
    }
}
