//! Canonical user set, filtered/paginated view and bulk selection.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use shared::domain::{Role, Status, User, UserId};
use tracing::debug;

pub const PAGE_SIZE: usize = 10;
const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub role: Option<Role>,
    pub status: Option<Status>,
    /// Calendar day (UTC) the user joined on.
    pub joined_on: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: text.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.role.is_none()
            && self.status.is_none()
            && self.joined_on.is_none()
    }

    pub fn matches(&self, user: &User) -> bool {
        self.matches_needle(&self.needle(), user)
    }

    fn needle(&self) -> String {
        self.search.trim().to_lowercase()
    }

    fn matches_needle(&self, needle: &str, user: &User) -> bool {
        if !needle.is_empty()
            && ![&user.name, &user.email, &user.username]
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
        {
            return false;
        }
        if self.role.is_some_and(|role| user.role != role) {
            return false;
        }
        if self.status.is_some_and(|status| user.status != status) {
            return false;
        }
        if self
            .joined_on
            .is_some_and(|day| user.joined_date.date_naive() != day)
        {
            return false;
        }
        true
    }
}

/// Records of `users` matching `criteria`, in their original order.
pub fn filtered_view<'a>(users: &'a [User], criteria: &FilterCriteria) -> Vec<&'a User> {
    let needle = criteria.needle();
    users
        .iter()
        .filter(|user| criteria.matches_needle(&needle, user))
        .collect()
}

pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE).max(1)
}

/// The 1-based `page` of `items`; empty when the page lies past the end.
pub fn paginate<T>(items: &[T], page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE).min(items.len());
    let end = start.saturating_add(PAGE_SIZE).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub users: Vec<&'a User>,
    pub page: usize,
    pub total_pages: usize,
    /// Number of records matching the filter, across all pages.
    pub total_count: usize,
}

impl PageView<'_> {
    pub fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Up to five page numbers around the cursor for a pager control.
    pub fn window(&self) -> RangeInclusive<usize> {
        let start = self.page.saturating_sub(2).max(1);
        let end = self.total_pages.min(start + PAGE_WINDOW - 1);
        start..=end
    }
}

/// Owns the canonical set and everything derived from it for one session.
#[derive(Debug)]
pub struct ListController {
    users: Vec<User>,
    criteria: FilterCriteria,
    page: usize,
    selection: Vec<UserId>,
}

impl Default for ListController {
    fn default() -> Self {
        Self::new()
    }
}

impl ListController {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            criteria: FilterCriteria::default(),
            page: 1,
            selection: Vec::new(),
        }
    }

    /// Swaps in a freshly fetched snapshot. The only write path to the set.
    pub fn replace_all(&mut self, users: Vec<User>) {
        self.users = users;
        if self.page > self.total_pages() {
            self.page = 1;
        }
        self.prune_selection();
        debug!(
            users = self.users.len(),
            page = self.page,
            selected = self.selection.len(),
            "list: canonical set replaced"
        );
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn find(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.page = 1;
        self.prune_selection();
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(FilterCriteria::default());
    }

    pub fn filtered(&self) -> Vec<&User> {
        filtered_view(&self.users, &self.criteria)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered().len())
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Out-of-range requests fall back to the first page.
    pub fn set_page(&mut self, page: usize) {
        let total = self.total_pages();
        self.page = if (1..=total).contains(&page) { page } else { 1 };
    }

    pub fn view(&self) -> PageView<'_> {
        let filtered = self.filtered();
        let total_pages = total_pages(filtered.len());
        let page = if self.page > total_pages { 1 } else { self.page };
        PageView {
            users: paginate(&filtered, page).to_vec(),
            page,
            total_pages,
            total_count: filtered.len(),
        }
    }

    /// Selecting an id outside the current filtered set is ignored.
    /// Deselecting is never rejected.
    pub fn toggle_select(&mut self, id: &UserId, included: bool) {
        if !included {
            self.selection.retain(|selected| selected != id);
            return;
        }
        if self.is_selected(id) {
            return;
        }
        if self.filtered().iter().any(|user| &user.id == id) {
            self.selection.push(id.clone());
        }
    }

    /// Selects every filtered record across all pages, or clears.
    pub fn select_all(&mut self, included: bool) {
        self.selection = if included {
            self.filtered().iter().map(|user| user.id.clone()).collect()
        } else {
            Vec::new()
        };
    }

    pub fn selection(&self) -> &[UserId] {
        &self.selection
    }

    pub fn is_selected(&self, id: &UserId) -> bool {
        self.selection.contains(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn prune_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let visible: Vec<UserId> = self.filtered().iter().map(|user| user.id.clone()).collect();
        self.selection.retain(|id| visible.contains(id));
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
