// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log filtering and pagination.
//!
//! A [`LogFilter`] is split in two: the predicates Firestore can evaluate
//! (timestamp range, level membership, exact user, single tag, package)
//! become a [`LogQuery`], and every predicate is re-checked in memory by
//! [`LogFilter::matches`]. Substring matching (user ID, free-text search)
//! and multi-tag membership only exist in memory.

use crate::db::LogQuery;
use crate::error::{AppError, Result};
use crate::models::LogRecord;
use crate::time_utils::{format_storage, parse_log_timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Firestore rejects `in` filters with more values than this.
pub const MAX_NATIVE_IN_VALUES: usize = 30;

/// How a user ID filter is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMatch {
    Exact(String),
    /// Case-insensitive substring (stored lower-cased)
    Contains(String),
}

/// Filter over log records. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub levels: Vec<String>,
    pub tags: Vec<String>,
    pub user: Option<UserMatch>,
    pub package_name: Option<String>,
    /// Inclusive
    pub start: Option<DateTime<Utc>>,
    /// Inclusive
    pub end: Option<DateTime<Utc>>,
    /// Lower-cased free-text needle
    pub search: Option<String>,
}

impl LogFilter {
    pub fn with_levels(mut self, raw: Option<&str>) -> Self {
        self.levels = split_list(raw)
            .into_iter()
            .map(|level| level.to_lowercase())
            .collect();
        self
    }

    /// A single level, matched as given (apart from case).
    pub fn with_level_exact(mut self, raw: Option<&str>) -> Self {
        self.levels = non_empty(raw)
            .map(|level| vec![level.to_lowercase()])
            .unwrap_or_default();
        self
    }

    pub fn with_tags(mut self, raw: Option<&str>) -> Self {
        self.tags = split_list(raw);
        self
    }

    /// A single tag; commas are part of the value.
    pub fn with_tag_exact(mut self, raw: Option<&str>) -> Self {
        self.tags = non_empty(raw).into_iter().collect();
        self
    }

    pub fn with_user_exact(mut self, raw: Option<&str>) -> Self {
        self.user = non_empty(raw).map(UserMatch::Exact);
        self
    }

    pub fn with_user_contains(mut self, raw: Option<&str>) -> Self {
        self.user = non_empty(raw).map(|u| UserMatch::Contains(u.to_lowercase()));
        self
    }

    pub fn with_package_name(mut self, raw: Option<&str>) -> Self {
        self.package_name = non_empty(raw);
        self
    }

    pub fn with_search(mut self, raw: Option<&str>) -> Self {
        self.search = non_empty(raw).map(|s| s.to_lowercase());
        self
    }

    /// Set the time range; `name_*` are the query parameter names used in
    /// error messages.
    pub fn with_range(
        mut self,
        start: Option<&str>,
        end: Option<&str>,
        (start_name, end_name): (&str, &str),
    ) -> Result<Self> {
        self.start = parse_bound(start, start_name)?;
        self.end = parse_bound(end, end_name)?;
        Ok(self)
    }

    fn native_levels(&self) -> bool {
        self.levels.len() <= MAX_NATIVE_IN_VALUES
    }

    /// The part of this filter Firestore evaluates natively.
    pub fn native_query(&self, limit: Option<u32>) -> LogQuery {
        LogQuery {
            since: self.start.map(format_storage),
            until: self.end.map(format_storage),
            before: None,
            levels: if self.native_levels() {
                self.levels.clone()
            } else {
                Vec::new()
            },
            user_id: match &self.user {
                Some(UserMatch::Exact(user)) => Some(user.clone()),
                _ => None,
            },
            tag: match self.tags.as_slice() {
                [tag] => Some(tag.clone()),
                _ => None,
            },
            package_name: self.package_name.clone(),
            offset: None,
            limit,
        }
    }

    /// One page of results, when Firestore can evaluate the whole filter.
    pub fn native_page(&self, page: PageRequest) -> Option<LogQuery> {
        if self.has_residual() {
            return None;
        }
        Some(LogQuery {
            offset: Some(page.offset()),
            ..self.native_query(Some(page.per_page))
        })
    }

    /// Whether in-memory filtering can drop records the native query
    /// returned. When it can, a native limit would under-fill results.
    pub fn has_residual(&self) -> bool {
        !self.native_levels()
            || self.tags.len() > 1
            || matches!(self.user, Some(UserMatch::Contains(_)))
            || self.search.is_some()
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&record.level) {
            return false;
        }

        if !self.tags.is_empty() {
            match &record.tag {
                Some(tag) if self.tags.contains(tag) => {}
                _ => return false,
            }
        }

        match &self.user {
            Some(UserMatch::Exact(user)) if &record.user_id != user => return false,
            Some(UserMatch::Contains(needle))
                if !record.user_id.to_lowercase().contains(needle.as_str()) =>
            {
                return false
            }
            _ => {}
        }

        if let Some(package) = &self.package_name {
            if record.package_name.as_ref() != Some(package) {
                return false;
            }
        }

        if self.start.is_some() || self.end.is_some() {
            let Some(ts) = record.parsed_timestamp() else {
                return false;
            };
            if self.start.is_some_and(|start| ts < start) || self.end.is_some_and(|end| ts > end)
            {
                return false;
            }
        }

        if let Some(needle) = &self.search {
            let hit = record.message.to_lowercase().contains(needle.as_str())
                || record.user_id.to_lowercase().contains(needle.as_str())
                || record.level.contains(needle.as_str())
                || record
                    .tag
                    .as_ref()
                    .is_some_and(|t| t.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }

        true
    }

    /// Keep only the records that match, preserving order.
    pub fn apply(&self, records: Vec<LogRecord>) -> Vec<LogRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Split a comma-separated parameter, trimming and dropping empty entries.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>> {
    non_empty(raw)
        .map(|value| {
            parse_log_timestamp(&value).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid '{name}' parameter: {value}"))
            })
        })
        .transpose()
}

// ─── Pagination ──────────────────────────────────────────────

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Clamp raw parameters: page to at least 1, page size to 1..=100.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let per_page = per_page
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE)) as u32;
        Self { page, per_page }
    }

    /// Records before the first one on this page.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block returned with every table page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Pagination block for `request` over `total` matching records.
    pub fn new(request: PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page);
        Self {
            current_page: request.page,
            total_pages: u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX),
            total_count: u32::try_from(total).unwrap_or(u32::MAX),
            per_page: request.per_page,
            has_next: u64::from(request.page).saturating_mul(per_page) < total,
            has_prev: request.page > 1,
        }
    }
}

/// Cut one page out of an ordered result set.
///
/// A page past the end yields no items but still reports the totals.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(request, items.len() as u64);
    let page_items: Vec<T> = items
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.per_page as usize)
        .collect();

    (page_items, pagination)
}
