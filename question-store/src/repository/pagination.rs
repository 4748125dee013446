//! Cursor pagination for question listings
//!
//! Listings are ordered newest first. A cursor carries the ID of the last
//! question the client has seen; the next page holds questions with a
//! strictly smaller ID.
//!
//! # Example
//!
//! ```rust
//! use question_store::repository::Cursor;
//!
//! // First page of 3
//! let first = Cursor::first_page(3);
//! assert_eq!(first.last_id(), None);
//!
//! // Continue after question 8
//! let next = Cursor::parse(Some("8"), 3).unwrap();
//! assert_eq!(next.last_id(), Some(8));
//! assert_eq!(next.limit(), 3);
//! ```

use thiserror::Error;

use super::model::QuestionId;
use crate::config::PaginationConfig;

/// Page size used when a cursor is created with a limit of 0
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Largest page size a cursor will ever request
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Error building a cursor from client input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The cursor value is not a question ID
    #[error("invalid cursor value: {0:?}")]
    Invalid(String),
}

/// Position and size of a page in a descending question listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    last_id: Option<QuestionId>,
    limit: u64,
}

impl Cursor {
    /// Cursor for the most recent `limit` questions
    #[must_use]
    pub fn first_page(limit: u64) -> Self {
        Self::bounded(None, limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Cursor for up to `limit` questions older than `last_id`
    #[must_use]
    pub fn after(last_id: QuestionId, limit: u64) -> Self {
        Self::bounded(Some(last_id), limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Build a cursor from the opaque value handed back by a client.
    ///
    /// A missing or blank value selects the first page.
    pub fn parse(raw: Option<&str>, limit: u64) -> Result<Self, CursorError> {
        Self::parse_bounded(raw, limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    fn parse_bounded(
        raw: Option<&str>,
        limit: u64,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<Self, CursorError> {
        let last_id = match raw.map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<QuestionId>()
                    .map_err(|_| CursorError::Invalid(value.to_string()))?,
            ),
        };
        Ok(Self::bounded(last_id, limit, default_limit, max_limit))
    }

    fn bounded(
        last_id: Option<QuestionId>,
        limit: u64,
        default_limit: u64,
        max_limit: u64,
    ) -> Self {
        let limit = if limit == 0 { default_limit } else { limit };
        Self {
            last_id,
            limit: limit.min(max_limit),
        }
    }

    /// ID of the last question already seen, if any
    #[must_use]
    pub fn last_id(&self) -> Option<QuestionId> {
        self.last_id
    }

    /// Maximum number of questions in the page
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Cursor for the page following `page`, or `None` when `page` was the
    /// last one.
    #[must_use]
    pub fn next<T>(&self, page: &[T], id_of: impl Fn(&T) -> QuestionId) -> Option<Self> {
        if (page.len() as u64) < self.limit {
            return None;
        }
        page.last().map(|last| Self {
            last_id: Some(id_of(last)),
            limit: self.limit,
        })
    }
}

impl PaginationConfig {
    /// Build a cursor with this configuration's page size bounds
    pub fn cursor(&self, raw: Option<&str>, limit: u64) -> Result<Cursor, CursorError> {
        Cursor::parse_bounded(raw, limit, self.default_limit, self.max_limit)
    }
}
