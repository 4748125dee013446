//! Repository error types
//!
//! Callers only ever need to tell two cases apart: the question does not
//! exist, or the storage layer failed. The latter carries the structured
//! [`DatabaseError`] and the repository operation it happened in.
//!
//! # Example
//!
//! ```rust
//! use question_store::repository::{StoreError, StoreOperation};
//!
//! let error = StoreError::NotFound { id: 42 };
//! assert!(error.is_not_found());
//! assert_eq!(error.to_string(), "question does not exist");
//! ```

use std::fmt;
use thiserror::Error;

use super::model::QuestionId;
use crate::error::DatabaseError;

/// Repository operation being performed when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Create,
    GetById,
    GetByUserId,
    GetByAskUserId,
    AnswerById,
    DeleteById,
    UpdateCensor,
    Count,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::GetById => write!(f, "get_by_id"),
            Self::GetByUserId => write!(f, "get_by_user_id"),
            Self::GetByAskUserId => write!(f, "get_by_ask_user_id"),
            Self::AnswerById => write!(f, "answer_by_id"),
            Self::DeleteById => write!(f, "delete_by_id"),
            Self::UpdateCensor => write!(f, "update_censor"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Error returned by every [`QuestionsStore`](super::QuestionsStore) operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No question has the requested ID
    #[error("question does not exist")]
    NotFound { id: QuestionId },

    /// The storage layer failed
    #[error("{operation}: {source}")]
    Storage {
        operation: StoreOperation,
        source: DatabaseError,
    },
}

impl StoreError {
    /// Wrap a storage failure with the operation it happened in
    pub fn storage(operation: StoreOperation, source: impl Into<DatabaseError>) -> Self {
        Self::Storage {
            operation,
            source: source.into(),
        }
    }

    /// Re-attribute an error raised by a nested lookup to the calling
    /// operation. `NotFound` passes through unchanged.
    #[must_use]
    pub fn within(self, operation: StoreOperation) -> Self {
        match self {
            Self::Storage {
                operation: inner,
                source,
            } if inner != operation => Self::Storage {
                operation,
                source: source.add_context(format!("during {inner}")),
            },
            other => other,
        }
    }

    /// Whether the question does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is transient
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Storage { source, .. } => source.is_retriable(),
        }
    }

    /// Operation a storage failure happened in
    #[must_use]
    pub fn operation(&self) -> Option<StoreOperation> {
        match self {
            Self::NotFound { .. } => None,
            Self::Storage { operation, .. } => Some(*operation),
        }
    }
}
