//! Question entity and operation options

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::censor;
use super::pagination::Cursor;

/// Sequential question identifier assigned by the store
pub type QuestionId = i64;

/// Identifier of a registered user (recipient or asker)
pub type UserId = i64;

/// A question sent to a user.
///
/// Only `id`, `created_at`, `content` and `answer` are serialized; all
/// provenance and moderation fields stay inside the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Question {
    pub id: QuestionId,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub from_ip: String,
    /// Recipient
    #[serde(skip)]
    pub user_id: UserId,
    pub content: String,
    #[serde(skip)]
    pub content_censor_metadata: Option<Value>,
    /// Answer token, assigned once at creation
    #[serde(skip)]
    pub token: String,
    pub answer: String,
    #[serde(skip)]
    pub answer_censor_metadata: Option<Value>,
    #[serde(skip)]
    pub receive_reply_email: String,
    #[serde(skip)]
    pub asker_user_id: UserId,
}

impl Question {
    /// Whether the moderation result for the content has `pass: true`
    #[must_use]
    pub fn content_censor_pass(&self) -> bool {
        censor::passed(self.content_censor_metadata.as_ref())
    }

    /// Whether the moderation result for the answer has `pass: true`
    #[must_use]
    pub fn answer_censor_pass(&self) -> bool {
        censor::passed(self.answer_censor_metadata.as_ref())
    }

    /// Whether the recipient has answered
    #[must_use]
    pub fn is_answered(&self) -> bool {
        !self.answer.is_empty()
    }
}

/// Fields supplied by the asker
#[derive(Debug, Clone, Default)]
pub struct CreateQuestionOptions {
    pub from_ip: String,
    pub user_id: UserId,
    pub content: String,
    pub receive_reply_email: String,
    pub asker_user_id: UserId,
}

/// Listing options for questions received by a user
#[derive(Debug, Clone, Default)]
pub struct GetQuestionsByUserIdOptions {
    /// Page to return; `None` returns every matching question
    pub cursor: Option<Cursor>,
    /// Only return answered questions
    pub filter_answered: bool,
}

/// Listing options for questions asked by a user
#[derive(Debug, Clone, Default)]
pub struct GetQuestionsByAskUserIdOptions {
    /// Page to return; `None` returns every matching question
    pub cursor: Option<Cursor>,
    /// Only return answered questions
    pub filter_answered: bool,
}

/// Counting options
#[derive(Debug, Clone, Copy, Default)]
pub struct GetQuestionsCountOptions {
    /// Only count answered questions
    pub filter_answered: bool,
}

/// Raw moderation responses for a question.
///
/// Each candidate is the JSON text returned by the moderation service and
/// replaces the stored metadata only if it is a valid censor response.
#[derive(Debug, Clone, Default)]
pub struct UpdateQuestionCensorOptions {
    pub content_censor_metadata: Option<String>,
    pub answer_censor_metadata: Option<String>,
}

/// Which side of a question a listing filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Recipient,
    Asker,
}

impl Owner {
    #[cfg(feature = "database")]
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Recipient => "user_id",
            Self::Asker => "asker_user_id",
        }
    }

    pub(crate) fn owns(self, question: &Question, user_id: UserId) -> bool {
        match self {
            Self::Recipient => question.user_id == user_id,
            Self::Asker => question.asker_user_id == user_id,
        }
    }
}
