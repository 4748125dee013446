//! Repository contract for questions
//!
//! Methods return futures via RPITIT (Return Position Impl Trait In Traits),
//! so implementations are written as plain `async fn`. Every future is
//! cancel-safe in the sense that dropping it abandons the underlying store
//! call; wrap calls in `tokio::time::timeout` to impose a caller deadline.
//!
//! # Example
//!
//! ```rust
//! use question_store::repository::{
//!     CreateQuestionOptions, MemoryQuestionsStore, QuestionsStore,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), question_store::repository::StoreError> {
//! let store = MemoryQuestionsStore::new();
//! let question = store
//!     .create(CreateQuestionOptions {
//!         user_id: 1,
//!         content: "Do you like rain?".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! store.answer_by_id(question.id, "Only when I'm inside").await?;
//! assert!(store.get_by_id(question.id).await?.is_answered());
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use super::error::StoreError;
use super::model::{
    CreateQuestionOptions, GetQuestionsByAskUserIdOptions, GetQuestionsByUserIdOptions,
    GetQuestionsCountOptions, Question, QuestionId, UpdateQuestionCensorOptions, UserId,
};

/// Result type for repository operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Data access for questions
///
/// Lookup-then-write operations (`answer_by_id`, `delete_by_id`,
/// `update_censor`) perform two separate statements without a version
/// check, so concurrent writers to the same question race and the last
/// write wins.
pub trait QuestionsStore: Send + Sync {
    /// Insert a new question with a freshly generated answer token
    fn create(
        &self,
        opts: CreateQuestionOptions,
    ) -> impl Future<Output = StoreResult<Question>> + Send;

    /// Fetch a question
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no question has this ID.
    fn get_by_id(&self, id: QuestionId) -> impl Future<Output = StoreResult<Question>> + Send;

    /// Questions received by `user_id`, newest first
    fn get_by_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByUserIdOptions,
    ) -> impl Future<Output = StoreResult<Vec<Question>>> + Send;

    /// Questions asked by `user_id`, newest first
    fn get_by_ask_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByAskUserIdOptions,
    ) -> impl Future<Output = StoreResult<Vec<Question>>> + Send;

    /// Set the answer, replacing any previous one
    fn answer_by_id(
        &self,
        id: QuestionId,
        answer: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Permanently remove a question
    fn delete_by_id(&self, id: QuestionId) -> impl Future<Output = StoreResult<()>> + Send;

    /// Record moderation results.
    ///
    /// Invalid candidates leave the stored metadata untouched. The row is
    /// written (and `updated_at` bumped) even when both are rejected.
    fn update_censor(
        &self,
        id: QuestionId,
        opts: UpdateQuestionCensorOptions,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Number of questions received by `user_id`
    fn count(
        &self,
        user_id: UserId,
        opts: GetQuestionsCountOptions,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}
