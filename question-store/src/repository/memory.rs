//! In-memory question store
//!
//! Behaves like [`PgQuestionsStore`](super::PgQuestionsStore) including
//! ordering, cursor handling and the moderation merge policy. Intended for
//! tests of code that consumes a [`QuestionsStore`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::censor;
use super::error::{StoreError, StoreOperation};
use super::model::{
    CreateQuestionOptions, GetQuestionsByAskUserIdOptions, GetQuestionsByUserIdOptions,
    GetQuestionsCountOptions, Owner, Question, QuestionId, UpdateQuestionCensorOptions, UserId,
};
use super::pagination::Cursor;
use super::traits::{QuestionsStore, StoreResult};
use crate::error::DatabaseError;
use crate::token::{self, QUESTION_TOKEN_LENGTH};

#[derive(Debug, Default)]
struct State {
    last_id: QuestionId,
    last_created_at: Option<DateTime<Utc>>,
    rows: BTreeMap<QuestionId, Question>,
    /// Failure returned by the next operation
    pending_failure: Option<DatabaseError>,
}

impl State {
    fn take_failure(&mut self, operation: StoreOperation) -> StoreResult<()> {
        match self.pending_failure.take() {
            Some(err) => Err(StoreError::storage(operation, err)),
            None => Ok(()),
        }
    }

    /// Creation time that never goes backwards, so ID order and time order agree
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }

    fn lookup(&self, id: QuestionId) -> StoreResult<&Question> {
        self.rows.get(&id).ok_or(StoreError::NotFound { id })
    }

    fn lookup_mut(&mut self, id: QuestionId) -> StoreResult<&mut Question> {
        self.rows.get_mut(&id).ok_or(StoreError::NotFound { id })
    }

    fn page(
        &self,
        owner: Owner,
        user_id: UserId,
        filter_answered: bool,
        cursor: Option<&Cursor>,
    ) -> Vec<Question> {
        let mut matching: Vec<&Question> = self
            .rows
            .values()
            .filter(|q| owner.owns(q, user_id))
            .filter(|q| !filter_answered || q.is_answered())
            .filter(|q| match cursor.and_then(Cursor::last_id) {
                Some(last_id) => q.id < last_id,
                None => true,
            })
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let limit = cursor.map_or(usize::MAX, |c| {
            usize::try_from(c.limit()).unwrap_or(usize::MAX)
        });
        matching.into_iter().take(limit).cloned().collect()
    }
}

/// [`QuestionsStore`] backed by a map guarded by an async `RwLock`
#[derive(Debug, Default)]
pub struct MemoryQuestionsStore {
    state: RwLock<State>,
}

impl MemoryQuestionsStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation fail with `error` as a storage failure
    pub async fn fail_next(&self, error: DatabaseError) {
        self.state.write().await.pending_failure = Some(error);
    }

    /// Number of stored questions
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Whether the store holds no questions
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }
}

impl QuestionsStore for MemoryQuestionsStore {
    async fn create(&self, opts: CreateQuestionOptions) -> StoreResult<Question> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Create)?;

        state.last_id += 1;
        let created_at = state.next_created_at();
        let question = Question {
            id: state.last_id,
            created_at,
            updated_at: created_at,
            from_ip: opts.from_ip,
            user_id: opts.user_id,
            content: opts.content,
            content_censor_metadata: None,
            token: token::generate(QUESTION_TOKEN_LENGTH),
            answer: String::new(),
            answer_censor_metadata: None,
            receive_reply_email: opts.receive_reply_email,
            asker_user_id: opts.asker_user_id,
        };
        state.rows.insert(question.id, question.clone());

        info!(question_id = question.id, user_id = question.user_id, "Question created");
        Ok(question)
    }

    async fn get_by_id(&self, id: QuestionId) -> StoreResult<Question> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::GetById)?;
        state.lookup(id).cloned()
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByUserIdOptions,
    ) -> StoreResult<Vec<Question>> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::GetByUserId)?;
        let page = state.page(
            Owner::Recipient,
            user_id,
            opts.filter_answered,
            opts.cursor.as_ref(),
        );
        debug!(user_id, returned = page.len(), "Listed received questions");
        Ok(page)
    }

    async fn get_by_ask_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByAskUserIdOptions,
    ) -> StoreResult<Vec<Question>> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::GetByAskUserId)?;
        let page = state.page(
            Owner::Asker,
            user_id,
            opts.filter_answered,
            opts.cursor.as_ref(),
        );
        debug!(user_id, returned = page.len(), "Listed asked questions");
        Ok(page)
    }

    async fn answer_by_id(&self, id: QuestionId, answer: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::AnswerById)?;

        let question = state.lookup_mut(id)?;
        question.answer = answer.to_string();
        question.updated_at = Utc::now();

        info!(question_id = id, "Question answered");
        Ok(())
    }

    async fn delete_by_id(&self, id: QuestionId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::DeleteById)?;

        state.lookup(id)?;
        state.rows.remove(&id);

        info!(question_id = id, "Question deleted");
        Ok(())
    }

    async fn update_censor(
        &self,
        id: QuestionId,
        opts: UpdateQuestionCensorOptions,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::UpdateCensor)?;

        let question = state.lookup_mut(id)?;
        let (content, answer) = censor::merge(question, &opts);
        question.content_censor_metadata = content;
        question.answer_censor_metadata = answer;
        question.updated_at = Utc::now();

        info!(question_id = id, "Censor metadata updated");
        Ok(())
    }

    async fn count(&self, user_id: UserId, opts: GetQuestionsCountOptions) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Count)?;

        let count = state
            .rows
            .values()
            .filter(|q| q.user_id == user_id)
            .filter(|q| !opts.filter_answered || q.is_answered())
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseErrorKind, DatabaseOperation};
    use serde_json::json;

    const RECIPIENT: UserId = 1;
    const ASKER: UserId = 2;

    fn ask(user_id: UserId, asker_user_id: UserId, content: &str) -> CreateQuestionOptions {
        CreateQuestionOptions {
            from_ip: "198.51.100.7".to_string(),
            user_id,
            content: content.to_string(),
            receive_reply_email: String::new(),
            asker_user_id,
        }
    }

    async fn seed<S: QuestionsStore>(store: &S, n: usize) -> Vec<Question> {
        let mut created = Vec::with_capacity(n);
        for i in 1..=n {
            let q = store
                .create(ask(RECIPIENT, ASKER, &format!("question {i}")))
                .await
                .unwrap();
            created.push(q);
        }
        created
    }

    fn ids(questions: &[Question]) -> Vec<QuestionId> {
        questions.iter().map(|q| q.id).collect()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_token() {
        let store = MemoryQuestionsStore::new();
        let a = store.create(ask(RECIPIENT, 0, "first")).await.unwrap();
        let b = store.create(ask(RECIPIENT, 0, "second")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.token.len(), 6);
        assert_eq!(b.token.len(), 6);
        assert!(a.answer.is_empty());
        assert!(a.content_censor_metadata.is_none());
        assert!(!a.content_censor_pass());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let store = MemoryQuestionsStore::new();
        let err = store.get_by_id(99).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound { id: 99 });
    }

    #[tokio::test]
    async fn test_storage_failure_is_distinct_from_not_found() {
        let store = MemoryQuestionsStore::new();
        store
            .fail_next(DatabaseError::connection_failed("connection reset by peer"))
            .await;

        let err = store.get_by_id(99).await.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.operation(), Some(StoreOperation::GetById));
        assert!(err.is_retriable());

        // Failure is consumed
        assert!(store.get_by_id(99).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_pagination_descending_by_cursor() {
        let store = MemoryQuestionsStore::new();
        seed(&store, 10).await;

        let first = store
            .get_by_user_id(
                RECIPIENT,
                GetQuestionsByUserIdOptions {
                    cursor: Some(Cursor::first_page(3)),
                    filter_answered: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&first), vec![10, 9, 8]);

        let next = store
            .get_by_user_id(
                RECIPIENT,
                GetQuestionsByUserIdOptions {
                    cursor: Some(Cursor::after(8, 3)),
                    filter_answered: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&next), vec![7, 6, 5]);
    }

    #[tokio::test]
    async fn test_pagination_walks_every_page() {
        let store = MemoryQuestionsStore::new();
        seed(&store, 10).await;

        let mut cursor = Some(Cursor::first_page(4));
        let mut seen = Vec::new();
        while let Some(current) = cursor {
            let page = store
                .get_by_user_id(
                    RECIPIENT,
                    GetQuestionsByUserIdOptions {
                        cursor: Some(current),
                        filter_answered: false,
                    },
                )
                .await
                .unwrap();
            seen.extend(ids(&page));
            cursor = current.next(&page, |q| q.id);
        }

        assert_eq!(seen, (1..=10).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_no_cursor_returns_everything() {
        let store = MemoryQuestionsStore::new();
        seed(&store, 25).await;

        let all = store
            .get_by_user_id(RECIPIENT, GetQuestionsByUserIdOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 25);
        assert_eq!(all[0].id, 25);
    }

    #[tokio::test]
    async fn test_listing_scopes_to_recipient_and_asker() {
        let store = MemoryQuestionsStore::new();
        store.create(ask(RECIPIENT, ASKER, "to 1 from 2")).await.unwrap();
        store.create(ask(3, ASKER, "to 3 from 2")).await.unwrap();
        store.create(ask(RECIPIENT, 0, "to 1 anonymous")).await.unwrap();

        let received = store
            .get_by_user_id(RECIPIENT, GetQuestionsByUserIdOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&received), vec![3, 1]);

        let asked = store
            .get_by_ask_user_id(ASKER, GetQuestionsByAskUserIdOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&asked), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_filter_answered() {
        let store = MemoryQuestionsStore::new();
        seed(&store, 5).await;
        store.answer_by_id(2, "yes").await.unwrap();
        store.answer_by_id(4, "no").await.unwrap();

        let answered = store
            .get_by_user_id(
                RECIPIENT,
                GetQuestionsByUserIdOptions {
                    cursor: None,
                    filter_answered: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&answered), vec![4, 2]);

        let asked_answered = store
            .get_by_ask_user_id(
                ASKER,
                GetQuestionsByAskUserIdOptions {
                    cursor: Some(Cursor::after(4, 10)),
                    filter_answered: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&asked_answered), vec![2]);
    }

    #[tokio::test]
    async fn test_answer_overwrites() {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, 0, "cats or dogs?")).await.unwrap();

        store.answer_by_id(q.id, "cats").await.unwrap();
        store.answer_by_id(q.id, "dogs").await.unwrap();

        let stored = store.get_by_id(q.id).await.unwrap();
        assert_eq!(stored.answer, "dogs");
        assert_eq!(stored.token, q.token);
    }

    #[tokio::test]
    async fn test_answer_missing_question() {
        let store = MemoryQuestionsStore::new();
        let err = store.answer_by_id(5, "hello").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, 0, "bye")).await.unwrap();

        store.delete_by_id(q.id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.get_by_id(q.id).await.unwrap_err().is_not_found());

        let err = store.delete_by_id(q.id).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound { id: q.id });
    }

    #[tokio::test]
    async fn test_update_censor_rejects_missing_source_name() {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, 0, "hi")).await.unwrap();
        store
            .update_censor(
                q.id,
                UpdateQuestionCensorOptions {
                    content_censor_metadata: Some(
                        r#"{"source_name":"qcloud","pass":false}"#.to_string(),
                    ),
                    answer_censor_metadata: None,
                },
            )
            .await
            .unwrap();

        store
            .update_censor(
                q.id,
                UpdateQuestionCensorOptions {
                    content_censor_metadata: Some(r#"{"pass":true}"#.to_string()),
                    answer_censor_metadata: Some(String::new()),
                },
            )
            .await
            .unwrap();

        let stored = store.get_by_id(q.id).await.unwrap();
        assert_eq!(
            stored.content_censor_metadata,
            Some(json!({"source_name": "qcloud", "pass": false}))
        );
        assert!(!stored.content_censor_pass());
        assert!(stored.answer_censor_metadata.is_none());
    }

    #[tokio::test]
    async fn test_update_censor_accepts_valid_response() {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, 0, "hi")).await.unwrap();

        store
            .update_censor(
                q.id,
                UpdateQuestionCensorOptions {
                    content_censor_metadata: Some(r#"{"source_name":"x","pass":true}"#.to_string()),
                    answer_censor_metadata: Some(r#"{"source_name":"x","pass":true}"#.to_string()),
                },
            )
            .await
            .unwrap();

        let stored = store.get_by_id(q.id).await.unwrap();
        assert!(stored.content_censor_pass());
        assert!(stored.answer_censor_pass());
    }

    #[tokio::test]
    async fn test_update_censor_always_writes() {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, 0, "hi")).await.unwrap();

        store
            .update_censor(q.id, UpdateQuestionCensorOptions::default())
            .await
            .unwrap();

        let stored = store.get_by_id(q.id).await.unwrap();
        assert!(stored.updated_at >= q.updated_at);
        assert!(stored.content_censor_metadata.is_none());
    }

    #[tokio::test]
    async fn test_update_censor_missing_question() {
        let store = MemoryQuestionsStore::new();
        let err = store
            .update_censor(1, UpdateQuestionCensorOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_count_matches_listing() {
        let store = MemoryQuestionsStore::new();
        seed(&store, 7).await;
        store.create(ask(9, RECIPIENT, "someone else's")).await.unwrap();
        for id in [1, 3, 6] {
            store.answer_by_id(id, "answered").await.unwrap();
        }

        for filter_answered in [false, true] {
            let listed = store
                .get_by_user_id(
                    RECIPIENT,
                    GetQuestionsByUserIdOptions {
                        cursor: None,
                        filter_answered,
                    },
                )
                .await
                .unwrap();
            let counted = store
                .count(RECIPIENT, GetQuestionsCountOptions { filter_answered })
                .await
                .unwrap();
            assert_eq!(counted, listed.len() as u64);
        }

        assert_eq!(
            store
                .count(RECIPIENT, GetQuestionsCountOptions { filter_answered: true })
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_injected_failure_on_write() {
        let store = MemoryQuestionsStore::new();
        store
            .fail_next(DatabaseError::timeout(
                DatabaseOperation::Insert,
                "statement timeout",
            ))
            .await;

        match store.create(ask(RECIPIENT, 0, "hi")).await.unwrap_err() {
            StoreError::Storage { operation, source } => {
                assert_eq!(operation, StoreOperation::Create);
                assert_eq!(source.kind, DatabaseErrorKind::Timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    async fn seed_with_failure(error: DatabaseError) -> (MemoryQuestionsStore, Question) {
        let store = MemoryQuestionsStore::new();
        let q = store.create(ask(RECIPIENT, ASKER, "hi")).await.unwrap();
        store.answer_by_id(q.id, "hello").await.unwrap();
        store
            .update_censor(
                q.id,
                UpdateQuestionCensorOptions {
                    content_censor_metadata: Some(
                        json!({"source_name": "qcloud", "pass": true}).to_string(),
                    ),
                    answer_censor_metadata: None,
                },
            )
            .await
            .unwrap();
        let before = store.get_by_id(q.id).await.unwrap();
        store.fail_next(error).await;
        (store, before)
    }

    fn assert_storage(err: StoreError, expected: StoreOperation) {
        assert!(!err.is_not_found());
        assert_eq!(err.operation(), Some(expected));
    }

    #[tokio::test]
    async fn test_injected_failure_on_answer_keeps_row() {
        let (store, before) =
            seed_with_failure(DatabaseError::connection_failed("connection reset")).await;

        let err = store.answer_by_id(before.id, "changed").await.unwrap_err();
        assert_storage(err, StoreOperation::AnswerById);
        assert_eq!(store.get_by_id(before.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_injected_failure_on_delete_keeps_row() {
        let (store, before) =
            seed_with_failure(DatabaseError::pool_exhausted("pool timed out")).await;

        let err = store.delete_by_id(before.id).await.unwrap_err();
        assert_storage(err, StoreOperation::DeleteById);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_by_id(before.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_injected_failure_on_update_censor_keeps_row() {
        let (store, before) =
            seed_with_failure(DatabaseError::timeout(DatabaseOperation::Update, "deadline")).await;

        let err = store
            .update_censor(
                before.id,
                UpdateQuestionCensorOptions {
                    content_censor_metadata: Some(
                        json!({"source_name": "qcloud", "pass": false}).to_string(),
                    ),
                    answer_censor_metadata: Some(
                        json!({"source_name": "qcloud", "pass": true}).to_string(),
                    ),
                },
            )
            .await
            .unwrap_err();
        assert_storage(err, StoreOperation::UpdateCensor);

        let after = store.get_by_id(before.id).await.unwrap();
        assert_eq!(after, before);
        assert!(after.content_censor_pass());
        assert!(!after.answer_censor_pass());
    }
}
