//! PostgreSQL question store
//!
//! Expects the `questions` table described in `sql/questions.sql`.

use std::future::Future;
use std::time::Duration;

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::censor;
use super::error::{StoreError, StoreOperation};
use super::model::{
    CreateQuestionOptions, GetQuestionsByAskUserIdOptions, GetQuestionsByUserIdOptions,
    GetQuestionsCountOptions, Owner, Question, QuestionId, UpdateQuestionCensorOptions, UserId,
};
use super::pagination::Cursor;
use super::traits::{QuestionsStore, StoreResult};
use crate::config::DatabaseConfig;
use crate::error::{DatabaseError, DatabaseOperation};
use crate::token::{self, QUESTION_TOKEN_LENGTH};

/// Deadline for a single statement when none is configured
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

macro_rules! question_columns {
    () => {
        "id, created_at, updated_at, from_ip, user_id, content, content_censor_metadata, \
         token, answer, answer_censor_metadata, receive_reply_email, asker_user_id"
    };
}

const INSERT_QUESTION: &str = concat!(
    "INSERT INTO questions \
     (from_ip, user_id, content, token, answer, receive_reply_email, asker_user_id, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, '', $5, $6, NOW(), NOW()) \
     RETURNING ",
    question_columns!()
);

const SELECT_QUESTION_BY_ID: &str = concat!(
    "SELECT ",
    question_columns!(),
    " FROM questions WHERE id = $1"
);

const UPDATE_ANSWER: &str = "UPDATE questions SET answer = $1, updated_at = NOW() WHERE id = $2";

const UPDATE_CENSOR: &str = "UPDATE questions \
     SET content_censor_metadata = $1, answer_censor_metadata = $2, updated_at = NOW() \
     WHERE id = $3";

const DELETE_QUESTION: &str = "DELETE FROM questions WHERE id = $1";

/// [`QuestionsStore`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgQuestionsStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgQuestionsStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Create a store using the deadline from `config`
    pub fn from_config(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self::new(pool).with_statement_timeout(config.statement_timeout())
    }

    /// Override the per-statement deadline
    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a statement under the configured deadline
    async fn run<T, F>(
        &self,
        operation: DatabaseOperation,
        statement: F,
    ) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.statement_timeout, statement).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let err = DatabaseError::from(e);
                // Keep connect/pool attribution, otherwise record the statement kind
                Err(if err.operation == DatabaseOperation::Query {
                    err.with_operation(operation)
                } else {
                    err
                })
            }
            Err(_) => Err(DatabaseError::timeout(
                operation,
                format!("statement exceeded {:?}", self.statement_timeout),
            )),
        }
    }

    async fn list(
        &self,
        operation: StoreOperation,
        owner: Owner,
        user_id: UserId,
        filter_answered: bool,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Question>> {
        let mut query = page_query(owner, user_id, filter_answered, cursor);
        let questions = self
            .run(
                DatabaseOperation::Query,
                query.build_query_as::<Question>().fetch_all(&self.pool),
            )
            .await
            .map_err(|e| StoreError::storage(operation, e))?;

        debug!(user_id, returned = questions.len(), %operation, "Listed questions");
        Ok(questions)
    }
}

/// `SELECT` for one page of a user's questions, newest first
pub(crate) fn page_query(
    owner: Owner,
    user_id: UserId,
    filter_answered: bool,
    cursor: Option<&Cursor>,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(concat!("SELECT ", question_columns!(), " FROM questions"));
    push_owner_filter(&mut query, owner, user_id, filter_answered);

    if let Some(last_id) = cursor.and_then(Cursor::last_id) {
        query.push(" AND id < ").push_bind(last_id);
    }

    query.push(" ORDER BY created_at DESC, id DESC");

    if let Some(cursor) = cursor {
        let limit = i64::try_from(cursor.limit()).unwrap_or(i64::MAX);
        query.push(" LIMIT ").push_bind(limit);
    }

    query
}

/// `SELECT COUNT(*)` over a recipient's questions
pub(crate) fn count_query(
    user_id: UserId,
    filter_answered: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM questions");
    push_owner_filter(&mut query, Owner::Recipient, user_id, filter_answered);
    query
}

fn push_owner_filter(
    query: &mut QueryBuilder<'static, Postgres>,
    owner: Owner,
    user_id: UserId,
    filter_answered: bool,
) {
    query
        .push(" WHERE ")
        .push(owner.column())
        .push(" = ")
        .push_bind(user_id);

    if filter_answered {
        query.push(" AND answer <> ''");
    }
}

impl QuestionsStore for PgQuestionsStore {
    async fn create(&self, opts: CreateQuestionOptions) -> StoreResult<Question> {
        let token = token::generate(QUESTION_TOKEN_LENGTH);

        let question = self
            .run(
                DatabaseOperation::Insert,
                sqlx::query_as::<_, Question>(INSERT_QUESTION)
                    .bind(&opts.from_ip)
                    .bind(opts.user_id)
                    .bind(&opts.content)
                    .bind(&token)
                    .bind(&opts.receive_reply_email)
                    .bind(opts.asker_user_id)
                    .fetch_one(&self.pool),
            )
            .await
            .map_err(|e| StoreError::storage(StoreOperation::Create, e))?;

        info!(question_id = question.id, user_id = question.user_id, "Question created");
        Ok(question)
    }

    async fn get_by_id(&self, id: QuestionId) -> StoreResult<Question> {
        self.run(
            DatabaseOperation::Query,
            sqlx::query_as::<_, Question>(SELECT_QUESTION_BY_ID)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|e| StoreError::storage(StoreOperation::GetById, e))?
        .ok_or(StoreError::NotFound { id })
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByUserIdOptions,
    ) -> StoreResult<Vec<Question>> {
        self.list(
            StoreOperation::GetByUserId,
            Owner::Recipient,
            user_id,
            opts.filter_answered,
            opts.cursor.as_ref(),
        )
        .await
    }

    async fn get_by_ask_user_id(
        &self,
        user_id: UserId,
        opts: GetQuestionsByAskUserIdOptions,
    ) -> StoreResult<Vec<Question>> {
        self.list(
            StoreOperation::GetByAskUserId,
            Owner::Asker,
            user_id,
            opts.filter_answered,
            opts.cursor.as_ref(),
        )
        .await
    }

    async fn answer_by_id(&self, id: QuestionId, answer: &str) -> StoreResult<()> {
        self.get_by_id(id)
            .await
            .map_err(|e| e.within(StoreOperation::AnswerById))?;

        self.run(
            DatabaseOperation::Update,
            sqlx::query(UPDATE_ANSWER)
                .bind(answer)
                .bind(id)
                .execute(&self.pool),
        )
        .await
        .map_err(|e| StoreError::storage(StoreOperation::AnswerById, e))?;

        info!(question_id = id, "Question answered");
        Ok(())
    }

    async fn delete_by_id(&self, id: QuestionId) -> StoreResult<()> {
        self.get_by_id(id)
            .await
            .map_err(|e| e.within(StoreOperation::DeleteById))?;

        self.run(
            DatabaseOperation::Delete,
            sqlx::query(DELETE_QUESTION).bind(id).execute(&self.pool),
        )
        .await
        .map_err(|e| StoreError::storage(StoreOperation::DeleteById, e))?;

        info!(question_id = id, "Question deleted");
        Ok(())
    }

    async fn update_censor(
        &self,
        id: QuestionId,
        opts: UpdateQuestionCensorOptions,
    ) -> StoreResult<()> {
        let current = self
            .get_by_id(id)
            .await
            .map_err(|e| e.within(StoreOperation::UpdateCensor))?;

        let (content, answer) = censor::merge(&current, &opts);

        self.run(
            DatabaseOperation::Update,
            sqlx::query(UPDATE_CENSOR)
                .bind(content)
                .bind(answer)
                .bind(id)
                .execute(&self.pool),
        )
        .await
        .map_err(|e| StoreError::storage(StoreOperation::UpdateCensor, e))?;

        info!(question_id = id, "Censor metadata updated");
        Ok(())
    }

    async fn count(&self, user_id: UserId, opts: GetQuestionsCountOptions) -> StoreResult<u64> {
        let mut query = count_query(user_id, opts.filter_answered);
        let count = self
            .run(
                DatabaseOperation::Query,
                query.build_query_scalar::<i64>().fetch_one(&self.pool),
            )
            .await
            .map_err(|e| StoreError::storage(StoreOperation::Count, e))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
