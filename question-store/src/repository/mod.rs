//! Question repository
//!
//! [`QuestionsStore`] is the data-access contract for questions. It has two
//! implementations:
//!
//! - [`PgQuestionsStore`]: PostgreSQL through sqlx (feature `database`)
//! - [`MemoryQuestionsStore`]: in-process map for tests
//!
//! Construct one store at startup and hand it to every consumer; there is no
//! global instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use question_store::repository::{Cursor, GetQuestionsByUserIdOptions, PgQuestionsStore, QuestionsStore};
//!
//! let store = PgQuestionsStore::new(pool);
//!
//! let page = store
//!     .get_by_user_id(
//!         user_id,
//!         GetQuestionsByUserIdOptions {
//!             cursor: Some(Cursor::parse(query.cursor.as_deref(), 20)?),
//!             filter_answered: true,
//!         },
//!     )
//!     .await?;
//! ```

pub mod censor;
mod error;
mod memory;
mod model;
mod pagination;
#[cfg(feature = "database")]
mod postgres;
mod traits;

pub use error::{StoreError, StoreOperation};
pub use memory::MemoryQuestionsStore;
pub use model::{
    CreateQuestionOptions, GetQuestionsByAskUserIdOptions, GetQuestionsByUserIdOptions,
    GetQuestionsCountOptions, Question, QuestionId, UpdateQuestionCensorOptions, UserId,
};
pub use pagination::{Cursor, CursorError, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
#[cfg(feature = "database")]
pub use postgres::{PgQuestionsStore, DEFAULT_STATEMENT_TIMEOUT};
pub use traits::{QuestionsStore, StoreResult};
