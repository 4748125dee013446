//! # question-store
//!
//! Persistence layer for questions in an anonymous Q&A service.
//!
//! ## Features
//!
//! - **Repository contract**: [`QuestionsStore`](repository::QuestionsStore) with
//!   PostgreSQL and in-memory implementations
//! - **Cursor pagination**: newest-first listings keyed on the last seen ID
//! - **Moderation metadata**: defensive merge of censor responses, derived pass flags
//! - **Configuration**: Figment layering of defaults, TOML files and environment
//! - **Observability**: `tracing` events with JSON or pretty output
//!
//! ## Example
//!
//! ```rust,no_run
//! use question_store::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let db = config
//!         .database
//!         .as_ref()
//!         .ok_or_else(|| Error::Internal("database.url is not configured".to_string()))?;
//!     let pool = create_pool(db).await?;
//!     let store = PgQuestionsStore::from_config(pool, db);
//!
//!     let received = store
//!         .count(1, GetQuestionsCountOptions::default())
//!         .await?;
//!     println!("{received} questions");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod repository;
pub mod token;

#[cfg(feature = "database")]
pub mod database;

/// Commonly used types
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, LogFormat, PaginationConfig};
    pub use crate::error::{DatabaseError, Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        CreateQuestionOptions, Cursor, GetQuestionsByAskUserIdOptions,
        GetQuestionsByUserIdOptions, GetQuestionsCountOptions, MemoryQuestionsStore, Question,
        QuestionId, QuestionsStore, StoreError, UpdateQuestionCensorOptions, UserId,
    };

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;
    #[cfg(feature = "database")]
    pub use crate::repository::PgQuestionsStore;
}
