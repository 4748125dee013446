use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use question_store::config::PaginationConfig;
use question_store::repository::{
    CreateQuestionOptions, Cursor, GetQuestionsByAskUserIdOptions, GetQuestionsByUserIdOptions,
    GetQuestionsCountOptions, Question, QuestionId, QuestionsStore, UpdateQuestionCensorOptions,
    UserId,
};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a user a question
    Create {
        /// Recipient user ID
        #[arg(long, value_name = "ID")]
        user_id: UserId,

        /// Question text
        #[arg(long)]
        content: String,

        /// Asker's IP address
        #[arg(long, default_value = "")]
        from_ip: String,

        /// Address notified when the question is answered
        #[arg(long, value_name = "EMAIL", default_value = "")]
        receive_reply_email: String,

        /// Asker user ID (0 for anonymous)
        #[arg(long, value_name = "ID", default_value_t = 0)]
        asker_user_id: UserId,
    },
    /// Show a single question
    Get {
        #[arg(value_name = "QUESTION_ID")]
        id: QuestionId,
    },
    /// List questions received by a user
    List {
        #[arg(long, value_name = "ID")]
        user_id: UserId,

        #[command(flatten)]
        page: PageArgs,
    },
    /// List questions asked by a user
    Asked {
        #[arg(long, value_name = "ID")]
        user_id: UserId,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Answer a question, replacing any previous answer
    Answer {
        #[arg(value_name = "QUESTION_ID")]
        id: QuestionId,

        #[arg(value_name = "ANSWER")]
        answer: String,
    },
    /// Permanently delete a question
    Delete {
        #[arg(value_name = "QUESTION_ID")]
        id: QuestionId,
    },
    /// Record moderation responses for a question
    Censor {
        #[arg(value_name = "QUESTION_ID")]
        id: QuestionId,

        /// Moderation response JSON for the question text
        #[arg(long, value_name = "JSON")]
        content: Option<String>,

        /// Moderation response JSON for the answer
        #[arg(long, value_name = "JSON")]
        answer: Option<String>,
    },
    /// Count questions received by a user
    Count {
        #[arg(long, value_name = "ID")]
        user_id: UserId,

        /// Only count answered questions
        #[arg(long)]
        answered: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct PageArgs {
    /// ID of the last question from the previous page
    #[arg(long)]
    cursor: Option<String>,

    /// Page size (0 uses the configured default)
    #[arg(long, default_value_t = 0)]
    limit: u64,

    /// Return every matching question in one response
    #[arg(long, conflicts_with = "cursor")]
    all: bool,

    /// Only list answered questions
    #[arg(long)]
    answered: bool,
}

impl PageArgs {
    fn cursor(&self, pagination: &PaginationConfig) -> Result<Option<Cursor>> {
        if self.all {
            return Ok(None);
        }
        let cursor = pagination
            .cursor(self.cursor.as_deref(), self.limit)
            .context("Invalid --cursor")?;
        Ok(Some(cursor))
    }
}

#[derive(Serialize)]
struct Page {
    questions: Vec<Question>,
    next_cursor: Option<String>,
}

impl Page {
    fn new(questions: Vec<Question>, cursor: Option<Cursor>) -> Self {
        let next_cursor = cursor
            .and_then(|c| c.next(&questions, |q| q.id))
            .and_then(|c| c.last_id())
            .map(|id| id.to_string());
        Self {
            questions,
            next_cursor,
        }
    }
}

#[derive(Serialize)]
struct QuestionDetail {
    #[serde(flatten)]
    question: Question,
    answered: bool,
    content_censor_pass: bool,
    answer_censor_pass: bool,
}

impl From<Question> for QuestionDetail {
    fn from(question: Question) -> Self {
        Self {
            answered: question.is_answered(),
            content_censor_pass: question.content_censor_pass(),
            answer_censor_pass: question.answer_censor_pass(),
            question,
        }
    }
}

/// Run `command` against `store` and return the JSON document to print
pub async fn execute<S: QuestionsStore>(
    store: &S,
    pagination: &PaginationConfig,
    command: Command,
) -> Result<Value> {
    let output = match command {
        Command::Create {
            user_id,
            content,
            from_ip,
            receive_reply_email,
            asker_user_id,
        } => {
            let question = store
                .create(CreateQuestionOptions {
                    from_ip,
                    user_id,
                    content,
                    receive_reply_email,
                    asker_user_id,
                })
                .await?;
            tracing::info!(question_id = question.id, user_id, "question created");
            serde_json::to_value(QuestionDetail::from(question))?
        }
        Command::Get { id } => {
            let question = store.get_by_id(id).await?;
            serde_json::to_value(QuestionDetail::from(question))?
        }
        Command::List { user_id, page } => {
            let cursor = page.cursor(pagination)?;
            let questions = store
                .get_by_user_id(
                    user_id,
                    GetQuestionsByUserIdOptions {
                        cursor,
                        filter_answered: page.answered,
                    },
                )
                .await?;
            serde_json::to_value(Page::new(questions, cursor))?
        }
        Command::Asked { user_id, page } => {
            let cursor = page.cursor(pagination)?;
            let questions = store
                .get_by_ask_user_id(
                    user_id,
                    GetQuestionsByAskUserIdOptions {
                        cursor,
                        filter_answered: page.answered,
                    },
                )
                .await?;
            serde_json::to_value(Page::new(questions, cursor))?
        }
        Command::Answer { id, answer } => {
            store.answer_by_id(id, &answer).await?;
            serde_json::to_value(QuestionDetail::from(store.get_by_id(id).await?))?
        }
        Command::Delete { id } => {
            store.delete_by_id(id).await?;
            tracing::info!(question_id = id, "question deleted");
            json!({ "deleted": id })
        }
        Command::Censor {
            id,
            content,
            answer,
        } => {
            store
                .update_censor(
                    id,
                    UpdateQuestionCensorOptions {
                        content_censor_metadata: content,
                        answer_censor_metadata: answer,
                    },
                )
                .await?;
            serde_json::to_value(QuestionDetail::from(store.get_by_id(id).await?))?
        }
        Command::Count { user_id, answered } => {
            let count = store
                .count(
                    user_id,
                    GetQuestionsCountOptions {
                        filter_answered: answered,
                    },
                )
                .await?;
            json!({ "user_id": user_id, "count": count })
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use question_store::repository::{MemoryQuestionsStore, StoreError};

    async fn seeded(n: usize) -> MemoryQuestionsStore {
        let store = MemoryQuestionsStore::new();
        for i in 0..n {
            store
                .create(CreateQuestionOptions {
                    user_id: 1,
                    content: format!("question {}", i + 1),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    fn list(user_id: UserId, cursor: Option<&str>, limit: u64) -> Command {
        Command::List {
            user_id,
            page: PageArgs {
                cursor: cursor.map(str::to_string),
                limit,
                ..Default::default()
            },
        }
    }

    fn ids(output: &Value) -> Vec<i64> {
        output["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_list_pages_with_next_cursor() {
        let store = seeded(5).await;
        let pagination = PaginationConfig::default();

        let first = execute(&store, &pagination, list(1, None, 2)).await.unwrap();
        assert_eq!(ids(&first), vec![5, 4]);
        assert_eq!(first["next_cursor"], "4");

        let second = execute(&store, &pagination, list(1, Some("4"), 2))
            .await
            .unwrap();
        assert_eq!(ids(&second), vec![3, 2]);

        let last = execute(&store, &pagination, list(1, Some("2"), 2))
            .await
            .unwrap();
        assert_eq!(ids(&last), vec![1]);
        assert!(last["next_cursor"].is_null());
    }

    #[tokio::test]
    async fn test_list_all_ignores_page_size() {
        let store = seeded(3).await;
        let command = Command::List {
            user_id: 1,
            page: PageArgs {
                all: true,
                limit: 1,
                ..Default::default()
            },
        };

        let output = execute(&store, &PaginationConfig::default(), command)
            .await
            .unwrap();
        assert_eq!(ids(&output), vec![3, 2, 1]);
        assert!(output["next_cursor"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_rejected() {
        let store = seeded(1).await;
        let result = execute(&store, &PaginationConfig::default(), list(1, Some("abc"), 0)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_answer_and_count() {
        let store = seeded(2).await;
        let pagination = PaginationConfig::default();

        let answered = execute(
            &store,
            &pagination,
            Command::Answer {
                id: 1,
                answer: "yes".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(answered["answer"], "yes");
        assert_eq!(answered["answered"], true);

        let count = execute(
            &store,
            &pagination,
            Command::Count {
                user_id: 1,
                answered: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(count["count"], 1);
    }

    #[tokio::test]
    async fn test_censor_reports_pass_flags() {
        let store = seeded(1).await;
        let output = execute(
            &store,
            &PaginationConfig::default(),
            Command::Censor {
                id: 1,
                content: Some(r#"{"source_name":"text-censor","pass":true}"#.to_string()),
                answer: Some("not json".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(output["content_censor_pass"], true);
        assert_eq!(output["answer_censor_pass"], false);
    }

    #[tokio::test]
    async fn test_get_hides_private_fields() {
        let store = seeded(1).await;
        let output = execute(&store, &PaginationConfig::default(), Command::Get { id: 1 })
            .await
            .unwrap();

        assert_eq!(output["content"], "question 1");
        assert!(output.get("token").is_none());
        assert!(output.get("from_ip").is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_question() {
        let store = MemoryQuestionsStore::new();
        let err = execute(&store, &PaginationConfig::default(), Command::Delete { id: 9 })
            .await
            .unwrap_err();

        let store_err = err.downcast_ref::<StoreError>().unwrap();
        assert!(store_err.is_not_found());
    }
}
