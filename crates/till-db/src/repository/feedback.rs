//! # Feedback Repository
//!
//! Post-sale ratings. `survey_responses` is stored as JSON text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use till_core::validation::{validate_optional, validate_rating};
use till_core::{CoreError, Feedback, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::customer::customer_exists;
use crate::repository::transaction::transaction_number_of;

const FEEDBACK_COLUMNS: &str = r#"
    id, transaction_id, customer_id, rating, comment, survey_responses, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: i64,
    transaction_id: i64,
    customer_id: Option<i64>,
    rating: i64,
    comment: Option<String>,
    survey_responses: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = DbError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let survey_responses = row
            .survey_responses
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DbError::Corrupt {
                entity: "Feedback".to_string(),
                message: e.to_string(),
            })?;

        Ok(Feedback {
            id: row.id,
            transaction_id: row.transaction_id,
            customer_id: row.customer_id,
            rating: row.rating,
            comment: row.comment,
            survey_responses,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_feedback(rows: Vec<FeedbackRow>) -> DbResult<Vec<Feedback>> {
    rows.into_iter().map(Feedback::try_from).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub transaction_id: i64,
    pub customer_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
    pub survey_responses: Option<serde_json::Value>,
}

impl NewFeedback {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_rating(self.rating)?;
        validate_optional("comment", self.comment.as_deref(), 1000)?;

        match &self.survey_responses {
            None | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(ValidationError::InvalidFormat {
                field: "survey_responses".to_string(),
                reason: "must be a JSON object".to_string(),
            }),
        }
    }
}

/// A stored feedback entry with the number of the sale it rates.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedFeedback {
    pub feedback: Feedback,
    pub transaction_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RatingCount {
    pub rating: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStatistics {
    pub average_rating: f64,
    pub total_feedback: i64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    pub rating_distribution: Vec<RatingCount>,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    average_rating: f64,
    total_feedback: i64,
    positive_feedback: i64,
    negative_feedback: i64,
}

#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeedbackRepository { pool }
    }

    /// Stores feedback for an existing transaction.
    pub async fn insert(&self, new: &NewFeedback) -> DbResult<RecordedFeedback> {
        new.validate()?;

        let mut conn = self.pool.acquire().await?;

        let transaction_number = transaction_number_of(&mut conn, new.transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", new.transaction_id))?;

        if let Some(customer_id) = new.customer_id {
            if !customer_exists(&mut conn, customer_id).await? {
                return Err(CoreError::CustomerNotFound(customer_id).into());
            }
        }

        let survey = new
            .survey_responses
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Internal(e.to_string()))?;

        debug!(transaction_id = new.transaction_id, rating = new.rating, "Inserting feedback");

        let row = sqlx::query_as::<_, FeedbackRow>(&format!(
            r#"
            INSERT INTO feedback (
                transaction_id, customer_id, rating, comment, survey_responses, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING {FEEDBACK_COLUMNS}
            "#
        ))
        .bind(new.transaction_id)
        .bind(new.customer_id)
        .bind(new.rating)
        .bind(&new.comment)
        .bind(survey)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(RecordedFeedback {
            feedback: row.try_into()?,
            transaction_number,
        })
    }

    /// All feedback, newest first.
    pub async fn list(&self) -> DbResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_feedback(rows)
    }

    /// The `limit` most recent entries.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_feedback(rows)
    }

    pub async fn get(&self, id: i64) -> DbResult<Feedback> {
        sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Feedback", id))?
        .try_into()
    }

    pub async fn for_transaction(&self, transaction_id: i64) -> DbResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE transaction_id = ?1 ORDER BY id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        into_feedback(rows)
    }

    pub async fn for_customer(&self, customer_id: i64) -> DbResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE customer_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        into_feedback(rows)
    }

    /// Rating statistics over all feedback.
    pub async fn statistics(&self) -> DbResult<FeedbackStatistics> {
        self.statistics_between(None, None).await
    }

    /// Rating statistics, optionally restricted to an inclusive date range.
    pub async fn statistics_between(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
    ) -> DbResult<FeedbackStatistics> {
        let stats = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT COALESCE(AVG(rating), 0.0) AS average_rating,
                   COUNT(*) AS total_feedback,
                   CAST(COALESCE(SUM(rating >= 4), 0) AS INTEGER) AS positive_feedback,
                   CAST(COALESCE(SUM(rating <= 2), 0) AS INTEGER) AS negative_feedback
            FROM feedback
            WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
              AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let rating_distribution = sqlx::query_as::<_, RatingCount>(
            r#"
            SELECT rating, COUNT(*) AS count
            FROM feedback
            WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
              AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
            GROUP BY rating
            ORDER BY rating
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(FeedbackStatistics {
            average_rating: stats.average_rating,
            total_feedback: stats.total_feedback,
            positive_feedback: stats.positive_feedback,
            negative_feedback: stats.negative_feedback,
            rating_distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_sale, seed_catalog, test_db};
    use serde_json::json;

    fn rating(transaction_id: i64, rating: i64) -> NewFeedback {
        NewFeedback {
            transaction_id,
            customer_id: None,
            rating,
            comment: Some("Quick checkout".to_string()),
            survey_responses: None,
        }
    }

    #[tokio::test]
    async fn test_insert_keeps_survey_json() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let sale = record_sale(&db, &fx, 1).await;

        let recorded = db
            .feedback()
            .insert(&NewFeedback {
                survey_responses: Some(json!({"staff": "friendly", "would_return": true})),
                ..rating(sale.id, 5)
            })
            .await
            .unwrap();

        assert_eq!(recorded.transaction_number, sale.transaction_number);
        let stored = db.feedback().get(recorded.feedback.id).await.unwrap();
        assert_eq!(stored.survey_responses, Some(json!({"staff": "friendly", "would_return": true})));
        assert_eq!(db.feedback().for_transaction(sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_input() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let sale = record_sale(&db, &fx, 1).await;
        let repo = db.feedback();

        assert!(matches!(
            repo.insert(&rating(sale.id, 6)).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(repo.insert(&rating(4040, 3)).await, Err(DbError::NotFound { .. })));
        assert!(matches!(
            repo.insert(&NewFeedback {
                customer_id: Some(77),
                ..rating(sale.id, 3)
            })
            .await,
            Err(DbError::Domain(CoreError::CustomerNotFound(77)))
        ));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let sale = record_sale(&db, &fx, 1).await;
        let repo = db.feedback();

        for r in [5, 4, 3, 1] {
            repo.insert(&rating(sale.id, r)).await.unwrap();
        }

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.total_feedback, 4);
        assert_eq!(stats.average_rating, 3.25);
        assert_eq!(stats.positive_feedback, 2);
        assert_eq!(stats.negative_feedback, 1);
        assert_eq!(stats.rating_distribution.len(), 4);
        assert_eq!(stats.rating_distribution[0], RatingCount { rating: 1, count: 1 });

        let empty = repo.statistics_between(chrono::NaiveDate::from_ymd_opt(2001, 1, 1), chrono::NaiveDate::from_ymd_opt(2001, 1, 2)).await.unwrap();
        assert_eq!(empty.total_feedback, 0);
        assert_eq!(empty.average_rating, 0.0);
    }
}
