//! Types and functions for storing and loading reviews from the database.

use crate::{
    core::repository::Repository,
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A review to be written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    /// The item the review is about.
    pub item_id: i64,
    /// The confirmed transaction behind the review.
    pub transaction_id: i64,
    /// Who writes the review.
    pub reviewer_id: Uuid,
    /// Who is being reviewed.
    pub reviewee_id: Uuid,
    /// One to five stars.
    #[validate(range(min = 1, max = 5))]
    #[schema(example = 5)]
    pub rating: i16,
    /// Free text.
    #[serde(default)]
    #[schema(example = "Friendly and on time")]
    pub comment: String,
}

/// A stored review.
///
/// The item and transaction references are cleared when the item is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub item_id: Option<i64>,
    pub transaction_id: Option<i64>,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A review as shown on the reviewee's page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    pub id: i64,
    pub item_id: Option<i64>,
    /// The item's title, if the item still exists.
    pub item_title: Option<String>,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Average rating of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Zero when there are no reviews.
    pub average_rating: f64,
    pub total_reviews: i64,
}

/// Anything that can store reviews.
#[async_trait::async_trait]
pub trait ReviewStore: Send {
    /// Stores a review.
    async fn create_review(&mut self, review: &NewReview) -> ApiResult<Review>;

    /// Whether the reviewer already reviewed the transaction.
    async fn has_review(&mut self, transaction_id: i64, reviewer_id: Uuid) -> ApiResult<bool>;

    /// Reviews about a profile, newest first.
    async fn list_reviews_for(&mut self, reviewee_id: Uuid) -> ApiResult<Vec<ReviewDetails>>;

    /// The average rating of a profile.
    async fn rating_summary(&mut self, reviewee_id: Uuid) -> ApiResult<RatingSummary>;
}

#[async_trait::async_trait]
impl ReviewStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn create_review(&mut self, review: &NewReview) -> ApiResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (item_id, transaction_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(review.item_id)
        .bind(review.transaction_id)
        .bind(review.reviewer_id)
        .bind(review.reviewee_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Created review {}", review.id);
        Ok(review)
    }

    #[instrument(skip(self))]
    async fn has_review(&mut self, transaction_id: i64, reviewer_id: Uuid) -> ApiResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE transaction_id = $1 AND reviewer_id = $2)",
        )
        .bind(transaction_id)
        .bind(reviewer_id)
        .fetch_one(&mut **self.executor)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn list_reviews_for(&mut self, reviewee_id: Uuid) -> ApiResult<Vec<ReviewDetails>> {
        let reviews = sqlx::query_as::<_, ReviewDetails>(
            r#"
            SELECT r.id, r.item_id, i.title AS item_title, r.reviewer_id,
                   p.name AS reviewer_name, r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN profiles p ON p.id = r.reviewer_id
            LEFT JOIN items i ON i.id = r.item_id
            WHERE r.reviewee_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(reviewee_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(reviews)
    }

    #[instrument(skip(self))]
    async fn rating_summary(&mut self, reviewee_id: Uuid) -> ApiResult<RatingSummary> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT COALESCE(AVG(rating)::float8, 0) AS average_rating,
                   COUNT(*) AS total_reviews
            FROM reviews
            WHERE reviewee_id = $1
            "#,
        )
        .bind(reviewee_id)
        .fetch_one(&mut **self.executor)
        .await?;
        Ok(summary)
    }
}
