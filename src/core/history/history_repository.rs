//! Types and functions for storing and loading search history from the database.

use crate::{
    core::repository::{escape_like, Repository},
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A keyword to remember.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSearch {
    /// Who searched.
    pub profile_id: Uuid,
    /// What they searched for.
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "bike")]
    pub keyword: String,
}

/// A remembered search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub id: i64,
    pub profile_id: Uuid,
    pub keyword: String,
    pub searched_at: DateTime<Utc>,
}

/// Anything that can store search history.
#[async_trait::async_trait]
pub trait HistoryStore: Send {
    /// Remembers a keyword.
    async fn add_search(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<SearchEntry>;

    /// Forgets a keyword, returning how many entries were removed.
    async fn delete_keyword(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<u64>;

    /// The latest searches, newest first.
    async fn list_searches(&mut self, profile_id: Uuid, limit: i64) -> ApiResult<Vec<SearchEntry>>;

    /// Forgets one entry, returning how many were removed.
    async fn delete_search(&mut self, id: i64) -> ApiResult<u64>;

    /// Forgets everything a profile searched for.
    async fn clear_searches(&mut self, profile_id: Uuid) -> ApiResult<u64>;

    /// Previous keywords starting with `prefix`, newest first.
    async fn suggest_keywords(
        &mut self,
        profile_id: Uuid,
        prefix: &str,
        limit: i64,
    ) -> ApiResult<Vec<String>>;
}

#[async_trait::async_trait]
impl HistoryStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn add_search(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<SearchEntry> {
        let entry = sqlx::query_as::<_, SearchEntry>(
            "INSERT INTO search_history (profile_id, keyword) VALUES ($1, $2) RETURNING *",
        )
        .bind(profile_id)
        .bind(keyword)
        .fetch_one(&mut **self.executor)
        .await?;
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn delete_keyword(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM search_history WHERE profile_id = $1 AND keyword = $2")
            .bind(profile_id)
            .bind(keyword)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }

    #[instrument(skip(self))]
    async fn list_searches(&mut self, profile_id: Uuid, limit: i64) -> ApiResult<Vec<SearchEntry>> {
        let entries = sqlx::query_as::<_, SearchEntry>(
            r#"
            SELECT * FROM search_history
            WHERE profile_id = $1
            ORDER BY searched_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn delete_search(&mut self, id: i64) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM search_history WHERE id = $1")
            .bind(id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }

    #[instrument(skip(self))]
    async fn clear_searches(&mut self, profile_id: Uuid) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM search_history WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }

    #[instrument(skip(self))]
    async fn suggest_keywords(
        &mut self,
        profile_id: Uuid,
        prefix: &str,
        limit: i64,
    ) -> ApiResult<Vec<String>> {
        let keywords = sqlx::query_scalar::<_, String>(
            r#"
            SELECT keyword FROM search_history
            WHERE profile_id = $1 AND keyword ILIKE $2
            ORDER BY searched_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(profile_id)
        .bind(format!("{}%", escape_like(prefix)))
        .bind(limit)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(keywords)
    }
}
