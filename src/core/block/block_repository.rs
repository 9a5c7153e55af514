//! Types and functions for storing and loading blocks from the database.

use crate::{
    core::{profile::profile_repository::Profile, repository::Repository},
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, Instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One profile blocking another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NewBlock {
    /// Who blocks.
    pub blocker_id: Uuid,
    /// Who is blocked.
    pub blocked_id: Uuid,
}

/// A stored block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: i64,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Anything that can store blocks.
#[async_trait::async_trait]
pub trait BlockStore: Send {
    /// Stores a block.
    async fn create_block(&mut self, block: &NewBlock) -> ApiResult<Block>;

    /// Fetches the block between two profiles.
    async fn fetch_block(&mut self, blocker_id: Uuid, blocked_id: Uuid)
        -> ApiResult<Option<Block>>;

    /// Removes a block, returning how many rows were removed.
    async fn delete_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> ApiResult<u64>;

    /// The profiles someone has blocked, most recent first.
    async fn list_blocked_profiles(&mut self, blocker_id: Uuid) -> ApiResult<Vec<Profile>>;
}

#[async_trait::async_trait]
impl BlockStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn create_block(&mut self, block: &NewBlock) -> ApiResult<Block> {
        let block = sqlx::query_as::<_, Block>(
            "INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(block.blocker_id)
        .bind(block.blocked_id)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("{} blocked {}", block.blocker_id, block.blocked_id);
        Ok(block)
    }

    #[instrument(skip(self))]
    async fn fetch_block(
        &mut self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> ApiResult<Option<Block>> {
        let block = sqlx::query_as::<_, Block>(
            "SELECT * FROM blocks WHERE blocker_id = $1 AND blocked_id = $2",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_optional(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_optional"))
        .await?;
        Ok(block)
    }

    #[instrument(skip(self))]
    async fn delete_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }

    #[instrument(skip(self))]
    async fn list_blocked_profiles(&mut self, blocker_id: Uuid) -> ApiResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.id, p.name
            FROM blocks b
            JOIN profiles p ON p.id = b.blocked_id
            WHERE b.blocker_id = $1
            ORDER BY b.created_at DESC, b.id DESC
            "#,
        )
        .bind(blocker_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(profiles)
    }
}
