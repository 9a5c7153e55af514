//! Types and functions for loading profiles from the database.

use crate::{
    core::repository::Repository,
    infra::{database::Tx, error::ApiResult},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// A user of the marketplace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Profile {
    /// The profile's id.
    pub id: Uuid,
    /// The display name.
    #[schema(example = "Kim")]
    pub name: String,
}

/// Anything that can look up profiles.
#[async_trait::async_trait]
pub trait ProfileStore: Send {
    /// Fetches a profile.
    async fn fetch_profile(&mut self, id: Uuid) -> ApiResult<Option<Profile>>;

    /// Fetches every profile whose id is in `ids`. Unknown ids are skipped.
    async fn fetch_profiles(&mut self, ids: &[Uuid]) -> ApiResult<Vec<Profile>>;
}

#[async_trait::async_trait]
impl ProfileStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn fetch_profile(&mut self, id: Uuid) -> ApiResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id, name FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **self.executor)
            .instrument(tracing::info_span!("fetch_optional"))
            .await?;
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn fetch_profiles(&mut self, ids: &[Uuid]) -> ApiResult<Vec<Profile>> {
        let profiles =
            sqlx::query_as::<_, Profile>("SELECT id, name FROM profiles WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&mut **self.executor)
                .instrument(tracing::info_span!("fetch_all"))
                .await?;
        Ok(profiles)
    }
}
