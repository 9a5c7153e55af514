//! Remembering, listing and forgetting what a profile searched for.

use super::history_repository::{HistoryStore, SearchEntry};
use crate::{
    core::profile::profile_repository::ProfileStore,
    infra::error::{ApiResult, ClientError},
};
use tracing::instrument;
use uuid::Uuid;

/// Entries returned when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

const MAX_HISTORY_LIMIT: i64 = 100;

/// Keyword suggestions returned at most.
const SUGGESTION_LIMIT: i64 = 5;

/// Remembers a search. Searching the same keyword again moves it to the front.
#[instrument(skip(repository))]
pub async fn record_search<R>(
    repository: &mut R,
    profile_id: Uuid,
    keyword: &str,
) -> ApiResult<SearchEntry>
where
    R: ProfileStore + HistoryStore,
{
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(ClientError::BadRequest("keyword must not be empty".to_string()).into());
    }
    repository
        .fetch_profile(profile_id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("profile {profile_id}")))?;

    repository.delete_keyword(profile_id, keyword).await?;
    repository.add_search(profile_id, keyword).await
}

/// The latest searches of a profile.
#[instrument(skip(repository))]
pub async fn list_history<R>(
    repository: &mut R,
    profile_id: Uuid,
    limit: Option<i64>,
) -> ApiResult<Vec<SearchEntry>>
where
    R: HistoryStore,
{
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    repository.list_searches(profile_id, limit).await
}

/// Forgets one search.
#[instrument(skip(repository))]
pub async fn delete_search<R>(repository: &mut R, id: i64) -> ApiResult<()>
where
    R: HistoryStore,
{
    if repository.delete_search(id).await? == 0 {
        return Err(ClientError::not_found(format!("search {id}")).into());
    }
    Ok(())
}

/// Forgets every search of a profile, returning how many were removed.
#[instrument(skip(repository))]
pub async fn clear_history<R>(repository: &mut R, profile_id: Uuid) -> ApiResult<u64>
where
    R: HistoryStore,
{
    let removed = repository.clear_searches(profile_id).await?;
    tracing::info!("Cleared {} search(es)", removed);
    Ok(removed)
}

/// Previous keywords starting with a prefix.
#[instrument(skip(repository))]
pub async fn suggest_keywords<R>(
    repository: &mut R,
    profile_id: Uuid,
    prefix: &str,
) -> ApiResult<Vec<String>>
where
    R: HistoryStore,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(Vec::new());
    }
    repository
        .suggest_keywords(profile_id, prefix, SUGGESTION_LIMIT)
        .await
}
