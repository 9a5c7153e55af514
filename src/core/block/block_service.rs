//! Blocking and unblocking profiles.

use super::block_repository::{Block, BlockStore, NewBlock};
use crate::{
    core::profile::profile_repository::{Profile, ProfileStore},
    infra::error::{ApiResult, ClientError},
};
use tracing::instrument;
use uuid::Uuid;

/// Blocks a profile.
#[instrument(skip(repository))]
pub async fn block_profile<R>(repository: &mut R, block: NewBlock) -> ApiResult<Block>
where
    R: ProfileStore + BlockStore,
{
    if block.blocker_id == block.blocked_id {
        return Err(ClientError::BadRequest("a profile cannot block itself".to_string()).into());
    }
    for profile_id in [block.blocker_id, block.blocked_id] {
        repository
            .fetch_profile(profile_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("profile {profile_id}")))?;
    }
    if repository
        .fetch_block(block.blocker_id, block.blocked_id)
        .await?
        .is_some()
    {
        return Err(ClientError::Conflict.into());
    }
    repository.create_block(&block).await
}

/// Lifts a block.
#[instrument(skip(repository))]
pub async fn unblock_profile<R>(repository: &mut R, block: NewBlock) -> ApiResult<()>
where
    R: BlockStore,
{
    let removed = repository
        .delete_block(block.blocker_id, block.blocked_id)
        .await?;
    if removed == 0 {
        return Err(ClientError::not_found(format!(
            "block of {} by {}",
            block.blocked_id, block.blocker_id
        ))
        .into());
    }
    tracing::info!("{} unblocked {}", block.blocker_id, block.blocked_id);
    Ok(())
}

/// The profiles someone has blocked.
#[instrument(skip(repository))]
pub async fn blocked_profiles<R>(repository: &mut R, blocker_id: Uuid) -> ApiResult<Vec<Profile>>
where
    R: BlockStore,
{
    repository.list_blocked_profiles(blocker_id).await
}
