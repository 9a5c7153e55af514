//! The block API implementation.

use crate::{
    core::{
        block::{
            block_repository::{Block, NewBlock},
            block_service,
        },
        profile::profile_repository::Profile,
        repository::Repository,
    },
    infra::{
        database::DbPool,
        error::{ApiResult, ClientError, ErrorBody},
        extract::{Json, Query},
        state::AppState,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

/// The block API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(block_profile)
        .typed_delete(unblock_profile)
        .typed_get(blocked_profiles)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/blocks", rejection(ClientError))]
struct Blocks;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/blocks/:id", rejection(ClientError))]
struct BlocksId(Uuid);

/// Blocks a profile.
#[utoipa::path(
    post,
    path = "/api/blocks",
    request_body = NewBlock,
    responses(
        (status = 201, description = "Created", body = Block),
        (status = 400, description = "Self Block", body = ErrorBody),
        (status = 404, description = "Profile Not Found", body = ErrorBody),
        (status = 409, description = "Already Blocked", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn block_profile(
    _: Blocks,
    State(db): State<DbPool>,
    Json(block): Json<NewBlock>,
) -> ApiResult<(StatusCode, Json<Block>)> {
    let mut tx = db.begin().await?;
    let block = block_service::block_profile(&mut Repository::new(&mut tx), block).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// Lifts a block.
#[utoipa::path(
    delete,
    path = "/api/blocks",
    params(NewBlock),
    responses(
        (status = 204, description = "No Content"),
        (status = 404, description = "Not Found", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn unblock_profile(
    _: Blocks,
    State(db): State<DbPool>,
    Query(block): Query<NewBlock>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    block_service::unblock_profile(&mut Repository::new(&mut tx), block).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists the profiles someone has blocked.
#[utoipa::path(
    get,
    path = "/api/blocks/{blockerId}",
    params(("blockerId" = Uuid, Path, description = "The blocking profile's id")),
    responses(
        (status = 200, description = "Success", body = [Profile]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn blocked_profiles(
    BlocksId(blocker_id): BlocksId,
    State(db): State<DbPool>,
) -> ApiResult<Json<Vec<Profile>>> {
    let mut tx = db.begin().await?;
    let profiles = block_service::blocked_profiles(&mut Repository::new(&mut tx), blocker_id).await?;
    tx.commit().await?;
    Ok(Json(profiles))
}
