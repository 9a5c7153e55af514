//! The search history API implementation.

use crate::{
    core::{
        history::{
            history_repository::{NewSearch, SearchEntry},
            history_service,
        },
        repository::Repository,
    },
    infra::{
        database::DbPool,
        error::{ApiResult, ClientError, ErrorBody},
        extract::{Json, Query},
        state::AppState,
        validation::Valid,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::IntoParams;
use uuid::Uuid;

/// The search history API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(record_search)
        .typed_get(list_history)
        .typed_get(suggest_keywords)
        .typed_delete(delete_search)
        .typed_delete(clear_history)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/search-history", rejection(ClientError))]
struct SearchHistory;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/search-history/suggest", rejection(ClientError))]
struct SearchHistorySuggest;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/search-history/:id", rejection(ClientError))]
struct SearchHistoryId(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/search-history/clear/:id", rejection(ClientError))]
struct SearchHistoryClearId(Uuid);

/// Whose history to list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    profile_id: Uuid,
    /// How many entries, 10 by default.
    limit: Option<i64>,
}

/// A prefix to complete from someone's history.
#[derive(Clone, Debug, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct KeywordQuery {
    profile_id: Uuid,
    keyword: String,
}

/// Remembers a search.
#[utoipa::path(
    post,
    path = "/api/search-history",
    request_body = NewSearch,
    responses(
        (status = 201, description = "Created", body = SearchEntry),
        (status = 400, description = "Blank Keyword", body = ErrorBody),
        (status = 404, description = "Profile Not Found", body = ErrorBody),
        (status = 422, description = "Unprocessable Entity", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn record_search(
    _: SearchHistory,
    State(db): State<DbPool>,
    Json(search): Json<NewSearch>,
) -> ApiResult<(StatusCode, Json<SearchEntry>)> {
    let search = Valid::new(search)?.into_inner();
    let mut tx = db.begin().await?;
    let entry = history_service::record_search(
        &mut Repository::new(&mut tx),
        search.profile_id,
        &search.keyword,
    )
    .await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Lists someone's latest searches.
#[utoipa::path(
    get,
    path = "/api/search-history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Success", body = [SearchEntry]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn list_history(
    _: SearchHistory,
    State(db): State<DbPool>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<SearchEntry>>> {
    let mut tx = db.begin().await?;
    let entries =
        history_service::list_history(&mut Repository::new(&mut tx), query.profile_id, query.limit)
            .await?;
    tx.commit().await?;
    Ok(Json(entries))
}

/// Completes a keyword from someone's history.
#[utoipa::path(
    get,
    path = "/api/search-history/suggest",
    params(KeywordQuery),
    responses(
        (status = 200, description = "Success", body = [String]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn suggest_keywords(
    _: SearchHistorySuggest,
    State(db): State<DbPool>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let mut tx = db.begin().await?;
    let keywords = history_service::suggest_keywords(
        &mut Repository::new(&mut tx),
        query.profile_id,
        &query.keyword,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(keywords))
}

/// Forgets one search.
#[utoipa::path(
    delete,
    path = "/api/search-history/{id}",
    params(("id" = i64, Path, description = "The entry's id")),
    responses(
        (status = 204, description = "No Content"),
        (status = 404, description = "Not Found", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn delete_search(
    SearchHistoryId(id): SearchHistoryId,
    State(db): State<DbPool>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    history_service::delete_search(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Forgets everything someone searched for.
#[utoipa::path(
    delete,
    path = "/api/search-history/clear/{profileId}",
    params(("profileId" = Uuid, Path, description = "The profile's id")),
    responses(
        (status = 204, description = "No Content"),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn clear_history(
    SearchHistoryClearId(profile_id): SearchHistoryClearId,
    State(db): State<DbPool>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    history_service::clear_history(&mut Repository::new(&mut tx), profile_id).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
