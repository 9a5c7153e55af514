//! The item API implementation.

use crate::{
    core::{
        item::{
            image_store::{DiskImageStore, ImageUpload},
            item_repository::{Item, ItemFilter, ItemSort, ItemUpdate, NewItem},
            item_service::{self, ItemDetails, ItemSuggestion},
            item_status::{ItemStatus, TransitionPolicy},
        },
        repository::Repository,
    },
    infra::{
        database::DbPool,
        error::{ApiResult, ClientError, ErrorBody},
        extract::{Json, Query},
        pagination::PaginationParams,
        state::AppState,
        validation::Valid,
    },
};
use axum::{
    extract::{Multipart, State},
    Router,
};
use axum_extra::{
    extract::WithRejection,
    routing::{RouterExt, TypedPath},
};
use http::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// The item API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_item)
        .typed_get(list_items)
        .typed_get(search_items)
        .typed_get(suggest_items)
        .typed_get(completed_items)
        .typed_get(get_item)
        .typed_put(update_item)
        .typed_delete(delete_item)
        .typed_put(update_item_status)
        .typed_post(reserve_item)
        .typed_post(complete_item)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items", rejection(ClientError))]
struct Items;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/search", rejection(ClientError))]
struct ItemsSearch;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/suggest", rejection(ClientError))]
struct ItemsSuggest;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/completed", rejection(ClientError))]
struct ItemsCompleted;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/:id", rejection(ClientError))]
struct ItemsId(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/:id/status", rejection(ClientError))]
struct ItemsIdStatus(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/:id/reserve", rejection(ClientError))]
struct ItemsIdReserve(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/items/:id/complete", rejection(ClientError))]
struct ItemsIdComplete(i64);

/// The multipart form for listing an item.
#[derive(ToSchema)]
pub struct NewItemForm {
    /// The item as JSON.
    pub item: NewItem,
    /// Image files.
    #[schema(value_type = Vec<String>)]
    pub images: Vec<Vec<u8>>,
}

/// The multipart form for editing an item.
#[derive(ToSchema)]
pub struct ItemUpdateForm {
    /// The new values as JSON, including the image paths to keep.
    pub item: ItemUpdate,
    /// Image files to add.
    #[schema(value_type = Vec<String>)]
    pub images: Vec<Vec<u8>>,
}

/// Which items to list.
#[derive(Clone, Debug, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    /// Only items sold by this profile.
    seller_id: Option<Uuid>,
    /// Only items reserved for or sold to this profile.
    buyer_id: Option<Uuid>,
    /// Only items with this status.
    status: Option<ItemStatus>,
    /// Only items in this category.
    category: Option<String>,
    /// Inclusive lower price bound.
    min_price: Option<i64>,
    /// Inclusive upper price bound.
    max_price: Option<i64>,
    /// Ordering, `latest` by default.
    sort_by: Option<ItemSort>,
    /// The profile looking. Sellers it blocked are hidden and searches are remembered.
    viewer_id: Option<Uuid>,
    /// Matched against title and description.
    keyword: Option<String>,
}

impl ItemQuery {
    fn into_filter(self, pagination: PaginationParams) -> ItemFilter {
        ItemFilter {
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            status: self.status,
            keyword: self.keyword.filter(|keyword| !keyword.trim().is_empty()),
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            hidden_for: self.viewer_id,
            sort: self.sort_by.unwrap_or_default(),
            pagination,
        }
    }
}

/// A keyword to complete.
#[derive(Clone, Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestQuery {
    keyword: String,
}

/// Whose purchases to list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BuyerQuery {
    buyer_id: Uuid,
}

/// A new status for an item.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    /// `on_sale`, `reserved` or `sold`.
    #[schema(example = "sold")]
    pub status: String,
}

/// Who reserves an item.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub buyer_id: Uuid,
}

/// Reads the `item` JSON part and the `images` file parts of a form.
async fn read_item_form<T: DeserializeOwned + Send>(
    mut multipart: Multipart,
) -> ApiResult<(T, Vec<ImageUpload>)> {
    let mut item = None;
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("item") => {
                let bytes = field.bytes().await?;
                let parsed = serde_json::from_slice::<T>(&bytes)
                    .map_err(|e| ClientError::BadRequest(format!("invalid item: {e}")))?;
                item = Some(parsed);
            }
            Some("images") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if data.is_empty() {
                    tracing::debug!("Skipping empty upload {:?}", file_name);
                } else {
                    uploads.push(ImageUpload { file_name, data });
                }
            }
            other => tracing::debug!("Ignoring form field {:?}", other),
        }
    }
    let item = item.ok_or_else(|| ClientError::BadRequest("missing item part".to_string()))?;
    Ok((item, uploads))
}

/// Lists a new item.
#[utoipa::path(
    post,
    path = "/api/items",
    request_body(content = NewItemForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = ItemDetails),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 404, description = "Seller Not Found", body = ErrorBody),
        (status = 422, description = "Unprocessable Entity", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip_all)]
async fn create_item(
    _: Items,
    State(db): State<DbPool>,
    State(images): State<DiskImageStore>,
    WithRejection(multipart, _): WithRejection<Multipart, ClientError>,
) -> ApiResult<(StatusCode, Json<ItemDetails>)> {
    let (new_item, uploads) = read_item_form::<NewItem>(multipart).await?;
    let new_item = Valid::new(new_item)?;
    let mut tx = db.begin().await?;
    let mut repository = Repository::new(&mut tx);
    let item = item_service::create_item(&mut repository, &images, new_item, uploads).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Lists items.
#[utoipa::path(
    get,
    path = "/api/items",
    params(ItemQuery, PaginationParams),
    responses(
        (status = 200, description = "Success", body = [ItemDetails]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn list_items(
    _: Items,
    State(db): State<DbPool>,
    Query(query): Query<ItemQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<Vec<ItemDetails>>> {
    let filter = query.into_filter(pagination);
    let mut tx = db.begin().await?;
    let items = item_service::list_items(&mut Repository::new(&mut tx), &filter).await?;
    tx.commit().await?;
    Ok(Json(items))
}

/// Searches items by keyword and remembers the search for the viewer.
#[utoipa::path(
    get,
    path = "/api/items/search",
    params(ItemQuery, PaginationParams),
    responses(
        (status = 200, description = "Success", body = [ItemDetails]),
        (status = 404, description = "Viewer Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn search_items(
    _: ItemsSearch,
    State(db): State<DbPool>,
    Query(query): Query<ItemQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<Vec<ItemDetails>>> {
    let viewer = query.viewer_id;
    let filter = query.into_filter(pagination);
    let mut tx = db.begin().await?;
    let items =
        item_service::search_items(&mut Repository::new(&mut tx), &filter, viewer).await?;
    tx.commit().await?;
    Ok(Json(items))
}

/// Suggests items for a partial keyword.
#[utoipa::path(
    get,
    path = "/api/items/suggest",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Success", body = [ItemSuggestion]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn suggest_items(
    _: ItemsSuggest,
    State(db): State<DbPool>,
    Query(query): Query<SuggestQuery>,
) -> ApiResult<Json<Vec<ItemSuggestion>>> {
    let mut tx = db.begin().await?;
    let suggestions =
        item_service::suggest_items(&mut Repository::new(&mut tx), &query.keyword).await?;
    tx.commit().await?;
    Ok(Json(suggestions))
}

/// Lists the items a profile has bought.
#[utoipa::path(
    get,
    path = "/api/items/completed",
    params(BuyerQuery, PaginationParams),
    responses(
        (status = 200, description = "Success", body = [ItemDetails]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn completed_items(
    _: ItemsCompleted,
    State(db): State<DbPool>,
    Query(query): Query<BuyerQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<Vec<ItemDetails>>> {
    let mut tx = db.begin().await?;
    let items = item_service::completed_items_for_buyer(
        &mut Repository::new(&mut tx),
        query.buyer_id,
        pagination,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(items))
}

/// Gets an item.
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = i64, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = ItemDetails),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn get_item(ItemsId(id): ItemsId, State(db): State<DbPool>) -> ApiResult<Json<ItemDetails>> {
    let mut tx = db.begin().await?;
    let item = item_service::read_item(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(Json(item))
}

/// Edits an item.
///
/// Images whose paths are missing from `itemImages` are deleted. Leaving the
/// list out, or sending it empty, deletes every image.
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(("id" = i64, Path, description = "The item's id")),
    request_body(content = ItemUpdateForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Ok", body = ItemDetails),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Unprocessable Entity", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(id = id))]
async fn update_item(
    ItemsId(id): ItemsId,
    State(db): State<DbPool>,
    State(images): State<DiskImageStore>,
    State(policy): State<TransitionPolicy>,
    WithRejection(multipart, _): WithRejection<Multipart, ClientError>,
) -> ApiResult<Json<ItemDetails>> {
    let (update, uploads) = read_item_form::<ItemUpdate>(multipart).await?;
    let update = Valid::new(update)?;
    let mut tx = db.begin().await?;
    let mut repository = Repository::new(&mut tx);
    let (item, stale) =
        item_service::update_item(&mut repository, &images, id, update, uploads, policy).await?;
    tx.commit().await?;
    stale.delete(&images).await;
    Ok(Json(item))
}

/// Deletes an item with its transactions, reports and images.
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = i64, Path, description = "The item's id")),
    responses(
        (status = 204, description = "No Content"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db, images))]
async fn delete_item(
    ItemsId(id): ItemsId,
    State(db): State<DbPool>,
    State(images): State<DiskImageStore>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    let stale = item_service::delete_item(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    stale.delete(&images).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Sets an item's status.
#[utoipa::path(
    put,
    path = "/api/items/{id}/status",
    params(("id" = i64, Path, description = "The item's id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 400, description = "Unknown Status", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn update_item_status(
    ItemsIdStatus(id): ItemsIdStatus,
    State(db): State<DbPool>,
    State(policy): State<TransitionPolicy>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<Item>> {
    let mut tx = db.begin().await?;
    let item =
        item_service::update_item_status(&mut Repository::new(&mut tx), id, &change.status, policy)
            .await?;
    tx.commit().await?;
    Ok(Json(item))
}

/// Reserves an item for a buyer.
#[utoipa::path(
    post,
    path = "/api/items/{id}/reserve",
    params(("id" = i64, Path, description = "The item's id")),
    request_body = ReserveRequest,
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Item Or Buyer Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn reserve_item(
    ItemsIdReserve(id): ItemsIdReserve,
    State(db): State<DbPool>,
    State(policy): State<TransitionPolicy>,
    Json(request): Json<ReserveRequest>,
) -> ApiResult<Json<Item>> {
    let mut tx = db.begin().await?;
    let item =
        item_service::reserve_item(&mut Repository::new(&mut tx), id, request.buyer_id, policy)
            .await?;
    tx.commit().await?;
    Ok(Json(item))
}

/// Marks an item as sold.
#[utoipa::path(
    post,
    path = "/api/items/{id}/complete",
    params(("id" = i64, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn complete_item(
    ItemsIdComplete(id): ItemsIdComplete,
    State(db): State<DbPool>,
    State(policy): State<TransitionPolicy>,
) -> ApiResult<Json<Item>> {
    let mut tx = db.begin().await?;
    let item = item_service::complete_item(&mut Repository::new(&mut tx), id, policy).await?;
    tx.commit().await?;
    Ok(Json(item))
}
