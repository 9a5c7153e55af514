//! The transaction API implementation.

use crate::{
    core::{
        repository::Repository,
        transaction::{
            transaction_repository::{
                ItemTransaction, NewTransaction, TransactionRequest, TransactionStatus,
            },
            transaction_service,
        },
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
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// The transaction API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_transaction)
        .typed_get(list_requests)
        .typed_post(confirm_transaction)
        .typed_post(reject_transaction)
        .typed_put(update_transaction_status)
        .typed_get(transactions_for_buyer)
        .typed_get(transaction_for_item_and_buyer)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions", rejection(ClientError))]
struct Transactions;

/// Keyed by item id.
#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/:id/requests", rejection(ClientError))]
struct TransactionsIdRequests(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/:id/confirm", rejection(ClientError))]
struct TransactionsIdConfirm(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/:id/reject", rejection(ClientError))]
struct TransactionsIdReject(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/:id/status", rejection(ClientError))]
struct TransactionsIdStatus(i64);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/user/:id", rejection(ClientError))]
struct TransactionsUserId(Uuid);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/transactions/item/:id/buyer/:buyer_id", rejection(ClientError))]
struct TransactionsItemBuyer {
    id: i64,
    buyer_id: Uuid,
}

/// The seller whose requests to list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SellerQuery {
    seller_id: Uuid,
}

/// A new status for a transaction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatusChange {
    pub status: TransactionStatus,
}

/// Requests to buy an item.
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = NewTransaction,
    responses(
        (status = 201, description = "Created", body = ItemTransaction),
        (status = 404, description = "Buyer, Seller Or Item Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn create_transaction(
    _: Transactions,
    State(db): State<DbPool>,
    Json(new): Json<NewTransaction>,
) -> ApiResult<(StatusCode, Json<ItemTransaction>)> {
    let mut tx = db.begin().await?;
    let transaction =
        transaction_service::create_transaction(&mut Repository::new(&mut tx), new).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Lists the requests a seller received for an item.
#[utoipa::path(
    get,
    path = "/api/transactions/{itemId}/requests",
    params(("itemId" = i64, Path, description = "The item's id"), SellerQuery),
    responses(
        (status = 200, description = "Success", body = [TransactionRequest]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn list_requests(
    TransactionsIdRequests(item_id): TransactionsIdRequests,
    State(db): State<DbPool>,
    Query(query): Query<SellerQuery>,
) -> ApiResult<Json<Vec<TransactionRequest>>> {
    let mut tx = db.begin().await?;
    let requests =
        transaction_service::list_requests(&mut Repository::new(&mut tx), item_id, query.seller_id)
            .await?;
    tx.commit().await?;
    Ok(Json(requests))
}

/// Confirms a transaction and rejects every other request for the same item.
#[utoipa::path(
    post,
    path = "/api/transactions/{id}/confirm",
    params(("id" = i64, Path, description = "The transaction's id")),
    responses(
        (status = 200, description = "Ok"),
        (status = 400, description = "No Such Transaction", body = ErrorBody),
        (status = 409, description = "Conflict", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn confirm_transaction(
    TransactionsIdConfirm(id): TransactionsIdConfirm,
    State(db): State<DbPool>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    transaction_service::confirm_transaction(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(StatusCode::OK)
}

/// Rejects a transaction.
#[utoipa::path(
    post,
    path = "/api/transactions/{id}/reject",
    params(("id" = i64, Path, description = "The transaction's id")),
    responses(
        (status = 200, description = "Ok"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn reject_transaction(
    TransactionsIdReject(id): TransactionsIdReject,
    State(db): State<DbPool>,
) -> ApiResult<StatusCode> {
    let mut tx = db.begin().await?;
    transaction_service::reject_transaction(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(StatusCode::OK)
}

/// Sets a transaction's status.
#[utoipa::path(
    put,
    path = "/api/transactions/{id}/status",
    params(("id" = i64, Path, description = "The transaction's id")),
    request_body = TransactionStatusChange,
    responses(
        (status = 200, description = "Ok", body = ItemTransaction),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Item Already Has A Confirmed Transaction", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn update_transaction_status(
    TransactionsIdStatus(id): TransactionsIdStatus,
    State(db): State<DbPool>,
    Json(change): Json<TransactionStatusChange>,
) -> ApiResult<Json<ItemTransaction>> {
    let mut tx = db.begin().await?;
    let transaction = transaction_service::update_transaction_status(
        &mut Repository::new(&mut tx),
        id,
        change.status,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(transaction))
}

/// Lists the transactions a buyer requested.
#[utoipa::path(
    get,
    path = "/api/transactions/user/{buyerId}",
    params(("buyerId" = Uuid, Path, description = "The buyer's profile id")),
    responses(
        (status = 200, description = "Success", body = [ItemTransaction]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn transactions_for_buyer(
    TransactionsUserId(buyer_id): TransactionsUserId,
    State(db): State<DbPool>,
) -> ApiResult<Json<Vec<ItemTransaction>>> {
    let mut tx = db.begin().await?;
    let transactions =
        transaction_service::transactions_for_buyer(&mut Repository::new(&mut tx), buyer_id)
            .await?;
    tx.commit().await?;
    Ok(Json(transactions))
}

/// Gets a buyer's transaction for an item.
#[utoipa::path(
    get,
    path = "/api/transactions/item/{itemId}/buyer/{buyerId}",
    params(
        ("itemId" = i64, Path, description = "The item's id"),
        ("buyerId" = Uuid, Path, description = "The buyer's profile id"),
    ),
    responses(
        (status = 200, description = "Ok", body = ItemTransaction),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn transaction_for_item_and_buyer(
    TransactionsItemBuyer { id, buyer_id }: TransactionsItemBuyer,
    State(db): State<DbPool>,
) -> ApiResult<Json<ItemTransaction>> {
    let mut tx = db.begin().await?;
    let transaction = transaction_service::transaction_for_item_and_buyer(
        &mut Repository::new(&mut tx),
        id,
        buyer_id,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(transaction))
}
