//! Types and functions for storing and loading transactions from the database.

use crate::{
    core::repository::Repository,
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// The seller's decision on a purchase request.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting for the seller.
    Pending,
    /// Accepted by the seller.
    Confirmed,
    /// Turned down, or lost to another buyer.
    Rejected,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Rejected => "rejected",
        })
    }
}

/// A buyer asking to purchase an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Who wants to buy.
    pub buyer_id: Uuid,
    /// Who is selling.
    pub seller_id: Uuid,
    /// What is being bought.
    pub item_id: i64,
}

/// A stored purchase request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemTransaction {
    /// The transaction's id.
    pub id: i64,
    /// The requested item.
    pub item_id: i64,
    /// The requesting buyer.
    pub buyer_id: Uuid,
    /// The seller, as given when the request was made.
    pub seller_id: Uuid,
    /// The seller's decision.
    pub status: TransactionStatus,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
}

/// A purchase request as the seller sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// The transaction's id.
    pub transaction_id: i64,
    /// The requesting buyer.
    pub buyer_id: Uuid,
    /// The buyer's name.
    pub buyer_name: String,
    /// The seller's decision so far.
    pub status: TransactionStatus,
}

/// Anything that can store transactions.
#[async_trait::async_trait]
pub trait TransactionStore: Send {
    /// Creates a pending transaction.
    async fn create_transaction(&mut self, new: &NewTransaction) -> ApiResult<ItemTransaction>;

    /// Fetches a transaction.
    async fn fetch_transaction(&mut self, id: i64) -> ApiResult<Option<ItemTransaction>>;

    /// Every transaction for an item, locked until the surrounding database
    /// transaction ends.
    async fn lock_transactions_for_item(&mut self, item_id: i64)
        -> ApiResult<Vec<ItemTransaction>>;

    /// Every transaction a buyer has requested, newest first.
    async fn list_transactions_for_buyer(&mut self, buyer_id: Uuid)
        -> ApiResult<Vec<ItemTransaction>>;

    /// The buyer's latest transaction for an item.
    async fn find_transaction(
        &mut self,
        item_id: i64,
        buyer_id: Uuid,
    ) -> ApiResult<Option<ItemTransaction>>;

    /// The requests a seller has received for an item, oldest first.
    async fn list_requests(
        &mut self,
        item_id: i64,
        seller_id: Uuid,
    ) -> ApiResult<Vec<TransactionRequest>>;

    /// Sets a transaction's status.
    async fn set_transaction_status(
        &mut self,
        id: i64,
        status: TransactionStatus,
    ) -> ApiResult<ItemTransaction>;

    /// Rejects every transaction for the item except one, returning how many changed.
    async fn reject_competing(&mut self, item_id: i64, except_id: i64) -> ApiResult<u64>;

    /// Deletes every transaction for an item, returning how many were deleted.
    async fn delete_transactions_for_item(&mut self, item_id: i64) -> ApiResult<u64>;
}

#[async_trait::async_trait]
impl TransactionStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn create_transaction(&mut self, new: &NewTransaction) -> ApiResult<ItemTransaction> {
        let transaction = sqlx::query_as::<_, ItemTransaction>(
            r#"
            INSERT INTO item_transactions (item_id, buyer_id, seller_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.item_id)
        .bind(new.buyer_id)
        .bind(new.seller_id)
        .bind(TransactionStatus::Pending)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Created transaction {}", transaction.id);
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn fetch_transaction(&mut self, id: i64) -> ApiResult<Option<ItemTransaction>> {
        let transaction =
            sqlx::query_as::<_, ItemTransaction>("SELECT * FROM item_transactions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut **self.executor)
                .instrument(tracing::info_span!("fetch_optional"))
                .await?;
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn lock_transactions_for_item(
        &mut self,
        item_id: i64,
    ) -> ApiResult<Vec<ItemTransaction>> {
        let transactions = sqlx::query_as::<_, ItemTransaction>(
            "SELECT * FROM item_transactions WHERE item_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(item_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        tracing::debug!("Locked {} transaction(s)", transactions.len());
        Ok(transactions)
    }

    #[instrument(skip(self))]
    async fn list_transactions_for_buyer(
        &mut self,
        buyer_id: Uuid,
    ) -> ApiResult<Vec<ItemTransaction>> {
        let transactions = sqlx::query_as::<_, ItemTransaction>(
            "SELECT * FROM item_transactions WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(buyer_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(transactions)
    }

    #[instrument(skip(self))]
    async fn find_transaction(
        &mut self,
        item_id: i64,
        buyer_id: Uuid,
    ) -> ApiResult<Option<ItemTransaction>> {
        let transaction = sqlx::query_as::<_, ItemTransaction>(
            r#"
            SELECT * FROM item_transactions
            WHERE item_id = $1 AND buyer_id = $2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(item_id)
        .bind(buyer_id)
        .fetch_optional(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_optional"))
        .await?;
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn list_requests(
        &mut self,
        item_id: i64,
        seller_id: Uuid,
    ) -> ApiResult<Vec<TransactionRequest>> {
        let requests = sqlx::query_as::<_, TransactionRequest>(
            r#"
            SELECT t.id AS transaction_id, t.buyer_id, p.name AS buyer_name, t.status
            FROM item_transactions t
            JOIN profiles p ON p.id = t.buyer_id
            WHERE t.item_id = $1 AND t.seller_id = $2
            ORDER BY t.id
            "#,
        )
        .bind(item_id)
        .bind(seller_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(requests)
    }

    #[instrument(skip(self))]
    async fn set_transaction_status(
        &mut self,
        id: i64,
        status: TransactionStatus,
    ) -> ApiResult<ItemTransaction> {
        let transaction = sqlx::query_as::<_, ItemTransaction>(
            "UPDATE item_transactions SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Transaction {} is now {}", id, status);
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn reject_competing(&mut self, item_id: i64, except_id: i64) -> ApiResult<u64> {
        let rows = sqlx::query(
            "UPDATE item_transactions SET status = $3 WHERE item_id = $1 AND id <> $2",
        )
        .bind(item_id)
        .bind(except_id)
        .bind(TransactionStatus::Rejected)
        .execute(&mut **self.executor)
        .await?;
        Ok(rows.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_transactions_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM item_transactions WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }
}
