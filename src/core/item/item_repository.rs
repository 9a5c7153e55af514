//! Types and functions for storing and loading items from the database.

use super::item_status::ItemStatus;
use crate::{
    core::repository::{escape_like, Repository},
    infra::{
        database::Tx,
        error::{ApiResult, ClientError},
        pagination::PaginationParams,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Where buyer and seller plan to meet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct MeetLocation {
    /// A human readable address.
    #[schema(example = "Main gate")]
    pub address: Option<String>,
    /// Latitude in degrees.
    #[validate(range(min = -90.0, max = 90.0))]
    #[schema(example = 37.5665)]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[validate(range(min = -180.0, max = 180.0))]
    #[schema(example = 126.978)]
    pub lng: Option<f64>,
}

impl MeetLocation {
    /// Builds a location from stored columns, if any of them is set.
    pub fn from_parts(address: Option<String>, lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        if address.is_none() && lat.is_none() && lng.is_none() {
            None
        } else {
            Some(Self { address, lat, lng })
        }
    }
}

/// A new listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    /// The seller's profile id.
    pub seller_id: Uuid,
    /// The listing's title.
    #[schema(example = "Desk lamp")]
    #[validate(length(min = 1))]
    pub title: String,
    /// The listing's description.
    #[schema(example = "Barely used")]
    #[serde(default)]
    pub description: String,
    /// The asking price.
    #[schema(example = 15000)]
    #[validate(range(min = 0))]
    pub price: i64,
    /// The listing's category.
    #[schema(example = "furniture")]
    #[validate(length(min = 1))]
    pub category: String,
    /// Where to meet, if agreed up front.
    #[validate(nested)]
    pub meet_location: Option<MeetLocation>,
}

/// New values for an existing listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    /// The listing's title.
    #[validate(length(min = 1))]
    pub title: String,
    /// The listing's description.
    #[serde(default)]
    pub description: String,
    /// The asking price.
    #[validate(range(min = 0))]
    pub price: i64,
    /// The listing's category.
    #[validate(length(min = 1))]
    pub category: String,
    /// Where to meet. `None` clears it.
    #[validate(nested)]
    pub meet_location: Option<MeetLocation>,
    /// A new status token, if the status should change too.
    #[schema(example = "reserved")]
    pub status: Option<String>,
    /// Image paths to keep. Images not listed here are deleted; an absent or
    /// empty list deletes all existing images.
    pub item_images: Option<Vec<String>>,
}

/// An existing listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// The item's id.
    pub id: i64,
    /// The seller's profile id.
    pub seller_id: Uuid,
    /// The buyer's profile id, once reserved.
    pub buyer_id: Option<Uuid>,
    /// The listing's title.
    pub title: String,
    /// The listing's description.
    pub description: String,
    /// The asking price.
    pub price: i64,
    /// The listing's category.
    pub category: String,
    /// The sale status.
    pub status: ItemStatus,
    /// Meeting address.
    pub meet_location_address: Option<String>,
    /// Meeting latitude.
    pub meet_location_lat: Option<f64>,
    /// Meeting longitude.
    pub meet_location_lng: Option<f64>,
    /// When the item was listed.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// The meeting location, if any part of it is set.
    pub fn meet_location(&self) -> Option<MeetLocation> {
        MeetLocation::from_parts(
            self.meet_location_address.clone(),
            self.meet_location_lat,
            self.meet_location_lng,
        )
    }
}

/// How to order listed items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
    /// Newest first.
    #[default]
    Latest,
    /// Cheapest first.
    PriceLow,
    /// Most expensive first.
    PriceHigh,
}

/// Which items to list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemFilter {
    /// Only items sold by this profile.
    pub seller_id: Option<Uuid>,
    /// Only items reserved for or sold to this profile.
    pub buyer_id: Option<Uuid>,
    /// Only items with this status.
    pub status: Option<ItemStatus>,
    /// Case-insensitive match on title or description.
    pub keyword: Option<String>,
    /// Only items in this category.
    pub category: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<i64>,
    /// Inclusive upper price bound.
    pub max_price: Option<i64>,
    /// Hide items from sellers this profile has blocked.
    pub hidden_for: Option<Uuid>,
    /// Ordering.
    pub sort: ItemSort,
    /// Which page.
    pub pagination: PaginationParams,
}

/// Anything that can store items.
#[async_trait::async_trait]
pub trait ItemStore: Send {
    /// Creates a new item with status on-sale.
    async fn create_item(&mut self, new_item: &NewItem) -> ApiResult<Item>;

    /// Fetches an item.
    async fn fetch_item(&mut self, id: i64) -> ApiResult<Option<Item>>;

    /// Lists items matching a filter.
    async fn list_items(&mut self, filter: &ItemFilter) -> ApiResult<Vec<Item>>;

    /// Replaces an item's scalar fields. The status is left alone.
    async fn update_item(&mut self, id: i64, update: &ItemUpdate) -> ApiResult<Item>;

    /// Sets an item's status.
    async fn set_item_status(&mut self, id: i64, status: ItemStatus) -> ApiResult<Item>;

    /// Marks an item as reserved for a buyer.
    async fn reserve_item(&mut self, id: i64, buyer_id: Uuid) -> ApiResult<Item>;

    /// Deletes an item row.
    async fn delete_item(&mut self, id: i64) -> ApiResult<()>;
}

#[async_trait::async_trait]
impl ItemStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn create_item(&mut self, new_item: &NewItem) -> ApiResult<Item> {
        tracing::info!("Creating item {:?}", new_item.title);
        let location = new_item.meet_location.clone().unwrap_or_default();
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (seller_id, title, description, price, category, status,
                               meet_location_address, meet_location_lat, meet_location_lng)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new_item.seller_id)
        .bind(&new_item.title)
        .bind(&new_item.description)
        .bind(new_item.price)
        .bind(&new_item.category)
        .bind(ItemStatus::OnSale)
        .bind(location.address)
        .bind(location.lat)
        .bind(location.lng)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Created item {}", item.id);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn fetch_item(&mut self, id: i64) -> ApiResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **self.executor)
            .instrument(tracing::info_span!("fetch_optional"))
            .await?;
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn list_items(&mut self, filter: &ItemFilter) -> ApiResult<Vec<Item>> {
        tracing::info!("Listing items");
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM items WHERE TRUE");
        if let Some(seller_id) = filter.seller_id {
            query.push(" AND seller_id = ").push_bind(seller_id);
        }
        if let Some(buyer_id) = filter.buyer_id {
            query.push(" AND buyer_id = ").push_bind(buyer_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(keyword) = &filter.keyword {
            let pattern = format!("%{}%", escape_like(keyword));
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        if let Some(viewer) = filter.hidden_for {
            query
                .push(" AND seller_id NOT IN (SELECT blocked_id FROM blocks WHERE blocker_id = ")
                .push_bind(viewer)
                .push(")");
        }
        query.push(match filter.sort {
            ItemSort::Latest => " ORDER BY created_at DESC, id DESC",
            ItemSort::PriceLow => " ORDER BY price ASC, id ASC",
            ItemSort::PriceHigh => " ORDER BY price DESC, id DESC",
        });
        query
            .push(" LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let items = query
            .build_query_as::<Item>()
            .fetch_all(&mut **self.executor)
            .instrument(tracing::info_span!("fetch_all"))
            .await?;
        tracing::info!("Listed {} items", items.len());
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn update_item(&mut self, id: i64, update: &ItemUpdate) -> ApiResult<Item> {
        let location = update.meet_location.clone().unwrap_or_default();
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET title = $2, description = $3, price = $4, category = $5,
                meet_location_address = $6, meet_location_lat = $7, meet_location_lng = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.price)
        .bind(&update.category)
        .bind(location.address)
        .bind(location.lat)
        .bind(location.lng)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Updated item {}", item.id);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn set_item_status(&mut self, id: i64, status: ItemStatus) -> ApiResult<Item> {
        let item =
            sqlx::query_as::<_, Item>("UPDATE items SET status = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(status)
                .fetch_one(&mut **self.executor)
                .await?;
        tracing::info!("Item {} is now {}", id, status);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn reserve_item(&mut self, id: i64, buyer_id: Uuid) -> ApiResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            "UPDATE items SET status = $2, buyer_id = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ItemStatus::Reserved)
        .bind(buyer_id)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Item {} reserved for {}", id, buyer_id);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete_item(&mut self, id: i64) -> ApiResult<()> {
        let rows = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut **self.executor)
            .await?;
        if rows.rows_affected() == 0 {
            tracing::warn!("Item not found");
            return Err(ClientError::not_found(format!("item {id}")))?;
        }
        tracing::info!("Deleted item {}", id);
        Ok(())
    }
}
