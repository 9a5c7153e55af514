//! Image records owned by items.

use crate::{
    core::repository::Repository,
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, Instrument};
use utoipa::ToSchema;

/// A stored image belonging to one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemImage {
    /// The image's id.
    pub id: i64,
    /// The owning item.
    pub item_id: i64,
    /// Public path, e.g. `/uploads/3f2a...c1.png`.
    pub photo_path: String,
    /// When the image was stored.
    pub created_at: DateTime<Utc>,
}

/// Anything that can store image records.
#[async_trait::async_trait]
pub trait ItemImageStore: Send {
    /// Records a stored image for an item.
    async fn add_image(&mut self, item_id: i64, photo_path: &str) -> ApiResult<ItemImage>;

    /// An item's images in upload order.
    async fn list_images(&mut self, item_id: i64) -> ApiResult<Vec<ItemImage>>;

    /// The images of several items at once, in upload order.
    async fn list_images_for_items(&mut self, item_ids: &[i64]) -> ApiResult<Vec<ItemImage>>;

    /// Removes one image record.
    async fn delete_image(&mut self, id: i64) -> ApiResult<()>;

    /// Removes every image record of an item, returning how many were removed.
    async fn delete_images_for_item(&mut self, item_id: i64) -> ApiResult<u64>;
}

#[async_trait::async_trait]
impl ItemImageStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn add_image(&mut self, item_id: i64, photo_path: &str) -> ApiResult<ItemImage> {
        let image = sqlx::query_as::<_, ItemImage>(
            "INSERT INTO item_images (item_id, photo_path) VALUES ($1, $2) RETURNING *",
        )
        .bind(item_id)
        .bind(photo_path)
        .fetch_one(&mut **self.executor)
        .await?;
        Ok(image)
    }

    #[instrument(skip(self))]
    async fn list_images(&mut self, item_id: i64) -> ApiResult<Vec<ItemImage>> {
        let images = sqlx::query_as::<_, ItemImage>(
            "SELECT * FROM item_images WHERE item_id = $1 ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(images)
    }

    #[instrument(skip(self))]
    async fn list_images_for_items(&mut self, item_ids: &[i64]) -> ApiResult<Vec<ItemImage>> {
        let images = sqlx::query_as::<_, ItemImage>(
            "SELECT * FROM item_images WHERE item_id = ANY($1) ORDER BY item_id, id",
        )
        .bind(item_ids)
        .fetch_all(&mut **self.executor)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        Ok(images)
    }

    #[instrument(skip(self))]
    async fn delete_image(&mut self, id: i64) -> ApiResult<()> {
        sqlx::query("DELETE FROM item_images WHERE id = $1")
            .bind(id)
            .execute(&mut **self.executor)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_images_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM item_images WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }
}
