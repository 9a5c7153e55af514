//! The item lifecycle: listing, editing, reserving, selling and removing items,
//! together with the image files that belong to them.

use super::{
    image_repository::{ItemImage, ItemImageStore},
    image_store::{ImageStore, ImageUpload},
    item_repository::{Item, ItemFilter, ItemStore, ItemUpdate, MeetLocation, NewItem},
    item_status::{ItemStatus, TransitionPolicy},
};
use crate::{
    core::{
        history::{history_repository::HistoryStore, history_service},
        profile::profile_repository::ProfileStore,
        report::report_repository::ReportStore,
        transaction::transaction_repository::TransactionStore,
    },
    infra::{
        error::{ApiError, ApiResult, ClientError},
        pagination::PaginationParams,
        validation::Valid,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// An item as shown to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    /// The item's id.
    pub item_id: i64,
    /// The listing's title.
    pub title: String,
    /// The listing's category.
    pub category: String,
    /// The listing's description.
    pub description: String,
    /// The asking price.
    pub price: i64,
    /// When the item was listed.
    pub created_at: DateTime<Utc>,
    /// Where to meet.
    pub meet_location: Option<MeetLocation>,
    /// The seller's profile id.
    pub seller_id: Uuid,
    /// The seller's name, if the profile still exists.
    pub seller_name: Option<String>,
    /// The buyer's profile id, once reserved.
    pub buyer_id: Option<Uuid>,
    /// Public image paths in upload order.
    pub item_images: Vec<String>,
    /// The sale status.
    pub status: ItemStatus,
}

impl ItemDetails {
    fn new(item: Item, item_images: Vec<String>, seller_name: Option<String>) -> Self {
        let meet_location = item.meet_location();
        Self {
            item_id: item.id,
            title: item.title,
            category: item.category,
            description: item.description,
            price: item.price,
            created_at: item.created_at,
            meet_location,
            seller_id: item.seller_id,
            seller_name,
            buyer_id: item.buyer_id,
            item_images,
            status: item.status,
        }
    }
}

/// A search-as-you-type hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemSuggestion {
    /// The item's id.
    pub item_id: i64,
    /// The listing's title.
    pub title: String,
    /// The first image, if any.
    pub thumbnail: Option<String>,
}

/// How many suggestions to return.
const SUGGESTION_LIMIT: i64 = 10;

/// Image files whose records were removed but which are still on disk.
///
/// Call [`StaleImages::delete`] once the removal is committed. Dropping the
/// value leaves the files in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use = "the files are only deleted by `StaleImages::delete`"]
pub struct StaleImages(Vec<String>);

impl StaleImages {
    fn new(images: &[ItemImage]) -> Self {
        Self(images.iter().map(|image| image.photo_path.clone()).collect())
    }

    /// Public paths of the files.
    pub fn paths(&self) -> &[String] {
        &self.0
    }

    /// Deletes the files. Failures are logged, never returned.
    pub async fn delete<S: ImageStore + ?Sized>(self, images: &S) {
        delete_files(images, self.0.iter().map(String::as_str)).await;
    }
}

/// Lists a new item with status on-sale and stores its images.
#[instrument(skip(repository, images, uploads), fields(uploads = uploads.len()))]
pub async fn create_item<R, S>(
    repository: &mut R,
    images: &S,
    new_item: Valid<NewItem>,
    uploads: Vec<ImageUpload>,
) -> ApiResult<ItemDetails>
where
    R: ProfileStore + ItemStore + ItemImageStore,
    S: ImageStore + ?Sized,
{
    let new_item = new_item.into_inner();
    let seller = repository
        .fetch_profile(new_item.seller_id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("profile {}", new_item.seller_id)))?;

    let item = repository.create_item(&new_item).await?;
    let stored = store_images(repository, images, item.id, &uploads).await?;
    tracing::info!("Listed item {} with {} image(s)", item.id, stored.len());

    let paths = stored.into_iter().map(|image| image.photo_path).collect();
    Ok(ItemDetails::new(item, paths, Some(seller.name)))
}

/// Reads an item with its images and seller name.
#[instrument(skip(repository))]
pub async fn read_item<R>(repository: &mut R, id: i64) -> ApiResult<ItemDetails>
where
    R: ProfileStore + ItemStore + ItemImageStore,
{
    let item = fetch_existing(repository, id).await?;
    let mut details = with_details(repository, vec![item]).await?;
    details
        .pop()
        .ok_or_else(|| ClientError::not_found(format!("item {id}")).into())
}

/// Lists items matching a filter.
#[instrument(skip(repository))]
pub async fn list_items<R>(repository: &mut R, filter: &ItemFilter) -> ApiResult<Vec<ItemDetails>>
where
    R: ProfileStore + ItemStore + ItemImageStore,
{
    let items = repository.list_items(filter).await?;
    with_details(repository, items).await
}

/// Searches items and remembers the keyword for the viewer, if there is one.
#[instrument(skip(repository))]
pub async fn search_items<R>(
    repository: &mut R,
    filter: &ItemFilter,
    viewer: Option<Uuid>,
) -> ApiResult<Vec<ItemDetails>>
where
    R: ProfileStore + ItemStore + ItemImageStore + HistoryStore,
{
    let found = list_items(repository, filter).await?;
    if let (Some(viewer), Some(keyword)) = (viewer, filter.keyword.as_deref()) {
        if !keyword.trim().is_empty() {
            match history_service::record_search(repository, viewer, keyword).await {
                Ok(_) => {}
                Err(ApiError::ClientError(e)) => {
                    tracing::warn!("Not recording search for {}: {}", viewer, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(found)
}

/// Up to ten items whose title or description contains the keyword.
#[instrument(skip(repository))]
pub async fn suggest_items<R>(repository: &mut R, keyword: &str) -> ApiResult<Vec<ItemSuggestion>>
where
    R: ItemStore + ItemImageStore,
{
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    let filter = ItemFilter {
        keyword: Some(keyword.to_string()),
        pagination: PaginationParams::new(0, SUGGESTION_LIMIT),
        ..Default::default()
    };
    let items = repository.list_items(&filter).await?;
    let mut thumbnails = first_images(repository, &items).await?;
    Ok(items
        .into_iter()
        .map(|item| ItemSuggestion {
            thumbnail: thumbnails.remove(&item.id),
            item_id: item.id,
            title: item.title,
        })
        .collect())
}

/// Items a profile has bought.
#[instrument(skip(repository))]
pub async fn completed_items_for_buyer<R>(
    repository: &mut R,
    buyer_id: Uuid,
    pagination: PaginationParams,
) -> ApiResult<Vec<ItemDetails>>
where
    R: ProfileStore + ItemStore + ItemImageStore,
{
    let filter = ItemFilter {
        buyer_id: Some(buyer_id),
        status: Some(ItemStatus::Sold),
        pagination,
        ..Default::default()
    };
    list_items(repository, &filter).await
}

/// Replaces an item's fields and reconciles its images.
///
/// Existing images whose paths are not in `update.item_images` lose their
/// records and come back as [`StaleImages`]. An absent or empty list removes
/// every existing image, so callers must send the full list of paths they want
/// to keep. New uploads are appended afterwards.
#[instrument(skip(repository, images, update, uploads), fields(uploads = uploads.len()))]
pub async fn update_item<R, S>(
    repository: &mut R,
    images: &S,
    id: i64,
    update: Valid<ItemUpdate>,
    uploads: Vec<ImageUpload>,
    policy: TransitionPolicy,
) -> ApiResult<(ItemDetails, StaleImages)>
where
    R: ProfileStore + ItemStore + ItemImageStore,
    S: ImageStore + ?Sized,
{
    let update = update.into_inner();
    let current = fetch_existing(repository, id).await?;
    let status = update
        .status
        .as_deref()
        .map(str::parse::<ItemStatus>)
        .transpose()?;
    if let Some(status) = status {
        policy.check(current.status, status)?;
    }

    let mut item = repository.update_item(id, &update).await?;
    if let Some(status) = status {
        item = repository.set_item_status(id, status).await?;
    }

    let keep = update.item_images.as_deref().unwrap_or_default();
    let (kept, removed): (Vec<ItemImage>, Vec<ItemImage>) = repository
        .list_images(id)
        .await?
        .into_iter()
        .partition(|image| !keep.is_empty() && keep.contains(&image.photo_path));
    if keep.is_empty() && !removed.is_empty() {
        tracing::warn!("No images to keep, deleting all {} image(s)", removed.len());
    }
    for image in &removed {
        repository.delete_image(image.id).await?;
    }
    let seller_name = repository
        .fetch_profile(item.seller_id)
        .await?
        .map(|profile| profile.name);
    let added = store_images(repository, images, id, &uploads).await?;
    tracing::info!(
        "Updated item {}: kept {}, removed {}, added {} image(s)",
        id,
        kept.len(),
        removed.len(),
        added.len()
    );

    let paths = kept
        .into_iter()
        .chain(added)
        .map(|image| image.photo_path)
        .collect();
    Ok((
        ItemDetails::new(item, paths, seller_name),
        StaleImages::new(&removed),
    ))
}

/// Deletes an item together with its transactions, reports and image records.
///
/// The image files are returned rather than deleted.
#[instrument(skip(repository))]
pub async fn delete_item<R>(repository: &mut R, id: i64) -> ApiResult<StaleImages>
where
    R: ItemStore + ItemImageStore + TransactionStore + ReportStore,
{
    fetch_existing(repository, id).await?;
    let stored = repository.list_images(id).await?;

    let transactions = repository.delete_transactions_for_item(id).await?;
    let reports = repository.delete_reports_for_item(id).await?;
    repository.delete_images_for_item(id).await?;
    repository.delete_item(id).await?;

    tracing::info!(
        "Deleted item {} with {} transaction(s), {} report(s), {} image(s)",
        id,
        transactions,
        reports,
        stored.len()
    );
    Ok(StaleImages::new(&stored))
}

/// Reserves an item for a buyer.
///
/// The previous status is only checked under [`TransitionPolicy::Strict`].
#[instrument(skip(repository))]
pub async fn reserve_item<R>(
    repository: &mut R,
    id: i64,
    buyer_id: Uuid,
    policy: TransitionPolicy,
) -> ApiResult<Item>
where
    R: ProfileStore + ItemStore,
{
    let item = fetch_existing(repository, id).await?;
    repository
        .fetch_profile(buyer_id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("profile {buyer_id}")))?;
    policy.check(item.status, ItemStatus::Reserved)?;
    repository.reserve_item(id, buyer_id).await
}

/// Sets an item's status from a status token.
#[instrument(skip(repository))]
pub async fn update_item_status<R>(
    repository: &mut R,
    id: i64,
    status: &str,
    policy: TransitionPolicy,
) -> ApiResult<Item>
where
    R: ItemStore,
{
    let status: ItemStatus = status.parse()?;
    set_status(repository, id, status, policy).await
}

/// Marks an item as sold.
#[instrument(skip(repository))]
pub async fn complete_item<R>(repository: &mut R, id: i64, policy: TransitionPolicy) -> ApiResult<Item>
where
    R: ItemStore,
{
    set_status(repository, id, ItemStatus::Sold, policy).await
}

async fn set_status<R: ItemStore>(
    repository: &mut R,
    id: i64,
    status: ItemStatus,
    policy: TransitionPolicy,
) -> ApiResult<Item> {
    let item = fetch_existing(repository, id).await?;
    policy.check(item.status, status)?;
    repository.set_item_status(id, status).await
}

async fn fetch_existing<R: ItemStore>(repository: &mut R, id: i64) -> ApiResult<Item> {
    repository
        .fetch_item(id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("item {id}")).into())
}

/// Saves uploads to disk and records them. Files written before a failure are removed again.
async fn store_images<R, S>(
    repository: &mut R,
    images: &S,
    item_id: i64,
    uploads: &[ImageUpload],
) -> ApiResult<Vec<ItemImage>>
where
    R: ItemImageStore,
    S: ImageStore + ?Sized,
{
    let mut stored: Vec<ItemImage> = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let saved = match images.save(upload).await {
            Ok(path) => repository.add_image(item_id, &path).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(image) => stored.push(image),
            Err(e) => {
                delete_files(images, stored.iter().map(|image| image.photo_path.as_str())).await;
                return Err(e);
            }
        }
    }
    Ok(stored)
}

/// Deletes image files. Failures are logged, never returned.
async fn delete_files<'a, S>(images: &S, paths: impl Iterator<Item = &'a str>)
where
    S: ImageStore + ?Sized,
{
    for path in paths {
        if let Err(e) = images.delete(path).await {
            tracing::warn!("Failed to delete image file {}: {}", path, e);
        }
    }
}

/// The first image path of each item.
async fn first_images<R: ItemImageStore>(
    repository: &mut R,
    items: &[Item],
) -> ApiResult<HashMap<i64, String>> {
    if items.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    let mut firsts = HashMap::new();
    for image in repository.list_images_for_items(&ids).await? {
        firsts.entry(image.item_id).or_insert(image.photo_path);
    }
    Ok(firsts)
}

/// Attaches image paths and seller names.
async fn with_details<R>(repository: &mut R, items: Vec<Item>) -> ApiResult<Vec<ItemDetails>>
where
    R: ProfileStore + ItemImageStore,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    let mut seller_ids: Vec<Uuid> = items.iter().map(|item| item.seller_id).collect();
    seller_ids.sort_unstable();
    seller_ids.dedup();

    let mut paths: HashMap<i64, Vec<String>> = HashMap::new();
    for image in repository.list_images_for_items(&ids).await? {
        paths.entry(image.item_id).or_default().push(image.photo_path);
    }
    let names: HashMap<Uuid, String> = repository
        .fetch_profiles(&seller_ids)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile.name))
        .collect();

    Ok(items
        .into_iter()
        .map(|item| {
            let item_paths = paths.remove(&item.id).unwrap_or_default();
            let seller_name = names.get(&item.seller_id).cloned();
            ItemDetails::new(item, item_paths, seller_name)
        })
        .collect())
}
