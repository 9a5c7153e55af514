//! An in-memory implementation of every store trait, for service tests.
//!
//! It mirrors the database closely enough for the services: ids are sequential,
//! timestamps grow with ids, and uniqueness rules come back as conflicts.

use crate::{
    core::{
        block::block_repository::{Block, BlockStore, NewBlock},
        history::history_repository::{HistoryStore, SearchEntry},
        item::{
            image_repository::{ItemImage, ItemImageStore},
            item_repository::{Item, ItemFilter, ItemSort, ItemStore, ItemUpdate, NewItem},
            item_status::ItemStatus,
        },
        profile::profile_repository::{Profile, ProfileStore},
        report::report_repository::{NewReport, Report, ReportStore},
        review::review_repository::{NewReview, RatingSummary, Review, ReviewDetails, ReviewStore},
        transaction::transaction_repository::{
            ItemTransaction, NewTransaction, TransactionRequest, TransactionStatus,
            TransactionStore,
        },
    },
    infra::error::{ApiResult, ClientError},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Every table as a vector.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    next_id: i64,
    pub profiles: Vec<Profile>,
    pub items: Vec<Item>,
    pub images: Vec<ItemImage>,
    pub transactions: Vec<ItemTransaction>,
    pub reviews: Vec<Review>,
    pub reports: Vec<Report>,
    pub blocks: Vec<Block>,
    pub searches: Vec<SearchEntry>,
}

fn timestamp(id: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap_or_default()
}

fn not_found(what: String) -> ClientError {
    ClientError::not_found(what)
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Adds a profile and returns its id.
    pub fn add_profile(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.profiles.push(Profile {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Adds an on-sale item and returns its id.
    pub fn insert_item(&mut self, seller_id: Uuid, title: &str, price: i64) -> i64 {
        let id = self.next_id();
        self.items.push(Item {
            id,
            seller_id,
            buyer_id: None,
            title: title.to_string(),
            description: String::new(),
            price,
            category: "misc".to_string(),
            status: ItemStatus::OnSale,
            meet_location_address: None,
            meet_location_lat: None,
            meet_location_lng: None,
            created_at: timestamp(id),
        });
        id
    }

    /// Adds an image record and returns its id.
    pub fn insert_image(&mut self, item_id: i64, photo_path: &str) -> i64 {
        let id = self.next_id();
        self.images.push(ItemImage {
            id,
            item_id,
            photo_path: photo_path.to_string(),
            created_at: timestamp(id),
        });
        id
    }

    /// Adds a transaction with any status and returns its id.
    pub fn insert_transaction(
        &mut self,
        item_id: i64,
        buyer_id: Uuid,
        seller_id: Uuid,
        status: TransactionStatus,
    ) -> i64 {
        let id = self.next_id();
        self.transactions.push(ItemTransaction {
            id,
            item_id,
            buyer_id,
            seller_id,
            status,
            created_at: timestamp(id),
        });
        id
    }

    /// Adds a report and returns its id.
    pub fn insert_report(&mut self, report: NewReport) -> i64 {
        let id = self.next_id();
        self.reports.push(Report {
            id,
            reporter_id: report.reporter_id,
            reported_id: report.reported_id,
            item_id: report.item_id,
            reason: report.reason,
            created_at: timestamp(id),
        });
        id
    }

    /// Adds a block and returns its id.
    pub fn insert_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> i64 {
        let id = self.next_id();
        self.blocks.push(Block {
            id,
            blocker_id,
            blocked_id,
            created_at: timestamp(id),
        });
        id
    }

    fn profile_name(&self, id: Uuid) -> Option<String> {
        self.profiles
            .iter()
            .find(|profile| profile.id == id)
            .map(|profile| profile.name.clone())
    }

    fn item_mut(&mut self, id: i64) -> ApiResult<&mut Item> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found(format!("item {id}")).into())
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryRepository {
    async fn fetch_profile(&mut self, id: Uuid) -> ApiResult<Option<Profile>> {
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn fetch_profiles(&mut self, ids: &[Uuid]) -> ApiResult<Vec<Profile>> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryRepository {
    async fn create_item(&mut self, new_item: &NewItem) -> ApiResult<Item> {
        let id = self.next_id();
        let location = new_item.meet_location.clone().unwrap_or_default();
        let item = Item {
            id,
            seller_id: new_item.seller_id,
            buyer_id: None,
            title: new_item.title.clone(),
            description: new_item.description.clone(),
            price: new_item.price,
            category: new_item.category.clone(),
            status: ItemStatus::OnSale,
            meet_location_address: location.address,
            meet_location_lat: location.lat,
            meet_location_lng: location.lng,
            created_at: timestamp(id),
        };
        self.items.push(item.clone());
        Ok(item)
    }

    async fn fetch_item(&mut self, id: i64) -> ApiResult<Option<Item>> {
        Ok(self.items.iter().find(|item| item.id == id).cloned())
    }

    async fn list_items(&mut self, filter: &ItemFilter) -> ApiResult<Vec<Item>> {
        let keyword = filter.keyword.as_ref().map(|k| k.to_lowercase());
        let hidden: Vec<Uuid> = match filter.hidden_for {
            Some(viewer) => self
                .blocks
                .iter()
                .filter(|b| b.blocker_id == viewer)
                .map(|b| b.blocked_id)
                .collect(),
            None => Vec::new(),
        };
        let mut items: Vec<Item> = self
            .items
            .iter()
            .filter(|i| filter.seller_id.map_or(true, |id| i.seller_id == id))
            .filter(|i| filter.buyer_id.map_or(true, |id| i.buyer_id == Some(id)))
            .filter(|i| filter.status.map_or(true, |s| i.status == s))
            .filter(|i| {
                keyword.as_ref().map_or(true, |k| {
                    i.title.to_lowercase().contains(k) || i.description.to_lowercase().contains(k)
                })
            })
            .filter(|i| filter.category.as_ref().map_or(true, |c| &i.category == c))
            .filter(|i| filter.min_price.map_or(true, |p| i.price >= p))
            .filter(|i| filter.max_price.map_or(true, |p| i.price <= p))
            .filter(|i| !hidden.contains(&i.seller_id))
            .cloned()
            .collect();
        match filter.sort {
            ItemSort::Latest => items.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id))),
            ItemSort::PriceLow => items.sort_by_key(|i| (i.price, i.id)),
            ItemSort::PriceHigh => items.sort_by(|a, b| (b.price, b.id).cmp(&(a.price, a.id))),
        }
        let offset = usize::try_from(filter.pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.pagination.limit()).unwrap_or(usize::MAX);
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_item(&mut self, id: i64, update: &ItemUpdate) -> ApiResult<Item> {
        let item = self.item_mut(id)?;
        let location = update.meet_location.clone().unwrap_or_default();
        item.title = update.title.clone();
        item.description = update.description.clone();
        item.price = update.price;
        item.category = update.category.clone();
        item.meet_location_address = location.address;
        item.meet_location_lat = location.lat;
        item.meet_location_lng = location.lng;
        Ok(item.clone())
    }

    async fn set_item_status(&mut self, id: i64, status: ItemStatus) -> ApiResult<Item> {
        let item = self.item_mut(id)?;
        item.status = status;
        Ok(item.clone())
    }

    async fn reserve_item(&mut self, id: i64, buyer_id: Uuid) -> ApiResult<Item> {
        let item = self.item_mut(id)?;
        item.status = ItemStatus::Reserved;
        item.buyer_id = Some(buyer_id);
        Ok(item.clone())
    }

    async fn delete_item(&mut self, id: i64) -> ApiResult<()> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Err(not_found(format!("item {id}")).into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ItemImageStore for MemoryRepository {
    async fn add_image(&mut self, item_id: i64, photo_path: &str) -> ApiResult<ItemImage> {
        let id = self.next_id();
        let image = ItemImage {
            id,
            item_id,
            photo_path: photo_path.to_string(),
            created_at: timestamp(id),
        };
        self.images.push(image.clone());
        Ok(image)
    }

    async fn list_images(&mut self, item_id: i64) -> ApiResult<Vec<ItemImage>> {
        Ok(self
            .images
            .iter()
            .filter(|i| i.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_images_for_items(&mut self, item_ids: &[i64]) -> ApiResult<Vec<ItemImage>> {
        let mut images: Vec<ItemImage> = self
            .images
            .iter()
            .filter(|i| item_ids.contains(&i.item_id))
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.item_id, i.id));
        Ok(images)
    }

    async fn delete_image(&mut self, id: i64) -> ApiResult<()> {
        self.images.retain(|i| i.id != id);
        Ok(())
    }

    async fn delete_images_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let before = self.images.len();
        self.images.retain(|i| i.item_id != item_id);
        Ok((before - self.images.len()) as u64)
    }
}

#[async_trait::async_trait]
impl TransactionStore for MemoryRepository {
    async fn create_transaction(&mut self, new: &NewTransaction) -> ApiResult<ItemTransaction> {
        let id = self.insert_transaction(
            new.item_id,
            new.buyer_id,
            new.seller_id,
            TransactionStatus::Pending,
        );
        self.fetch_transaction(id)
            .await?
            .ok_or_else(|| not_found(format!("transaction {id}")).into())
    }

    async fn fetch_transaction(&mut self, id: i64) -> ApiResult<Option<ItemTransaction>> {
        Ok(self.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn lock_transactions_for_item(
        &mut self,
        item_id: i64,
    ) -> ApiResult<Vec<ItemTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_transactions_for_buyer(
        &mut self,
        buyer_id: Uuid,
    ) -> ApiResult<Vec<ItemTransaction>> {
        let mut found: Vec<ItemTransaction> = self
            .transactions
            .iter()
            .filter(|t| t.buyer_id == buyer_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(found)
    }

    async fn find_transaction(
        &mut self,
        item_id: i64,
        buyer_id: Uuid,
    ) -> ApiResult<Option<ItemTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.item_id == item_id && t.buyer_id == buyer_id)
            .max_by_key(|t| t.id)
            .cloned())
    }

    async fn list_requests(
        &mut self,
        item_id: i64,
        seller_id: Uuid,
    ) -> ApiResult<Vec<TransactionRequest>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.item_id == item_id && t.seller_id == seller_id)
            .filter_map(|t| {
                Some(TransactionRequest {
                    transaction_id: t.id,
                    buyer_id: t.buyer_id,
                    buyer_name: self.profile_name(t.buyer_id)?,
                    status: t.status,
                })
            })
            .collect())
    }

    async fn set_transaction_status(
        &mut self,
        id: i64,
        status: TransactionStatus,
    ) -> ApiResult<ItemTransaction> {
        let item_id = self
            .transactions
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.item_id)
            .ok_or_else(|| not_found(format!("transaction {id}")))?;
        let other_confirmed = self
            .transactions
            .iter()
            .any(|t| t.item_id == item_id && t.id != id && t.status == TransactionStatus::Confirmed);
        if status == TransactionStatus::Confirmed && other_confirmed {
            return Err(ClientError::Conflict.into());
        }
        let transaction = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(format!("transaction {id}")))?;
        transaction.status = status;
        Ok(transaction.clone())
    }

    async fn reject_competing(&mut self, item_id: i64, except_id: i64) -> ApiResult<u64> {
        let mut changed = 0;
        for t in self
            .transactions
            .iter_mut()
            .filter(|t| t.item_id == item_id && t.id != except_id)
        {
            t.status = TransactionStatus::Rejected;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_transactions_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.item_id != item_id);
        Ok((before - self.transactions.len()) as u64)
    }
}

#[async_trait::async_trait]
impl ReviewStore for MemoryRepository {
    async fn create_review(&mut self, review: &NewReview) -> ApiResult<Review> {
        if self.has_review(review.transaction_id, review.reviewer_id).await? {
            return Err(ClientError::Conflict.into());
        }
        let id = self.next_id();
        let review = Review {
            id,
            item_id: Some(review.item_id),
            transaction_id: Some(review.transaction_id),
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: timestamp(id),
        };
        self.reviews.push(review.clone());
        Ok(review)
    }

    async fn has_review(&mut self, transaction_id: i64, reviewer_id: Uuid) -> ApiResult<bool> {
        Ok(self
            .reviews
            .iter()
            .any(|r| r.transaction_id == Some(transaction_id) && r.reviewer_id == reviewer_id))
    }

    async fn list_reviews_for(&mut self, reviewee_id: Uuid) -> ApiResult<Vec<ReviewDetails>> {
        let mut reviews: Vec<ReviewDetails> = self
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .filter_map(|r| {
                Some(ReviewDetails {
                    id: r.id,
                    item_id: r.item_id,
                    item_title: r.item_id.and_then(|id| {
                        self.items
                            .iter()
                            .find(|i| i.id == id)
                            .map(|i| i.title.clone())
                    }),
                    reviewer_id: r.reviewer_id,
                    reviewer_name: self.profile_name(r.reviewer_id)?,
                    rating: r.rating,
                    comment: r.comment.clone(),
                    created_at: r.created_at,
                })
            })
            .collect();
        reviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(reviews)
    }

    async fn rating_summary(&mut self, reviewee_id: Uuid) -> ApiResult<RatingSummary> {
        let ratings: Vec<f64> = self
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .map(|r| f64::from(r.rating))
            .collect();
        let total_reviews = ratings.len() as i64;
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };
        Ok(RatingSummary {
            average_rating,
            total_reviews,
        })
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryRepository {
    async fn create_report(&mut self, report: &NewReport) -> ApiResult<Report> {
        let id = self.insert_report(report.clone());
        Ok(self.reports.iter().find(|r| r.id == id).cloned().unwrap())
    }

    async fn list_reports(&mut self, item_id: Option<i64>) -> ApiResult<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| item_id.map_or(true, |id| r.item_id == Some(id)))
            .cloned()
            .collect();
        reports.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(reports)
    }

    async fn delete_reports_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let before = self.reports.len();
        self.reports.retain(|r| r.item_id != Some(item_id));
        Ok((before - self.reports.len()) as u64)
    }
}

#[async_trait::async_trait]
impl BlockStore for MemoryRepository {
    async fn create_block(&mut self, block: &NewBlock) -> ApiResult<Block> {
        if self
            .fetch_block(block.blocker_id, block.blocked_id)
            .await?
            .is_some()
        {
            return Err(ClientError::Conflict.into());
        }
        let id = self.insert_block(block.blocker_id, block.blocked_id);
        self.blocks
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("block {id}")).into())
    }

    async fn fetch_block(
        &mut self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> ApiResult<Option<Block>> {
        Ok(self
            .blocks
            .iter()
            .find(|b| b.blocker_id == blocker_id && b.blocked_id == blocked_id)
            .cloned())
    }

    async fn delete_block(&mut self, blocker_id: Uuid, blocked_id: Uuid) -> ApiResult<u64> {
        let before = self.blocks.len();
        self.blocks
            .retain(|b| !(b.blocker_id == blocker_id && b.blocked_id == blocked_id));
        Ok((before - self.blocks.len()) as u64)
    }

    async fn list_blocked_profiles(&mut self, blocker_id: Uuid) -> ApiResult<Vec<Profile>> {
        let mut blocks: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|b| b.blocker_id == blocker_id)
            .collect();
        blocks.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(blocks
            .into_iter()
            .filter_map(|b| self.profiles.iter().find(|p| p.id == b.blocked_id).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryRepository {
    async fn add_search(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<SearchEntry> {
        let id = self.next_id();
        let entry = SearchEntry {
            id,
            profile_id,
            keyword: keyword.to_string(),
            searched_at: timestamp(id),
        };
        self.searches.push(entry.clone());
        Ok(entry)
    }

    async fn delete_keyword(&mut self, profile_id: Uuid, keyword: &str) -> ApiResult<u64> {
        let before = self.searches.len();
        self.searches
            .retain(|s| !(s.profile_id == profile_id && s.keyword == keyword));
        Ok((before - self.searches.len()) as u64)
    }

    async fn list_searches(&mut self, profile_id: Uuid, limit: i64) -> ApiResult<Vec<SearchEntry>> {
        let mut entries: Vec<SearchEntry> = self
            .searches
            .iter()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.searched_at, b.id).cmp(&(a.searched_at, a.id)));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn delete_search(&mut self, id: i64) -> ApiResult<u64> {
        let before = self.searches.len();
        self.searches.retain(|s| s.id != id);
        Ok((before - self.searches.len()) as u64)
    }

    async fn clear_searches(&mut self, profile_id: Uuid) -> ApiResult<u64> {
        let before = self.searches.len();
        self.searches.retain(|s| s.profile_id != profile_id);
        Ok((before - self.searches.len()) as u64)
    }

    async fn suggest_keywords(
        &mut self,
        profile_id: Uuid,
        prefix: &str,
        limit: i64,
    ) -> ApiResult<Vec<String>> {
        let prefix = prefix.to_lowercase();
        let entries = self.list_searches(profile_id, i64::MAX).await?;
        Ok(entries
            .into_iter()
            .filter(|s| s.keyword.to_lowercase().starts_with(&prefix))
            .map(|s| s.keyword)
            .take(limit.max(0) as usize)
            .collect())
    }
}
