//! Purchase requests and their confirmation.
//!
//! Confirming one request for an item rejects every other request for the same
//! item, so at most one transaction per item is ever confirmed. The rows are
//! locked while this happens, and the database refuses a second confirmed row
//! for an item, so concurrent confirmations cannot both win.

use super::transaction_repository::{
    ItemTransaction, NewTransaction, TransactionRequest, TransactionStatus, TransactionStore,
};
use crate::{
    core::{item::item_repository::ItemStore, profile::profile_repository::ProfileStore},
    infra::error::{ApiResult, ClientError},
};
use tracing::instrument;
use uuid::Uuid;

/// Creates a pending transaction after checking that buyer, seller and item exist.
#[instrument(skip(repository))]
pub async fn create_transaction<R>(
    repository: &mut R,
    new: NewTransaction,
) -> ApiResult<ItemTransaction>
where
    R: ProfileStore + ItemStore + TransactionStore,
{
    for profile_id in [new.buyer_id, new.seller_id] {
        repository
            .fetch_profile(profile_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("profile {profile_id}")))?;
    }
    let item = repository
        .fetch_item(new.item_id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("item {}", new.item_id)))?;
    if item.seller_id != new.seller_id {
        tracing::warn!(
            "Seller {} does not own item {}, storing it anyway",
            new.seller_id,
            item.id
        );
    }
    repository.create_transaction(&new).await
}

/// Sets a transaction's status, whatever it was before.
#[instrument(skip(repository))]
pub async fn update_transaction_status<R>(
    repository: &mut R,
    id: i64,
    status: TransactionStatus,
) -> ApiResult<ItemTransaction>
where
    R: TransactionStore,
{
    repository
        .fetch_transaction(id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("transaction {id}")))?;
    repository.set_transaction_status(id, status).await
}

/// Rejects a transaction.
#[instrument(skip(repository))]
pub async fn reject_transaction<R>(repository: &mut R, id: i64) -> ApiResult<ItemTransaction>
where
    R: TransactionStore,
{
    update_transaction_status(repository, id, TransactionStatus::Rejected).await
}

/// Confirms a transaction and rejects every other transaction for its item.
///
/// Returns all transactions of the item afterwards. An unknown id is a bad
/// request and changes nothing.
#[instrument(skip(repository))]
pub async fn confirm_transaction<R>(repository: &mut R, id: i64) -> ApiResult<Vec<ItemTransaction>>
where
    R: TransactionStore,
{
    let target = repository
        .fetch_transaction(id)
        .await?
        .ok_or_else(|| ClientError::BadRequest(format!("no transaction with id {id}")))?;

    let locked = repository.lock_transactions_for_item(target.item_id).await?;
    if !locked.iter().any(|transaction| transaction.id == id) {
        return Err(ClientError::BadRequest(format!("no transaction with id {id}")).into());
    }

    // Reject first so the item never has two confirmed rows.
    let rejected = repository.reject_competing(target.item_id, id).await?;
    let confirmed = repository
        .set_transaction_status(id, TransactionStatus::Confirmed)
        .await?;
    tracing::info!(
        "Confirmed transaction {} for item {}, rejected {} other(s)",
        id,
        confirmed.item_id,
        rejected
    );

    Ok(locked
        .into_iter()
        .map(|mut transaction| {
            transaction.status = if transaction.id == id {
                TransactionStatus::Confirmed
            } else {
                TransactionStatus::Rejected
            };
            transaction
        })
        .collect())
}

/// The requests a seller has received for an item.
#[instrument(skip(repository))]
pub async fn list_requests<R>(
    repository: &mut R,
    item_id: i64,
    seller_id: Uuid,
) -> ApiResult<Vec<TransactionRequest>>
where
    R: TransactionStore,
{
    repository.list_requests(item_id, seller_id).await
}

/// Every transaction a buyer has requested.
#[instrument(skip(repository))]
pub async fn transactions_for_buyer<R>(
    repository: &mut R,
    buyer_id: Uuid,
) -> ApiResult<Vec<ItemTransaction>>
where
    R: TransactionStore,
{
    repository.list_transactions_for_buyer(buyer_id).await
}

/// The buyer's transaction for an item.
#[instrument(skip(repository))]
pub async fn transaction_for_item_and_buyer<R>(
    repository: &mut R,
    item_id: i64,
    buyer_id: Uuid,
) -> ApiResult<ItemTransaction>
where
    R: TransactionStore,
{
    repository
        .find_transaction(item_id, buyer_id)
        .await?
        .ok_or_else(|| {
            ClientError::not_found(format!("transaction for item {item_id} and buyer {buyer_id}"))
                .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::testing::MemoryRepository,
        infra::error::{ApiError, ClientError},
    };

    struct Fixture {
        repo: MemoryRepository,
        seller: Uuid,
        buyer_a: Uuid,
        buyer_b: Uuid,
        item: i64,
    }

    fn fixture() -> Fixture {
        let mut repo = MemoryRepository::new();
        let seller = repo.add_profile("Seller");
        let buyer_a = repo.add_profile("Buyer A");
        let buyer_b = repo.add_profile("Buyer B");
        let item = repo.insert_item(seller, "Bike", 50_000);
        Fixture {
            repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        }
    }

    fn statuses(repo: &MemoryRepository, item: i64) -> Vec<(i64, TransactionStatus)> {
        repo.transactions
            .iter()
            .filter(|t| t.item_id == item)
            .map(|t| (t.id, t.status))
            .collect()
    }

    #[tokio::test]
    async fn create_starts_pending_with_the_given_seller() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            item,
            ..
        } = fixture();

        let transaction = create_transaction(
            &mut repo,
            NewTransaction {
                buyer_id: buyer_a,
                seller_id: seller,
                item_id: item,
            },
        )
        .await
        .unwrap();

        assert_eq!(TransactionStatus::Pending, transaction.status);
        assert_eq!(seller, transaction.seller_id);
        assert_eq!(buyer_a, transaction.buyer_id);
        assert_eq!(item, transaction.item_id);
    }

    #[tokio::test]
    async fn create_with_missing_references_is_not_found_and_stores_nothing() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            item,
            ..
        } = fixture();

        let cases = [
            (buyer_a, seller, 999),
            (Uuid::new_v4(), seller, item),
            (buyer_a, Uuid::new_v4(), item),
        ];
        for (buyer_id, seller_id, item_id) in cases {
            let result = create_transaction(
                &mut repo,
                NewTransaction {
                    buyer_id,
                    seller_id,
                    item_id,
                },
            )
            .await;
            assert!(matches!(
                result,
                Err(ApiError::ClientError(ClientError::NotFound(_)))
            ));
        }
        assert!(repo.transactions.is_empty());
    }

    #[tokio::test]
    async fn the_last_confirmation_wins() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        } = fixture();
        let t1 = repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Pending);
        let t2 = repo.insert_transaction(item, buyer_b, seller, TransactionStatus::Pending);

        confirm_transaction(&mut repo, t1).await.unwrap();
        assert_eq!(
            vec![
                (t1, TransactionStatus::Confirmed),
                (t2, TransactionStatus::Rejected)
            ],
            statuses(&repo, item)
        );

        let result = confirm_transaction(&mut repo, t2).await.unwrap();
        let expected = vec![
            (t1, TransactionStatus::Rejected),
            (t2, TransactionStatus::Confirmed),
        ];
        assert_eq!(expected, statuses(&repo, item));
        let returned: Vec<_> = result.iter().map(|t| (t.id, t.status)).collect();
        assert_eq!(expected, returned);
    }

    #[tokio::test]
    async fn confirm_rejects_everything_else_and_keeps_the_count() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        } = fixture();
        let other_item = repo.insert_item(seller, "Helmet", 10_000);
        let mut ids = vec![];
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Rejected,
            TransactionStatus::Confirmed,
            TransactionStatus::Pending,
        ] {
            ids.push(repo.insert_transaction(item, buyer_a, seller, status));
        }
        let untouched = repo.insert_transaction(other_item, buyer_b, seller, TransactionStatus::Pending);
        let before = statuses(&repo, item).len();

        confirm_transaction(&mut repo, ids[3]).await.unwrap();

        let after = statuses(&repo, item);
        assert_eq!(before, after.len());
        let confirmed: Vec<_> = after
            .iter()
            .filter(|(_, s)| *s == TransactionStatus::Confirmed)
            .collect();
        assert_eq!(vec![&(ids[3], TransactionStatus::Confirmed)], confirmed);
        assert!(after
            .iter()
            .filter(|(id, _)| *id != ids[3])
            .all(|(_, s)| *s == TransactionStatus::Rejected));
        assert_eq!(
            vec![(untouched, TransactionStatus::Pending)],
            statuses(&repo, other_item)
        );
    }

    #[tokio::test]
    async fn confirming_a_missing_transaction_is_bad_request_and_changes_nothing() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            item,
            ..
        } = fixture();
        let t1 = repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Pending);

        let result = confirm_transaction(&mut repo, t1 + 100).await;

        assert!(matches!(
            result,
            Err(ApiError::ClientError(ClientError::BadRequest(_)))
        ));
        assert_eq!(vec![(t1, TransactionStatus::Pending)], statuses(&repo, item));
    }

    #[tokio::test]
    async fn confirmation_does_not_touch_the_item() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            item,
            ..
        } = fixture();
        let t1 = repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Pending);

        confirm_transaction(&mut repo, t1).await.unwrap();

        assert_eq!(
            crate::core::item::item_status::ItemStatus::OnSale,
            repo.items[0].status
        );
        assert_eq!(None, repo.items[0].buyer_id);
    }

    #[tokio::test]
    async fn status_updates_are_unconditional() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            item,
            ..
        } = fixture();
        let t1 = repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Rejected);

        let updated = update_transaction_status(&mut repo, t1, TransactionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(TransactionStatus::Pending, updated.status);

        let rejected = reject_transaction(&mut repo, t1).await.unwrap();
        assert_eq!(TransactionStatus::Rejected, rejected.status);

        let missing = reject_transaction(&mut repo, t1 + 1).await;
        assert!(matches!(
            missing,
            Err(ApiError::ClientError(ClientError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn a_second_confirmed_row_is_a_conflict() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        } = fixture();
        repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Confirmed);
        let t2 = repo.insert_transaction(item, buyer_b, seller, TransactionStatus::Pending);

        let result = update_transaction_status(&mut repo, t2, TransactionStatus::Confirmed).await;

        assert!(matches!(
            result,
            Err(ApiError::ClientError(ClientError::Conflict))
        ));
    }

    #[tokio::test]
    async fn requests_name_their_buyers() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        } = fixture();
        repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Pending);
        repo.insert_transaction(item, buyer_b, seller, TransactionStatus::Rejected);

        let requests = list_requests(&mut repo, item, seller).await.unwrap();

        let names: Vec<_> = requests.iter().map(|r| r.buyer_name.as_str()).collect();
        assert_eq!(vec!["Buyer A", "Buyer B"], names);
        assert!(list_requests(&mut repo, item, buyer_a)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn lookups_by_buyer() {
        let Fixture {
            mut repo,
            seller,
            buyer_a,
            buyer_b,
            item,
        } = fixture();
        let t1 = repo.insert_transaction(item, buyer_a, seller, TransactionStatus::Pending);

        let mine = transactions_for_buyer(&mut repo, buyer_a).await.unwrap();
        assert_eq!(vec![t1], mine.iter().map(|t| t.id).collect::<Vec<_>>());

        let found = transaction_for_item_and_buyer(&mut repo, item, buyer_a)
            .await
            .unwrap();
        assert_eq!(t1, found.id);

        let missing = transaction_for_item_and_buyer(&mut repo, item, buyer_b).await;
        assert!(matches!(
            missing,
            Err(ApiError::ClientError(ClientError::NotFound(_)))
        ));
    }
}
