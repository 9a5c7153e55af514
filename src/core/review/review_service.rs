//! Reviews of sellers, allowed once per confirmed purchase, and their
//! average ratings.

use super::review_repository::{NewReview, RatingSummary, Review, ReviewDetails, ReviewStore};
use crate::{
    core::{
        profile::profile_repository::ProfileStore,
        transaction::transaction_repository::{TransactionStatus, TransactionStore},
    },
    infra::{
        error::{ApiResult, ClientError},
        validation::Valid,
    },
};
use tracing::instrument;
use uuid::Uuid;

/// Writes a review for a confirmed purchase.
#[instrument(skip(repository))]
pub async fn create_review<R>(repository: &mut R, review: Valid<NewReview>) -> ApiResult<Review>
where
    R: ProfileStore + TransactionStore + ReviewStore,
{
    let review = review.into_inner();
    if review.reviewer_id == review.reviewee_id {
        return Err(ClientError::BadRequest("a profile cannot review itself".to_string()).into());
    }
    for profile_id in [review.reviewer_id, review.reviewee_id] {
        repository
            .fetch_profile(profile_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("profile {profile_id}")))?;
    }
    let transaction = repository
        .fetch_transaction(review.transaction_id)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("transaction {}", review.transaction_id)))?;

    if transaction.item_id != review.item_id {
        return Err(ClientError::BadRequest(format!(
            "transaction {} is not for item {}",
            transaction.id, review.item_id
        ))
        .into());
    }
    if transaction.status != TransactionStatus::Confirmed {
        return Err(ClientError::BadRequest(format!(
            "transaction {} is {}, not confirmed",
            transaction.id, transaction.status
        ))
        .into());
    }
    if transaction.buyer_id != review.reviewer_id {
        return Err(ClientError::BadRequest(format!(
            "transaction {} was not requested by the reviewer",
            transaction.id
        ))
        .into());
    }
    if repository
        .has_review(review.transaction_id, review.reviewer_id)
        .await?
    {
        return Err(ClientError::Conflict.into());
    }

    repository.create_review(&review).await
}

/// Reviews about a profile, newest first.
#[instrument(skip(repository))]
pub async fn reviews_for<R>(repository: &mut R, reviewee_id: Uuid) -> ApiResult<Vec<ReviewDetails>>
where
    R: ReviewStore,
{
    repository.list_reviews_for(reviewee_id).await
}

/// The average rating of a profile.
#[instrument(skip(repository))]
pub async fn rating_summary<R>(repository: &mut R, reviewee_id: Uuid) -> ApiResult<RatingSummary>
where
    R: ReviewStore,
{
    repository.rating_summary(reviewee_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::testing::MemoryRepository, infra::error::ApiError};

    struct Fixture {
        repo: MemoryRepository,
        seller: Uuid,
        buyer: Uuid,
        item: i64,
        transaction: i64,
    }

    fn fixture(status: TransactionStatus) -> Fixture {
        let mut repo = MemoryRepository::new();
        let seller = repo.add_profile("Seller");
        let buyer = repo.add_profile("Buyer");
        let item = repo.insert_item(seller, "Bike", 50_000);
        let transaction = repo.insert_transaction(item, buyer, seller, status);
        Fixture {
            repo,
            seller,
            buyer,
            item,
            transaction,
        }
    }

    fn review(f: &Fixture, rating: i16) -> NewReview {
        NewReview {
            item_id: f.item,
            transaction_id: f.transaction,
            reviewer_id: f.buyer,
            reviewee_id: f.seller,
            rating,
            comment: "Great".to_string(),
        }
    }

    fn is_bad_request<T: std::fmt::Debug>(result: ApiResult<T>) -> bool {
        matches!(result, Err(ApiError::ClientError(ClientError::BadRequest(_))))
    }

    #[test]
    fn rating_must_be_one_to_five() {
        let f = fixture(TransactionStatus::Confirmed);
        assert!(Valid::new(review(&f, 0)).is_err());
        assert!(Valid::new(review(&f, 6)).is_err());
        assert!(Valid::new(review(&f, 1)).is_ok());
    }

    #[tokio::test]
    async fn buyer_reviews_seller_once() {
        let mut f = fixture(TransactionStatus::Confirmed);
        let new = Valid::new(review(&f, 4)).unwrap();

        let created = create_review(&mut f.repo, new.clone()).await.unwrap();
        assert_eq!(4, created.rating);
        assert_eq!(Some(f.item), created.item_id);

        let again = create_review(&mut f.repo, new).await;
        assert!(matches!(
            again,
            Err(ApiError::ClientError(ClientError::Conflict))
        ));
    }

    #[tokio::test]
    async fn only_confirmed_transactions_can_be_reviewed() {
        let mut f = fixture(TransactionStatus::Pending);
        let new = Valid::new(review(&f, 4)).unwrap();
        assert!(is_bad_request(create_review(&mut f.repo, new).await));
    }

    #[tokio::test]
    async fn review_must_match_item_and_reviewer() {
        let mut f = fixture(TransactionStatus::Confirmed);

        let mut wrong_item = review(&f, 5);
        wrong_item.item_id += 1;
        let result = create_review(&mut f.repo, Valid::new(wrong_item).unwrap()).await;
        assert!(is_bad_request(result));

        let stranger = f.repo.add_profile("Stranger");
        let mut wrong_reviewer = review(&f, 5);
        wrong_reviewer.reviewer_id = stranger;
        let result = create_review(&mut f.repo, Valid::new(wrong_reviewer).unwrap()).await;
        assert!(is_bad_request(result));

        let mut self_review = review(&f, 5);
        self_review.reviewee_id = f.buyer;
        let result = create_review(&mut f.repo, Valid::new(self_review).unwrap()).await;
        assert!(is_bad_request(result));
    }

    #[tokio::test]
    async fn missing_profile_or_transaction_is_not_found() {
        let mut f = fixture(TransactionStatus::Confirmed);

        let mut unknown_reviewee = review(&f, 5);
        unknown_reviewee.reviewee_id = Uuid::new_v4();
        let result = create_review(&mut f.repo, Valid::new(unknown_reviewee).unwrap()).await;
        assert!(matches!(
            result,
            Err(ApiError::ClientError(ClientError::NotFound(_)))
        ));

        let mut unknown_transaction = review(&f, 5);
        unknown_transaction.transaction_id += 100;
        let result = create_review(&mut f.repo, Valid::new(unknown_transaction).unwrap()).await;
        assert!(matches!(
            result,
            Err(ApiError::ClientError(ClientError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn summary_and_listing() {
        let mut f = fixture(TransactionStatus::Confirmed);
        let empty = rating_summary(&mut f.repo, f.seller).await.unwrap();
        assert_eq!(0, empty.total_reviews);
        assert_eq!(0.0, empty.average_rating);

        let first = Valid::new(review(&f, 5)).unwrap();
        create_review(&mut f.repo, first).await.unwrap();
        let other_buyer = f.repo.add_profile("Other buyer");
        let helmet = f.repo.insert_item(f.seller, "Helmet", 10_000);
        let second =
            f.repo
                .insert_transaction(helmet, other_buyer, f.seller, TransactionStatus::Confirmed);
        let mut new = review(&f, 2);
        new.item_id = helmet;
        new.transaction_id = second;
        new.reviewer_id = other_buyer;
        create_review(&mut f.repo, Valid::new(new).unwrap())
            .await
            .unwrap();

        let summary = rating_summary(&mut f.repo, f.seller).await.unwrap();
        assert_eq!(2, summary.total_reviews);
        assert_eq!(3.5, summary.average_rating);

        let listed = reviews_for(&mut f.repo, f.seller).await.unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.reviewer_name.as_str()).collect();
        assert_eq!(vec!["Other buyer", "Buyer"], names);
        assert_eq!(Some("Helmet".to_string()), listed[0].item_title);
        assert_eq!(Some("Bike".to_string()), listed[1].item_title);
    }
}
