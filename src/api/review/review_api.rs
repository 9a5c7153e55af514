//! The review API implementation.

use crate::{
    core::{
        repository::Repository,
        review::{
            review_repository::{NewReview, RatingSummary, Review, ReviewDetails},
            review_service,
        },
    },
    infra::{
        database::DbPool,
        error::{ApiResult, ClientError, ErrorBody},
        extract::Json,
        state::AppState,
        validation::Valid,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

/// The review API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_review)
        .typed_get(reviews_for_seller)
        .typed_get(rating_summary)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/reviews", rejection(ClientError))]
struct Reviews;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/reviews/seller/:id", rejection(ClientError))]
struct ReviewsSellerId(Uuid);

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/reviews/seller/:id/summary", rejection(ClientError))]
struct ReviewsSellerIdSummary(Uuid);

/// Reviews a confirmed purchase.
#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = NewReview,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Transaction Cannot Be Reviewed", body = ErrorBody),
        (status = 404, description = "Profile Or Transaction Not Found", body = ErrorBody),
        (status = 409, description = "Already Reviewed", body = ErrorBody),
        (status = 422, description = "Unprocessable Entity", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn create_review(
    _: Reviews,
    State(db): State<DbPool>,
    Json(review): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = Valid::new(review)?;
    let mut tx = db.begin().await?;
    let review = review_service::create_review(&mut Repository::new(&mut tx), review).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Lists reviews about a seller, newest first.
#[utoipa::path(
    get,
    path = "/api/reviews/seller/{id}",
    params(("id" = Uuid, Path, description = "The seller's profile id")),
    responses(
        (status = 200, description = "Success", body = [ReviewDetails]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn reviews_for_seller(
    ReviewsSellerId(id): ReviewsSellerId,
    State(db): State<DbPool>,
) -> ApiResult<Json<Vec<ReviewDetails>>> {
    let mut tx = db.begin().await?;
    let reviews = review_service::reviews_for(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(Json(reviews))
}

/// A seller's average rating.
#[utoipa::path(
    get,
    path = "/api/reviews/seller/{id}/summary",
    params(("id" = Uuid, Path, description = "The seller's profile id")),
    responses(
        (status = 200, description = "Success", body = RatingSummary),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn rating_summary(
    ReviewsSellerIdSummary(id): ReviewsSellerIdSummary,
    State(db): State<DbPool>,
) -> ApiResult<Json<RatingSummary>> {
    let mut tx = db.begin().await?;
    let summary = review_service::rating_summary(&mut Repository::new(&mut tx), id).await?;
    tx.commit().await?;
    Ok(Json(summary))
}
