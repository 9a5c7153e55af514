//! The REST API.
//!
//! Every module exposes `routes()`, mounted under `/api` by [`api`].

use axum::Router;

use crate::infra::state::AppState;

pub mod block;
pub mod history;
pub mod info;
pub mod item;
pub mod report;
pub mod review;
pub mod transaction;

/// Constructs the full REST API.
pub fn api(state: AppState) -> Router {
    Router::new()
        .merge(info::info_api::routes())
        .merge(item::item_api::routes())
        .merge(transaction::transaction_api::routes())
        .merge(review::review_api::routes())
        .merge(report::report_api::routes())
        .merge(block::block_api::routes())
        .merge(history::history_api::routes())
        .with_state(state)
}
