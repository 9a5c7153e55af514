//! OpenAPI configuration.

use crate::api::{
    block::block_api, history::history_api, info::info_api, item::item_api, report::report_api,
    review::review_api, transaction::transaction_api,
};
use crate::core::{
    block::block_repository, history::history_repository, item::item_repository,
    item::item_service, item::item_status, profile::profile_repository, report::report_repository,
    review::review_repository, transaction::transaction_repository,
};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    paths(
        info_api::info,
        item_api::create_item,
        item_api::list_items,
        item_api::search_items,
        item_api::suggest_items,
        item_api::completed_items,
        item_api::get_item,
        item_api::update_item,
        item_api::delete_item,
        item_api::update_item_status,
        item_api::reserve_item,
        item_api::complete_item,
        transaction_api::create_transaction,
        transaction_api::list_requests,
        transaction_api::confirm_transaction,
        transaction_api::reject_transaction,
        transaction_api::update_transaction_status,
        transaction_api::transactions_for_buyer,
        transaction_api::transaction_for_item_and_buyer,
        review_api::create_review,
        review_api::reviews_for_seller,
        review_api::rating_summary,
        report_api::create_report,
        report_api::list_reports,
        block_api::block_profile,
        block_api::unblock_profile,
        block_api::blocked_profiles,
        history_api::record_search,
        history_api::list_history,
        history_api::suggest_keywords,
        history_api::delete_search,
        history_api::clear_history,
    ),
    components(
        schemas(
            info_api::AppInfo,
            profile_repository::Profile,
            item_repository::MeetLocation,
            item_repository::NewItem,
            item_repository::ItemUpdate,
            item_repository::Item,
            item_repository::ItemSort,
            item_status::ItemStatus,
            item_service::ItemDetails,
            item_service::ItemSuggestion,
            item_api::NewItemForm,
            item_api::ItemUpdateForm,
            item_api::StatusChange,
            item_api::ReserveRequest,
            transaction_repository::TransactionStatus,
            transaction_repository::NewTransaction,
            transaction_repository::ItemTransaction,
            transaction_repository::TransactionRequest,
            transaction_api::TransactionStatusChange,
            review_repository::NewReview,
            review_repository::Review,
            review_repository::ReviewDetails,
            review_repository::RatingSummary,
            report_repository::NewReport,
            report_repository::Report,
            block_repository::NewBlock,
            block_repository::Block,
            history_repository::NewSearch,
            history_repository::SearchEntry,
            crate::infra::error::ErrorBody
        )
    ),
    tags((name = "marketplace", description = "Second-hand marketplace API"))
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_marketplace_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/info",
            "/api/items",
            "/api/items/{id}",
            "/api/transactions/{id}/confirm",
            "/api/reviews/seller/{id}/summary",
            "/api/search-history/suggest",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
