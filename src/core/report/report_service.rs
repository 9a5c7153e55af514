//! Reports filed by one profile against another.

use super::report_repository::{NewReport, Report, ReportStore};
use crate::{
    core::{item::item_repository::ItemStore, profile::profile_repository::ProfileStore},
    infra::{
        error::{ApiResult, ClientError},
        validation::Valid,
    },
};
use tracing::instrument;

/// Files a report about another profile.
#[instrument(skip(repository))]
pub async fn create_report<R>(repository: &mut R, report: Valid<NewReport>) -> ApiResult<Report>
where
    R: ProfileStore + ItemStore + ReportStore,
{
    let report = report.into_inner();
    if report.reporter_id == report.reported_id {
        return Err(ClientError::BadRequest("a profile cannot report itself".to_string()).into());
    }
    for profile_id in [report.reporter_id, report.reported_id] {
        repository
            .fetch_profile(profile_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("profile {profile_id}")))?;
    }
    if let Some(item_id) = report.item_id {
        repository
            .fetch_item(item_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("item {item_id}")))?;
    }
    repository.create_report(&report).await
}

/// Reports about an item, or all reports.
#[instrument(skip(repository))]
pub async fn list_reports<R>(repository: &mut R, item_id: Option<i64>) -> ApiResult<Vec<Report>>
where
    R: ReportStore,
{
    repository.list_reports(item_id).await
}
