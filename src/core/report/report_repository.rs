//! Types and functions for storing and loading reports from the database.

use crate::{
    core::repository::Repository,
    infra::{database::Tx, error::ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A report to be filed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Who files the report.
    pub reporter_id: Uuid,
    /// Who is reported.
    pub reported_id: Uuid,
    /// The listing the report is about, if any.
    pub item_id: Option<i64>,
    /// What happened.
    #[validate(length(min = 1, max = 1000))]
    #[schema(example = "Asked for payment outside the app")]
    pub reason: String,
}

/// A filed report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub item_id: Option<i64>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Anything that can store reports.
#[async_trait::async_trait]
pub trait ReportStore: Send {
    /// Files a report.
    async fn create_report(&mut self, report: &NewReport) -> ApiResult<Report>;

    /// Reports about one item, or every report when `item_id` is `None`. Newest first.
    async fn list_reports(&mut self, item_id: Option<i64>) -> ApiResult<Vec<Report>>;

    /// Deletes the reports that reference an item, returning how many were deleted.
    async fn delete_reports_for_item(&mut self, item_id: i64) -> ApiResult<u64>;
}

#[async_trait::async_trait]
impl ReportStore for Repository<&mut Tx> {
    #[instrument(skip(self))]
    async fn create_report(&mut self, report: &NewReport) -> ApiResult<Report> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (reporter_id, reported_id, item_id, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(report.reporter_id)
        .bind(report.reported_id)
        .bind(report.item_id)
        .bind(&report.reason)
        .fetch_one(&mut **self.executor)
        .await?;
        tracing::info!("Filed report {}", report.id);
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn list_reports(&mut self, item_id: Option<i64>) -> ApiResult<Vec<Report>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM reports");
        if let Some(item_id) = item_id {
            query.push(" WHERE item_id = ").push_bind(item_id);
        }
        query.push(" ORDER BY created_at DESC, id DESC");
        let reports = query
            .build_query_as::<Report>()
            .fetch_all(&mut **self.executor)
            .instrument(tracing::info_span!("fetch_all"))
            .await?;
        Ok(reports)
    }

    #[instrument(skip(self))]
    async fn delete_reports_for_item(&mut self, item_id: i64) -> ApiResult<u64> {
        let rows = sqlx::query("DELETE FROM reports WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut **self.executor)
            .await?;
        Ok(rows.rows_affected())
    }
}
