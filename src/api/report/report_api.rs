//! The report API implementation.

use crate::{
    core::{
        report::{
            report_repository::{NewReport, Report},
            report_service,
        },
        repository::Repository,
    },
    infra::{
        database::DbPool,
        error::{ApiResult, ClientError, ErrorBody},
        extract::{Json, Query},
        state::AppState,
        validation::Valid,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::IntoParams;

/// The report API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_report)
        .typed_get(list_reports)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/reports", rejection(ClientError))]
struct Reports;

/// Which reports to list.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Only reports about this item.
    item_id: Option<i64>,
}

/// Files a report.
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = NewReport,
    responses(
        (status = 201, description = "Created", body = Report),
        (status = 400, description = "Self Report", body = ErrorBody),
        (status = 404, description = "Profile Or Item Not Found", body = ErrorBody),
        (status = 422, description = "Unprocessable Entity", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn create_report(
    _: Reports,
    State(db): State<DbPool>,
    Json(report): Json<NewReport>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = Valid::new(report)?;
    let mut tx = db.begin().await?;
    let report = report_service::create_report(&mut Repository::new(&mut tx), report).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Lists reports, optionally for one item.
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Success", body = [Report]),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(db))]
async fn list_reports(
    _: Reports,
    State(db): State<DbPool>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<Report>>> {
    let mut tx = db.begin().await?;
    let reports = report_service::list_reports(&mut Repository::new(&mut tx), query.item_id).await?;
    tx.commit().await?;
    Ok(Json(reports))
}
