//! JSON endpoints consumed by the dashboard charts.

use axum::Json;
use curavyom_common::dashboard::DashboardData;

/// GET /api/dashboard: canned chart series for the live dashboard.
pub async fn api_dashboard() -> Json<DashboardData> {
    Json(DashboardData::canned())
}
