use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::dto::content_dto::PeriodQuery;
use crate::error::Result;
use crate::services::analytics_service::parse_period;
use crate::AppState;

#[axum::debug_handler]
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse> {
    let period = parse_period(query.period.as_deref())?;
    Ok(Json(state.analytics_service.overview(period).await?))
}

#[axum::debug_handler]
pub async fn sessions(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse> {
    let period = parse_period(query.period.as_deref())?;
    Ok(Json(state.analytics_service.sessions(period).await?))
}
