//! Ledger synchronization handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use core_kernel::OrderId;
use domain_sales::{OrderQuery, OrderStatus};
use domain_sync::{AuditReport, RecoveryReport, ResyncOutcome};

use crate::middleware::RequestMetadata;
use crate::{error::ApiError, AppState};

/// Re-derives one order's revenue entry from its current state
pub async fn resync_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
) -> Result<Json<ResyncOutcome>, ApiError> {
    let outcome = state
        .service
        .resync(OrderId::from(id), Some(metadata))
        .await?;
    Ok(Json(outcome))
}

/// Replays every pending sync intent
pub async fn recover_pending(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
) -> Result<Json<RecoveryReport>, ApiError> {
    let report = state.service.recover_pending(Some(metadata)).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct SweepParams {
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Audits a page of orders and returns the drifted ones
pub async fn sweep(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Query(params): Query<SweepParams>,
) -> Result<Json<Vec<AuditReport>>, ApiError> {
    let query = OrderQuery {
        status: params.status,
        limit: Some(params.limit.unwrap_or(100)),
        offset: params.offset,
    };
    let drifted = state.auditor.sweep(query, Some(metadata)).await?;
    Ok(Json(drifted))
}
