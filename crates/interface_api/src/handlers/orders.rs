//! Order handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use core_kernel::OrderId;
use domain_sync::{AuditReport, DeletionOutcome};

use crate::dto::orders::*;
use crate::middleware::RequestMetadata;
use crate::{error::ApiError, AppState};

/// Creates a pending order
pub async fn create_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let currency = state.service.config().base_currency;
    let order = state
        .service
        .create_order(request.into_new_order(currency), Some(metadata))
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Gets an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let detail = state
        .service
        .get_order(OrderId::from(id), Some(metadata))
        .await?;
    Ok(Json(detail.into()))
}

/// Replaces an order's fields and lines
pub async fn update_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let currency = state.service.config().base_currency;
    let (edit, previous_status) = request.into_edit(currency);
    let outcome = state
        .service
        .update_order(OrderId::from(id), edit, previous_status, Some(metadata))
        .await?;
    Ok(Json(outcome.into()))
}

/// Moves an order to a new status
pub async fn change_status(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let outcome = state
        .service
        .change_status(OrderId::from(id), request.status, Some(metadata))
        .await?;
    Ok(Json(outcome.into()))
}

/// Deletes an order, its lines and every ledger entry linked to it
pub async fn delete_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletionOutcome>, ApiError> {
    let outcome = state
        .service
        .delete_order(OrderId::from(id), Some(metadata))
        .await?;
    Ok(Json(outcome))
}

/// Audits one order against its revenue entries
pub async fn audit_order(
    State(state): State<AppState>,
    RequestMetadata(metadata): RequestMetadata,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditReport>, ApiError> {
    let report = state
        .auditor
        .audit(OrderId::from(id), Some(metadata))
        .await?;
    Ok(Json(report))
}
