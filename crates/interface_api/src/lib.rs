//! HTTP API Layer
//!
//! REST transport for the order mutation service and the consistency
//! auditor, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per concern (orders, sync, health)
//! - **Middleware**: request id propagation, request logging, tracing
//! - **DTOs**: request/response bodies
//! - **Error Handling**: `SyncError` mapped onto HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::from_ports(orders, ledger, journal, events, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_ledger::LedgerPort;
use domain_sales::OrderPort;
use domain_sync::{ConsistencyAuditor, EventPublisher, OrderMutationService, SyncJournalPort};

use crate::config::ApiConfig;
use crate::handlers::{health, orders, sync};
use crate::middleware::request_logging_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderMutationService>,
    pub auditor: Arc<ConsistencyAuditor>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the mutation service and auditor over one set of ports
    pub fn from_ports(
        orders: Arc<dyn OrderPort>,
        ledger: Arc<dyn LedgerPort>,
        journal: Arc<dyn SyncJournalPort>,
        events: Arc<dyn EventPublisher>,
        config: ApiConfig,
    ) -> Self {
        let service = OrderMutationService::new(
            orders.clone(),
            ledger.clone(),
            journal,
            events,
            config.sync.clone(),
        );
        Self {
            service: Arc::new(service),
            auditor: Arc::new(ConsistencyAuditor::new(orders, ledger)),
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let order_routes = Router::new()
        .route("/", post(orders::create_order))
        .route(
            "/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/:id/status", put(orders::change_status))
        .route("/:id/audit", get(orders::audit_order))
        .route("/:id/resync", post(sync::resync_order));

    let sync_routes = Router::new()
        .route("/recover", post(sync::recover_pending))
        .route("/audit", get(sync::sweep));

    let api_routes = Router::new()
        .nest("/orders", order_routes)
        .nest("/sync", sync_routes)
        .layer(axum_middleware::from_fn(request_logging_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
