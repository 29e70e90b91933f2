//! HTTP surface: `/generate`, `/getBarcode` and `/read`.

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::service::BarcodeService;

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub service: BarcodeService,
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_upload_bytes: usize,
    pub concurrency: usize,
}

pub fn router(service: BarcodeService, limits: Limits) -> Router {
    tracing::info!(
        max_upload_bytes = limits.max_upload_bytes,
        concurrency = limits.concurrency,
        "HTTP limits enabled"
    );
    Router::new()
        .route("/generate", get(handlers::generate))
        .route("/getBarcode", get(handlers::get_barcode))
        .route("/read", post(handlers::read))
        .with_state(AppState { service })
        .layer(ConcurrencyLimitLayer::new(limits.concurrency.max(1)))
        .layer(RequestBodyLimitLayer::new(limits.max_upload_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
}
