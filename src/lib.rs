//! Uniflow API Library
//!
//! Order fulfillment backend for employee uniform programs: vendor-wise
//! order splitting, the purchase-requisition approval chain, PO/GRN
//! closure, and pluggable shipping providers.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod circuit_breaker;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod identity;
pub mod migrator;
pub mod providers;
pub mod services;

use crate::providers::registry::ProviderRegistry;
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wire the full service graph over an established connection.
    pub fn build(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        let order = Arc::new(services::orders::OrderService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let shipments = Arc::new(services::shipments::ShipmentService::new(
            db.clone(),
            event_sender.clone(),
            registry,
        ));
        let procurement = Arc::new(services::procurement::ProcurementService::new(
            db.clone(),
            event_sender.clone(),
        ));
        Self {
            db,
            config,
            event_sender,
            services: handlers::AppServices {
                order,
                shipments,
                procurement,
            },
        }
    }
}

/// Build the application router over a prepared state.
pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}
