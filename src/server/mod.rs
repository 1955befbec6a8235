//! Dashboard server.
//!
//! This module provides:
//! - REST dashboard using axum
//! - Health and metrics endpoints
//! - Tracing setup

mod app;
pub mod metrics;
pub mod observability;
mod rest;

pub use app::{App, ServerConfig};
pub use metrics::init_metrics;
pub use observability::init_tracing;
pub use rest::{create_rest_router, static_route, DashboardState, HealthResponse};
