//! Two-dimensional cutting-stock optimization.
//!
//! Lays out rectangular pieces on stock sheets with Bottom-Left Fill,
//! compares sort strategies, prices the result and serves it over HTTP.

pub mod analysis;
pub mod api;
pub mod config;
pub mod export;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod placement;
pub mod project;
pub mod types;
