//! HTTP surface: axum application, JSON command routes, SSE streams.

pub mod app;
pub mod routes;
