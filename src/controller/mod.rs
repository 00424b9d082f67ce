//! # Controller
//!
//! Reconciliation logic and the HTTP server exposing metrics and health endpoints.

pub mod reconciler;
pub mod server;
