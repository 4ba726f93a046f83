//! BillSync - Webhook-driven billing state synchronizer
//!
//! This crate receives signed Stripe webhook events and reconciles them
//! onto per-user subscription records, alongside caller-invoked billing
//! portal and manual re-sync operations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
