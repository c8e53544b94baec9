//! Shared types and configuration for Cobro.
//!
//! This crate provides common types used across all other crates:
//! - Currency and money types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Runtime configuration for the payment engine

pub mod config;
pub mod types;

pub use config::ReconcilePolicy;
pub use types::{Currency, Money};
