//! Split-payment allocation and reconciliation engine for Cobro.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. Given a set of open invoices and one payment amount in one
//! currency, it groups the invoices into batches, allocates the amount
//! oldest-debt-first, computes rounding and exchange differences, and emits
//! balanced journal line specifications ready for posting and
//! reconciliation by the host accounting subsystem.
//!
//! # Modules
//!
//! - `currency` - Multi-currency conversion with custom fixed rates
//! - `register` - Payment session state, auto-split allocation, differences
//! - `batch` - Grouping of allocation lines into payment batches
//! - `journal` - Balanced journal line specifications per batch
//! - `payment` - Payment records, orchestration, reconciliation
//! - `edi` - Split metadata blob and tax-document cancellation dispatch
//! - `error` - Error taxonomy for the engine

pub mod batch;
pub mod currency;
pub mod edi;
pub mod error;
pub mod journal;
pub mod payment;
pub mod register;

pub use error::PaymentError;
