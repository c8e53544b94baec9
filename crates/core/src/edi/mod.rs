//! Electronic-invoicing support: the per-invoice split breakdown
//! attached to payments, and the fiscal cancellation registry.

pub mod cancellation;
pub mod split_data;

pub use cancellation::{
    CancellationCase, CancellationOutcome, CancellationProvider, CancellationRequest,
    CancellationStatus, ProviderRegistry,
};
pub use split_data::{PaymentSplitData, SplitLine};
