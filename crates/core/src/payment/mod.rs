//! Payments: records, the accounting backend seam, and orchestration.

pub mod backend;
pub mod orchestrator;
pub mod record;


pub use backend::{AccountingBackend, InMemoryAccounting};
pub use orchestrator::PaymentOrchestrator;
pub use record::{Payment, PaymentStatus, PostedLine};
