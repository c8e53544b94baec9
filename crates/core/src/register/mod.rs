//! Payment session state: invoice selection, amount allocation, differences.
//!
//! A [`PaymentRegister`] is the ephemeral state of one payment-splitting
//! session. It owns one [`AllocationLine`] per invoice being paid, keeps
//! them ordered by due date, and redistributes the entered amount
//! oldest-debt-first whenever the total changes.

pub mod difference;
pub mod invoice;
pub mod line;
pub mod session;

#[cfg(test)]
mod props;

pub use difference::DifferenceSummary;
pub use invoice::InvoiceRef;
pub use line::{AllocationLine, ConversionContext};
pub use session::{DifferenceHandling, JournalRef, PaymentRegister};
