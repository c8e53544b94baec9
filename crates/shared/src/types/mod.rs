//! Shared domain types.

pub mod id;
pub mod money;

pub use id::{
    AccountId, CompanyId, InvoiceId, JournalId, LedgerLineId, PartnerId, PaymentId,
};
pub use money::{Currency, Money};

#[cfg(test)]
mod money_tests;
