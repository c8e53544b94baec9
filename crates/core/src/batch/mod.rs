//! Grouping of allocation lines into per-partner payment batches.

pub mod grouping;

pub use grouping::{
    allocated_batches, preview_batches, AccountType, BatchMember, DefaultGrouping, GroupKey, GroupingStrategy,
    OpenLedgerLine, PartnerType, PaymentBatch, PaymentType,
};
