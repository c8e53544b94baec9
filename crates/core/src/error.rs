//! Error types for the split-payment engine.
//!
//! The taxonomy follows three user-facing families: validation errors
//! (recoverable by changing input), configuration errors (require a setup
//! change), and contention errors (transient, caused by a concurrent
//! payment). Rounding edge cases are never errors.

use chrono::NaiveDate;
use thiserror::Error;

use cobro_shared::types::PaymentId;
use cobro_shared::Currency;

/// Errors that can occur while allocating and creating split payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ========== Validation Errors ==========
    /// The selection contains no open receivable/payable line.
    #[error("You can't register a payment without at least one open receivable/payable line")]
    NoEligibleInvoices,

    /// The selected invoices belong to more than one company.
    #[error("You can't create payments for entries belonging to different companies")]
    MultiCompanySelection,

    /// A write-off cannot be distributed across several payments.
    #[error("When processing multiple payments Write-Off is not supported")]
    MultiBatchWriteOff,

    /// A line edit referenced an index past the end of the register.
    #[error("Payment line {0} does not exist")]
    LineOutOfRange(usize),

    // ========== Configuration Errors ==========
    /// A custom rate can only bridge two currencies, one of them the
    /// company currency.
    #[error(
        "Three Currency Custom Rate is not supported. A custom rate is supported only when \
         either the payment or the invoice currency is the company currency"
    )]
    ThreeCurrencyCustomRate,

    /// Difference handling requires a write-off account and none is set.
    #[error("Booking the payment difference requires a write-off account and none is configured")]
    MissingWriteoffAccount,

    /// No market exchange rate known for the currency pair on the date.
    #[error("No exchange rate found for {from} to {to} on {date}")]
    NoExchangeRate {
        /// Source currency.
        from: Currency,
        /// Target currency.
        to: Currency,
        /// Date for which the rate was requested.
        date: NaiveDate,
    },

    /// No cancellation provider registered under the given name.
    #[error("Unknown cancellation provider: {0}")]
    UnknownCancellationProvider(String),

    /// The cancellation case requires a replacement document reference.
    #[error("Cancellation case {case} requires the fiscal folio of the replacement document")]
    MissingReplacementUuid {
        /// SAT cancellation case code.
        case: &'static str,
    },

    // ========== Contention Errors ==========
    /// Some target invoices are pending background reconciliation by
    /// another payment.
    #[error(
        "This payment cannot be performed: invoices in the selection are pending background \
         reconciliation by payments {payments:?}. Make sure those payments have been reconciled \
         and come back later"
    )]
    BackgroundReconciliationPending {
        /// Payments holding the conflicting reconciliations.
        payments: Vec<PaymentId>,
    },

    // ========== Payment State Errors ==========
    /// Only draft payments can be posted.
    #[error("Only draft payments can be posted")]
    CannotPostNonDraft,

    /// Posted payments must be reset to draft before being modified.
    #[error("Cannot modify a posted payment")]
    CannotModifyPosted,

    /// The payment was not flagged for background reconciliation.
    #[error("Payment {0} has no pending background reconciliation")]
    NothingToReconcile(PaymentId),

    /// The per-invoice split breakdown could not be encoded or decoded.
    #[error("Invalid payment split data: {0}")]
    InvalidSplitData(#[from] serde_json::Error),
}

impl PaymentError {
    /// Returns the stable error code for API responses and logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoEligibleInvoices => "NO_ELIGIBLE_INVOICES",
            Self::MultiCompanySelection => "MULTI_COMPANY_SELECTION",
            Self::MultiBatchWriteOff => "MULTI_BATCH_WRITE_OFF",
            Self::LineOutOfRange(_) => "LINE_OUT_OF_RANGE",
            Self::ThreeCurrencyCustomRate => "THREE_CURRENCY_CUSTOM_RATE",
            Self::MissingWriteoffAccount => "MISSING_WRITEOFF_ACCOUNT",
            Self::NoExchangeRate { .. } => "NO_EXCHANGE_RATE",
            Self::UnknownCancellationProvider(_) => "UNKNOWN_CANCELLATION_PROVIDER",
            Self::MissingReplacementUuid { .. } => "MISSING_REPLACEMENT_UUID",
            Self::BackgroundReconciliationPending { .. } => "BACKGROUND_RECONCILIATION_PENDING",
            Self::CannotPostNonDraft => "CANNOT_POST_NON_DRAFT",
            Self::CannotModifyPosted => "CANNOT_MODIFY_POSTED",
            Self::NothingToReconcile(_) => "NOTHING_TO_RECONCILE",
            Self::InvalidSplitData(_) => "INVALID_SPLIT_DATA",
        }
    }

    /// Returns true if this error is transient and worth retrying after the
    /// conflicting process finishes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackgroundReconciliationPending { .. })
    }
}
