//! Fiscal cancellation of stamped documents through named providers.
//!
//! Mexican tax rules (SAT) define four cancellation cases; case 01
//! replaces the document and must reference the substitute's fiscal
//! folio. Actual transmission is delegated to a [`CancellationProvider`]
//! looked up by name in a [`ProviderRegistry`], so certification
//! vendors plug in without the engine knowing any of them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use cobro_shared::types::PaymentId;

use crate::error::PaymentError;

/// SAT cancellation case of a stamped document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationCase {
    /// 01: issued with errors, a replacement document exists.
    ErrorsWithReplacement,
    /// 02: issued with errors, no replacement.
    ErrorsWithoutReplacement,
    /// 03: the operation never took place.
    OperationNotCarriedOut,
    /// 04: nominative operation folded into a global invoice.
    GlobalInvoiceOperation,
}

impl CancellationCase {
    /// Two-digit SAT code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ErrorsWithReplacement => "01",
            Self::ErrorsWithoutReplacement => "02",
            Self::OperationNotCarriedOut => "03",
            Self::GlobalInvoiceOperation => "04",
        }
    }

    /// Whether the case must name the replacement document.
    #[must_use]
    pub const fn requires_replacement(self) -> bool {
        matches!(self, Self::ErrorsWithReplacement)
    }
}

/// What to cancel and under which case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationRequest {
    /// Payment whose fiscal document is being cancelled.
    pub payment: PaymentId,
    /// Fiscal folio (UUID) of the stamped document.
    pub fiscal_folio: Uuid,
    /// SAT case invoked.
    pub case: CancellationCase,
    /// Folio of the replacement document, mandatory for case 01.
    pub replacement_folio: Option<Uuid>,
}

impl CancellationRequest {
    /// Checks the case's folio requirements.
    ///
    /// # Errors
    ///
    /// `MissingReplacementUuid` when case 01 lacks a replacement folio.
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.case.requires_replacement() && self.replacement_folio.is_none() {
            return Err(PaymentError::MissingReplacementUuid {
                case: self.case.code(),
            });
        }
        Ok(())
    }
}

/// Where the authority left the cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationStatus {
    /// Accepted and final.
    Cancelled,
    /// Waiting for the receiver to accept or reject.
    PendingAcceptance,
    /// Rejected by the authority or the receiver.
    Rejected,
}

/// Result reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Where the request ended up.
    pub status: CancellationStatus,
    /// Authority acknowledgement, when one was issued.
    pub acknowledgement: Option<String>,
}

/// A certification vendor able to transmit cancellations.
pub trait CancellationProvider {
    /// Transmits one validated cancellation request.
    ///
    /// # Errors
    ///
    /// Provider-specific failures map onto [`PaymentError`].
    fn cancel_case(
        &self,
        request: &CancellationRequest,
    ) -> Result<CancellationOutcome, PaymentError>;
}

/// Name-keyed set of cancellation providers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn CancellationProvider>>,
}

impl ProviderRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Box<dyn CancellationProvider>,
    ) {
        self.providers.insert(name.into(), provider);
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Validates `request` and dispatches it to the named provider.
    ///
    /// # Errors
    ///
    /// `UnknownCancellationProvider` for an unregistered name,
    /// `MissingReplacementUuid` for an invalid case 01 request, plus
    /// whatever the provider itself reports.
    pub fn cancel(
        &self,
        name: &str,
        request: &CancellationRequest,
    ) -> Result<CancellationOutcome, PaymentError> {
        request.validate()?;
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| PaymentError::UnknownCancellationProvider(name.to_owned()))?;
        let outcome = provider.cancel_case(request)?;
        info!(
            provider = name,
            case = request.case.code(),
            status = ?outcome.status,
            "cancellation request transmitted"
        );
        Ok(outcome)
    }
}
