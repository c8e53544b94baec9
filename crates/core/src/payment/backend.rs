//! Seam between the payment engine and whatever stores the books.

use std::collections::BTreeMap;

use cobro_shared::types::{InvoiceId, LedgerLineId, PaymentId};

use crate::batch::OpenLedgerLine;

use super::record::Payment;

/// Ledger operations the engine needs from its host.
///
/// The engine never touches storage directly; posting and
/// reconciliation go through this trait so the host decides what a
/// ledger actually is.
pub trait AccountingBackend {
    /// Open receivable/payable lines of one invoice.
    fn open_lines(&self, invoice: InvoiceId) -> Vec<OpenLedgerLine>;

    /// Persists a payment and returns its id.
    fn store_payment(&mut self, payment: Payment) -> PaymentId;

    /// Looks a payment up.
    fn payment(&self, id: PaymentId) -> Option<&Payment>;

    /// Looks a payment up for mutation.
    fn payment_mut(&mut self, id: PaymentId) -> Option<&mut Payment>;

    /// All stored payments, for contention scans.
    fn payments(&self) -> Vec<&Payment>;

    /// Posted payments still holding deferred reconciliation work.
    fn payments_pending_background(&self) -> Vec<&Payment> {
        self.payments()
            .into_iter()
            .filter(|p| {
                p.status == super::record::PaymentStatus::Posted
                    && p.to_reconcile_on_background
                    && !p.reconciliation_data.is_empty()
            })
            .collect()
    }

    /// Matches an open invoice line against a settlement line, closing
    /// the open line.
    fn reconcile(&mut self, open_line: LedgerLineId, settlement_line: LedgerLineId);
}

/// In-memory books, used by tests and embedders without a ledger.
#[derive(Debug, Default)]
pub struct InMemoryAccounting {
    open_lines: Vec<OpenLedgerLine>,
    payments: BTreeMap<PaymentId, Payment>,
    matches: Vec<(LedgerLineId, LedgerLineId)>,
}

impl InMemoryAccounting {
    /// Empty books.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an open invoice line to the books.
    pub fn add_open_line(&mut self, line: OpenLedgerLine) {
        self.open_lines.push(line);
    }

    /// Reconciliations performed so far, as (open line, settlement
    /// line) pairs.
    #[must_use]
    pub fn matches(&self) -> &[(LedgerLineId, LedgerLineId)] {
        &self.matches
    }
}

impl AccountingBackend for InMemoryAccounting {
    fn open_lines(&self, invoice: InvoiceId) -> Vec<OpenLedgerLine> {
        self.open_lines
            .iter()
            .filter(|l| l.invoice == invoice)
            .cloned()
            .collect()
    }

    fn store_payment(&mut self, payment: Payment) -> PaymentId {
        let id = payment.id;
        self.payments.insert(id, payment);
        id
    }

    fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.get(&id)
    }

    fn payment_mut(&mut self, id: PaymentId) -> Option<&mut Payment> {
        self.payments.get_mut(&id)
    }

    fn payments(&self) -> Vec<&Payment> {
        self.payments.values().collect()
    }

    fn reconcile(&mut self, open_line: LedgerLineId, settlement_line: LedgerLineId) {
        if let Some(line) = self.open_lines.iter_mut().find(|l| l.id == open_line) {
            line.reconciled = true;
        }
        self.matches.push((open_line, settlement_line));
    }
}
