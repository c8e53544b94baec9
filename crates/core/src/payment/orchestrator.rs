//! End-to-end payment creation from a register.

use cobro_shared::config::ReconcilePolicy;
use cobro_shared::types::{InvoiceId, LedgerLineId, Money, PaymentId};
use tracing::{info, instrument};

use crate::batch::{DefaultGrouping, PartnerType, PaymentBatch, PaymentType};
use crate::currency::CurrencyConverter;
use crate::error::PaymentError;
use crate::journal::{materialize_batches, MaterializedBatch};
use crate::register::PaymentRegister;

use super::backend::AccountingBackend;
use super::record::{Payment, PaymentStatus, PostedLine};

/// Drives a register through batching, posting and reconciliation.
///
/// Reconciliation of supplier or customer payments can be deferred to
/// a background pass via [`ReconcilePolicy`]; deferred payments keep
/// their settlement pairs on board until [`reconcile_in_background`]
/// runs them.
///
/// [`reconcile_in_background`]: PaymentOrchestrator::reconcile_in_background
#[derive(Debug, Clone, Default)]
pub struct PaymentOrchestrator {
    policy: ReconcilePolicy,
}

impl PaymentOrchestrator {
    /// Orchestrator applying `policy`.
    #[must_use]
    pub const fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    /// Creates, posts and (unless deferred) reconciles one payment per
    /// batch of the register. Returns the payment ids in batch order.
    ///
    /// A write-off only fits a single payment: with several batches and
    /// a global difference the whole run is refused before anything is
    /// written.
    ///
    /// # Errors
    ///
    /// `MultiBatchWriteOff`, `BackgroundReconciliationPending`, plus
    /// everything batching and line building can report.
    #[instrument(skip_all, fields(amount = %register.amount, currency = %register.currency))]
    pub fn create_payments(
        &self,
        register: &PaymentRegister,
        converter: &CurrencyConverter<'_>,
        backend: &mut dyn AccountingBackend,
    ) -> Result<Vec<PaymentId>, PaymentError> {
        let materialized =
            materialize_batches(register, converter, |id| backend.open_lines(id), &DefaultGrouping)?;

        let mut built = Vec::with_capacity(materialized.len());
        for MaterializedBatch {
            batch,
            specs,
            split_data,
        } in materialized
        {
            let defer = self.defers_reconciliation(batch.payment_type, batch.key.partner_type);
            if defer {
                ensure_no_contention(&batch, &*backend)?;
            }

            let lines: Vec<PostedLine> = specs
                .into_iter()
                .map(|spec| PostedLine {
                    id: LedgerLineId::new(),
                    spec,
                })
                .collect();
            let matches: Vec<(LedgerLineId, LedgerLineId)> = lines
                .iter()
                .filter_map(|l| l.spec.reconcile_with.map(|open| (open, l.id)))
                .collect();
            let reconciliation_data: Vec<(InvoiceId, LedgerLineId)> = if defer {
                lines
                    .iter()
                    .filter_map(|l| l.spec.invoice.map(|inv| (inv, l.id)))
                    .collect()
            } else {
                Vec::new()
            };

            let payment = Payment {
                id: PaymentId::new(),
                date: register.payment_date,
                amount: Money::new(batch.source_amount_currency, register.currency),
                payment_type: batch.payment_type,
                partner_type: batch.key.partner_type,
                partner: batch.key.partner,
                journal: register.journal.id,
                destination_account: batch.destination_account,
                reference: batch.communication.clone(),
                status: PaymentStatus::Draft,
                lines,
                split_data: Some(split_data.to_json()?),
                to_reconcile_on_background: defer,
                reconciliation_data,
            };
            built.push((payment, matches, defer));
        }

        let mut stored = Vec::with_capacity(built.len());
        for (payment, matches, defer) in built {
            let id = backend.store_payment(payment);
            stored.push((id, matches, defer));
        }
        for (id, matches, defer) in &stored {
            if let Some(payment) = backend.payment_mut(*id) {
                payment.post()?;
            }
            if *defer {
                info!(payment = %id, "reconciliation deferred to background");
            } else {
                for (open, settlement) in matches {
                    backend.reconcile(*open, *settlement);
                }
            }
        }
        Ok(stored.into_iter().map(|(id, _, _)| id).collect())
    }

    /// Runs the deferred reconciliation of one payment and clears its
    /// backlog.
    ///
    /// # Errors
    ///
    /// `NothingToReconcile` when the payment is unknown or carries no
    /// deferred work.
    #[instrument(skip(backend))]
    pub fn reconcile_in_background(
        &self,
        id: PaymentId,
        backend: &mut dyn AccountingBackend,
    ) -> Result<(), PaymentError> {
        let pending = {
            let payment = backend
                .payment(id)
                .ok_or(PaymentError::NothingToReconcile(id))?;
            if !payment.to_reconcile_on_background || payment.reconciliation_data.is_empty() {
                return Err(PaymentError::NothingToReconcile(id));
            }
            payment.reconciliation_data.clone()
        };
        for (invoice, settlement) in pending {
            if let Some(open) = backend
                .open_lines(invoice)
                .into_iter()
                .find(|l| !l.reconciled)
            {
                backend.reconcile(open.id, settlement);
            }
        }
        if let Some(payment) = backend.payment_mut(id) {
            payment.to_reconcile_on_background = false;
            payment.reconciliation_data.clear();
        }
        info!(payment = %id, "background reconciliation completed");
        Ok(())
    }

    const fn defers_reconciliation(
        &self,
        payment_type: PaymentType,
        partner_type: PartnerType,
    ) -> bool {
        match (payment_type, partner_type) {
            (PaymentType::Outbound, PartnerType::Supplier) => {
                self.policy.skip_supplier_reconciliation
            }
            (PaymentType::Inbound, PartnerType::Customer) => {
                self.policy.skip_customer_reconciliation
            }
            _ => false,
        }
    }
}

// Pre-flight check: refuse to touch invoices another posted payment
// still has queued for background reconciliation.
fn ensure_no_contention(
    batch: &PaymentBatch,
    backend: &dyn AccountingBackend,
) -> Result<(), PaymentError> {
    let invoices: Vec<InvoiceId> = batch.members.iter().map(|m| m.open_line.invoice).collect();
    let mut holders: Vec<PaymentId> = backend
        .payments_pending_background()
        .into_iter()
        .filter(|p| {
            p.reconciliation_data
                .iter()
                .any(|(invoice, _)| invoices.contains(invoice))
        })
        .map(|p| p.id)
        .collect();
    if holders.is_empty() {
        Ok(())
    } else {
        holders.sort_unstable();
        holders.dedup();
        Err(PaymentError::BackgroundReconciliationPending { payments: holders })
    }
}
