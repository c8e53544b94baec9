//! The payment record and its lifecycle.

use chrono::NaiveDate;
use cobro_shared::types::{
    AccountId, InvoiceId, JournalId, LedgerLineId, Money, PartnerId, PaymentId,
};

use crate::batch::{PartnerType, PaymentType};
use crate::error::PaymentError;
use crate::journal::LineSpec;

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    /// Editable, nothing booked yet.
    #[default]
    Draft,
    /// Booked in the ledger.
    Posted,
    /// Withdrawn; its lines are void.
    Cancelled,
}

/// A journal line as created by a posted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedLine {
    /// Identifier of the created ledger line.
    pub id: LedgerLineId,
    /// What the line contains.
    pub spec: LineSpec,
}

/// One payment created from a batch.
#[derive(Debug, Clone)]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Date the payment is booked on.
    pub date: NaiveDate,
    /// Amount and currency the payment was entered in.
    pub amount: Money,
    /// Direction of the money flow.
    pub payment_type: PaymentType,
    /// Role of the counterparty.
    pub partner_type: PartnerType,
    /// Counterparty.
    pub partner: PartnerId,
    /// Journal the payment went through.
    pub journal: JournalId,
    /// Receivable or payable account it settles.
    pub destination_account: AccountId,
    /// Memo.
    pub reference: String,
    /// Lifecycle state.
    pub status: PaymentStatus,
    /// Journal lines, filled when posting.
    pub lines: Vec<PostedLine>,
    /// Serialized per-invoice breakdown, for downstream documents.
    pub split_data: Option<String>,
    /// True while reconciliation is deferred to a background pass.
    pub to_reconcile_on_background: bool,
    /// Pairs awaiting background reconciliation: the invoice and the
    /// settlement line created for it.
    pub reconciliation_data: Vec<(InvoiceId, LedgerLineId)>,
}

impl Payment {
    /// Books the payment.
    ///
    /// # Errors
    ///
    /// `CannotPostNonDraft` unless the payment is a draft.
    pub fn post(&mut self) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Draft {
            return Err(PaymentError::CannotPostNonDraft);
        }
        self.status = PaymentStatus::Posted;
        Ok(())
    }

    /// Returns the payment to draft, discarding the split breakdown:
    /// whatever gets posted next is re-derived from scratch.
    pub fn action_draft(&mut self) {
        self.status = PaymentStatus::Draft;
        self.split_data = None;
    }

    /// Cancels a draft payment and drops any pending background
    /// reconciliation work.
    ///
    /// # Errors
    ///
    /// `CannotModifyPosted` when the payment is still posted.
    pub fn action_cancel(&mut self) -> Result<(), PaymentError> {
        if self.status == PaymentStatus::Posted {
            return Err(PaymentError::CannotModifyPosted);
        }
        self.status = PaymentStatus::Cancelled;
        self.to_reconcile_on_background = false;
        self.reconciliation_data.clear();
        Ok(())
    }

    /// Settlement pairs this payment still has to reconcile.
    #[must_use]
    pub fn pending_invoices(&self) -> Vec<InvoiceId> {
        self.reconciliation_data.iter().map(|(i, _)| *i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobro_shared::types::Currency;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment {
            id: PaymentId::new(),
            date: NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
            amount: Money::new(dec!(100.00), Currency::Mxn),
            payment_type: PaymentType::Inbound,
            partner_type: PartnerType::Customer,
            partner: PartnerId::new(),
            journal: JournalId::new(),
            destination_account: AccountId::new(),
            reference: "INV/5".to_owned(),
            status: PaymentStatus::Draft,
            lines: Vec::new(),
            split_data: Some("{}".to_owned()),
            to_reconcile_on_background: true,
            reconciliation_data: vec![(InvoiceId::new(), LedgerLineId::new())],
        }
    }

    #[test]
    fn post_requires_draft() {
        let mut p = payment();
        p.post().unwrap();
        assert_eq!(p.status, PaymentStatus::Posted);
        assert!(matches!(p.post(), Err(PaymentError::CannotPostNonDraft)));
    }

    #[test]
    fn back_to_draft_clears_the_split_breakdown() {
        let mut p = payment();
        p.post().unwrap();
        p.action_draft();
        assert_eq!(p.status, PaymentStatus::Draft);
        assert!(p.split_data.is_none());
    }

    #[test]
    fn cancel_clears_background_reconciliation() {
        let mut p = payment();
        p.action_cancel().unwrap();
        assert_eq!(p.status, PaymentStatus::Cancelled);
        assert!(!p.to_reconcile_on_background);
        assert!(p.reconciliation_data.is_empty());
    }

    #[test]
    fn cancel_rejects_posted_payments() {
        let mut p = payment();
        p.post().unwrap();
        assert!(matches!(
            p.action_cancel(),
            Err(PaymentError::CannotModifyPosted)
        ));
    }
}
