//! Per-invoice split breakdown serialized onto posted payments.
//!
//! Downstream fiscal documents (payment complements) need the exact
//! allocation the payment was posted with, not a reconstruction from
//! reconciled amounts. The breakdown is frozen at posting time as a
//! JSON blob on the payment.

use chrono::NaiveDate;
use cobro_shared::types::{Currency, InvoiceId, JournalId};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::batch::PaymentBatch;
use crate::error::PaymentError;
use crate::register::{DifferenceSummary, PaymentRegister};

/// One invoice's share of the payment, in all three currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLine {
    /// Invoice being paid.
    pub invoice: InvoiceId,
    /// Currency of the invoice.
    pub currency: Currency,
    /// Amount still due at posting time, invoice currency.
    pub amount: Decimal,
    /// Allocated amount, invoice currency.
    pub payment_amount: Decimal,
    /// Allocated amount, payment currency.
    pub payment_currency_amount: Decimal,
    /// Allocated amount, company currency.
    pub company_currency_amount: Decimal,
    /// Revaluation gap, payment currency.
    pub inline_payment_difference: Decimal,
    /// Revaluation gap, company currency.
    pub inline_company_difference: Decimal,
}

/// Frozen breakdown of one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplitData {
    /// Total of the payment, payment currency.
    pub amount: Decimal,
    /// Journal the payment went through.
    pub journal: JournalId,
    /// Payment currency.
    pub currency: Currency,
    /// Company currency.
    pub company_currency: Currency,
    /// Total of the payment, company currency.
    pub company_currency_amount: Decimal,
    /// Unallocated remainder, payment currency.
    pub payment_difference: Decimal,
    /// Unallocated remainder, company currency.
    pub company_difference: Decimal,
    /// Date the payment was made.
    pub payment_date: NaiveDate,
    /// One entry per invoice in the payment.
    pub lines: Vec<SplitLine>,
}

impl PaymentSplitData {
    /// Freezes the breakdown of one batch.
    ///
    /// The global remainder belongs to the payment hosting the
    /// register's first allocated line; other batches carry plain sums.
    #[must_use]
    pub fn for_batch(
        register: &PaymentRegister,
        batch: &PaymentBatch,
        summary: &DifferenceSummary,
        company_currency: Currency,
    ) -> Self {
        let host_index = register.difference_host_index();
        let hosts_differences = batch.members.iter().any(|m| Some(m.line_index) == host_index);
        let lines: Vec<SplitLine> = batch
            .members
            .iter()
            .map(|m| {
                let line = &register.lines[m.line_index];
                SplitLine {
                    invoice: line.invoice.id,
                    currency: line.invoice.currency,
                    amount: line.due_amount,
                    payment_amount: line.payment_amount,
                    payment_currency_amount: line.payment_currency_amount,
                    company_currency_amount: line.company_currency_amount,
                    inline_payment_difference: line.inline_payment_difference(),
                    inline_company_difference: line.inline_company_difference,
                }
            })
            .collect();
        let (payment_difference, company_difference) = if hosts_differences {
            (summary.payment_difference, summary.company_difference)
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };
        let amount = payment_difference
            + lines
                .iter()
                .map(|l| l.payment_currency_amount)
                .sum::<Decimal>();
        let company_currency_amount = company_difference
            + lines
                .iter()
                .map(|l| l.company_currency_amount)
                .sum::<Decimal>();
        Self {
            amount,
            journal: register.journal.id,
            currency: register.currency,
            company_currency,
            company_currency_amount,
            payment_difference,
            company_difference,
            payment_date: register.payment_date,
            lines,
        }
    }

    /// Rate between the payment and company currencies implied by the
    /// frozen amounts, rounded up to six digits as fiscal payment
    /// complements require. `None` when the payment is in the company
    /// currency or the amounts cannot form a ratio.
    #[must_use]
    pub fn payment_exchange_rate(&self) -> Option<Decimal> {
        if self.currency == self.company_currency || self.amount.is_zero() {
            return None;
        }
        let rate = (self.company_currency_amount / self.amount).abs();
        Some(rate.round_dp_with_strategy(6, RoundingStrategy::AwayFromZero))
    }

    /// Rate between one invoice's currency and the payment currency,
    /// rounded up to ten digits. `None` when they match or nothing was
    /// allocated.
    #[must_use]
    pub fn invoice_exchange_rate(&self, invoice: InvoiceId) -> Option<Decimal> {
        let line = self.lines.iter().find(|l| l.invoice == invoice)?;
        if line.currency == self.currency || line.payment_currency_amount.is_zero() {
            return None;
        }
        let rate = (line.payment_amount / line.payment_currency_amount).abs();
        Some(rate.round_dp_with_strategy(10, RoundingStrategy::AwayFromZero))
    }

    /// Encodes the breakdown for storage on a payment.
    ///
    /// # Errors
    ///
    /// `InvalidSplitData` when encoding fails.
    pub fn to_json(&self) -> Result<String, PaymentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a breakdown stored on a payment.
    ///
    /// # Errors
    ///
    /// `InvalidSplitData` when the blob does not parse.
    pub fn from_json(raw: &str) -> Result<Self, PaymentError> {
        Ok(serde_json::from_str(raw)?)
    }
}
