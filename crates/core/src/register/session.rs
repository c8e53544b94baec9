//! The payment register: one editing session over a set of invoices.

use chrono::NaiveDate;
use cobro_shared::types::{AccountId, CompanyId, Currency, JournalId};
use rust_decimal::Decimal;
use tracing::debug;

use crate::currency::CurrencyConverter;
use crate::error::PaymentError;

use super::invoice::InvoiceRef;
use super::line::{implied_rate, AllocationLine, ConversionContext};

/// What to do with the gap between the entered amount and the sum of
/// the invoices' open amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifferenceHandling {
    /// Leave the remainder open on the invoices.
    #[default]
    Open,
    /// Post the remainder to a write-off account and fully reconcile.
    Reconcile,
}

/// The journal the payment is booked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalRef {
    /// Journal identifier.
    pub id: JournalId,
    /// Bank or cash account receiving the liquidity counterpart.
    pub liquidity_account: AccountId,
    /// Currency the journal forces on the payment, when set.
    pub currency: Option<Currency>,
}

/// Editable state of a split-payment session.
///
/// Lines are kept sorted by due date ascending; [`set_amount`] walks
/// them in that order, so the oldest debts are settled first.
///
/// [`set_amount`]: PaymentRegister::set_amount
#[derive(Debug, Clone)]
pub struct PaymentRegister {
    /// Company booking the payment.
    pub company: CompanyId,
    /// Date the payment is made.
    pub payment_date: NaiveDate,
    /// Currency the payment is entered in.
    pub currency: Currency,
    /// Journal the payment goes through.
    pub journal: JournalRef,
    /// Total entered amount, in the payment currency.
    pub amount: Decimal,
    /// Optional fixed rate between the payment and company currencies.
    pub custom_rate: Option<Decimal>,
    /// Memo carried onto the payment, overriding the generated one.
    pub communication: Option<String>,
    /// How to treat a shortfall or excess against the open amounts.
    pub handling: DifferenceHandling,
    /// Write-off account, required when `handling` is `Reconcile`.
    pub writeoff_account: Option<AccountId>,
    /// Label for the write-off lines.
    pub writeoff_label: String,
    /// One allocation line per invoice, due date ascending.
    pub lines: Vec<AllocationLine>,
    // Last amount produced by a line-side edit. When set_amount receives
    // this exact value the manual per-line split is left untouched.
    dummy_amount: Decimal,
}

impl PaymentRegister {
    /// Opens a session over `invoices`, sorted by due date ascending.
    ///
    /// Call [`refresh_for_payment_context`] afterwards to value the
    /// lines at the payment date and propose a full-payment amount.
    ///
    /// # Errors
    ///
    /// `NoEligibleInvoices` when every invoice is already settled, and
    /// `MultiCompanySelection` when the invoices span companies.
    ///
    /// [`refresh_for_payment_context`]: PaymentRegister::refresh_for_payment_context
    pub fn new(
        payment_date: NaiveDate,
        currency: Currency,
        journal: JournalRef,
        invoices: Vec<InvoiceRef>,
    ) -> Result<Self, PaymentError> {
        let mut invoices: Vec<InvoiceRef> =
            invoices.into_iter().filter(|i| !i.is_settled()).collect();
        let Some(first) = invoices.first() else {
            return Err(PaymentError::NoEligibleInvoices);
        };
        let company = first.company;
        if invoices.iter().any(|i| i.company != company) {
            return Err(PaymentError::MultiCompanySelection);
        }
        invoices.sort_by_key(|i| i.date_due);
        let currency = journal.currency.unwrap_or(currency);
        let lines = invoices
            .into_iter()
            .map(|invoice| AllocationLine::new(invoice, currency))
            .collect();
        Ok(Self {
            company,
            payment_date,
            currency,
            journal,
            amount: Decimal::ZERO,
            custom_rate: None,
            communication: None,
            handling: DifferenceHandling::Open,
            writeoff_account: None,
            writeoff_label: "Write-Off".to_owned(),
            lines,
            dummy_amount: Decimal::ZERO,
        })
    }

    fn context<'a, 'p>(
        &self,
        converter: &'a CurrencyConverter<'p>,
    ) -> ConversionContext<'a, 'p> {
        ConversionContext {
            converter,
            payment_date: self.payment_date,
            register_rate: self.custom_rate,
        }
    }

    /// Revalues every line at the current payment date, currency and
    /// custom rate, then proposes paying everything in full.
    ///
    /// # Errors
    ///
    /// Propagates conversion failures, typically a missing market rate.
    pub fn refresh_for_payment_context(
        &mut self,
        converter: &CurrencyConverter<'_>,
    ) -> Result<(), PaymentError> {
        let cx = self.context(converter);
        let mut cumulative = Decimal::ZERO;
        for line in &mut self.lines {
            line.payment_currency = self.currency;
            let in_payment = line.invoice_to_payment(&cx, None)?;
            line.payment_currency_amount = in_payment;
            line.payment_currency_due_amount = in_payment;
            line.refresh_from_payment_currency_amount(&cx)?;
            cumulative += in_payment;
        }
        self.amount = self.currency.round(cumulative);
        self.dummy_amount = self.amount;
        Ok(())
    }

    /// Sets the total amount and redistributes it over the lines,
    /// oldest due date first, each line capped at its open amount.
    ///
    /// Setting the amount the lines already sum to is a no-op, so a
    /// manual per-line split survives a round trip through the total.
    ///
    /// # Errors
    ///
    /// Propagates conversion failures.
    pub fn set_amount(
        &mut self,
        amount: Decimal,
        converter: &CurrencyConverter<'_>,
    ) -> Result<(), PaymentError> {
        self.amount = amount;
        if amount == self.dummy_amount {
            return Ok(());
        }
        debug!(%amount, lines = self.lines.len(), "redistributing payment amount");
        let cx = self.context(converter);
        let mut remaining = amount;
        for line in &mut self.lines {
            let line_amount = line.invoice_to_payment(&cx, None)?;
            let assigned = remaining.min(line_amount);
            line.payment_currency_amount = self.currency.round(assigned);
            line.refresh_from_payment_currency_amount(&cx)?;
            remaining -= assigned;
        }
        self.dummy_amount = amount;
        Ok(())
    }

    /// Overrides one line's allocation, in the payment currency, and
    /// pulls the total back in sync with the lines.
    ///
    /// # Errors
    ///
    /// `LineOutOfRange` when `index` does not name a line; conversion
    /// failures propagate.
    pub fn set_line_amount(
        &mut self,
        index: usize,
        amount: Decimal,
        converter: &CurrencyConverter<'_>,
    ) -> Result<(), PaymentError> {
        let cx = self.context(converter);
        let line = self
            .lines
            .get_mut(index)
            .ok_or(PaymentError::LineOutOfRange(index))?;
        line.payment_currency_amount = self.currency.round(amount);
        line.refresh_from_payment_currency_amount(&cx)?;
        self.sync_amount_from_lines();
        Ok(())
    }

    /// Recomputes the total from the per-line allocations without
    /// triggering a redistribution.
    pub fn sync_amount_from_lines(&mut self) {
        let total: Decimal = self.lines.iter().map(|l| l.payment_currency_amount).sum();
        self.amount = self.currency.round(total);
        self.dummy_amount = self.amount;
    }

    /// Pins a per-line rate between the payment and invoice currencies
    /// and revalues the line with it.
    ///
    /// On a line whose invoice already carries the payment currency the
    /// rate is meaningless and is reset to one.
    ///
    /// # Errors
    ///
    /// `LineOutOfRange` when `index` does not name a line; conversion
    /// failures propagate.
    pub fn set_line_rate(
        &mut self,
        index: usize,
        rate: Decimal,
        converter: &CurrencyConverter<'_>,
    ) -> Result<(), PaymentError> {
        let cx = self.context(converter);
        let line = self
            .lines
            .get_mut(index)
            .ok_or(PaymentError::LineOutOfRange(index))?;
        if line.invoice.currency == self.currency {
            line.rate = Decimal::ONE;
            line.use_rate = false;
            return Ok(());
        }
        line.use_rate = true;
        line.rate = rate;
        let in_payment = line.invoice_to_payment(&cx, None)?;
        line.payment_currency_amount = in_payment;
        line.payment_amount = line.payment_to_invoice(&cx, in_payment)?;
        line.company_currency_amount = line.payment_to_company(&cx, in_payment)?;
        line.payment_currency_date_amount = in_payment;
        line.refresh_company_difference(&cx)?;
        self.sync_amount_from_lines();
        Ok(())
    }

    /// Drops a line's pinned rate, keeping the allocated amounts and
    /// re-deriving the rate implied by them.
    ///
    /// # Errors
    ///
    /// `LineOutOfRange` when `index` does not name a line; conversion
    /// failures propagate.
    pub fn clear_line_rate(
        &mut self,
        index: usize,
        converter: &CurrencyConverter<'_>,
    ) -> Result<(), PaymentError> {
        let cx = self.context(converter);
        let line = self
            .lines
            .get_mut(index)
            .ok_or(PaymentError::LineOutOfRange(index))?;
        if line.invoice.currency == self.currency {
            line.rate = Decimal::ONE;
            line.use_rate = false;
            line.payment_amount = line.payment_currency_amount;
            line.company_currency_amount =
                line.invoice_to_company(&cx, Some(line.payment_currency_amount))?;
            line.payment_currency_date_amount = line.invoice_to_payment(&cx, None)?;
            line.refresh_company_difference(&cx)?;
            return Ok(());
        }
        // Revalue the company side at the rate the kept amounts imply,
        // then let the line fall back to market rates.
        line.rate = implied_rate(line.payment_currency_amount, line.payment_amount);
        line.use_rate = true;
        line.company_currency_amount =
            line.payment_to_company(&cx, line.payment_currency_amount)?;
        line.payment_currency_date_amount = line.invoice_to_payment(&cx, None)?;
        line.use_rate = false;
        line.refresh_company_difference(&cx)?;
        Ok(())
    }

    /// Index of the first line carrying an allocation. The payment
    /// built from the batch containing it hosts the difference entries.
    #[must_use]
    pub fn difference_host_index(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.payment_currency_amount > Decimal::ZERO)
    }

    /// Total allocated over the lines, in the company currency.
    #[must_use]
    pub fn company_currency_total(&self) -> Decimal {
        self.lines.iter().map(|l| l.company_currency_amount).sum()
    }

    /// Memo for the payment: the explicit communication when set.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.communication.as_deref()
    }
}
