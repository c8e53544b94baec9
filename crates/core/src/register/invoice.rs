//! Invoice snapshot used by the payment register.

use chrono::NaiveDate;
use cobro_shared::types::{CompanyId, Currency, InvoiceId, PartnerId};
use rust_decimal::Decimal;

/// Immutable view of a posted, partially or fully unpaid invoice.
///
/// This is the slice of the invoice the register needs: identity,
/// currencies, dates, and the open amounts on its receivable or payable
/// side. The open amounts are carried in both the invoice currency and
/// the company currency so allocation ratios survive currency changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRef {
    /// Invoice identifier.
    pub id: InvoiceId,
    /// Counterparty on the invoice.
    pub partner: PartnerId,
    /// Company that issued or received the invoice.
    pub company: CompanyId,
    /// Currency the invoice is expressed in.
    pub currency: Currency,
    /// Accounting date of the invoice, used for historical rate lookups.
    pub date: NaiveDate,
    /// Due date, which drives oldest-first allocation order.
    pub date_due: NaiveDate,
    /// Open amount still owed, in the invoice currency.
    pub residual: Decimal,
    /// Open receivable/payable balance, in the company currency.
    pub open_balance: Decimal,
    /// Open receivable/payable amount, in the invoice currency.
    pub open_amount_currency: Decimal,
}

impl InvoiceRef {
    /// True when nothing is left to pay on this invoice.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.currency.is_zero(self.residual)
    }
}
