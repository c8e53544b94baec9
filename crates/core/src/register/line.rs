//! One invoice's slice of a payment, in three currencies at once.

use chrono::NaiveDate;
use cobro_shared::types::Currency;
use rust_decimal::Decimal;

use crate::currency::CurrencyConverter;
use crate::error::PaymentError;

use super::invoice::InvoiceRef;

/// Everything a line needs to convert amounts between its three
/// currencies: the converter, the payment date, and the register-wide
/// custom rate (overridden per line when [`AllocationLine::use_rate`]
/// is set).
#[derive(Clone, Copy)]
pub struct ConversionContext<'a, 'p> {
    /// Converter carrying the company currency and rate provider.
    pub converter: &'a CurrencyConverter<'p>,
    /// Date the payment is made, used for rate lookups.
    pub payment_date: NaiveDate,
    /// Custom rate entered at the register level, if any.
    pub register_rate: Option<Decimal>,
}

/// Allocation of part of a payment to a single invoice.
///
/// The same allocated value is carried in the invoice currency
/// (`payment_amount`), the payment currency (`payment_currency_amount`)
/// and the company currency (`company_currency_amount`). The two
/// `payment_currency_*_amount` fields hold the full due amount valued
/// at the invoice date and at the payment date, whose gap is the
/// per-line exchange difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationLine {
    /// The invoice being paid.
    pub invoice: InvoiceRef,
    /// Amount still due, in the invoice currency.
    pub due_amount: Decimal,
    /// Currency the payment is made in.
    pub payment_currency: Currency,
    /// Allocated amount, in the payment currency.
    pub payment_currency_amount: Decimal,
    /// Allocated amount, in the invoice currency.
    pub payment_amount: Decimal,
    /// Allocated amount, in the company currency.
    pub company_currency_amount: Decimal,
    /// Full due amount in the payment currency, valued at the invoice date.
    pub payment_currency_due_amount: Decimal,
    /// Full due amount in the payment currency, valued at the payment date.
    pub payment_currency_date_amount: Decimal,
    /// Difference between the revalued due amount and the allocation,
    /// in the company currency. Negative means an excess payment.
    pub inline_company_difference: Decimal,
    /// Rate between the payment and invoice currencies, for display and
    /// as the custom rate when `use_rate` is set.
    pub rate: Decimal,
    /// When true, `rate` overrides the register-level custom rate.
    pub use_rate: bool,
}

impl AllocationLine {
    /// Builds a fresh line for `invoice`, with nothing allocated yet.
    #[must_use]
    pub fn new(invoice: InvoiceRef, payment_currency: Currency) -> Self {
        let due_amount = invoice.currency.round(invoice.residual);
        Self {
            invoice,
            due_amount,
            payment_currency,
            payment_currency_amount: Decimal::ZERO,
            payment_amount: Decimal::ZERO,
            company_currency_amount: Decimal::ZERO,
            payment_currency_due_amount: Decimal::ZERO,
            payment_currency_date_amount: Decimal::ZERO,
            inline_company_difference: Decimal::ZERO,
            rate: Decimal::ONE,
            use_rate: false,
        }
    }

    fn custom_rate(&self, cx: &ConversionContext<'_, '_>) -> Option<Decimal> {
        if self.use_rate {
            Some(self.rate)
        } else {
            cx.register_rate
        }
    }

    /// Converts between any two currencies in this line's rate context.
    /// Unlike the directional helpers below, no snapping is applied.
    ///
    /// # Errors
    ///
    /// Propagates conversion failures.
    pub fn convert(
        &self,
        cx: &ConversionContext<'_, '_>,
        from: Currency,
        to: Currency,
        amount: Decimal,
    ) -> Result<Decimal, PaymentError> {
        cx.converter
            .convert(amount, from, to, cx.payment_date, self.custom_rate(cx))
    }

    /// Converts an invoice-currency amount (the full due amount when
    /// `None`) into the payment currency at the payment date.
    pub fn invoice_to_payment(
        &self,
        cx: &ConversionContext<'_, '_>,
        amount: Option<Decimal>,
    ) -> Result<Decimal, PaymentError> {
        let amount = amount.unwrap_or(self.due_amount);
        self.convert(cx, self.invoice.currency, self.payment_currency, amount)
    }

    /// Converts a payment-currency amount back into the invoice
    /// currency. When `amount` is exactly the converted due amount the
    /// due amount itself is returned, so a full payment never misses the
    /// residual by a rounding step.
    pub fn payment_to_invoice(
        &self,
        cx: &ConversionContext<'_, '_>,
        amount: Decimal,
    ) -> Result<Decimal, PaymentError> {
        if self.invoice_to_payment(cx, None)? == amount {
            return Ok(self.due_amount);
        }
        self.convert(cx, self.payment_currency, self.invoice.currency, amount)
    }

    /// Converts a payment-currency amount into the company currency.
    ///
    /// When the result lands within half a converted minor unit of the
    /// due amount it snaps to the due amount, absorbing the rounding
    /// noise of a round trip through the payment currency.
    pub fn payment_to_company(
        &self,
        cx: &ConversionContext<'_, '_>,
        amount: Decimal,
    ) -> Result<Decimal, PaymentError> {
        let company = cx.converter.company_currency();
        let converted = self.convert(cx, self.payment_currency, company, amount)?;
        if self.payment_currency == company {
            return Ok(converted);
        }
        let offset = self.convert(
            cx,
            self.payment_currency,
            company,
            company.rounding_unit(),
        )?;
        let two = Decimal::from(2);
        if (converted - self.due_amount).abs() < offset / two {
            return Ok(self.due_amount);
        }
        Ok(converted)
    }

    /// Converts an invoice-currency amount (the full due amount when
    /// `None`) into the company currency.
    pub fn invoice_to_company(
        &self,
        cx: &ConversionContext<'_, '_>,
        amount: Option<Decimal>,
    ) -> Result<Decimal, PaymentError> {
        let amount = amount.unwrap_or(self.due_amount);
        self.convert(
            cx,
            self.invoice.currency,
            cx.converter.company_currency(),
            amount,
        )
    }

    /// Exchange difference in the payment currency: what the due amount
    /// is worth today minus what was allocated.
    #[must_use]
    pub fn inline_payment_difference(&self) -> Decimal {
        self.payment_currency_date_amount - self.payment_currency_amount
    }

    /// Recomputes the company-currency exchange difference from the
    /// current allocation.
    pub fn refresh_company_difference(
        &mut self,
        cx: &ConversionContext<'_, '_>,
    ) -> Result<(), PaymentError> {
        self.inline_company_difference = if self.payment_currency
            == cx.converter.company_currency()
        {
            self.inline_payment_difference()
        } else {
            let date_value = self.invoice_to_company(cx, None)?;
            date_value - self.company_currency_amount
        };
        Ok(())
    }

    /// Recomputes the invoice- and company-currency amounts from the
    /// payment-currency allocation, together with the display rate and
    /// the revalued due amounts.
    pub fn refresh_from_payment_currency_amount(
        &mut self,
        cx: &ConversionContext<'_, '_>,
    ) -> Result<(), PaymentError> {
        self.payment_amount = self.payment_to_invoice(cx, self.payment_currency_amount)?;
        self.company_currency_amount = self.invoice_to_company(cx, Some(self.payment_amount))?;
        self.payment_currency_date_amount = self.invoice_to_payment(cx, None)?;
        if !self.use_rate {
            self.rate = implied_rate(self.payment_currency_amount, self.payment_amount);
        }
        self.refresh_company_difference(cx)
    }
}

/// Display rate between an allocated pair of amounts, normalised so it
/// always reads as "units of the weaker currency per unit of the
/// stronger one" (a raw ratio below one is inverted).
#[must_use]
pub fn implied_rate(payment_currency_amount: Decimal, payment_amount: Decimal) -> Decimal {
    if payment_amount.is_zero() || payment_currency_amount.is_zero() {
        return Decimal::ONE;
    }
    let rate = payment_currency_amount / payment_amount;
    if rate > Decimal::ZERO && rate < Decimal::ONE {
        Decimal::ONE / rate
    } else {
        rate
    }
}
