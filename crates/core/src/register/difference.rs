//! Classification of payment differences before posting.

use rust_decimal::Decimal;
use tracing::debug;

use crate::currency::CurrencyConverter;
use crate::error::PaymentError;

use super::session::PaymentRegister;

/// The three payment differences, each in the payment currency and the
/// company currency.
///
/// * Global: the entered amount exceeds everything allocated to lines.
/// * Excess: lines revalued at the payment date are worth less than
///   what was allocated to them.
/// * Defect: lines revalued at the payment date are worth more than
///   what was allocated to them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DifferenceSummary {
    /// Unallocated remainder of the entered amount, payment currency.
    pub payment_difference: Decimal,
    /// Same remainder expressed in the company currency.
    pub company_difference: Decimal,
    /// Excess over the revalued dues, payment currency, absolute.
    pub excess_payment_difference: Decimal,
    /// Excess over the revalued dues, company currency, absolute.
    pub excess_company_difference: Decimal,
    /// Shortfall against the revalued dues, payment currency, absolute.
    pub defect_payment_difference: Decimal,
    /// Shortfall against the revalued dues, company currency, absolute.
    pub defect_company_difference: Decimal,
    /// Total of the payment in the company currency, including the
    /// global remainder.
    pub company_currency_amount: Decimal,
    /// True when any of the three differences is non-zero.
    pub has_difference: bool,
}

impl DifferenceSummary {
    /// Measures the differences on `register` as it currently stands.
    ///
    /// The global remainder only exists when positive; an entered
    /// amount below the allocations is a per-line matter, not a global
    /// one. Its company value is converted through the first line's
    /// rate context, at face value with no snapping.
    ///
    /// # Errors
    ///
    /// Propagates conversion failures.
    pub fn compute(
        register: &PaymentRegister,
        converter: &CurrencyConverter<'_>,
    ) -> Result<Self, PaymentError> {
        let currency = register.currency;
        let allocated: Decimal = register
            .lines
            .iter()
            .map(|l| l.payment_currency_amount)
            .sum();
        let remainder = register.amount - currency.round(allocated);
        let mut company_total = register.company_currency_total();

        let mut summary = Self::default();
        if currency.round(remainder) > Decimal::ZERO {
            let Some(first) = register.lines.first() else {
                return Err(PaymentError::NoEligibleInvoices);
            };
            let cx = crate::register::line::ConversionContext {
                converter,
                payment_date: register.payment_date,
                register_rate: register.custom_rate,
            };
            summary.payment_difference = remainder;
            summary.company_difference = first.convert(
                &cx,
                register.currency,
                converter.company_currency(),
                remainder,
            )?;
            company_total += summary.company_difference;
            summary.has_difference = true;
        }
        summary.company_currency_amount = company_total;

        // Lines split strictly on the sign of the company-side gap; a
        // line whose company gap is exactly zero carries no difference,
        // whatever its payment-side gap reads.
        let mut excess_payment = Decimal::ZERO;
        let mut excess_company = Decimal::ZERO;
        let mut defect_payment = Decimal::ZERO;
        let mut defect_company = Decimal::ZERO;
        for line in &register.lines {
            let company_diff = line.inline_company_difference;
            if company_diff < Decimal::ZERO {
                excess_payment += line.inline_payment_difference();
                excess_company += company_diff;
                summary.has_difference = true;
            } else if company_diff > Decimal::ZERO {
                defect_payment += line.inline_payment_difference();
                defect_company += company_diff;
                summary.has_difference = true;
            }
        }
        summary.excess_payment_difference = excess_payment.abs();
        summary.excess_company_difference = excess_company.abs();
        summary.defect_payment_difference = defect_payment.abs();
        summary.defect_company_difference = defect_company.abs();

        if summary.has_difference {
            debug!(
                global = %summary.payment_difference,
                excess = %summary.excess_payment_difference,
                defect = %summary.defect_payment_difference,
                "payment differences detected"
            );
        }
        Ok(summary)
    }
}
