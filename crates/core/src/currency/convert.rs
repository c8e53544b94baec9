//! Currency conversion honoring optional custom fixed rates.
//!
//! A custom rate bridges exactly two currencies, one of which must be the
//! company currency; it is expressed as company-currency units per unit of
//! the other currency. Results are always rounded to the target currency's
//! precision with Banker's Rounding.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use cobro_shared::Currency;

use super::exchange::RateProvider;
use crate::error::PaymentError;

/// Converts amounts between currencies at a given date.
pub struct CurrencyConverter<'a> {
    company_currency: Currency,
    provider: &'a dyn RateProvider,
}

impl<'a> CurrencyConverter<'a> {
    /// Creates a converter for a company and a market-rate provider.
    #[must_use]
    pub const fn new(company_currency: Currency, provider: &'a dyn RateProvider) -> Self {
        Self {
            company_currency,
            provider,
        }
    }

    /// The company (home/reporting) currency.
    #[must_use]
    pub const fn company_currency(&self) -> Currency {
        self.company_currency
    }

    /// Convert `amount` from `from` to `to` at `date`.
    ///
    /// With a custom rate:
    /// - `from == to`: identity, the custom rate never applies.
    /// - `from` is the company currency: divide by the rate.
    /// - `to` is the company currency: multiply by the rate.
    /// - three distinct currencies: rejected, a single rate cannot bridge
    ///   two foreign currencies at once.
    ///
    /// Without a custom rate the market rate at `date` is used.
    ///
    /// # Errors
    ///
    /// `ThreeCurrencyCustomRate` for the unsupported custom-rate setup,
    /// `NoExchangeRate` when the market lookup comes up empty.
    pub fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
        date: NaiveDate,
        custom_rate: Option<Decimal>,
    ) -> Result<Decimal, PaymentError> {
        if from == to {
            return Ok(amount);
        }

        let Some(rate) = custom_rate.filter(|r| !r.is_zero()) else {
            return self.market_convert(amount, from, to, date);
        };

        // Both from and to differ from each other; if neither is the
        // company currency there are three distinct currencies in play.
        if from != self.company_currency && to != self.company_currency {
            return Err(PaymentError::ThreeCurrencyCustomRate);
        }

        let converted = if from == self.company_currency {
            // rate company-currency units per to-currency unit
            amount / rate
        } else {
            // rate company-currency units per from-currency unit
            amount * rate
        };
        Ok(to.round(converted))
    }

    fn market_convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
        date: NaiveDate,
    ) -> Result<Decimal, PaymentError> {
        let rate = self
            .provider
            .rate(from, to, date)
            .ok_or(PaymentError::NoExchangeRate { from, to, date })?;
        Ok(to.round(amount * rate))
    }
}
