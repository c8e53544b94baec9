//! Exchange rate types and the market-rate lookup seam.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cobro_shared::Currency;

/// Exchange rate between two currencies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency.
    pub from_currency: Currency,
    /// Target currency.
    pub to_currency: Currency,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
    /// Date this rate is effective.
    pub effective_date: NaiveDate,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub const fn new(
        from_currency: Currency,
        to_currency: Currency,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
            effective_date,
        }
    }

    /// Returns the inverse rate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from_currency: self.to_currency,
            to_currency: self.from_currency,
            rate: Decimal::ONE / self.rate,
            effective_date: self.effective_date,
        }
    }
}

/// Market-rate lookup by date.
///
/// This is the boundary with the host accounting subsystem's currency
/// service: implementations answer "what was the rate from `from` to `to`
/// on `date`", or `None` when no rate is known.
pub trait RateProvider {
    /// Returns the market rate effective on `date`, if any.
    fn rate(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Decimal>;
}

/// In-memory dated rate table.
///
/// Resolution picks the latest rate effective on or before the requested
/// date for the exact pair, falling back to the reciprocal of the inverted
/// pair.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: Vec<ExchangeRate>,
}

impl RateTable {
    /// Creates an empty rate table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dated rate to the table.
    pub fn insert(&mut self, rate: ExchangeRate) {
        self.rates.push(rate);
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with_rate(
        mut self,
        from: Currency,
        to: Currency,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        self.insert(ExchangeRate::new(from, to, rate, effective_date));
        self
    }

    fn lookup(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Decimal> {
        self.rates
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to && r.effective_date <= date)
            .max_by_key(|r| r.effective_date)
            .map(|r| r.rate)
    }
}

impl RateProvider for RateTable {
    fn rate(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.lookup(from, to, date)
            .or_else(|| self.lookup(to, from, date).map(|r| Decimal::ONE / r))
    }
}
