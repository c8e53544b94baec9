//! Multi-currency conversion with custom fixed rates.

pub mod convert;
pub mod exchange;

#[cfg(test)]
mod props;

pub use convert::CurrencyConverter;
pub use exchange::{ExchangeRate, RateProvider, RateTable};
