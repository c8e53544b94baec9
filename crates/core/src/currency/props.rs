//! Property-based tests for currency conversion.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use cobro_shared::Currency;

use super::convert::CurrencyConverter;
use super::exchange::RateTable;

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Round-tripping through the market rate lands within one minor unit
    /// of the original amount when no custom rate is used.
    #[test]
    fn prop_conversion_roundtrip_within_one_minor_unit(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let table = RateTable::new().with_rate(
            Currency::Usd,
            Currency::Mxn,
            rate,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let converter = CurrencyConverter::new(Currency::Mxn, &table);

        let there = converter
            .convert(amount, Currency::Usd, Currency::Mxn, date(), None)
            .unwrap();
        let back = converter
            .convert(there, Currency::Mxn, Currency::Usd, date(), None)
            .unwrap();

        // Tolerance scales with the rate: one MXN minor unit converts back
        // into up to 0.01/rate USD, plus the USD rounding step itself.
        let tolerance = Currency::Usd.rounding_unit()
            + Currency::Mxn.rounding_unit() / rate;
        prop_assert!(
            (back - amount).abs() <= tolerance,
            "round trip drifted: {amount} -> {there} -> {back}"
        );
    }

    /// Same-currency conversion is the identity for any custom rate.
    #[test]
    fn prop_same_currency_identity(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let table = RateTable::new();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        let result = converter
            .convert(amount, Currency::Usd, Currency::Usd, date(), Some(rate))
            .unwrap();
        prop_assert_eq!(result, amount);
    }

    /// Custom-rate conversion to the company currency and back is stable
    /// within one minor unit of each currency.
    #[test]
    fn prop_custom_rate_roundtrip(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let table = RateTable::new();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);

        let company = converter
            .convert(amount, Currency::Usd, Currency::Mxn, date(), Some(rate))
            .unwrap();
        let back = converter
            .convert(company, Currency::Mxn, Currency::Usd, date(), Some(rate))
            .unwrap();

        let tolerance = Currency::Usd.rounding_unit()
            + Currency::Mxn.rounding_unit() / rate;
        prop_assert!(
            (back - amount).abs() <= tolerance,
            "custom rate round trip drifted: {amount} -> {company} -> {back}"
        );
    }
}
