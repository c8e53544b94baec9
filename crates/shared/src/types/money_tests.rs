//! Tests for money and currency types.

use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use super::money::{Currency, Money};

#[rstest]
#[case(Currency::Mxn, 2)]
#[case(Currency::Usd, 2)]
#[case(Currency::Eur, 2)]
#[case(Currency::Cad, 2)]
#[case(Currency::Jpy, 0)]
fn test_decimal_places(#[case] currency: Currency, #[case] places: u32) {
    assert_eq!(currency.decimal_places(), places);
}

#[test]
fn test_rounding_unit() {
    assert_eq!(Currency::Mxn.rounding_unit(), dec!(0.01));
    assert_eq!(Currency::Jpy.rounding_unit(), dec!(1));
}

#[test]
fn test_round_bankers() {
    // Banker's rounding: midpoint goes to the even neighbour
    assert_eq!(Currency::Mxn.round(dec!(2.125)), dec!(2.12));
    assert_eq!(Currency::Mxn.round(dec!(2.135)), dec!(2.14));
    assert_eq!(Currency::Jpy.round(dec!(2.5)), dec!(2));
    assert_eq!(Currency::Jpy.round(dec!(3.5)), dec!(4));
}

#[test]
fn test_is_zero_after_rounding() {
    assert!(Currency::Mxn.is_zero(dec!(0.004)));
    assert!(Currency::Mxn.is_zero(dec!(-0.004)));
    assert!(!Currency::Mxn.is_zero(dec!(0.01)));
}

#[test]
fn test_currency_roundtrip() {
    for code in ["MXN", "USD", "EUR", "CAD", "JPY"] {
        let currency = Currency::from_str(code).unwrap();
        assert_eq!(currency.to_string(), code);
    }
    assert!(Currency::from_str("XXX").is_err());
    assert!(Currency::from_str("").is_err());
}

#[test]
fn test_money_zero() {
    let money = Money::zero(Currency::Mxn);
    assert!(money.is_zero());
    assert_eq!(money.amount, Decimal::ZERO);
    assert_eq!(money.currency, Currency::Mxn);
}

#[test]
fn test_money_is_negative() {
    assert!(Money::new(dec!(-10), Currency::Usd).is_negative());
    assert!(!Money::new(dec!(10), Currency::Usd).is_negative());
    assert!(!Money::new(dec!(0), Currency::Usd).is_negative());
}

#[test]
fn test_money_rounded() {
    let money = Money::new(dec!(10.005), Currency::Mxn).rounded();
    assert_eq!(money.amount, dec!(10.00));
}
