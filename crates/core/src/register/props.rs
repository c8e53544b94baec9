//! Property-based tests for the amount redistribution.

use chrono::NaiveDate;
use cobro_shared::types::{AccountId, CompanyId, Currency, InvoiceId, JournalId, PartnerId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::currency::{CurrencyConverter, RateTable};
use crate::register::invoice::InvoiceRef;
use crate::register::session::{JournalRef, PaymentRegister};

fn cents(raw: i64) -> Decimal {
    Decimal::new(raw, 2)
}

fn register_for(residual_cents: &[i64]) -> PaymentRegister {
    let company = CompanyId::new();
    let base = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let invoices = residual_cents
        .iter()
        .zip(0_u64..)
        .map(|(&raw, offset)| InvoiceRef {
            id: InvoiceId::new(),
            partner: PartnerId::new(),
            company,
            currency: Currency::Mxn,
            date: base,
            date_due: base + chrono::Days::new(offset),
            residual: cents(raw),
            open_balance: cents(raw),
            open_amount_currency: cents(raw),
        })
        .collect();
    let journal = JournalRef {
        id: JournalId::new(),
        liquidity_account: AccountId::new(),
        currency: None,
    };
    PaymentRegister::new(
        base + chrono::Days::new(30),
        Currency::Mxn,
        journal,
        invoices,
    )
    .unwrap()
}

proptest! {
    /// Redistribution never loses money: the allocations sum to the
    /// entered amount, capped at the total open amount.
    #[test]
    fn redistribution_conserves_the_amount(
        residuals in prop::collection::vec(1_i64..=500_000, 1..8),
        amount_cents in 0_i64..=4_000_000,
    ) {
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        let mut register = register_for(&residuals);
        register.refresh_for_payment_context(&converter).unwrap();

        let amount = cents(amount_cents);
        register.set_amount(amount, &converter).unwrap();

        let allocated: Decimal = register
            .lines
            .iter()
            .map(|l| l.payment_currency_amount)
            .sum();
        let total_due: Decimal = residuals.iter().map(|&r| cents(r)).sum();
        prop_assert_eq!(allocated, amount.min(total_due));
    }

    /// A line only receives money once every earlier-due line is full.
    #[test]
    fn redistribution_fills_oldest_debt_first(
        residuals in prop::collection::vec(1_i64..=500_000, 2..8),
        amount_cents in 0_i64..=4_000_000,
    ) {
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        let mut register = register_for(&residuals);
        register.refresh_for_payment_context(&converter).unwrap();
        register.set_amount(cents(amount_cents), &converter).unwrap();

        let mut earlier_all_full = true;
        for line in &register.lines {
            if !line.payment_currency_amount.is_zero() {
                prop_assert!(earlier_all_full);
            }
            earlier_all_full &= line.payment_currency_amount == line.due_amount;
        }
    }

    /// No line is ever allocated more than its open amount.
    #[test]
    fn redistribution_never_overfills_a_line(
        residuals in prop::collection::vec(1_i64..=500_000, 1..8),
        amount_cents in 0_i64..=4_000_000,
    ) {
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        let mut register = register_for(&residuals);
        register.refresh_for_payment_context(&converter).unwrap();
        register.set_amount(cents(amount_cents), &converter).unwrap();

        for line in &register.lines {
            prop_assert!(line.payment_currency_amount <= line.due_amount);
        }
    }
}
