//! Batch construction: one payment per partner and direction.

use cobro_shared::types::{AccountId, CompanyId, Currency, InvoiceId, LedgerLineId, PartnerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PaymentError;
use crate::register::PaymentRegister;

/// Side of the balance sheet an open line sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Customer receivable.
    Receivable,
    /// Supplier payable.
    Payable,
}

impl AccountType {
    /// Partner role implied by the account side.
    #[must_use]
    pub const fn partner_type(self) -> PartnerType {
        match self {
            Self::Receivable => PartnerType::Customer,
            Self::Payable => PartnerType::Supplier,
        }
    }
}

/// Role of the counterparty on a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerType {
    /// Money owed to us.
    Customer,
    /// Money we owe.
    Supplier,
}

/// Direction of the money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    /// Money coming in.
    Inbound,
    /// Money going out.
    Outbound,
}

/// An unreconciled receivable or payable ledger line of an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLedgerLine {
    /// Ledger line identifier.
    pub id: LedgerLineId,
    /// Invoice the line belongs to.
    pub invoice: InvoiceId,
    /// Receivable or payable account.
    pub account: AccountId,
    /// Side of the balance sheet.
    pub account_type: AccountType,
    /// Counterparty.
    pub partner: PartnerId,
    /// Company owning the ledger.
    pub company: CompanyId,
    /// Currency of the line.
    pub currency: Currency,
    /// Open balance, company currency, signed.
    pub balance: Decimal,
    /// Open amount in the line currency, signed.
    pub amount_currency: Decimal,
    /// True once fully matched against payments.
    pub reconciled: bool,
    /// Line label, when one was entered.
    pub label: Option<String>,
    /// Reference of the journal entry, when one was entered.
    pub entry_ref: Option<String>,
    /// Name of the journal entry.
    pub entry_name: String,
}

impl OpenLedgerLine {
    /// Best available label, for payment memos and journal lines.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.entry_ref.as_deref())
            .unwrap_or(&self.entry_name)
    }
}

/// Key two allocation lines must share to end up in the same payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Counterparty of the batch.
    pub partner: PartnerId,
    /// Role of the counterparty.
    pub partner_type: PartnerType,
    /// Extra discriminator a custom strategy may add, such as a payment
    /// method. The default grouping leaves it empty.
    pub extra: Option<String>,
}

/// Pluggable batching rule.
///
/// The default groups by partner and partner type; an implementation
/// can refine the key to split batches further, never to merge across
/// partners.
pub trait GroupingStrategy {
    /// Batch key for one open line.
    fn key(&self, line: &OpenLedgerLine) -> GroupKey {
        GroupKey {
            partner: line.partner,
            partner_type: line.account_type.partner_type(),
            extra: None,
        }
    }
}

/// The stock partner-and-direction grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGrouping;

impl GroupingStrategy for DefaultGrouping {}

/// One allocation line paired with the open ledger line it settles.
#[derive(Debug, Clone)]
pub struct BatchMember {
    /// Index into the register's allocation lines.
    pub line_index: usize,
    /// Open receivable or payable line being settled.
    pub open_line: OpenLedgerLine,
}

/// One future payment: a group of allocation lines sharing a key.
#[derive(Debug, Clone)]
pub struct PaymentBatch {
    /// Grouping key of the batch.
    pub key: GroupKey,
    /// Direction of the money flow.
    pub payment_type: PaymentType,
    /// Receivable or payable account the payment will settle.
    pub destination_account: AccountId,
    /// Memo assembled from the member entries.
    pub communication: String,
    /// Total allocated to the batch, payment currency, absolute.
    pub source_amount_currency: Decimal,
    /// Total allocated to the batch, company currency, absolute.
    pub source_company_amount: Decimal,
    /// Members in register order.
    pub members: Vec<BatchMember>,
}

/// Groups the register's lines into the payments that posting would
/// create, without building journal lines. Every line with an open
/// counterpart is included, allocated or not.
///
/// # Errors
///
/// `MultiCompanySelection` when an open line belongs to another
/// company, `NoEligibleInvoices` when nothing groupable remains.
pub fn preview_batches<F>(
    register: &PaymentRegister,
    open_lines: F,
    strategy: &dyn GroupingStrategy,
) -> Result<Vec<PaymentBatch>, PaymentError>
where
    F: Fn(InvoiceId) -> Vec<OpenLedgerLine>,
{
    collect_batches(register, &open_lines, strategy, false)
}

/// Groups only the lines that actually carry money, the set posting
/// will turn into payments.
///
/// # Errors
///
/// Same conditions as [`preview_batches`].
pub fn allocated_batches<F>(
    register: &PaymentRegister,
    open_lines: F,
    strategy: &dyn GroupingStrategy,
) -> Result<Vec<PaymentBatch>, PaymentError>
where
    F: Fn(InvoiceId) -> Vec<OpenLedgerLine>,
{
    collect_batches(register, &open_lines, strategy, true)
}

fn collect_batches<F>(
    register: &PaymentRegister,
    open_lines: &F,
    strategy: &dyn GroupingStrategy,
    only_allocated: bool,
) -> Result<Vec<PaymentBatch>, PaymentError>
where
    F: Fn(InvoiceId) -> Vec<OpenLedgerLine>,
{
    // Vec keyed by GroupKey to keep batches in first-seen order.
    let mut groups: Vec<(GroupKey, Vec<BatchMember>)> = Vec::new();
    for (line_index, line) in register.lines.iter().enumerate() {
        if only_allocated && line.payment_currency_amount <= Decimal::ZERO {
            continue;
        }
        let Some(open_line) = open_lines(line.invoice.id)
            .into_iter()
            .find(|l| !l.reconciled)
        else {
            continue;
        };
        if open_line.company != register.company {
            return Err(PaymentError::MultiCompanySelection);
        }
        let key = strategy.key(&open_line);
        let member = BatchMember {
            line_index,
            open_line,
        };
        if let Some(pos) = groups.iter().position(|(k, _)| *k == key) {
            groups[pos].1.push(member);
        } else {
            groups.push((key, vec![member]));
        }
    }
    if groups.is_empty() {
        return Err(PaymentError::NoEligibleInvoices);
    }

    let batches = groups
        .into_iter()
        .map(|(key, members)| finish_batch(register, key, members))
        .collect::<Vec<_>>();
    debug!(batches = batches.len(), "grouped allocation lines");
    Ok(batches)
}

fn finish_batch(
    register: &PaymentRegister,
    key: GroupKey,
    members: Vec<BatchMember>,
) -> PaymentBatch {
    let balance: Decimal = members.iter().map(|m| m.open_line.balance).sum();
    let payment_type = if balance > Decimal::ZERO {
        PaymentType::Inbound
    } else {
        PaymentType::Outbound
    };
    let source_amount_currency: Decimal = members
        .iter()
        .map(|m| register.lines[m.line_index].payment_currency_amount)
        .sum();
    let source_company_amount: Decimal = members
        .iter()
        .map(|m| register.lines[m.line_index].company_currency_amount)
        .sum();
    let communication = register.reference().map_or_else(
        || {
            let mut labels: Vec<&str> =
                members.iter().map(|m| m.open_line.display_label()).collect();
            labels.sort_unstable();
            labels.dedup();
            labels.join(" ")
        },
        ToOwned::to_owned,
    );
    PaymentBatch {
        key,
        payment_type,
        destination_account: members[0].open_line.account,
        communication,
        source_amount_currency: source_amount_currency.abs(),
        source_company_amount: source_company_amount.abs(),
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{CurrencyConverter, RateTable};
    use crate::register::{InvoiceRef, JournalRef};
    use chrono::NaiveDate;
    use cobro_shared::types::JournalId;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    struct Fixture {
        register: PaymentRegister,
        open: HashMap<InvoiceId, Vec<OpenLedgerLine>>,
    }

    fn fixture(partners: &[(PartnerId, Decimal)]) -> Fixture {
        let company = CompanyId::new();
        let account = AccountId::new();
        let mut open: HashMap<InvoiceId, Vec<OpenLedgerLine>> = HashMap::new();
        let mut invoices = Vec::new();
        for (day, (partner, residual)) in (5_u32..).zip(partners.iter()) {
            let invoice = InvoiceRef {
                id: InvoiceId::new(),
                partner: *partner,
                company,
                currency: Currency::Mxn,
                date: date(1),
                date_due: date(day),
                residual: *residual,
                open_balance: *residual,
                open_amount_currency: *residual,
            };
            open.insert(
                invoice.id,
                vec![OpenLedgerLine {
                    id: LedgerLineId::new(),
                    invoice: invoice.id,
                    account,
                    account_type: AccountType::Receivable,
                    partner: *partner,
                    company,
                    currency: Currency::Mxn,
                    balance: *residual,
                    amount_currency: *residual,
                    reconciled: false,
                    label: Some(format!("INV/{day}")),
                    entry_ref: None,
                    entry_name: format!("MOVE/{day}"),
                }],
            );
            invoices.push(invoice);
        }
        let journal = JournalRef {
            id: JournalId::new(),
            liquidity_account: AccountId::new(),
            currency: None,
        };
        let register =
            PaymentRegister::new(date(20), Currency::Mxn, journal, invoices).unwrap();
        Fixture { register, open }
    }

    #[test]
    fn one_batch_per_partner() {
        let alice = PartnerId::new();
        let bob = PartnerId::new();
        let mut fx = fixture(&[(alice, dec!(100)), (bob, dec!(50)), (alice, dec!(25))]);
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();

        let open = fx.open;
        let batches = preview_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap();

        assert_eq!(batches.len(), 2);
        let first = &batches[0];
        assert_eq!(first.key.partner, alice);
        assert_eq!(first.members.len(), 2);
        assert_eq!(first.payment_type, PaymentType::Inbound);
        assert_eq!(first.source_amount_currency, dec!(125));
        assert_eq!(batches[1].key.partner, bob);
    }

    #[test]
    fn allocated_batches_skip_empty_lines() {
        let alice = PartnerId::new();
        let bob = PartnerId::new();
        let mut fx = fixture(&[(alice, dec!(100)), (bob, dec!(50))]);
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();
        // Only the oldest invoice gets money.
        fx.register.set_amount(dec!(60), &converter).unwrap();

        let open = fx.open;
        let batches = allocated_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].key.partner, alice);
        assert_eq!(batches[0].source_amount_currency, dec!(60));
    }

    #[test]
    fn communication_joins_sorted_unique_labels() {
        let alice = PartnerId::new();
        let mut fx = fixture(&[(alice, dec!(100)), (alice, dec!(25))]);
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();

        let open = fx.open;
        let batches = preview_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap();
        assert_eq!(batches[0].communication, "INV/5 INV/6");
    }

    #[test]
    fn explicit_communication_wins() {
        let alice = PartnerId::new();
        let mut fx = fixture(&[(alice, dec!(100))]);
        fx.register.communication = Some("PAY-2024-07".to_owned());
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();

        let open = fx.open;
        let batches = preview_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap();
        assert_eq!(batches[0].communication, "PAY-2024-07");
    }

    #[test]
    fn foreign_company_open_line_is_rejected() {
        let alice = PartnerId::new();
        let mut fx = fixture(&[(alice, dec!(100))]);
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();

        for lines in fx.open.values_mut() {
            for line in lines {
                line.company = CompanyId::new();
            }
        }
        let open = fx.open;
        let err = preview_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap_err();
        assert!(matches!(err, PaymentError::MultiCompanySelection));
    }

    #[test]
    fn payables_flow_outbound() {
        let supplier = PartnerId::new();
        let mut fx = fixture(&[(supplier, dec!(100))]);
        for lines in fx.open.values_mut() {
            for line in lines {
                line.account_type = AccountType::Payable;
                line.balance = -line.balance;
                line.amount_currency = -line.amount_currency;
            }
        }
        let table = RateTable::default();
        let converter = CurrencyConverter::new(Currency::Mxn, &table);
        fx.register.refresh_for_payment_context(&converter).unwrap();

        let open = fx.open;
        let batches = preview_batches(
            &fx.register,
            |id| open.get(&id).cloned().unwrap_or_default(),
            &DefaultGrouping,
        )
        .unwrap();
        assert_eq!(batches[0].payment_type, PaymentType::Outbound);
        assert_eq!(batches[0].key.partner_type, PartnerType::Supplier);
        assert_eq!(batches[0].source_amount_currency, dec!(100));
    }
}
