//! Translation of a batch into balanced debit/credit line specs.

use cobro_shared::types::{AccountId, Currency, InvoiceId, LedgerLineId, PartnerId};
use rust_decimal::Decimal;

use crate::batch::{
    allocated_batches, BatchMember, GroupingStrategy, OpenLedgerLine, PaymentBatch,
};
use crate::currency::CurrencyConverter;
use crate::edi::PaymentSplitData;
use crate::error::PaymentError;
use crate::register::{
    AllocationLine, ConversionContext, DifferenceHandling, DifferenceSummary, PaymentRegister,
};

/// One journal line to be created when a payment posts.
///
/// `currency` and `amount_currency` are only present when the line is
/// valued in a currency other than the company's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    /// Open ledger line this one settles, absent on non-reconciling lines.
    pub reconcile_with: Option<LedgerLineId>,
    /// Invoice behind `reconcile_with`, for deferred reconciliation.
    pub invoice: Option<InvoiceId>,
    /// Line label.
    pub name: String,
    /// Counterparty.
    pub partner: PartnerId,
    /// Account the line posts to.
    pub account: AccountId,
    /// Foreign currency of the line, when any.
    pub currency: Option<Currency>,
    /// Amount in `currency`, signed like the balance.
    pub amount_currency: Option<Decimal>,
    /// Debit side, company currency.
    pub debit: Decimal,
    /// Credit side, company currency.
    pub credit: Decimal,
}

impl LineSpec {
    /// Signed balance of the line, company currency.
    #[must_use]
    pub fn signed(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Builds the journal lines one batch turns into: a settlement line per
/// member, difference lines where the register carries any, and the
/// liquidity counterpart that balances the entry.
pub struct JournalLineBuilder<'a, 'p> {
    register: &'a PaymentRegister,
    converter: &'a CurrencyConverter<'p>,
    summary: &'a DifferenceSummary,
}

impl<'a, 'p> JournalLineBuilder<'a, 'p> {
    /// Builder over one register and its measured differences.
    #[must_use]
    pub const fn new(
        register: &'a PaymentRegister,
        converter: &'a CurrencyConverter<'p>,
        summary: &'a DifferenceSummary,
    ) -> Self {
        Self {
            register,
            converter,
            summary,
        }
    }

    fn context(&self) -> ConversionContext<'a, 'p> {
        ConversionContext {
            converter: self.converter,
            payment_date: self.register.payment_date,
            register_rate: self.register.custom_rate,
        }
    }

    /// All lines of the batch's journal entry, liquidity line last.
    /// The entry balances exactly: the liquidity line takes whatever
    /// the other lines leave open.
    ///
    /// # Errors
    ///
    /// `MissingWriteoffAccount` when a write-off is needed without an
    /// account; conversion failures propagate.
    pub fn batch_lines(&self, batch: &PaymentBatch) -> Result<Vec<LineSpec>, PaymentError> {
        let mut specs = Vec::with_capacity(batch.members.len() + 2);
        for member in &batch.members {
            specs.push(self.settlement_spec(member)?);
        }
        // Differences ride once, on the payment of the first allocated
        // line.
        let host_index = self.register.difference_host_index();
        if let Some(host) = batch
            .members
            .iter()
            .find(|m| Some(m.line_index) == host_index)
        {
            specs.extend(self.difference_specs(host)?);
        }
        specs.push(self.liquidity_spec(batch, &specs));
        Ok(specs)
    }

    /// The line settling one open receivable or payable.
    fn settlement_spec(&self, member: &BatchMember) -> Result<LineSpec, PaymentError> {
        let line = &self.register.lines[member.line_index];
        let sign = balance_sign(member.open_line.balance);

        let mut amount = line.company_currency_amount;
        let mut amount_currency = line.payment_currency_amount;
        if self.absorbs_inline_difference(line) {
            amount += line.inline_company_difference;
            amount_currency += line.inline_payment_difference();
        }

        let mut spec = self.line_spec(line, sign, amount, amount_currency)?;
        spec.reconcile_with = Some(member.open_line.id);
        spec.invoice = Some(line.invoice.id);
        spec.name = member.open_line.display_label().to_owned();
        spec.partner = member.open_line.partner;
        spec.account = member.open_line.account;
        if self.converter.company_currency() == line.invoice.currency {
            spec.currency = None;
            spec.amount_currency = None;
        }
        Ok(spec)
    }

    // A line's revaluation gap is folded into its settlement when the
    // register reconciles differences, or when leaving it open would
    // overstate the invoice (a negative gap).
    fn absorbs_inline_difference(&self, line: &AllocationLine) -> bool {
        match self.register.handling {
            DifferenceHandling::Reconcile => true,
            DifferenceHandling::Open => line.inline_company_difference < Decimal::ZERO,
        }
    }

    /// The write-off and exchange-difference lines, hosted by the
    /// payment that carries the register's first allocated line.
    fn difference_specs(&self, host: &BatchMember) -> Result<Vec<LineSpec>, PaymentError> {
        if !self.summary.has_difference {
            return Ok(Vec::new());
        }
        let currency = self.register.currency;
        let reconcile = self.register.handling == DifferenceHandling::Reconcile;
        let line = &self.register.lines[host.line_index];
        let sign = balance_sign(host.open_line.balance);

        let entries = [
            (
                "[Global] ",
                true,
                self.summary.payment_difference,
                self.summary.company_difference,
                sign,
            ),
            (
                "[Excess] ",
                true,
                self.summary.excess_payment_difference,
                self.summary.excess_company_difference,
                sign,
            ),
            (
                "[Defect] ",
                reconcile,
                self.summary.defect_payment_difference,
                self.summary.defect_company_difference,
                -sign,
            ),
        ];

        let mut specs = Vec::new();
        for (label, enabled, payment_amount, company_amount, entry_sign) in entries {
            if !enabled
                || (currency.is_zero(payment_amount) && currency.is_zero(company_amount))
            {
                continue;
            }
            let mut spec = self.line_spec(line, entry_sign, company_amount, payment_amount)?;
            spec.name = format!("{label}{}", self.register.writeoff_label);
            spec.partner = host.open_line.partner;
            spec.account = if reconcile {
                self.register
                    .writeoff_account
                    .ok_or(PaymentError::MissingWriteoffAccount)?
            } else {
                host.open_line.account
            };
            if self.converter.company_currency() == currency {
                spec.currency = None;
                spec.amount_currency = None;
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    /// The bank/cash counterpart, sized so the entry balances exactly.
    fn liquidity_spec(&self, batch: &PaymentBatch, others: &[LineSpec]) -> LineSpec {
        let open: Decimal = others.iter().map(LineSpec::signed).sum();
        let (debit, credit, sign) = if open < Decimal::ZERO {
            (-open, Decimal::ZERO, Decimal::ONE)
        } else {
            (Decimal::ZERO, open, Decimal::NEGATIVE_ONE)
        };
        let payment_currency = self.register.currency;
        let (currency, amount_currency) = if payment_currency
            == self.converter.company_currency()
        {
            (None, None)
        } else {
            (
                Some(payment_currency),
                Some(sign * batch.source_amount_currency),
            )
        };
        LineSpec {
            reconcile_with: None,
            invoice: None,
            name: batch.communication.clone(),
            partner: batch.key.partner,
            account: self.register.journal.liquidity_account,
            currency,
            amount_currency,
            debit,
            credit,
        }
    }

    // Common shape of a valued line. The caller overrides label,
    // partner, account and the reconciliation target.
    fn line_spec(
        &self,
        line: &AllocationLine,
        sign: Decimal,
        amount: Decimal,
        amount_currency: Decimal,
    ) -> Result<LineSpec, PaymentError> {
        let cx = self.context();
        let payment_currency = self.register.currency;
        let company = self.converter.company_currency();
        let invoice_currency = line.invoice.currency;

        let mut currency = payment_currency;
        let mut foreign = sign * amount_currency;
        let three_way = invoice_currency != payment_currency
            && invoice_currency != company
            && payment_currency != company;
        if three_way || company == payment_currency {
            // The payment currency cannot value this line; fall back to
            // the invoice currency.
            currency = invoice_currency;
            foreign = sign * line.payment_amount;
            if self.register.handling == DifferenceHandling::Reconcile
                || line.inline_payment_difference() < Decimal::ZERO
            {
                foreign += sign * line.payment_to_invoice(&cx, line.inline_payment_difference())?;
            }
        }

        Ok(LineSpec {
            reconcile_with: None,
            invoice: None,
            name: String::new(),
            partner: line.invoice.partner,
            account: self.register.journal.liquidity_account,
            currency: Some(currency),
            amount_currency: Some(foreign),
            debit: if sign > Decimal::ZERO {
                amount
            } else {
                Decimal::ZERO
            },
            credit: if sign < Decimal::ZERO {
                amount
            } else {
                Decimal::ZERO
            },
        })
    }
}

/// A batch together with everything posting needs: its journal lines
/// and the frozen per-invoice breakdown.
#[derive(Debug, Clone)]
pub struct MaterializedBatch {
    /// The grouped batch, source amounts lifted when it absorbs a
    /// write-off.
    pub batch: PaymentBatch,
    /// Journal lines of the batch's entry, liquidity line last.
    pub specs: Vec<LineSpec>,
    /// Breakdown to persist on the payment.
    pub split_data: PaymentSplitData,
}

/// Groups the register's allocated lines and builds each batch out in
/// full.
///
/// When the register carries a global difference, the single batch's
/// source amounts are lifted to the full entered amount; several
/// batches plus a write-off is refused.
///
/// # Errors
///
/// `MultiBatchWriteOff`, plus everything grouping and line building
/// can report.
pub fn materialize_batches<F>(
    register: &PaymentRegister,
    converter: &CurrencyConverter<'_>,
    open_lines: F,
    strategy: &dyn GroupingStrategy,
) -> Result<Vec<MaterializedBatch>, PaymentError>
where
    F: Fn(InvoiceId) -> Vec<OpenLedgerLine>,
{
    let summary = DifferenceSummary::compute(register, converter)?;
    let mut batches = allocated_batches(register, open_lines, strategy)?;
    if !register.currency.is_zero(summary.payment_difference) {
        if batches.len() > 1 {
            return Err(PaymentError::MultiBatchWriteOff);
        }
        // The single payment carries the full entered amount, the
        // write-off included.
        let batch = &mut batches[0];
        batch.source_amount_currency = register.amount;
        batch.source_company_amount = summary.company_currency_amount;
    }

    let builder = JournalLineBuilder::new(register, converter, &summary);
    batches
        .into_iter()
        .map(|batch| {
            let specs = builder.batch_lines(&batch)?;
            let split_data = PaymentSplitData::for_batch(
                register,
                &batch,
                &summary,
                converter.company_currency(),
            );
            Ok(MaterializedBatch {
                batch,
                specs,
                split_data,
            })
        })
        .collect()
}

fn balance_sign(balance: Decimal) -> Decimal {
    if balance > Decimal::ZERO {
        Decimal::NEGATIVE_ONE
    } else {
        Decimal::ONE
    }
}
