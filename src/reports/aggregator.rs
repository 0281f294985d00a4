use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::arrears::AgingBucket;
use crate::decimal::Money;
use crate::types::{PaymentFrequency, ProductId};

use super::{
    AgingRow, ArrearsRow, CollectionsRow, PortfolioSummary, ProductRow, ReportFilter, ReportInput,
    ReportKind, ReportRows, RevenueRow, WriteOffRow,
};

/// Folds per-loan inputs into report rows.
///
/// Stateless and read-only. A loan id that appears more than once is
/// counted on its first occurrence only, and every row set comes back in a
/// fixed order so the same input always renders the same report.
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn aggregate(inputs: &[ReportInput], kind: ReportKind, filter: &ReportFilter) -> ReportRows {
        let selected = Self::select(inputs, filter);
        debug!(?kind, loans = selected.len(), "aggregating report");

        match kind {
            ReportKind::Portfolio => ReportRows::Portfolio(Self::portfolio(&selected)),
            ReportKind::Aging => ReportRows::Aging(Self::aging(&selected)),
            ReportKind::Arrears => ReportRows::Arrears(Self::arrears(&selected)),
            ReportKind::WriteOffs => ReportRows::WriteOffs(Self::write_offs(&selected)),
            ReportKind::Collections => ReportRows::Collections(Self::collections(&selected, filter)),
            ReportKind::Products => ReportRows::Products(Self::products(&selected)),
            ReportKind::Revenue => ReportRows::Revenue(Self::revenue(&selected, filter)),
        }
    }

    /// start of the collections period a payment falls into
    pub fn period_start(frequency: PaymentFrequency, date: NaiveDate) -> NaiveDate {
        match frequency {
            PaymentFrequency::Daily => date,
            PaymentFrequency::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            PaymentFrequency::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    fn select<'a>(inputs: &'a [ReportInput], filter: &ReportFilter) -> Vec<&'a ReportInput> {
        let mut seen = HashSet::new();
        inputs
            .iter()
            .filter(|input| filter.matches(input))
            .filter(|input| seen.insert(input.loan_id))
            .collect()
    }

    fn portfolio(inputs: &[&ReportInput]) -> PortfolioSummary {
        inputs.iter().fold(PortfolioSummary::default(), |mut summary, input| {
            let c = &input.classification;
            summary.loan_count += 1;
            if input.status.is_open() {
                summary.active_loans += 1;
                if c.bucket.is_overdue() {
                    summary.overdue_loans += 1;
                }
            }
            if input.status != crate::types::LoanStatus::Pending {
                summary.principal_disbursed += input.principal;
            }
            summary.outstanding_principal += c.outstanding_principal;
            summary.outstanding_interest += c.outstanding_interest;
            summary.outstanding_fees += c.outstanding_fees;
            summary
        })
    }

    fn aging(inputs: &[&ReportInput]) -> Vec<AgingRow> {
        let mut rows: Vec<AgingRow> = AgingBucket::ALL
            .iter()
            .map(|bucket| AgingRow {
                bucket: *bucket,
                loan_count: 0,
                outstanding_principal: Money::ZERO,
            })
            .collect();

        for input in inputs.iter().filter(|i| i.status.is_open()) {
            let c = &input.classification;
            if let Some(row) = rows.iter_mut().find(|r| r.bucket == c.bucket) {
                row.loan_count += 1;
                row.outstanding_principal += c.outstanding_principal;
            }
        }
        rows
    }

    fn arrears(inputs: &[&ReportInput]) -> Vec<ArrearsRow> {
        let mut rows: Vec<ArrearsRow> = inputs
            .iter()
            .filter(|i| i.status.is_open() && i.classification.bucket.is_overdue())
            .map(|i| ArrearsRow {
                loan_id: i.loan_id,
                customer_id: i.customer_id.clone(),
                product_id: i.product_id,
                bucket: i.classification.bucket,
                days_overdue: i.classification.days_overdue,
                overdue_amount: i.classification.overdue_amount,
                outstanding_principal: i.classification.outstanding_principal,
                outstanding_interest: i.classification.outstanding_interest,
            })
            .collect();

        // worst first
        rows.sort_by(|a, b| {
            b.bucket
                .cmp(&a.bucket)
                .then(b.days_overdue.cmp(&a.days_overdue))
                .then(a.loan_id.cmp(&b.loan_id))
        });
        rows
    }

    fn write_offs(inputs: &[&ReportInput]) -> Vec<WriteOffRow> {
        let mut rows: Vec<WriteOffRow> = inputs
            .iter()
            .filter_map(|i| {
                i.write_off.map(|w| WriteOffRow {
                    loan_id: i.loan_id,
                    customer_id: i.customer_id.clone(),
                    product_id: i.product_id,
                    date: w.date,
                    principal: w.principal,
                    interest: w.interest,
                    fees: w.fees,
                    total: w.total(),
                })
            })
            .collect();

        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.loan_id.cmp(&b.loan_id)));
        rows
    }

    fn collections(inputs: &[&ReportInput], filter: &ReportFilter) -> Vec<CollectionsRow> {
        let mut periods: BTreeMap<(NaiveDate, PaymentFrequency), (u32, Money)> = BTreeMap::new();

        for input in inputs {
            for payment in input.payments.iter().filter(|p| filter.includes_payment(p.received_date)) {
                let key = (Self::period_start(input.payment_frequency, payment.received_date), input.payment_frequency);
                let (count, amount) = periods.entry(key).or_insert((0, Money::ZERO));
                *count += 1;
                *amount += payment.amount;
            }
        }

        periods
            .into_iter()
            .map(|((period_start, payment_frequency), (payment_count, amount))| CollectionsRow {
                period_start,
                payment_frequency,
                payment_count,
                amount,
            })
            .collect()
    }

    fn products(inputs: &[&ReportInput]) -> Vec<ProductRow> {
        let mut products: BTreeMap<ProductId, ProductRow> = BTreeMap::new();

        for input in inputs {
            let row = products.entry(input.product_id).or_insert_with(|| ProductRow {
                product_id: input.product_id,
                loan_count: 0,
                overdue_loans: 0,
                outstanding_principal: Money::ZERO,
                outstanding_interest: Money::ZERO,
            });
            row.loan_count += 1;
            if input.status.is_open() && input.classification.bucket.is_overdue() {
                row.overdue_loans += 1;
            }
            row.outstanding_principal += input.classification.outstanding_principal;
            row.outstanding_interest += input.classification.outstanding_interest;
        }
        products.into_values().collect()
    }

    fn revenue(inputs: &[&ReportInput], filter: &ReportFilter) -> Vec<RevenueRow> {
        let mut products: BTreeMap<ProductId, RevenueRow> = BTreeMap::new();

        for input in inputs {
            let row = products.entry(input.product_id).or_insert_with(|| RevenueRow {
                product_id: input.product_id,
                interest_collected: Money::ZERO,
                fees_collected: Money::ZERO,
            });
            for payment in input.payments.iter().filter(|p| filter.includes_payment(p.received_date)) {
                row.interest_collected += payment.to_interest;
                row.fees_collected += payment.to_fees;
            }
        }
        products.into_values().collect()
    }
}
