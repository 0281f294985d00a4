/// portfolio reporting over per-loan arrears classifications
mod aggregator;

pub use aggregator::ReportAggregator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arrears::{AgingBucket, ArrearsClassification};
use crate::decimal::Money;
use crate::loan::Loan;
use crate::payments::Allocation;
use crate::state::WriteOff;
use crate::types::{LoanId, LoanStatus, PaymentFrequency, ProductId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Portfolio,
    Aging,
    Arrears,
    WriteOffs,
    Collections,
    Products,
    Revenue,
}

/// inclusive range of business dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Narrows the input set before folding.
///
/// `received_between` only restricts payment based reports
/// (collections and revenue).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub product_id: Option<ProductId>,
    pub status: Option<LoanStatus>,
    pub received_between: Option<DateRange>,
}

impl ReportFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn received_between(mut self, range: DateRange) -> Self {
        self.received_between = Some(range);
        self
    }

    pub fn matches(&self, input: &ReportInput) -> bool {
        self.product_id.map_or(true, |id| id == input.product_id)
            && self.status.map_or(true, |status| status == input.status)
    }

    pub fn includes_payment(&self, received_date: NaiveDate) -> bool {
        self.received_between.map_or(true, |range| range.contains(received_date))
    }
}

/// one loan's classification plus the metadata the reports group by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInput {
    pub loan_id: LoanId,
    pub product_id: ProductId,
    pub customer_id: String,
    pub status: LoanStatus,
    pub payment_frequency: PaymentFrequency,
    pub principal: Money,
    pub classification: ArrearsClassification,
    /// allocations across the loan's whole history, restructures included
    pub payments: Vec<Allocation>,
    pub write_off: Option<WriteOff>,
}

impl ReportInput {
    pub fn from_loan(loan: &Loan, as_of: NaiveDate) -> Self {
        Self {
            loan_id: loan.id,
            product_id: loan.terms.product_id,
            customer_id: loan.customer_id.clone(),
            status: loan.status,
            payment_frequency: loan.terms.payment_frequency,
            principal: loan.principal,
            classification: loan.classify(as_of),
            payments: loan.payment_history().map(|r| r.allocation.clone()).collect(),
            write_off: loan.write_off,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub loan_count: u32,
    /// pending loans are not counted as active
    pub active_loans: u32,
    pub overdue_loans: u32,
    pub principal_disbursed: Money,
    pub outstanding_principal: Money,
    pub outstanding_interest: Money,
    pub outstanding_fees: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingRow {
    pub bucket: AgingBucket,
    pub loan_count: u32,
    pub outstanding_principal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsRow {
    pub loan_id: LoanId,
    pub customer_id: String,
    pub product_id: ProductId,
    pub bucket: AgingBucket,
    pub days_overdue: u32,
    pub overdue_amount: Money,
    pub outstanding_principal: Money,
    pub outstanding_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOffRow {
    pub loan_id: LoanId,
    pub customer_id: String,
    pub product_id: ProductId,
    pub date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
    pub fees: Money,
    pub total: Money,
}

/// payments received in one period for loans of one repayment frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsRow {
    pub period_start: NaiveDate,
    pub payment_frequency: PaymentFrequency,
    pub payment_count: u32,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_id: ProductId,
    pub loan_count: u32,
    pub overdue_loans: u32,
    pub outstanding_principal: Money,
    pub outstanding_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub product_id: ProductId,
    pub interest_collected: Money,
    pub fees_collected: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "report", content = "rows", rename_all = "snake_case")]
pub enum ReportRows {
    Portfolio(PortfolioSummary),
    Aging(Vec<AgingRow>),
    Arrears(Vec<ArrearsRow>),
    WriteOffs(Vec<WriteOffRow>),
    Collections(Vec<CollectionsRow>),
    Products(Vec<ProductRow>),
    Revenue(Vec<RevenueRow>),
}

impl ReportRows {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRows::Portfolio(_) => ReportKind::Portfolio,
            ReportRows::Aging(_) => ReportKind::Aging,
            ReportRows::Arrears(_) => ReportKind::Arrears,
            ReportRows::WriteOffs(_) => ReportKind::WriteOffs,
            ReportRows::Collections(_) => ReportKind::Collections,
            ReportRows::Products(_) => ReportKind::Products,
            ReportRows::Revenue(_) => ReportKind::Revenue,
        }
    }
}
