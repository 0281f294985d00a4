use chrono::{Days, Months, NaiveDate};

use crate::errors::{LoanError, Result};
use crate::types::PaymentFrequency;

/// steps installment due dates from the start of the first period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentCalendar {
    pub period_start: NaiveDate,
    pub frequency: PaymentFrequency,
}

impl InstallmentCalendar {
    /// first period starts once the grace period has elapsed
    pub fn new(disbursement_date: NaiveDate, grace_period_days: u32, frequency: PaymentFrequency) -> Result<Self> {
        let period_start = add_days(disbursement_date, grace_period_days)?;
        Ok(Self {
            period_start,
            frequency,
        })
    }

    /// Date `k` intervals after the period start.
    ///
    /// Monthly steps are taken from the period start, not chained, so a loan
    /// started on the 31st falls due on the last day of shorter months and
    /// returns to the 31st when the month allows.
    pub fn step(&self, k: u32) -> Result<NaiveDate> {
        match self.frequency {
            PaymentFrequency::Daily => add_days(self.period_start, k),
            PaymentFrequency::Weekly => {
                let days = k.checked_mul(7).ok_or_else(out_of_range)?;
                add_days(self.period_start, days)
            }
            PaymentFrequency::Monthly => self
                .period_start
                .checked_add_months(Months::new(k))
                .ok_or_else(out_of_range),
        }
    }

    /// date `days` after the period start
    pub fn offset(&self, days: u32) -> Result<NaiveDate> {
        add_days(self.period_start, days)
    }

    /// smallest installment count whose last step reaches `days` past the start
    pub fn installments_covering(&self, days: u32) -> Result<u32> {
        match self.frequency {
            PaymentFrequency::Daily => Ok(days.max(1)),
            PaymentFrequency::Weekly => Ok(days.div_ceil(7).max(1)),
            PaymentFrequency::Monthly => {
                let target = self.offset(days)?;
                let mut k = 1;
                while self.step(k)? < target {
                    k += 1;
                }
                Ok(k)
            }
        }
    }

    /// largest installment count whose last step stays within `days` of the start
    pub fn installments_within(&self, days: u32) -> Result<u32> {
        match self.frequency {
            PaymentFrequency::Daily => Ok(days),
            PaymentFrequency::Weekly => Ok(days / 7),
            PaymentFrequency::Monthly => {
                let limit = self.offset(days)?;
                let mut k = 0;
                while self.step(k + 1)? <= limit {
                    k += 1;
                }
                Ok(k)
            }
        }
    }

    /// due dates for `n` installments stepping by the interval
    pub fn due_dates(&self, n: u32) -> Result<Vec<NaiveDate>> {
        (1..=n).map(|k| self.step(k)).collect()
    }

    /// Due dates for a fixed term of `term_days`.
    ///
    /// The final installment falls on the term end, absorbing whatever part
    /// of an interval is left over.
    pub fn fixed_term_dates(&self, term_days: u32) -> Result<Vec<NaiveDate>> {
        let n = self.installments_covering(term_days)?;
        let term_end = self.offset(term_days)?;
        let mut dates = self.due_dates(n)?;
        if let Some(last) = dates.last_mut() {
            *last = term_end;
        }
        Ok(dates)
    }
}

fn add_days(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(out_of_range)
}

fn out_of_range() -> LoanError {
    LoanError::InvalidTermConfiguration {
        message: "term extends beyond the supported calendar range".to_string(),
    }
}
