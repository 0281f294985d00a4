use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{LoanTerms, TermConfig};
use crate::decimal::{round_half_up, Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::InterestType;

use super::{InstallmentCalendar, Schedule, ScheduleEntry};

/// builds repayment schedules from a loan's effective terms
pub struct ScheduleGenerator<'a> {
    terms: &'a LoanTerms,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(terms: &'a LoanTerms) -> Self {
        Self { terms }
    }

    /// generate the full schedule for `principal` disbursed on `disbursement_date`
    pub fn generate(&self, principal: Money, disbursement_date: NaiveDate) -> Result<Schedule> {
        self.terms.validate()?;
        if !principal.is_positive() {
            return Err(LoanError::NonPositiveAmount { amount: principal });
        }

        let calendar = InstallmentCalendar::new(
            disbursement_date,
            self.terms.grace_period_days,
            self.terms.payment_frequency,
        )?;

        let entries = match self.terms.term {
            TermConfig::Fixed { fixed_term_days } => {
                let dates = calendar.fixed_term_dates(fixed_term_days)?;
                self.amortize(principal, calendar.period_start, &dates)?
                    .ok_or_else(|| LoanError::UnschedulableTerm {
                        message: format!(
                            "{} installments cannot amortize {} without a negative installment",
                            dates.len(),
                            principal
                        ),
                    })?
            }
            TermConfig::Flexible { min_term_days, max_term_days } => {
                self.amortize_flexible(principal, &calendar, min_term_days, max_term_days)?
            }
        };

        let schedule = Schedule {
            principal,
            disbursement_date,
            first_period_start: calendar.period_start,
            entries,
        };

        info!(
            principal = %principal,
            installments = schedule.len(),
            total_interest = %schedule.total_interest_due(),
            interest_type = ?self.terms.interest_type,
            frequency = ?self.terms.payment_frequency,
            "schedule generated"
        );

        Ok(schedule)
    }

    /// pick the shortest installment count inside the bounds that amortizes cleanly
    fn amortize_flexible(
        &self,
        principal: Money,
        calendar: &InstallmentCalendar,
        min_term_days: u32,
        max_term_days: u32,
    ) -> Result<Vec<ScheduleEntry>> {
        let min_n = calendar.installments_covering(min_term_days)?;
        let max_n = calendar.installments_within(max_term_days)?;

        if min_n > max_n {
            return Err(LoanError::UnschedulableTerm {
                message: format!(
                    "no {:?} installment count fits between {} and {} days",
                    self.terms.payment_frequency, min_term_days, max_term_days
                ),
            });
        }

        for n in min_n..=max_n {
            let dates = calendar.due_dates(n)?;
            if let Some(entries) = self.amortize(principal, calendar.period_start, &dates)? {
                return Ok(entries);
            }
            debug!(installments = n, "installment count rejected");
        }

        Err(LoanError::UnschedulableTerm {
            message: format!(
                "{} cannot be amortized in {}..={} installments",
                principal, min_n, max_n
            ),
        })
    }

    /// split principal and interest over the given due dates;
    /// `None` when some installment would come out negative
    fn amortize(
        &self,
        principal: Money,
        period_start: NaiveDate,
        dates: &[NaiveDate],
    ) -> Result<Option<Vec<ScheduleEntry>>> {
        let n = u32::try_from(dates.len()).map_err(|_| LoanError::InvalidTermConfiguration {
            message: "too many installments".to_string(),
        })?;
        if n == 0 {
            return Ok(None);
        }

        let parts = match self.terms.interest_type {
            InterestType::Flat => {
                let last_due = dates[dates.len() - 1];
                let term_days = (last_due - period_start).num_days();
                Some(flat_parts(principal, self.terms.interest_rate, term_days, n))
            }
            InterestType::ReducingBalance => {
                let periodic = self.terms.interest_rate.periodic(self.terms.payment_frequency);
                reducing_balance_parts(principal, periodic, n)?
            }
        };

        let Some(parts) = parts else {
            return Ok(None);
        };

        let mut balance = principal;
        let mut entries = Vec::with_capacity(dates.len());
        for (i, (due_date, (principal_due, interest_due))) in dates.iter().zip(parts).enumerate() {
            balance = balance.try_sub(principal_due)?;
            let sequence = i as u32 + 1;
            debug!(
                sequence,
                %due_date,
                principal = %principal_due,
                interest = %interest_due,
                balance = %balance,
                "installment"
            );
            entries.push(ScheduleEntry::new(
                sequence,
                *due_date,
                principal_due,
                interest_due,
                self.terms.installment_fee,
                balance,
            ));
        }

        Ok(Some(entries))
    }
}

/// flat interest on the original principal over the whole term, both split evenly
fn flat_parts(principal: Money, annual_rate: Rate, term_days: i64, n: u32) -> Vec<(Money, Money)> {
    let total_interest = round_half_up(
        Decimal::from(principal.minor()) * annual_rate.as_decimal() * Decimal::from(term_days)
            / Decimal::from(365),
    );

    Money::split(principal, n)
        .into_iter()
        .zip(Money::split(total_interest, n))
        .collect()
}

/// Level-installment split on the declining balance.
///
/// The final entry takes whatever principal is left so the schedule clears
/// the balance exactly. `None` when the level installment does not cover an
/// entry's interest.
fn reducing_balance_parts(principal: Money, periodic: Rate, n: u32) -> Result<Option<Vec<(Money, Money)>>> {
    if periodic.is_zero() {
        return Ok(Some(
            Money::split(principal, n)
                .into_iter()
                .map(|p| (p, Money::ZERO))
                .collect(),
        ));
    }

    let installment = level_installment(principal, periodic, n)?;
    let mut balance = principal;
    let mut parts = Vec::with_capacity(n as usize);

    for k in 1..=n {
        let interest = balance.mul_rate(periodic);
        let principal_due = if k == n {
            balance
        } else {
            let level_principal = installment.minor() - interest.minor();
            if level_principal < 0 {
                return Ok(None);
            }
            Money::from_minor(level_principal).min(balance)
        };
        balance = balance.try_sub(principal_due)?;
        parts.push((principal_due, interest));
    }

    Ok(Some(parts))
}

/// annuity payment P * r * (1 + r)^n / ((1 + r)^n - 1), rounded half-up
fn level_installment(principal: Money, periodic: Rate, n: u32) -> Result<Money> {
    let overflow = || LoanError::UnschedulableTerm {
        message: format!("annuity factor overflows for {n} installments at {periodic}"),
    };

    let r = periodic.as_decimal();
    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..n {
        compound = compound.checked_mul(base).ok_or_else(overflow)?;
    }

    let numerator = Decimal::from(principal.minor())
        .checked_mul(r)
        .and_then(|x| x.checked_mul(compound))
        .ok_or_else(overflow)?;
    let denominator = compound - Decimal::ONE;
    let installment = numerator.checked_div(denominator).ok_or_else(overflow)?;

    Ok(round_half_up(installment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryStatus, PaymentFrequency};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms(interest_type: InterestType, term: TermConfig, frequency: PaymentFrequency, rate: Rate) -> LoanTerms {
        LoanTerms {
            product_id: Uuid::nil(),
            interest_type,
            term,
            payment_frequency: frequency,
            grace_period_days: 0,
            interest_rate: rate,
            installment_fee: Money::ZERO,
        }
    }

    #[test]
    fn test_reducing_balance_monthly_scenario() {
        // 24% annual = 2% per month
        let terms = terms(
            InterestType::ReducingBalance,
            TermConfig::Fixed { fixed_term_days: 365 },
            PaymentFrequency::Monthly,
            Rate::from_percentage(24),
        );
        let schedule = ScheduleGenerator::new(&terms)
            .generate(Money::from_minor(12_000), date(2023, 1, 1))
            .unwrap();

        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule.entries[0].interest_due, Money::from_minor(240));
        assert_eq!(schedule.entries[0].principal_due, Money::from_minor(895));

        for pair in schedule.entries.windows(2) {
            assert!(pair[1].interest_due < pair[0].interest_due);
        }

        let last = schedule.entries.last().unwrap();
        assert_eq!(last.balance_after, Money::ZERO);
        assert_eq!(schedule.total_principal_due(), Money::from_minor(12_000));
    }

    #[test]
    fn test_flat_daily_scenario() {
        let terms = terms(
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 10 },
            PaymentFrequency::Daily,
            Rate::from_percentage(36),
        );
        let schedule = ScheduleGenerator::new(&terms)
            .generate(Money::from_minor(10_000), date(2024, 3, 1))
            .unwrap();

        assert_eq!(schedule.len(), 10);
        assert!(schedule.entries.iter().all(|e| e.principal_due == Money::from_minor(1_000)));

        // 10000 * 0.36 * 10 / 365 = 98.63 -> 99, split 10 ways
        assert_eq!(schedule.total_interest_due(), Money::from_minor(99));
        assert_eq!(schedule.entries[0].interest_due, Money::from_minor(10));
        assert_eq!(schedule.entries[8].interest_due, Money::from_minor(10));
        assert_eq!(schedule.entries[9].interest_due, Money::from_minor(9));
        assert!(schedule.entries.iter().all(|e| e.status == EntryStatus::Upcoming));
    }

    #[test]
    fn test_flat_uneven_principal_split() {
        let terms = terms(
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 3 },
            PaymentFrequency::Daily,
            Rate::ZERO,
        );
        let schedule = ScheduleGenerator::new(&terms)
            .generate(Money::from_minor(100), date(2024, 3, 1))
            .unwrap();

        let principal: Vec<_> = schedule.entries.iter().map(|e| e.principal_due.minor()).collect();
        assert_eq!(principal, vec![34, 33, 33]);
        assert_eq!(schedule.entries[0].balance_after, Money::from_minor(66));
    }

    #[test]
    fn test_grace_period_shifts_first_due_date() {
        let mut terms = terms(
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 28 },
            PaymentFrequency::Weekly,
            Rate::from_percentage(10),
        );
        terms.grace_period_days = 14;

        let schedule = ScheduleGenerator::new(&terms)
            .generate(Money::from_major(400), date(2024, 1, 1))
            .unwrap();

        assert_eq!(schedule.first_period_start, date(2024, 1, 15));
        assert_eq!(schedule.entries[0].due_date, date(2024, 1, 22));
        assert_eq!(schedule.len(), 4);

        // interest covers the 28 days after grace only
        let expected = round_half_up(dec!(40000) * dec!(0.10) * dec!(28) / dec!(365));
        assert_eq!(schedule.total_interest_due(), expected);
    }

    #[test]
    fn test_flexible_term_picks_shortest_count() {
        let terms = terms(
            InterestType::ReducingBalance,
            TermConfig::Flexible {
                min_term_days: 30,
                max_term_days: 70,
            },
            PaymentFrequency::Weekly,
            Rate::from_percentage(30),
        );
        let schedule = ScheduleGenerator::new(&terms)
            .generate(Money::from_major(1_000), date(2024, 1, 1))
            .unwrap();

        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule.total_principal_due(), Money::from_major(1_000));
    }

    #[test]
    fn test_flexible_term_without_fitting_count() {
        let terms = terms(
            InterestType::Flat,
            TermConfig::Flexible {
                min_term_days: 8,
                max_term_days: 13,
            },
            PaymentFrequency::Weekly,
            Rate::from_percentage(10),
        );
        let err = ScheduleGenerator::new(&terms)
            .generate(Money::from_major(100), date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LoanError::UnschedulableTerm { .. }));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let terms = terms(
            InterestType::Flat,
            TermConfig::Flexible {
                min_term_days: 90,
                max_term_days: 30,
            },
            PaymentFrequency::Daily,
            Rate::from_percentage(10),
        );
        let err = ScheduleGenerator::new(&terms)
            .generate(Money::from_major(100), date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidTermConfiguration { .. }));
    }

    #[test]
    fn test_non_positive_principal_rejected() {
        let terms = terms(
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 10 },
            PaymentFrequency::Daily,
            Rate::from_percentage(10),
        );
        let err = ScheduleGenerator::new(&terms)
            .generate(Money::ZERO, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LoanError::NonPositiveAmount { .. }));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let terms = terms(
            InterestType::ReducingBalance,
            TermConfig::Fixed { fixed_term_days: 180 },
            PaymentFrequency::Weekly,
            Rate::from_percentage(18),
        );
        let generator = ScheduleGenerator::new(&terms);
        let a = generator.generate(Money::from_minor(987_654), date(2024, 5, 17)).unwrap();
        let b = generator.generate(Money::from_minor(987_654), date(2024, 5, 17)).unwrap();
        assert_eq!(a, b);
    }
}
