use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::errors::{LoanError, Result};
use crate::types::PaymentFrequency;

/// number of decimal places between major and minor units (cents)
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Money type holding an exact count of minor units (cents).
///
/// Amounts never pass through binary floating point. Anything that needs
/// fractional arithmetic (interest, rates) is computed in `Decimal` and
/// brought back with [`round_half_up`], the only rounding rule in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MINOR_UNIT: Money = Money(1);

    /// create from minor amount (cents)
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// create from integer amount (dollars, euros, etc)
    pub const fn from_major(amount: i64) -> Self {
        Money(amount * 100)
    }

    /// create from a decimal major-unit amount, rounding half-up to the minor unit
    pub fn from_decimal(d: Decimal) -> Self {
        round_half_up(d * Decimal::from(10_i64.pow(MINOR_UNIT_SCALE)))
    }

    /// parse a major-unit string such as "120.00"
    pub fn from_str_exact(s: &str) -> Result<Self> {
        let d = Decimal::from_str(s).map_err(|e| LoanError::InvalidConfiguration {
            message: format!("invalid money amount {s:?}: {e}"),
        })?;
        Ok(Money::from_decimal(d))
    }

    /// minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// value in major units
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtract, failing instead of producing a negative balance
    pub fn try_sub(self, other: Money) -> Result<Money> {
        if other.0 > self.0 {
            return Err(LoanError::NegativeResult {
                balance: self,
                deducted: other,
            });
        }
        Ok(Money(self.0 - other.0))
    }

    /// subtract, flooring at zero
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// multiply by a fixed-point rate, rounding half-up to the minor unit
    pub fn mul_rate(&self, rate: Rate) -> Money {
        round_half_up(Decimal::from(self.0) * rate.as_decimal())
    }

    /// multiply by an arbitrary decimal factor, rounding half-up
    pub fn mul_decimal(&self, factor: Decimal) -> Money {
        round_half_up(Decimal::from(self.0) * factor)
    }

    /// Divide `total` into `n` parts that differ by at most one minor unit.
    ///
    /// The leftover minor units go to the earliest parts, so the result is
    /// stable for a given input and always sums back to `total`.
    pub fn split(total: Money, n: u32) -> Vec<Money> {
        if n == 0 {
            return Vec::new();
        }
        let n_i = i64::from(n);
        let base = total.0.div_euclid(n_i);
        let remainder = total.0.rem_euclid(n_i);
        (0..n_i)
            .map(|i| if i < remainder { Money(base + 1) } else { Money(base) })
            .collect()
    }
}

/// round a minor-unit decimal half-up (away from zero at the midpoint)
pub fn round_half_up(minor_units: Decimal) -> Money {
    let rounded = minor_units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    // amounts beyond i64 minor units are not representable loan balances
    Money(rounded.to_i64().unwrap_or(if rounded.is_sign_negative() { i64::MIN } else { i64::MAX }))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

impl FromStr for Money {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        Money::from_str_exact(s)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Money::from_minor(minor)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate type for interest rates, percentages, and ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from decimal (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10_000))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn as_bps(&self) -> Decimal {
        self.0 * Decimal::from(10_000)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// per-installment rate derived from this annual nominal rate
    pub fn periodic(&self, frequency: PaymentFrequency) -> Rate {
        match frequency {
            PaymentFrequency::Daily => Rate(self.0 / Decimal::from(365)),
            PaymentFrequency::Weekly => Rate(self.0 * Decimal::from(7) / Decimal::from(365)),
            PaymentFrequency::Monthly => Rate(self.0 / Decimal::from(12)),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}
