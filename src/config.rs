use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{InterestType, PaymentFrequency, ProductId};

/// loan term configuration
///
/// Serialized with a `loan_term_type` tag so persisted products carry the
/// same field names as the product table (`fixed_term_days`,
/// `min_term_days`, `max_term_days`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "loan_term_type", rename_all = "snake_case")]
pub enum TermConfig {
    Fixed {
        fixed_term_days: u32,
    },
    Flexible {
        min_term_days: u32,
        max_term_days: u32,
    },
}

impl TermConfig {
    /// build from a loosely typed product record
    pub fn from_record(
        loan_term_type: &str,
        fixed_term_days: Option<u32>,
        min_term_days: Option<u32>,
        max_term_days: Option<u32>,
    ) -> Result<Self> {
        match (loan_term_type, fixed_term_days, min_term_days, max_term_days) {
            ("fixed", Some(days), None, None) => Ok(TermConfig::Fixed { fixed_term_days: days }),
            ("fixed", None, _, _) => Err(LoanError::InvalidTermConfiguration {
                message: "fixed term requires fixed_term_days".to_string(),
            }),
            ("fixed", Some(_), _, _) => Err(LoanError::InvalidTermConfiguration {
                message: "fixed term must not carry min_term_days/max_term_days".to_string(),
            }),
            ("flexible", None, Some(min), Some(max)) => Ok(TermConfig::Flexible {
                min_term_days: min,
                max_term_days: max,
            }),
            ("flexible", Some(_), _, _) => Err(LoanError::InvalidTermConfiguration {
                message: "flexible term must not carry fixed_term_days".to_string(),
            }),
            ("flexible", None, _, _) => Err(LoanError::InvalidTermConfiguration {
                message: "flexible term requires min_term_days and max_term_days".to_string(),
            }),
            (other, _, _, _) => Err(LoanError::InvalidTermConfiguration {
                message: format!("unknown loan_term_type {other:?}"),
            }),
        }
    }

    /// check the day bounds
    pub fn validate(&self) -> Result<()> {
        match *self {
            TermConfig::Fixed { fixed_term_days } if fixed_term_days == 0 => {
                Err(LoanError::InvalidTermConfiguration {
                    message: "fixed_term_days must be positive".to_string(),
                })
            }
            TermConfig::Flexible { min_term_days, max_term_days } if min_term_days > max_term_days => {
                Err(LoanError::InvalidTermConfiguration {
                    message: format!(
                        "min_term_days {min_term_days} exceeds max_term_days {max_term_days}"
                    ),
                })
            }
            TermConfig::Flexible { max_term_days, .. } if max_term_days == 0 => {
                Err(LoanError::InvalidTermConfiguration {
                    message: "max_term_days must be positive".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// loan product template edited by operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub id: ProductId,
    pub name: String,
    pub interest_type: InterestType,
    #[serde(flatten)]
    pub term: TermConfig,
    pub payment_frequency: PaymentFrequency,
    pub grace_period_days: u32,
    /// annual nominal rate
    pub interest_rate: Rate,
    /// fee charged on every installment
    #[serde(default)]
    pub installment_fee: Money,
}

impl LoanProduct {
    /// create a product with no installment fee
    pub fn new(
        name: impl Into<String>,
        interest_type: InterestType,
        term: TermConfig,
        payment_frequency: PaymentFrequency,
        grace_period_days: u32,
        interest_rate: Rate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            interest_type,
            term,
            payment_frequency,
            grace_period_days,
            interest_rate,
            installment_fee: Money::ZERO,
        }
    }

    pub fn with_installment_fee(mut self, fee: Money) -> Self {
        self.installment_fee = fee;
        self
    }

    /// daily micro-loan: 30 days, flat 36% annual
    pub fn daily_microloan() -> Self {
        Self::new(
            "daily micro-loan",
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 30 },
            PaymentFrequency::Daily,
            0,
            Rate::from_percentage(36),
        )
    }

    /// weekly group loan: 12 to 26 weeks, reducing balance 30% annual
    pub fn weekly_group_loan() -> Self {
        Self::new(
            "weekly group loan",
            InterestType::ReducingBalance,
            TermConfig::Flexible {
                min_term_days: 84,
                max_term_days: 182,
            },
            PaymentFrequency::Weekly,
            7,
            Rate::from_percentage(30),
        )
        .with_installment_fee(Money::from_major(1))
    }

    /// monthly personal loan: 12 months, reducing balance 24% annual
    pub fn monthly_personal_loan() -> Self {
        Self::new(
            "monthly personal loan",
            InterestType::ReducingBalance,
            TermConfig::Fixed { fixed_term_days: 365 },
            PaymentFrequency::Monthly,
            0,
            Rate::from_decimal(dec!(0.24)),
        )
    }

    /// effective terms to copy onto a loan at disbursement
    pub fn terms(&self) -> LoanTerms {
        LoanTerms::from(self)
    }
}

/// loosely typed product row as persisted by the admin layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProductRecord {
    pub id: ProductId,
    pub name: String,
    pub interest_type: InterestType,
    pub loan_term_type: String,
    pub fixed_term_days: Option<u32>,
    pub min_term_days: Option<u32>,
    pub max_term_days: Option<u32>,
    pub payment_frequency: PaymentFrequency,
    pub grace_period_days: i64,
    pub interest_rate: Rate,
    #[serde(default)]
    pub installment_fee: Money,
}

impl TryFrom<LoanProductRecord> for LoanProduct {
    type Error = LoanError;

    fn try_from(record: LoanProductRecord) -> Result<Self> {
        let term = TermConfig::from_record(
            &record.loan_term_type,
            record.fixed_term_days,
            record.min_term_days,
            record.max_term_days,
        )?;
        let grace_period_days = u32::try_from(record.grace_period_days).map_err(|_| {
            LoanError::InvalidTermConfiguration {
                message: format!("grace_period_days out of range: {}", record.grace_period_days),
            }
        })?;

        let product = LoanProduct {
            id: record.id,
            name: record.name,
            interest_type: record.interest_type,
            term,
            payment_frequency: record.payment_frequency,
            grace_period_days,
            interest_rate: record.interest_rate,
            installment_fee: record.installment_fee,
        };
        product.terms().validate()?;
        Ok(product)
    }
}

/// term parameters frozen onto a loan at disbursement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub product_id: ProductId,
    pub interest_type: InterestType,
    #[serde(flatten)]
    pub term: TermConfig,
    pub payment_frequency: PaymentFrequency,
    pub grace_period_days: u32,
    pub interest_rate: Rate,
    pub installment_fee: Money,
}

impl LoanTerms {
    pub fn validate(&self) -> Result<()> {
        self.term.validate()?;
        if self.interest_rate.is_negative() {
            return Err(LoanError::InvalidTermConfiguration {
                message: format!("interest rate must not be negative: {}", self.interest_rate),
            });
        }
        if self.installment_fee.is_negative() {
            return Err(LoanError::InvalidTermConfiguration {
                message: format!("installment fee must not be negative: {}", self.installment_fee),
            });
        }
        Ok(())
    }
}

impl From<&LoanProduct> for LoanTerms {
    fn from(product: &LoanProduct) -> Self {
        Self {
            product_id: product.id,
            interest_type: product.interest_type,
            term: product.term,
            payment_frequency: product.payment_frequency,
            grace_period_days: product.grace_period_days,
            interest_rate: product.interest_rate,
            installment_fee: product.installment_fee,
        }
    }
}

/// Thresholds for explicit status transitions driven by arrears.
///
/// Aging is measured from each installment's due date; grace days only move
/// the first due date and never count toward days overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsPolicy {
    /// days overdue at which an active loan becomes overdue
    pub overdue_after_days: u32,
    /// days overdue at which a loan becomes defaulted
    pub default_after_days: u32,
}

impl Default for ArrearsPolicy {
    fn default() -> Self {
        Self {
            overdue_after_days: 1,
            default_after_days: 90,
        }
    }
}

/// engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub arrears: ArrearsPolicy,
}

impl EngineConfig {
    /// parse and validate a json configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| LoanError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let policy = &self.arrears;
        if policy.overdue_after_days == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "overdue_after_days must be at least 1".to_string(),
            });
        }
        if policy.default_after_days <= policy.overdue_after_days {
            return Err(LoanError::InvalidConfiguration {
                message: format!(
                    "default_after_days {} must exceed overdue_after_days {}",
                    policy.default_after_days, policy.overdue_after_days
                ),
            });
        }
        Ok(())
    }
}
