//! Money Value Object
//!
//! Immutable monetary value with currency. Subscriber billing runs in whole
//! currency units (no fractional rupiah), so rounding always lands on 0
//! decimal places, half-up.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object with currency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Create a new money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Create money from whole currency units in the default currency
    pub fn from_units(units: i64) -> Self {
        Self {
            amount: Decimal::from(units),
            currency: Currency::default(),
        }
    }

    /// Create zero money
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Create IDR money
    pub fn idr(amount: Decimal) -> Self {
        Self::new(amount, Currency::IDR)
    }

    /// Get the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Get the currency
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Check if same currency
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Add money (must be same currency)
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if !self.same_currency(other) {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Subtract money (must be same currency)
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        if !self.same_currency(other) {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Multiply by a factor
    pub fn multiply(&self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, self.currency.clone())
    }

    /// Round half-up to a whole currency unit
    pub fn round_to_unit(&self) -> Money {
        Money::new(
            self.amount
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            self.currency.clone(),
        )
    }

    /// Clamp negative amounts to zero
    pub fn max_zero(&self) -> Money {
        if self.amount < Decimal::ZERO {
            Money::zero(self.currency.clone())
        } else {
            self.clone()
        }
    }

    /// Check if positive
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.amount == Decimal::ZERO
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero(Currency::IDR)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, self.amount)
    }
}

/// Currency enum
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    IDR,
    USD,
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Self::IDR => "IDR",
            Self::USD => "USD",
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "IDR" => Self::IDR,
            "USD" => Self::USD,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::IDR
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
    #[error("amount cannot be negative")]
    NegativeAmount,
}
