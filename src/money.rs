// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Exact monetary amounts.
//!
//! [`Money`] wraps a [`Decimal`] that is always rescaled to two fraction
//! digits. Rounding (half away from zero, i.e. half-up for the non-negative
//! amounts used here) happens only when a value is constructed; addition and
//! subtraction of two-digit values are exact, and checked so they never panic.
//!
//! # Example
//!
//! ```
//! use circulation_rs::Money;
//!
//! let rate: Money = "0.50".parse().unwrap();
//! assert_eq!(rate.multiplied_by(5), Money::from_cents(250));
//! assert_eq!(rate.to_string(), "$0.50");
//! ```

use crate::error::CirculationError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// A non-negative amount of money with two-digit cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fraction digits kept for every amount.
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Largest amount that still carries two fraction digits.
    pub const MAX: Money = Money(Decimal::from_parts(u32::MAX, u32::MAX, u32::MAX, false, Self::SCALE));

    /// Builds an amount from a decimal, rounding half-up to cents.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `amount` is negative or
    /// too large to keep two fraction digits.
    pub fn new(amount: Decimal) -> Result<Self, CirculationError> {
        if amount.is_zero() {
            return Ok(Self::ZERO);
        }
        if amount.is_sign_negative() {
            return Err(CirculationError::InvalidArgument("amount cannot be negative"));
        }
        Self::rounded(amount)
    }

    /// Builds an amount from a whole number of cents.
    pub const fn from_cents(cents: u64) -> Self {
        Self(Decimal::from_parts(
            cents as u32,
            (cents >> 32) as u32,
            0,
            false,
            Self::SCALE,
        ))
    }

    fn rounded(amount: Decimal) -> Result<Self, CirculationError> {
        let mut value =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(Self::SCALE);
        // rescale leaves the scale lower when the mantissa has no room left.
        if value.scale() != Self::SCALE {
            return Err(CirculationError::InvalidArgument("amount out of range"));
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `self + other`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if the sum exceeds [`Money::MAX`].
    pub fn checked_add(self, other: Money) -> Result<Money, CirculationError> {
        self.0
            .checked_add(other.0)
            .ok_or(CirculationError::InvalidArgument("amount out of range"))
            .and_then(Self::rounded)
    }

    /// Returns `self + other`, saturating at [`Money::MAX`].
    pub fn saturating_add(self, other: Money) -> Money {
        self.checked_add(other).unwrap_or(Self::MAX)
    }

    /// Returns `self - other`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::NegativeResult`] if `other > self`.
    pub fn checked_sub(self, other: Money) -> Result<Money, CirculationError> {
        if other > self {
            return Err(CirculationError::NegativeResult);
        }
        Self::rounded(self.0 - other.0)
    }

    /// Returns `self * factor`, rounded to cents and saturating at [`Money::MAX`].
    pub fn multiplied_by(self, factor: u64) -> Money {
        self.0
            .checked_mul(Decimal::from(factor))
            .and_then(|product| Self::rounded(product).ok())
            .unwrap_or(Self::MAX)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Saturates at [`Money::MAX`].
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = CirculationError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Money::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.0
    }
}

impl FromStr for Money {
    type Err = CirculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim().trim_start_matches('$'))
            .map_err(|_| CirculationError::InvalidArgument("amount is not a valid decimal"))?;
        Money::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn construction_rounds_half_up_to_cents() {
        assert_eq!(Money::new(dec!(1.005)).unwrap().amount(), dec!(1.01));
        assert_eq!(Money::new(dec!(1.004)).unwrap().amount(), dec!(1.00));
        assert_eq!(Money::new(dec!(0.125)).unwrap().amount(), dec!(0.13));
    }

    #[test]
    fn construction_rejects_negative_amounts() {
        assert_eq!(
            Money::new(dec!(-0.01)),
            Err(CirculationError::InvalidArgument("amount cannot be negative"))
        );
        assert_eq!(Money::new(Decimal::ZERO), Ok(Money::ZERO));
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn scale_is_always_two_digits() {
        assert_eq!(Money::new(dec!(3)).unwrap().to_string(), "$3.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(
            Money::from_cents(150).checked_add(Money::from_cents(100)).unwrap().to_string(),
            "$2.50"
        );
        assert_eq!(Money::default().to_string(), "$0.00");
    }

    #[test]
    fn parses_plain_and_dollar_prefixed_strings() {
        assert_eq!("2.50".parse::<Money>().unwrap(), Money::from_cents(250));
        assert_eq!(" $25 ".parse::<Money>().unwrap(), Money::from_cents(2500));
        assert!("two dollars".parse::<Money>().is_err());
        assert!("-1.00".parse::<Money>().is_err());
    }

    #[test]
    fn checked_sub_never_goes_negative() {
        let a = Money::from_cents(250);
        let b = Money::from_cents(100);
        assert_eq!(a.checked_sub(b), Ok(Money::from_cents(150)));
        assert_eq!(b.checked_sub(a), Err(CirculationError::NegativeResult));
        assert_eq!(a.checked_sub(a), Ok(Money::ZERO));
    }

    #[test]
    fn ordering_and_min() {
        let small = Money::from_cents(99);
        let large = Money::from_cents(100);
        assert!(small < large);
        assert_eq!(small.min(large), small);
        assert_eq!(Money::new(dec!(1)).unwrap(), Money::new(dec!(1.00)).unwrap());
    }

    #[test]
    fn amounts_too_large_for_cents_are_rejected() {
        let huge = Decimal::MAX;
        assert_eq!(
            Money::new(huge),
            Err(CirculationError::InvalidArgument("amount out of range"))
        );
        assert!("79228162514264337593543950335".parse::<Money>().is_err());
        assert_eq!(Money::new(Money::MAX.amount()), Ok(Money::MAX));
    }

    #[test]
    fn checked_add_reports_overflow() {
        assert_eq!(
            Money::MAX.checked_add(Money::from_cents(1)),
            Err(CirculationError::InvalidArgument("amount out of range"))
        );
        assert_eq!(Money::MAX.saturating_add(Money::from_cents(1)), Money::MAX);
        assert_eq!(Money::from_cents(1).multiplied_by(u64::MAX), Money::from_cents(u64::MAX));
        assert_eq!(Money::MAX.multiplied_by(2), Money::MAX);
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [50, 125, 25].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(200));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(250)).unwrap();
        assert_eq!(json, "\"2.50\"");
        let parsed: Money = serde_json::from_str("\"0.505\"").unwrap();
        assert_eq!(parsed, Money::from_cents(51));
    }
}
