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

//! Fine calculation policy.
//!
//! A [`FinePolicy`] charges a flat rate per overdue day and caps the total at
//! a maximum fine. It holds no mutable state and is safe to share.
//!
//! # Example
//!
//! ```
//! use circulation_rs::{FinePolicy, Money};
//!
//! let policy = FinePolicy::default();
//! assert_eq!(policy.amount_for(5), Money::from_cents(250));
//! assert_eq!(policy.amount_for(90), Money::from_cents(2500));
//! assert_eq!(policy.days_until_cap(), 50);
//! ```

use crate::base::CatalogKey;
use crate::clock::Clock;
use crate::copy::{BookCopy, Loan};
use crate::error::CirculationError;
use crate::fine::Fine;
use crate::money::Money;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::fmt;

/// Linear per-day fine with a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinePolicy {
    rate_per_day: Money,
    max_fine: Money,
}

impl FinePolicy {
    pub const DEFAULT_RATE_PER_DAY: Money = Money::from_cents(50);
    pub const DEFAULT_MAX_FINE: Money = Money::from_cents(2500);

    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidPolicy`] if either amount is zero or
    /// if the daily rate exceeds the cap.
    pub fn new(rate_per_day: Money, max_fine: Money) -> Result<Self, CirculationError> {
        if rate_per_day.is_zero() {
            return Err(CirculationError::InvalidPolicy("rate per day must be positive"));
        }
        if max_fine.is_zero() {
            return Err(CirculationError::InvalidPolicy("max fine must be positive"));
        }
        if rate_per_day > max_fine {
            return Err(CirculationError::InvalidPolicy("rate per day cannot exceed max fine"));
        }
        Ok(Self {
            rate_per_day,
            max_fine,
        })
    }

    pub fn rate_per_day(&self) -> Money {
        self.rate_per_day
    }

    pub fn max_fine(&self) -> Money {
        self.max_fine
    }

    /// Fine owed after `days_overdue` days; zero for non-positive input.
    pub fn amount_for(&self, days_overdue: i64) -> Money {
        match u64::try_from(days_overdue) {
            Ok(days) if days > 0 => self.rate_per_day.multiplied_by(days).min(self.max_fine),
            _ => Money::ZERO,
        }
    }

    /// Smallest day count at which the daily rate reaches the cap.
    pub fn days_until_cap(&self) -> u64 {
        (self.max_fine.amount() / self.rate_per_day.amount())
            .ceil()
            .to_u64()
            .unwrap_or(u64::MAX)
    }

    pub fn is_at_max(&self, amount: Money) -> bool {
        amount >= self.max_fine
    }

    /// Builds a fresh fine for the copy's current loan without storing it.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::NotOverdue`] if the copy is not held past its due date.
    pub fn assess(&self, copy: &BookCopy, clock: &dyn Clock) -> Result<Fine, CirculationError> {
        copy.draft_fine(self, clock.now())
    }

    pub(crate) fn fine_for_loan(
        &self,
        key: &CatalogKey,
        title: &str,
        loan: &Loan,
        now: DateTime<Utc>,
    ) -> Result<Fine, CirculationError> {
        let days_overdue = loan.days_overdue(now.date_naive());
        if days_overdue == 0 {
            return Err(CirculationError::NotOverdue);
        }
        let amount_due = self.amount_for(i64::try_from(days_overdue).unwrap_or(i64::MAX));
        Fine::new(
            key.clone(),
            title,
            &loan.holder,
            loan.due_date,
            days_overdue,
            amount_due,
            now,
        )
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            rate_per_day: Self::DEFAULT_RATE_PER_DAY,
            max_fine: Self::DEFAULT_MAX_FINE,
        }
    }
}

impl fmt::Display for FinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/day, max {}, cap at {} days",
            self.rate_per_day,
            self.max_fine,
            self.days_until_cap()
        )
    }
}
