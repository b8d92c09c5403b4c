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

//! Immutable fine records.
//!
//! A [`Fine`] is never mutated in place. Paying or waiving it produces a new
//! value, which the owning copy then swaps in for the old one:
//!
//! ```text
//!  Open ──with_payment (partial)──► Open (partially paid)
//!   │                                 │
//!   ├──with_payment (full)────────────┴──► Paid     (settled)
//!   └──with_waiver────────────────────────► Waived   (settled)
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use circulation_rs::{CatalogKey, Fine, Money};
//!
//! let due = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let fine = Fine::new(
//!     CatalogKey::new("978-0451524935").unwrap(),
//!     "1984",
//!     "Alice",
//!     due,
//!     5,
//!     Money::from_cents(250),
//!     Utc::now(),
//! )
//! .unwrap();
//!
//! let paid = fine.with_payment(Money::from_cents(250), Utc::now()).unwrap();
//! assert!(paid.is_settled());
//! assert!(!fine.is_settled());
//! ```

use crate::base::{CatalogKey, require_text};
use crate::error::CirculationError;
use crate::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// A single overdue assessment and its payment/waiver history.
///
/// # Invariants
///
/// - `amount_paid <= amount_due`.
/// - A waived fine accepts no payment; a fully paid fine cannot be waived.
/// - `paid_at` is set once the fine is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fine {
    key: CatalogKey,
    title: String,
    borrower: String,
    /// Due date of the loan this fine was assessed for.
    due_date: NaiveDate,
    days_overdue: u64,
    amount_due: Money,
    amount_paid: Money,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    /// Waiver reason; `Some` iff the fine was waived.
    waiver: Option<String>,
}

impl Fine {
    /// Creates an open, unpaid fine.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `borrower`
    /// is blank, or if `days_overdue` is zero.
    pub fn new(
        key: CatalogKey,
        title: &str,
        borrower: &str,
        due_date: NaiveDate,
        days_overdue: u64,
        amount_due: Money,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CirculationError> {
        let title = require_text(title, "title cannot be empty")?;
        let borrower = require_text(borrower, "borrower name cannot be empty")?;
        if days_overdue == 0 {
            return Err(CirculationError::InvalidArgument("days overdue must be positive"));
        }

        Ok(Self {
            key,
            title: title.to_string(),
            borrower: borrower.to_string(),
            due_date,
            days_overdue,
            amount_due,
            amount_paid: Money::ZERO,
            created_at,
            paid_at: None,
            waiver: None,
        })
    }

    pub fn key(&self) -> &CatalogKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn borrower(&self) -> &str {
        &self.borrower
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn days_overdue(&self) -> u64 {
        self.days_overdue
    }

    pub fn amount_due(&self) -> Money {
        self.amount_due
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    /// Returns `amount_due - amount_paid`.
    pub fn amount_remaining(&self) -> Money {
        self.amount_due
            .checked_sub(self.amount_paid)
            .unwrap_or(Money::ZERO)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_waived(&self) -> bool {
        self.waiver.is_some()
    }

    pub fn waive_reason(&self) -> Option<&str> {
        self.waiver.as_deref()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid >= self.amount_due
    }

    pub fn is_partially_paid(&self) -> bool {
        !self.amount_paid.is_zero() && self.amount_paid < self.amount_due
    }

    /// A fine is settled once it is waived or fully paid.
    pub fn is_settled(&self) -> bool {
        self.is_waived() || self.is_fully_paid()
    }

    fn ensure_open(&self) -> Result<(), CirculationError> {
        if self.is_waived() {
            return Err(CirculationError::FineAlreadyWaived);
        }
        if self.is_fully_paid() {
            return Err(CirculationError::FineAlreadyPaid);
        }
        Ok(())
    }

    /// Returns a new fine with `amount` added to the amount paid.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::InvalidArgument`] - `amount` is zero.
    /// - [`CirculationError::FineAlreadyWaived`] - the fine was waived.
    /// - [`CirculationError::FineAlreadyPaid`] - nothing is left to pay.
    /// - [`CirculationError::PaymentExceedsDue`] - the payment is larger than the remaining balance.
    pub fn with_payment(&self, amount: Money, now: DateTime<Utc>) -> Result<Fine, CirculationError> {
        if amount.is_zero() {
            return Err(CirculationError::InvalidArgument("payment must be positive"));
        }
        self.ensure_open()?;

        // A sum past Money::MAX is necessarily past the amount due.
        let amount_paid = self
            .amount_paid
            .checked_add(amount)
            .map_err(|_| CirculationError::PaymentExceedsDue)?;
        if amount_paid > self.amount_due {
            return Err(CirculationError::PaymentExceedsDue);
        }

        let paid_at = if amount_paid == self.amount_due {
            Some(now)
        } else {
            self.paid_at
        };

        Ok(Fine {
            amount_paid,
            paid_at,
            ..self.clone()
        })
    }

    /// Returns a new, settled fine carrying the waiver `reason`.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::InvalidArgument`] - `reason` is blank.
    /// - [`CirculationError::FineAlreadyWaived`] - the fine was already waived.
    /// - [`CirculationError::FineAlreadyPaid`] - the fine is fully paid.
    pub fn with_waiver(&self, reason: &str, now: DateTime<Utc>) -> Result<Fine, CirculationError> {
        let reason = require_text(reason, "waiver reason cannot be empty")?;
        self.ensure_open()?;

        Ok(Fine {
            paid_at: Some(now),
            waiver: Some(reason.to_string()),
            ..self.clone()
        })
    }

    /// Whether this fine was assessed for the loan held by `borrower` and due on `due_date`.
    pub(crate) fn covers_loan(&self, borrower: &str, due_date: NaiveDate) -> bool {
        self.borrower == borrower && self.due_date == due_date
    }

    /// Recomputes the amount due for the same loan, keeping payments made so far.
    pub(crate) fn reassessed(
        &self,
        days_overdue: u64,
        amount_due: Money,
    ) -> Result<Fine, CirculationError> {
        if self.is_waived() {
            return Err(CirculationError::FineAlreadyWaived);
        }
        if self.amount_paid > amount_due {
            return Err(CirculationError::PaymentExceedsDue);
        }

        let paid_at = if self.amount_paid == amount_due {
            self.paid_at
        } else {
            None
        };

        Ok(Fine {
            days_overdue,
            amount_due,
            paid_at,
            ..self.clone()
        })
    }
}

impl fmt::Display for Fine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fine for '{}' ({}) - {}", self.title, self.borrower, self.amount_due)?;
        if let Some(reason) = &self.waiver {
            write!(f, " WAIVED ({reason})")
        } else if self.is_fully_paid() {
            write!(f, " PAID")
        } else if self.is_partially_paid() {
            write!(
                f,
                " due ({} paid, {} remaining)",
                self.amount_paid,
                self.amount_remaining()
            )
        } else {
            write!(f, " due ({} days overdue)", self.days_overdue)
        }
    }
}
