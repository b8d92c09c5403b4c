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

//! Circulation state of a single copy.
//!
//! Implemented state machine:
//!
//! ```text
//!  Available ──borrow──► Held(holder, due)
//!      ▲                    │
//!      └──return (queue empty)
//!                           │
//!        Held(next, today + loan days) ◄──return (queue non-empty)
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use circulation_rs::{BookCopy, CatalogKey, Category, ManualClock};
//!
//! let clock = ManualClock::starting_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
//! let copy = BookCopy::new(
//!     CatalogKey::new("978-0451524935").unwrap(),
//!     "1984",
//!     "George Orwell",
//!     1949,
//!     Category::Fiction,
//! )
//! .unwrap();
//!
//! assert!(copy.borrow("Alice", 14, &clock).unwrap());
//! assert!(!copy.borrow("Bob", 14, &clock).unwrap());
//! assert!(copy.reserve("Bob").unwrap());
//! assert!(copy.return_copy(14, &clock));
//! assert_eq!(copy.holder().as_deref(), Some("Bob"));
//! ```

use crate::base::{CatalogKey, require_text};
use crate::category::Category;
use crate::clock::Clock;
use crate::error::CirculationError;
use crate::fine::Fine;
use crate::money::Money;
use crate::policy::FinePolicy;
use crate::reservation_queue::ReservationQueue;
use chrono::{DateTime, Days, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Default loan period in days.
pub const DEFAULT_LOAN_DAYS: u32 = 14;

/// An active loan: who holds the copy and when it is due back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loan {
    pub(crate) holder: String,
    pub(crate) due_date: NaiveDate,
}

impl Loan {
    fn starting(holder: &str, today: NaiveDate, days: u32) -> Self {
        Self {
            holder: holder.to_string(),
            due_date: today
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// Whole days past the due date, or zero if not yet overdue.
    pub fn days_overdue(&self, today: NaiveDate) -> u64 {
        u64::try_from((today - self.due_date).num_days()).unwrap_or(0)
    }
}

/// Circulation status of a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CopyStatus {
    Available,
    Held(Loan),
}

#[derive(Debug)]
struct CopyData {
    /// `Some` iff the copy is held; carries the due date.
    loan: Option<Loan>,
    reservations: ReservationQueue,
    rating: f64,
    read_count: u32,
    /// Fine for the current or most recent overdue loan.
    fine: Option<Fine>,
}

impl CopyData {
    fn new() -> Self {
        Self {
            loan: None,
            reservations: ReservationQueue::new(),
            rating: 0.0,
            read_count: 0,
            fine: None,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.loan.is_some() || self.reservations.is_empty(),
            "Invariant violated: reservations queued on an available copy"
        );
        debug_assert!(
            self.fine
                .as_ref()
                .is_none_or(|fine| fine.amount_paid() <= fine.amount_due()),
            "Invariant violated: fine overpaid"
        );
    }

    fn hand_off(&mut self, person: &str, days: u32, today: NaiveDate) {
        self.loan = Some(Loan::starting(person, today, days));
        self.read_count = self.read_count.saturating_add(1);
    }

    fn borrow(&mut self, person: &str, days: u32, today: NaiveDate) -> bool {
        if self.loan.is_some() {
            return false;
        }
        self.hand_off(person, days, today);
        self.assert_invariants();
        true
    }

    /// Ends the current loan. Returns the next holder if the copy was handed
    /// to the head of the reservation queue, `None` if it became available.
    fn return_copy(&mut self, reassign_days: u32, today: NaiveDate) -> Option<Option<String>> {
        self.loan.take()?;
        let next = self.reservations.pop();
        if let Some(person) = &next {
            self.hand_off(person, reassign_days, today);
        }
        self.assert_invariants();
        Some(next)
    }

    fn reserve(&mut self, person: &str) -> bool {
        match &self.loan {
            Some(loan) if loan.holder != person => self.reservations.push(person),
            _ => false,
        }
    }

    fn days_overdue(&self, today: NaiveDate) -> u64 {
        self.loan
            .as_ref()
            .map_or(0, |loan| loan.days_overdue(today))
    }

    fn has_open_fine(&self) -> bool {
        self.fine.as_ref().is_some_and(|fine| !fine.is_settled())
    }
}

/// A circulation unit: one lendable copy of a title.
///
/// Descriptive fields are immutable; circulation state sits behind a mutex so
/// each operation on a copy is atomic.
#[derive(Debug)]
pub struct BookCopy {
    key: CatalogKey,
    title: String,
    author: String,
    year: i32,
    category: Category,
    inner: Mutex<CopyData>,
}

impl BookCopy {
    pub const YEAR_RANGE: RangeInclusive<i32> = 1..=9999;
    pub const RATING_RANGE: RangeInclusive<f64> = 0.0..=5.0;

    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `author` is
    /// blank or `year` is outside [`BookCopy::YEAR_RANGE`].
    pub fn new(
        key: CatalogKey,
        title: &str,
        author: &str,
        year: i32,
        category: Category,
    ) -> Result<Self, CirculationError> {
        let title = require_text(title, "title cannot be empty")?;
        let author = require_text(author, "author cannot be empty")?;
        if !Self::YEAR_RANGE.contains(&year) {
            return Err(CirculationError::InvalidArgument("publication year out of range"));
        }

        Ok(Self {
            key,
            title: title.to_string(),
            author: author.to_string(),
            year,
            category,
            inner: Mutex::new(CopyData::new()),
        })
    }

    pub fn key(&self) -> &CatalogKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn status(&self) -> CopyStatus {
        match &self.inner.lock().loan {
            Some(loan) => CopyStatus::Held(loan.clone()),
            None => CopyStatus::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.lock().loan.is_none()
    }

    pub fn holder(&self) -> Option<String> {
        self.inner.lock().loan.as_ref().map(|loan| loan.holder.clone())
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.inner.lock().loan.as_ref().map(|loan| loan.due_date)
    }

    pub fn rating(&self) -> f64 {
        self.inner.lock().rating
    }

    /// Sets the rating. Values outside [`BookCopy::RATING_RANGE`] are ignored.
    pub fn set_rating(&self, rating: f64) {
        if Self::RATING_RANGE.contains(&rating) {
            self.inner.lock().rating = rating;
        }
    }

    /// Number of times the copy has been handed to a reader.
    pub fn read_count(&self) -> u32 {
        self.inner.lock().read_count
    }

    /// Queued requester names, head first.
    pub fn reservations(&self) -> Vec<String> {
        self.inner
            .lock()
            .reservations
            .iter()
            .map(str::to_string)
            .collect()
    }

    pub fn reservation_count(&self) -> usize {
        self.inner.lock().reservations.len()
    }

    /// Lends an available copy to `person` for `days` days.
    ///
    /// Returns `Ok(false)` if the copy is already held; use [`BookCopy::reserve`]
    /// to queue for it instead.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `person` is blank or `days` is zero.
    pub fn borrow(&self, person: &str, days: u32, clock: &dyn Clock) -> Result<bool, CirculationError> {
        let person = require_text(person, "person name cannot be empty")?;
        if days == 0 {
            return Err(CirculationError::InvalidArgument("loan days must be positive"));
        }

        let borrowed = self.inner.lock().borrow(person, days, clock.today());
        if borrowed {
            tracing::debug!(key = %self.key, holder = person, days, "copy borrowed");
        }
        Ok(borrowed)
    }

    /// Ends the current loan.
    ///
    /// If anyone is queued, the copy passes straight to the head of the queue
    /// for `reassign_days` days. Returns `false` if the copy was not held.
    pub fn return_copy(&self, reassign_days: u32, clock: &dyn Clock) -> bool {
        let outcome = self.inner.lock().return_copy(reassign_days, clock.today());
        match outcome {
            Some(Some(next)) => {
                tracing::debug!(key = %self.key, holder = %next, "copy returned and handed to next reservation");
                true
            }
            Some(None) => {
                tracing::debug!(key = %self.key, "copy returned");
                true
            }
            None => false,
        }
    }

    /// Queues `person` for the copy while it is held.
    ///
    /// Returns `Ok(false)` if the copy is available, if `person` already holds
    /// it, or if `person` is already queued.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `person` is blank.
    pub fn reserve(&self, person: &str) -> Result<bool, CirculationError> {
        let person = require_text(person, "person name cannot be empty")?;
        let reserved = self.inner.lock().reserve(person);
        if reserved {
            tracing::debug!(key = %self.key, person, "reservation queued");
        }
        Ok(reserved)
    }

    /// Removes `person` from the reservation queue.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `person` is blank.
    pub fn cancel_reservation(&self, person: &str) -> Result<bool, CirculationError> {
        let person = require_text(person, "person name cannot be empty")?;
        let cancelled = self.inner.lock().reservations.remove(person);
        if cancelled {
            tracing::debug!(key = %self.key, person, "reservation cancelled");
        }
        Ok(cancelled)
    }

    /// Held and past the due date.
    pub fn is_overdue(&self, clock: &dyn Clock) -> bool {
        self.days_overdue(clock) > 0
    }

    pub fn days_overdue(&self, clock: &dyn Clock) -> u64 {
        self.inner.lock().days_overdue(clock.today())
    }

    pub fn current_fine(&self) -> Option<Fine> {
        self.inner.lock().fine.clone()
    }

    /// Replaces the stored fine.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if the fine was assessed for another copy.
    pub fn set_current_fine(&self, fine: Fine) -> Result<(), CirculationError> {
        if fine.key() != &self.key {
            return Err(CirculationError::InvalidArgument("fine belongs to a different copy"));
        }
        self.inner.lock().fine = Some(fine);
        Ok(())
    }

    /// A fine is stored and not yet settled.
    pub fn has_fine(&self) -> bool {
        self.inner.lock().has_open_fine()
    }

    /// Balance still owed on the stored fine, zero if none is open.
    pub fn outstanding_fine(&self) -> Money {
        let data = self.inner.lock();
        match &data.fine {
            Some(fine) if !fine.is_settled() => fine.amount_remaining(),
            _ => Money::ZERO,
        }
    }

    /// Point-in-time view of the copy for reporting.
    pub fn snapshot(&self, clock: &dyn Clock) -> CopySnapshot {
        let today = clock.today();
        let data = self.inner.lock();
        CopySnapshot {
            key: self.key.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            year: self.year,
            category: self.category,
            status: match &data.loan {
                Some(loan) => CopyStatus::Held(loan.clone()),
                None => CopyStatus::Available,
            },
            reservations: data.reservations.iter().map(str::to_string).collect(),
            rating: data.rating,
            read_count: data.read_count,
            days_overdue: data.days_overdue(today),
            fine: data.fine.clone(),
        }
    }

    /// Builds a fine for the current loan without storing it.
    pub(crate) fn draft_fine(
        &self,
        policy: &FinePolicy,
        now: DateTime<Utc>,
    ) -> Result<Fine, CirculationError> {
        let data = self.inner.lock();
        let loan = data.loan.as_ref().ok_or(CirculationError::NotOverdue)?;
        policy.fine_for_loan(&self.key, &self.title, loan, now)
    }

    /// Assesses (or re-assesses) the fine for the current loan and stores it.
    ///
    /// A fine already stored for the same loan keeps its payments and only has
    /// its amount recomputed; a waived fine for the same loan is left alone.
    /// A fine from an earlier loan is replaced even if still open, since a copy
    /// stores at most one fine. Returns `Ok(false)` if the copy is not overdue or the fine was waived.
    pub(crate) fn assess_fine(
        &self,
        policy: &FinePolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, CirculationError> {
        let mut data = self.inner.lock();
        let Some(loan) = data.loan.as_ref() else {
            return Ok(false);
        };
        if loan.days_overdue(now.date_naive()) == 0 {
            return Ok(false);
        }

        let fresh = policy.fine_for_loan(&self.key, &self.title, loan, now)?;
        let fine = match &data.fine {
            Some(existing) if existing.covers_loan(&loan.holder, loan.due_date) => {
                if existing.is_waived() {
                    return Ok(false);
                }
                existing.reassessed(fresh.days_overdue(), fresh.amount_due())?
            }
            Some(previous) if !previous.is_settled() => {
                tracing::warn!(
                    key = %self.key,
                    previous_borrower = previous.borrower(),
                    unpaid = %previous.amount_remaining(),
                    "open fine from an earlier loan replaced"
                );
                fresh
            }
            _ => fresh,
        };

        tracing::debug!(
            key = %self.key,
            borrower = fine.borrower(),
            days_overdue = fine.days_overdue(),
            amount_due = %fine.amount_due(),
            "fine assessed"
        );
        data.fine = Some(fine);
        data.assert_invariants();
        Ok(true)
    }

    /// Applies a payment to the stored fine. Returns `Ok(false)` if no fine is stored.
    pub(crate) fn pay_fine(&self, amount: Money, now: DateTime<Utc>) -> Result<bool, CirculationError> {
        let mut data = self.inner.lock();
        let Some(fine) = data.fine.as_ref() else {
            return Ok(false);
        };

        let paid = fine.with_payment(amount, now)?;
        tracing::debug!(
            key = %self.key,
            amount = %amount,
            remaining = %paid.amount_remaining(),
            "fine payment applied"
        );
        data.fine = Some(paid);
        data.assert_invariants();
        Ok(true)
    }

    /// Waives the stored fine. Returns `Ok(false)` if no fine is stored.
    pub(crate) fn waive_fine(&self, reason: &str, now: DateTime<Utc>) -> Result<bool, CirculationError> {
        let mut data = self.inner.lock();
        let Some(fine) = data.fine.as_ref() else {
            return Ok(false);
        };

        let waived = fine.with_waiver(reason, now)?;
        tracing::debug!(key = %self.key, reason = ?waived.waive_reason(), "fine waived");
        data.fine = Some(waived);
        Ok(true)
    }
}

/// Point-in-time view of a copy, safe to hand to reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopySnapshot {
    pub key: CatalogKey,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub category: Category,
    pub status: CopyStatus,
    pub reservations: Vec<String>,
    pub rating: f64,
    pub read_count: u32,
    pub days_overdue: u64,
    pub fine: Option<Fine>,
}

impl CopySnapshot {
    pub fn holder(&self) -> Option<&str> {
        match &self.status {
            CopyStatus::Held(loan) => Some(loan.holder()),
            CopyStatus::Available => None,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match &self.status {
            CopyStatus::Held(loan) => Some(loan.due_date()),
            CopyStatus::Available => None,
        }
    }

    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === CopyData Internal Tests ===
    // These test the private CopyData transitions directly.

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn copy_data_borrow_sets_due_date_and_read_count() {
        let mut data = CopyData::new();
        assert!(data.borrow("Alice", 14, day(1)));
        let loan = data.loan.as_ref().unwrap();
        assert_eq!(loan.holder, "Alice");
        assert_eq!(loan.due_date, day(15));
        assert_eq!(data.read_count, 1);
    }

    #[test]
    fn copy_data_borrow_while_held_is_rejected() {
        let mut data = CopyData::new();
        data.borrow("Alice", 14, day(1));
        assert!(!data.borrow("Bob", 14, day(2)));
        assert_eq!(data.loan.as_ref().unwrap().holder, "Alice");
        assert_eq!(data.read_count, 1);
    }

    #[test]
    fn copy_data_return_with_queue_hands_off() {
        let mut data = CopyData::new();
        data.borrow("Alice", 14, day(1));
        data.reserve("Bob");
        assert_eq!(data.return_copy(7, day(10)), Some(Some("Bob".to_string())));
        let loan = data.loan.as_ref().unwrap();
        assert_eq!(loan.holder, "Bob");
        assert_eq!(loan.due_date, day(17));
        assert_eq!(data.read_count, 2);
        assert!(data.reservations.is_empty());
    }

    #[test]
    fn copy_data_return_when_available_is_noop() {
        let mut data = CopyData::new();
        assert_eq!(data.return_copy(14, day(1)), None);
        assert_eq!(data.read_count, 0);
    }

    #[test]
    fn copy_data_holder_cannot_reserve_own_copy() {
        let mut data = CopyData::new();
        assert!(!data.reserve("Alice"));
        data.borrow("Alice", 14, day(1));
        assert!(!data.reserve("Alice"));
        assert!(data.reservations.is_empty());
    }

    #[test]
    fn loan_days_overdue_counts_calendar_days() {
        let loan = Loan::starting("Alice", day(1), 1);
        assert_eq!(loan.days_overdue(day(1)), 0);
        assert_eq!(loan.days_overdue(day(2)), 0);
        assert_eq!(loan.days_overdue(day(3)), 1);
        assert_eq!(loan.days_overdue(day(7)), 5);
    }
}
