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

//! Catalog of lendable copies.
//!
//! The [`Catalog`] owns every [`BookCopy`] and is the only surface
//! collaborators use to change circulation state. Operations name a copy by
//! title, resolve it, and delegate to the copy.
//!
//! # Outcomes
//!
//! Mutating operations return `Result<bool, CirculationError>`:
//!
//! - `Ok(true)` - the operation was applied.
//! - `Ok(false)` - nothing to do: unknown title, or the copy is not in a state
//!   the operation applies to.
//! - `Err(_)` - malformed input, or a call that would break a fine invariant
//!   (overpayment, paying a waived fine, waiving a paid one).
//!
//! # Thread Safety
//!
//! Copies are stored in a [`DashMap`] and each copy guards its own state, so
//! operations on different copies run in parallel while operations on the
//! same copy are serialised. No operation holds more than one copy lock.

use crate::base::{CatalogKey, require_text};
use crate::clock::{Clock, SystemClock};
use crate::config::CirculationConfig;
use crate::copy::{BookCopy, CopySnapshot, DEFAULT_LOAN_DAYS};
use crate::error::CirculationError;
use crate::money::Money;
use crate::policy::FinePolicy;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::Ref;
use std::cmp::Reverse;
use std::sync::Arc;

/// The aggregate owning all copies and the fine policy.
///
/// # Invariants
///
/// - Catalog keys are unique.
/// - Title lookups are case-insensitive; when several copies share a title the
///   one with the smallest key is used.
pub struct Catalog {
    name: String,
    /// Copies indexed by catalog key.
    copies: DashMap<CatalogKey, BookCopy>,
    policy: FinePolicy,
    loan_days: u32,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    /// Creates an empty catalog with the default fine policy, the default loan
    /// period, and the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `name` is blank.
    pub fn new(name: &str) -> Result<Self, CirculationError> {
        Self::with_policy(name, FinePolicy::default(), DEFAULT_LOAN_DAYS, Arc::new(SystemClock))
    }

    /// Creates an empty catalog from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `name` is blank or the
    /// loan period is zero, and [`CirculationError::InvalidPolicy`] for an
    /// invalid fine rate or cap.
    pub fn with_config(
        name: &str,
        config: &CirculationConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CirculationError> {
        config.validate()?;
        Self::with_policy(name, config.fine_policy()?, config.loan_days, clock)
    }

    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `name` is blank or
    /// `loan_days` is zero.
    pub fn with_policy(
        name: &str,
        policy: FinePolicy,
        loan_days: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CirculationError> {
        let name = require_text(name, "catalog name cannot be empty")?;
        if loan_days == 0 {
            return Err(CirculationError::InvalidArgument("loan days must be positive"));
        }

        Ok(Self {
            name: name.to_string(),
            copies: DashMap::new(),
            policy,
            loan_days,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &FinePolicy {
        &self.policy
    }

    /// Default loan period, also used when a returned copy passes to the next reservation.
    pub fn loan_days(&self) -> u32 {
        self.loan_days
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Adds a copy. Returns `false` without changes if its key is already present.
    pub fn add(&self, copy: BookCopy) -> bool {
        // Entry API makes check-and-insert atomic across threads.
        match self.copies.entry(copy.key().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                tracing::debug!(key = %copy.key(), title = copy.title(), "copy added");
                entry.insert(copy);
                true
            }
        }
    }

    /// Removes the copy stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `key` is blank.
    pub fn remove(&self, key: &str) -> Result<bool, CirculationError> {
        let key = CatalogKey::new(key)?;
        let removed = self.copies.remove(&key).is_some();
        if removed {
            tracing::debug!(%key, "copy removed");
        }
        Ok(removed)
    }

    /// Retrieves a copy by key.
    pub fn get(&self, key: &CatalogKey) -> Option<Ref<'_, CatalogKey, BookCopy>> {
        self.copies.get(key)
    }

    /// Finds a copy by title, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` is blank.
    pub fn find_by_title(
        &self,
        title: &str,
    ) -> Result<Option<Ref<'_, CatalogKey, BookCopy>>, CirculationError> {
        Ok(self
            .key_for_title(title)?
            .and_then(|key| self.copies.get(&key)))
    }

    fn key_for_title(&self, title: &str) -> Result<Option<CatalogKey>, CirculationError> {
        let wanted = require_text(title, "title cannot be empty")?.to_lowercase();
        // Keys are cloned out so no shard lock outlives the scan.
        Ok(self
            .copies
            .iter()
            .filter(|entry| entry.value().title().to_lowercase() == wanted)
            .map(|entry| entry.key().clone())
            .min())
    }

    /// Resolves `title` and runs `op` on the matching copy; `Ok(None)` if not found.
    fn with_copy<T>(
        &self,
        title: &str,
        op: impl FnOnce(&BookCopy) -> Result<T, CirculationError>,
    ) -> Result<Option<T>, CirculationError> {
        match self.find_by_title(title)? {
            Some(copy) => op(copy.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Lends the copy titled `title` to `person` for the default loan period.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `person` is blank.
    pub fn borrow(&self, title: &str, person: &str) -> Result<bool, CirculationError> {
        self.borrow_for(title, person, self.loan_days)
    }

    /// Lends the copy titled `title` to `person` for `days` days.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `person` is
    /// blank or `days` is zero.
    pub fn borrow_for(&self, title: &str, person: &str, days: u32) -> Result<bool, CirculationError> {
        require_text(person, "person name cannot be empty")?;
        if days == 0 {
            return Err(CirculationError::InvalidArgument("loan days must be positive"));
        }
        Ok(self
            .with_copy(title, |copy| copy.borrow(person, days, self.clock()))?
            .unwrap_or(false))
    }

    /// Returns the copy titled `title`, handing it to the next reservation if any.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` is blank.
    pub fn return_copy(&self, title: &str) -> Result<bool, CirculationError> {
        Ok(self
            .with_copy(title, |copy| Ok(copy.return_copy(self.loan_days, self.clock())))?
            .unwrap_or(false))
    }

    /// Queues `person` for the held copy titled `title`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `person` is blank.
    pub fn reserve(&self, title: &str, person: &str) -> Result<bool, CirculationError> {
        require_text(person, "person name cannot be empty")?;
        Ok(self
            .with_copy(title, |copy| copy.reserve(person))?
            .unwrap_or(false))
    }

    /// Removes `person` from the reservation queue of the copy titled `title`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` or `person` is blank.
    pub fn cancel_reservation(&self, title: &str, person: &str) -> Result<bool, CirculationError> {
        require_text(person, "person name cannot be empty")?;
        Ok(self
            .with_copy(title, |copy| copy.cancel_reservation(person))?
            .unwrap_or(false))
    }

    /// Reservation queue of the copy titled `title`, head first.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` is blank.
    pub fn reservations(&self, title: &str) -> Result<Option<Vec<String>>, CirculationError> {
        self.with_copy(title, |copy| Ok(copy.reservations()))
    }

    /// Rates the copy titled `title`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` is blank or
    /// `rating` is outside 0.0..=5.0.
    pub fn rate(&self, title: &str, rating: f64) -> Result<bool, CirculationError> {
        if !BookCopy::RATING_RANGE.contains(&rating) {
            return Err(CirculationError::InvalidArgument("rating must be between 0.0 and 5.0"));
        }
        Ok(self
            .with_copy(title, |copy| {
                copy.set_rating(rating);
                Ok(true)
            })?
            .unwrap_or(false))
    }

    /// Assesses the fine for the copy titled `title` and stores it on the copy.
    ///
    /// Returns `Ok(false)` if the title is unknown, the copy is not overdue, or
    /// the fine for the current loan was waived.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `title` is blank.
    pub fn assess_fine(&self, title: &str) -> Result<bool, CirculationError> {
        let now = self.clock.now();
        Ok(self
            .with_copy(title, |copy| copy.assess_fine(&self.policy, now))?
            .unwrap_or(false))
    }

    /// Assesses fines for every overdue copy. Returns how many fines were stored.
    ///
    /// Re-running at the same instant recomputes the same amounts. A copy whose
    /// stored fine cannot be re-assessed (for instance when the clock moved
    /// backwards after a payment) keeps its fine and is logged and skipped.
    pub fn assess_all_fines(&self) -> usize {
        let now = self.clock.now();
        let mut assessed = 0;
        for key in self.sorted_keys() {
            let Some(copy) = self.copies.get(&key) else {
                continue;
            };
            match copy.assess_fine(&self.policy, now) {
                Ok(true) => assessed += 1,
                Ok(false) => {}
                Err(error) => tracing::warn!(%key, %error, "fine re-assessment skipped"),
            }
        }
        tracing::info!(assessed, "overdue fines assessed");
        assessed
    }

    /// Applies a payment to the fine of the copy titled `title`.
    ///
    /// Returns `Ok(false)` if the title is unknown or the copy has no fine.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::InvalidArgument`] - blank title or zero amount.
    /// - [`CirculationError::PaymentExceedsDue`] - amount is larger than the remaining balance.
    /// - [`CirculationError::FineAlreadyPaid`] - the fine is already fully paid.
    /// - [`CirculationError::FineAlreadyWaived`] - the fine was waived.
    pub fn pay_fine(&self, title: &str, amount: Money) -> Result<bool, CirculationError> {
        if amount.is_zero() {
            return Err(CirculationError::InvalidArgument("payment amount must be positive"));
        }
        let now = self.clock.now();
        self.with_copy(title, |copy| copy.pay_fine(amount, now))
            .inspect_err(|error| tracing::warn!(title, %amount, %error, "fine payment rejected"))
            .map(|paid| paid.unwrap_or(false))
    }

    /// Waives the fine of the copy titled `title`.
    ///
    /// Returns `Ok(false)` if the title is unknown or the copy has no fine.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::InvalidArgument`] - blank title or reason.
    /// - [`CirculationError::FineAlreadyPaid`] - the fine is already fully paid.
    /// - [`CirculationError::FineAlreadyWaived`] - the fine was already waived.
    pub fn waive_fine(&self, title: &str, reason: &str) -> Result<bool, CirculationError> {
        require_text(reason, "waiver reason cannot be empty")?;
        let now = self.clock.now();
        self.with_copy(title, |copy| copy.waive_fine(reason, now))
            .inspect_err(|error| tracing::warn!(title, %error, "fine waiver rejected"))
            .map(|waived| waived.unwrap_or(false))
    }

    // === Queries ===

    fn sorted_keys(&self) -> Vec<CatalogKey> {
        let mut keys: Vec<CatalogKey> = self.copies.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Snapshot of one copy.
    pub fn snapshot(&self, key: &CatalogKey) -> Option<CopySnapshot> {
        self.copies.get(key).map(|copy| copy.snapshot(self.clock()))
    }

    /// Snapshots of all copies, ordered by key.
    pub fn snapshots(&self) -> Vec<CopySnapshot> {
        let mut snapshots: Vec<CopySnapshot> = self
            .copies
            .iter()
            .map(|entry| entry.value().snapshot(self.clock()))
            .collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }

    fn snapshots_where(&self, keep: impl Fn(&CopySnapshot) -> bool) -> Vec<CopySnapshot> {
        self.snapshots().into_iter().filter(|s| keep(s)).collect()
    }

    pub fn available(&self) -> Vec<CopySnapshot> {
        self.snapshots_where(|s| s.holder().is_none())
    }

    pub fn borrowed(&self) -> Vec<CopySnapshot> {
        self.snapshots_where(|s| s.holder().is_some())
    }

    /// Available and borrowed counts taken in a single pass.
    fn circulation_counts(&self) -> (usize, usize) {
        self.copies
            .iter()
            .fold((0, 0), |(available, borrowed), entry| {
                if entry.is_available() {
                    (available + 1, borrowed)
                } else {
                    (available, borrowed + 1)
                }
            })
    }

    pub fn available_count(&self) -> usize {
        self.circulation_counts().0
    }

    pub fn borrowed_count(&self) -> usize {
        self.circulation_counts().1
    }

    pub fn overdue(&self) -> Vec<CopySnapshot> {
        self.snapshots_where(CopySnapshot::is_overdue)
    }

    /// Copies carrying an open (unsettled) fine.
    pub fn with_fines(&self) -> Vec<CopySnapshot> {
        self.snapshots_where(|s| s.fine.as_ref().is_some_and(|fine| !fine.is_settled()))
    }

    /// Sum of the remaining balances of all open fines.
    pub fn total_unpaid_fines(&self) -> Money {
        self.copies.iter().map(|entry| entry.outstanding_fine()).sum()
    }

    /// Copies rated at least `min_rating`.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `min_rating` is outside 0.0..=5.0.
    pub fn by_minimum_rating(&self, min_rating: f64) -> Result<Vec<CopySnapshot>, CirculationError> {
        if !BookCopy::RATING_RANGE.contains(&min_rating) {
            return Err(CirculationError::InvalidArgument("rating must be between 0.0 and 5.0"));
        }
        Ok(self.snapshots_where(|s| s.rating >= min_rating))
    }

    /// Up to `count` of the most-read copies, most read first.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `count` is zero.
    pub fn most_popular(&self, count: usize) -> Result<Vec<CopySnapshot>, CirculationError> {
        if count == 0 {
            return Err(CirculationError::InvalidArgument("count must be positive"));
        }
        let mut read = self.snapshots_where(|s| s.read_count > 0);
        // Stable sort keeps key order among ties.
        read.sort_by_key(|s| Reverse(s.read_count));
        read.truncate(count);
        Ok(read)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("name", &self.name)
            .field("copies", &self.copies.len())
            .field("policy", &self.policy)
            .field("loan_days", &self.loan_days)
            .finish_non_exhaustive()
    }
}
