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

//! Time source for due dates and fine timestamps.
//!
//! Circulation logic never reads wall-clock time directly; it asks a
//! [`Clock`]. Production code uses [`SystemClock`], tests and replay tools
//! use [`ManualClock`] to pin or advance time deterministically.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use std::fmt;

/// A source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date (UTC).
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Creates a clock set to midnight UTC of `date`.
    pub fn starting_on(date: NaiveDate) -> Self {
        Self::new(midnight(date))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Moves the clock to midnight UTC of `date`.
    pub fn set_date(&self, date: NaiveDate) {
        self.set(midnight(date));
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: u64) {
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add_days(Days::new(days)) {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn manual_clock_starts_at_midnight() {
        let clock = ManualClock::starting_on(date(2025, 3, 1));
        assert_eq!(clock.today(), date(2025, 3, 1));
        assert_eq!(clock.now().to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_advances_across_month_boundary() {
        let clock = ManualClock::starting_on(date(2025, 2, 27));
        clock.advance_days(3);
        assert_eq!(clock.today(), date(2025, 3, 2));
    }

    #[test]
    fn manual_clock_can_be_reset() {
        let clock = ManualClock::starting_on(date(2025, 1, 1));
        clock.advance_days(10);
        clock.set_date(date(2024, 12, 31));
        assert_eq!(clock.today(), date(2024, 12, 31));
    }
}
