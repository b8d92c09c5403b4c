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

//! Fine public API integration tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use circulation_rs::{CatalogKey, CirculationError, Fine, Money};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
}

fn make_fine(cents: u64) -> Fine {
    Fine::new(
        CatalogKey::new("isbn-1").unwrap(),
        "1984",
        "Alice",
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        5,
        Money::from_cents(cents),
        at(7),
    )
    .unwrap()
}

#[test]
fn payment_in_parts_equals_payment_at_once() {
    let fine = make_fine(250);
    let in_parts = fine
        .with_payment(Money::from_cents(150), at(8))
        .unwrap()
        .with_payment(Money::from_cents(100), at(9))
        .unwrap();
    let at_once = fine.with_payment(Money::from_cents(250), at(9)).unwrap();

    assert_eq!(in_parts.amount_paid(), at_once.amount_paid());
    assert!(in_parts.is_settled());
    assert!(at_once.is_settled());
}

#[test]
fn overpayment_is_rejected_without_changing_the_fine() {
    let fine = make_fine(250);
    assert_eq!(
        fine.with_payment(Money::from_cents(10_000), at(8)),
        Err(CirculationError::PaymentExceedsDue)
    );
    assert_eq!(fine.amount_paid(), Money::ZERO);

    let partial = fine.with_payment(Money::from_cents(200), at(8)).unwrap();
    assert_eq!(
        partial.with_payment(Money::from_cents(51), at(9)),
        Err(CirculationError::PaymentExceedsDue)
    );
    assert_eq!(partial.amount_remaining(), Money::from_cents(50));
}

#[test]
fn zero_payment_is_invalid() {
    let fine = make_fine(250);
    assert_eq!(
        fine.with_payment(Money::ZERO, at(8)),
        Err(CirculationError::InvalidArgument("payment must be positive"))
    );
}

#[test]
fn paid_fine_rejects_further_payment_and_waiver() {
    let paid = make_fine(250)
        .with_payment(Money::from_cents(250), at(8))
        .unwrap();
    assert_eq!(paid.paid_at(), Some(at(8)));
    assert_eq!(
        paid.with_payment(Money::from_cents(1), at(9)),
        Err(CirculationError::FineAlreadyPaid)
    );
    assert_eq!(
        paid.with_waiver("goodwill", at(9)),
        Err(CirculationError::FineAlreadyPaid)
    );
}

#[test]
fn waiver_settles_and_blocks_payment() {
    let fine = make_fine(250)
        .with_payment(Money::from_cents(100), at(8))
        .unwrap();
    let waived = fine.with_waiver("  hardship  ", at(9)).unwrap();

    assert!(waived.is_waived());
    assert!(waived.is_settled());
    assert_eq!(waived.waive_reason(), Some("hardship"));
    assert_eq!(waived.paid_at(), Some(at(9)));
    assert_eq!(waived.amount_paid(), Money::from_cents(100));

    assert_eq!(
        waived.with_payment(Money::from_cents(50), at(10)),
        Err(CirculationError::FineAlreadyWaived)
    );
    assert_eq!(
        waived.with_waiver("again", at(10)),
        Err(CirculationError::FineAlreadyWaived)
    );
}

#[test]
fn waiver_requires_reason() {
    let fine = make_fine(250);
    assert_eq!(
        fine.with_waiver("   ", at(8)),
        Err(CirculationError::InvalidArgument("waiver reason cannot be empty"))
    );
    assert!(!fine.is_waived());
}

#[test]
fn snapshot_fields_survive_transitions() {
    let fine = make_fine(250);
    let paid = fine.with_payment(Money::from_cents(250), at(8)).unwrap();

    assert_eq!(paid.key(), fine.key());
    assert_eq!(paid.title(), "1984");
    assert_eq!(paid.borrower(), "Alice");
    assert_eq!(paid.due_date(), fine.due_date());
    assert_eq!(paid.days_overdue(), 5);
    assert_eq!(paid.amount_due(), Money::from_cents(250));
    assert_eq!(paid.created_at(), at(7));
}
