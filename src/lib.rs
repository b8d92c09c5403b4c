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

//! # Circulation
//!
//! This library provides the lending core of a small library system: copies
//! that can be borrowed, returned, and reserved, and an immutable fine ledger
//! with partial payments and waivers.
//!
//! ## Core Components
//!
//! - [`Catalog`]: Aggregate owning all copies; the entry point for collaborators
//! - [`BookCopy`]: One lendable copy with its loan, reservation queue, and fine
//! - [`Fine`]: Immutable overdue assessment; payments and waivers yield new values
//! - [`FinePolicy`]: Per-day rate with a cap
//! - [`Money`]: Exact two-digit decimal amounts
//! - [`Clock`]: Injected time source ([`SystemClock`], [`ManualClock`])
//! - [`CirculationError`]: Validation and rule-violation errors
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use circulation_rs::{
//!     BookCopy, Catalog, CatalogKey, Category, CirculationConfig, ManualClock, Money,
//! };
//!
//! let clock = Arc::new(ManualClock::starting_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
//! let catalog = Catalog::with_config("City Library", &CirculationConfig::default(), clock.clone())
//!     .unwrap();
//!
//! let copy = BookCopy::new(
//!     CatalogKey::new("978-0451524935").unwrap(),
//!     "1984",
//!     "George Orwell",
//!     1949,
//!     Category::Fiction,
//! )
//! .unwrap();
//! assert!(catalog.add(copy));
//!
//! // Borrow for one day, then keep it five days past the due date.
//! assert!(catalog.borrow_for("1984", "Alice", 1).unwrap());
//! clock.advance_days(6);
//! assert!(catalog.assess_fine("1984").unwrap());
//! assert_eq!(catalog.total_unpaid_fines(), Money::from_cents(250));
//!
//! assert!(catalog.pay_fine("1984", Money::from_cents(250)).unwrap());
//! assert_eq!(catalog.total_unpaid_fines(), Money::ZERO);
//! ```
//!
//! ## Thread Safety
//!
//! Each copy guards its circulation state with its own lock, and the catalog
//! handles concurrent access to copies, so concurrent borrows of the same
//! title are serialised and at most one succeeds.

mod base;
pub mod catalog;
mod category;
mod clock;
mod config;
pub mod copy;
pub mod error;
pub mod fine;
mod money;
pub mod policy;
mod reservation_queue;

pub use base::CatalogKey;
pub use catalog::Catalog;
pub use category::Category;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CirculationConfig;
pub use copy::{BookCopy, CopySnapshot, CopyStatus, DEFAULT_LOAN_DAYS, Loan};
pub use error::CirculationError;
pub use fine::Fine;
pub use money::Money;
pub use policy::FinePolicy;
pub use reservation_queue::ReservationQueue;
