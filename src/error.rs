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

//! Error types for circulation and fine processing.
//!
//! Operations that can simply "not apply" (unknown title, copy already in the
//! requested state) report that through an `Ok(false)` return. The variants
//! below are reserved for malformed input and for calls that would break a
//! circulation or fine invariant.

use thiserror::Error;

/// Circulation processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CirculationError {
    /// Malformed input: empty names, non-positive counts or amounts,
    /// out-of-range ratings or years
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Subtraction would produce a negative amount of money
    #[error("money result would be negative")]
    NegativeResult,

    /// Fine policy parameters are inconsistent
    #[error("invalid fine policy: {0}")]
    InvalidPolicy(&'static str),

    /// A fine was requested for a copy that is not overdue
    #[error("copy is not overdue")]
    NotOverdue,

    /// Payment would push the amount paid above the amount due
    #[error("payment exceeds amount due")]
    PaymentExceedsDue,

    /// Payment or waiver attempted on a waived fine
    #[error("fine has already been waived")]
    FineAlreadyWaived,

    /// Payment or waiver attempted on a fully paid fine
    #[error("fine has already been paid")]
    FineAlreadyPaid,
}
