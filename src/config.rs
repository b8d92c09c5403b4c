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

//! Externally supplied circulation settings.

use crate::copy::DEFAULT_LOAN_DAYS;
use crate::error::CirculationError;
use crate::money::Money;
use crate::policy::FinePolicy;
use serde::{Deserialize, Serialize};

/// Fine rate, fine cap, and default loan period.
///
/// Missing fields fall back to the defaults ($0.50/day, $25.00 cap, 14 days).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CirculationConfig {
    pub rate_per_day: Money,
    pub max_fine: Money,
    pub loan_days: u32,
}

impl CirculationConfig {
    /// Builds the fine policy described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidPolicy`] if the rate or cap is invalid.
    pub fn fine_policy(&self) -> Result<FinePolicy, CirculationError> {
        FinePolicy::new(self.rate_per_day, self.max_fine)
    }

    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidPolicy`] for an invalid fine policy
    /// and [`CirculationError::InvalidArgument`] for a zero loan period.
    pub fn validate(&self) -> Result<(), CirculationError> {
        self.fine_policy()?;
        if self.loan_days == 0 {
            return Err(CirculationError::InvalidArgument("loan days must be positive"));
        }
        Ok(())
    }
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            rate_per_day: FinePolicy::DEFAULT_RATE_PER_DAY,
            max_fine: FinePolicy::DEFAULT_MAX_FINE,
            loan_days: DEFAULT_LOAN_DAYS,
        }
    }
}
