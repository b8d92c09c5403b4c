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

//! Core identifier types for catalog copies.

use crate::error::CirculationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable catalog identifier of a copy (typically an ISBN).
///
/// Surrounding whitespace is trimmed; the remaining key must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogKey(String);

impl CatalogKey {
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidArgument`] if `key` is blank.
    pub fn new(key: &str) -> Result<Self, CirculationError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CirculationError::InvalidArgument("catalog key cannot be empty"));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CatalogKey {
    type Error = CirculationError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        CatalogKey::new(&key)
    }
}

impl From<CatalogKey> for String {
    fn from(key: CatalogKey) -> String {
        key.0
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims `value` and rejects it if nothing is left.
pub(crate) fn require_text<'a>(
    value: &'a str,
    message: &'static str,
) -> Result<&'a str, CirculationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CirculationError::InvalidArgument(message));
    }
    Ok(value)
}
