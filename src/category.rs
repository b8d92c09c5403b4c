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

//! Subject categories for catalog copies.

use crate::error::CirculationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of subject categories, each with a display name and description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Fiction,
    NonFiction,
    ScienceFiction,
    Mystery,
    Biography,
    History,
    Fantasy,
    Romance,
    Thriller,
    Classic,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Fiction,
        Category::NonFiction,
        Category::ScienceFiction,
        Category::Mystery,
        Category::Biography,
        Category::History,
        Category::Fantasy,
        Category::Romance,
        Category::Thriller,
        Category::Classic,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fiction => "Fiction",
            Self::NonFiction => "Non-Fiction",
            Self::ScienceFiction => "Science Fiction",
            Self::Mystery => "Mystery",
            Self::Biography => "Biography",
            Self::History => "History",
            Self::Fantasy => "Fantasy",
            Self::Romance => "Romance",
            Self::Thriller => "Thriller",
            Self::Classic => "Classic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Fiction => "Imaginative narratives and stories",
            Self::NonFiction => "Factual and informational books",
            Self::ScienceFiction => "Futuristic and speculative fiction",
            Self::Mystery => "Crime, detective, and suspenseful stories",
            Self::Biography => "Life stories and memoirs",
            Self::History => "Historical events and periods",
            Self::Fantasy => "Magical and supernatural worlds",
            Self::Romance => "Love stories and relationships",
            Self::Thriller => "Suspenseful and exciting narratives",
            Self::Classic => "Timeless literary works",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Accepts the display name or its kebab/snake spelling, case-insensitively.
impl FromStr for Category {
    type Err = CirculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        Category::ALL
            .into_iter()
            .find(|category| {
                let name: String = category
                    .display_name()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect();
                name == wanted
            })
            .ok_or(CirculationError::InvalidArgument("unknown category"))
    }
}
