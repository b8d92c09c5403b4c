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

//! Reservation queue with duplicate detection.
//!
//! Keeps requester names in FIFO order while guaranteeing that a name is
//! queued at most once at a time.

use std::collections::{HashSet, VecDeque};

/// A FIFO waiting list of requester names.
///
/// Combines a [`HashSet`] for O(1) duplicate checking with a [`VecDeque`]
/// to preserve insertion order. The queue is not synchronised on its own; it
/// lives inside a copy's lock.
#[derive(Debug, Clone, Default)]
pub struct ReservationQueue {
    /// Names currently queued, for duplicate detection.
    members: HashSet<String>,

    /// Names in the order they were queued.
    order: VecDeque<String>,
}

impl ReservationQueue {
    /// Creates a new empty reservation queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the tail.
    ///
    /// Returns `false` without changing the queue if `name` is already queued.
    pub fn push(&mut self, name: &str) -> bool {
        if !self.members.insert(name.to_string()) {
            return false;
        }
        self.order.push_back(name.to_string());
        true
    }

    /// Removes and returns the name at the head.
    pub fn pop(&mut self) -> Option<String> {
        let name = self.order.pop_front()?;
        self.members.remove(&name);
        Some(name)
    }

    /// Removes `name` from the queue. Returns `false` if it was not queued.
    pub fn remove(&mut self, name: &str) -> bool {
        if !self.members.remove(name) {
            return false;
        }
        self.order.retain(|queued| queued != name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over queued names from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_insertion_order() {
        let mut queue = ReservationQueue::new();
        assert!(queue.push("David"));
        assert!(queue.push("Eve"));
        assert!(queue.push("Frank"));
        assert_eq!(queue.pop().as_deref(), Some("David"));
        assert_eq!(queue.pop().as_deref(), Some("Eve"));
        assert_eq!(queue.pop().as_deref(), Some("Frank"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn rejects_duplicates_while_queued() {
        let mut queue = ReservationQueue::new();
        assert!(queue.push("David"));
        assert!(!queue.push("David"));
        assert_eq!(queue.len(), 1);

        // Once served, the same name may queue again.
        queue.pop();
        assert!(queue.push("David"));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut queue = ReservationQueue::new();
        queue.push("David");
        queue.push("Eve");
        queue.push("Frank");

        assert!(queue.remove("Eve"));
        assert!(!queue.remove("Eve"));
        assert!(!queue.contains("Eve"));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["David", "Frank"]);
    }
}
