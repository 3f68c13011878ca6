//! Static seat-map configuration for one showing.
//!
//! The layout (rows, seats per row, VIP rows, disabled seats, pricing) is
//! fixed for a session. The booked and locked sets are refreshed by push
//! events through the selection reducer.

use crate::types::{Money, Pricing, SeatCategory, SeatId, ShowingId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from validating a seat map
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatMapError {
    /// Zero rows or zero seats per row
    #[error("Seat map must have at least one row and one seat per row")]
    EmptyLayout,

    /// A seat id lies outside the grid
    #[error("Seat {seat} is outside the {rows}x{seats_per_row} grid")]
    SeatOutOfBounds {
        /// Offending seat
        seat: SeatId,
        /// Row count of the grid
        rows: u32,
        /// Seats per row of the grid
        seats_per_row: u32,
    },

    /// A VIP row lies outside the grid
    #[error("VIP row {row} is outside the grid of {rows} rows")]
    RowOutOfBounds {
        /// Offending row index
        row: u32,
        /// Row count of the grid
        rows: u32,
    },

    /// A seat is listed as both booked and locked
    #[error("Seat {0} is both booked and locked")]
    ConflictingStatus(SeatId),
}

/// Per-showing seat map
///
/// Deserialization goes through [`SeatMapBuilder::build`], so a decoded map
/// is as valid as a built one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SeatMapBuilder")]
pub struct SeatMapData {
    showing_id: ShowingId,
    rows: u32,
    seats_per_row: u32,
    vip_rows: BTreeSet<u32>,
    disabled_seats: BTreeSet<SeatId>,
    booked_seats: BTreeSet<SeatId>,
    locked_seats: BTreeSet<SeatId>,
    pricing: Pricing,
}

impl SeatMapData {
    /// Start building a seat map for a `rows` x `seats_per_row` grid
    #[must_use]
    pub fn builder(showing_id: ShowingId, rows: u32, seats_per_row: u32) -> SeatMapBuilder {
        SeatMapBuilder {
            showing_id,
            rows,
            seats_per_row,
            vip_rows: BTreeSet::new(),
            disabled_seats: BTreeSet::new(),
            booked_seats: BTreeSet::new(),
            locked_seats: BTreeSet::new(),
            pricing: Pricing::default(),
        }
    }

    /// Showing this map belongs to
    #[must_use]
    pub const fn showing_id(&self) -> ShowingId {
        self.showing_id
    }

    /// Number of rows
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Seats in every row
    #[must_use]
    pub const fn seats_per_row(&self) -> u32 {
        self.seats_per_row
    }

    /// Pricing table
    #[must_use]
    pub const fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// VIP row indices
    #[must_use]
    pub const fn vip_rows(&self) -> &BTreeSet<u32> {
        &self.vip_rows
    }

    /// Seats sold to anyone
    #[must_use]
    pub const fn booked_seats(&self) -> &BTreeSet<SeatId> {
        &self.booked_seats
    }

    /// Seats held by other users
    #[must_use]
    pub const fn locked_seats(&self) -> &BTreeSet<SeatId> {
        &self.locked_seats
    }

    /// Whether the id lies inside the grid
    #[must_use]
    pub const fn contains(&self, seat: SeatId) -> bool {
        seat.row() < self.rows && seat.number() >= 1 && seat.number() <= self.seats_per_row
    }

    /// Category of a seat inside the grid
    #[must_use]
    pub fn category_of(&self, seat: SeatId) -> SeatCategory {
        if self.disabled_seats.contains(&seat) {
            SeatCategory::Disabled
        } else if self.vip_rows.contains(&seat.row()) {
            SeatCategory::Vip
        } else {
            SeatCategory::Regular
        }
    }

    /// Price of a seat, `None` if it is disabled
    #[must_use]
    pub fn price_of(&self, seat: SeatId) -> Option<Money> {
        self.pricing.price_for(self.category_of(seat))
    }

    /// Whether the seat is sold
    #[must_use]
    pub fn is_booked(&self, seat: SeatId) -> bool {
        self.booked_seats.contains(&seat)
    }

    /// Whether the seat is held by someone else
    #[must_use]
    pub fn is_locked(&self, seat: SeatId) -> bool {
        self.locked_seats.contains(&seat)
    }

    /// Whether the seat is disabled
    #[must_use]
    pub fn is_disabled(&self, seat: SeatId) -> bool {
        self.disabled_seats.contains(&seat)
    }

    /// Every seat id, row-major
    pub fn seat_ids(&self) -> impl Iterator<Item = SeatId> + '_ {
        (0..self.rows)
            .flat_map(move |row| (1..=self.seats_per_row).map(move |number| SeatId::new(row, number)))
    }

    /// Total seats in the grid
    #[must_use]
    pub fn seat_count(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.seats_per_row)
    }

    pub(crate) fn mark_locked(&mut self, seat: SeatId) {
        self.booked_seats.remove(&seat);
        self.locked_seats.insert(seat);
    }

    pub(crate) fn mark_booked(&mut self, seat: SeatId) {
        self.locked_seats.remove(&seat);
        self.booked_seats.insert(seat);
    }

    pub(crate) fn mark_available(&mut self, seat: SeatId) {
        self.locked_seats.remove(&seat);
        self.booked_seats.remove(&seat);
    }

    pub(crate) fn release_booked(&mut self, seat: SeatId) {
        self.booked_seats.remove(&seat);
    }
}

/// Validating builder for [`SeatMapData`]
#[derive(Clone, Debug, Deserialize)]
#[must_use]
pub struct SeatMapBuilder {
    showing_id: ShowingId,
    rows: u32,
    seats_per_row: u32,
    #[serde(default)]
    vip_rows: BTreeSet<u32>,
    #[serde(default)]
    disabled_seats: BTreeSet<SeatId>,
    #[serde(default)]
    booked_seats: BTreeSet<SeatId>,
    #[serde(default)]
    locked_seats: BTreeSet<SeatId>,
    #[serde(default)]
    pricing: Pricing,
}

impl SeatMapBuilder {
    /// Mark rows as VIP
    pub fn vip_rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.vip_rows.extend(rows);
        self
    }

    /// Mark seats as disabled
    pub fn disabled(mut self, seats: impl IntoIterator<Item = SeatId>) -> Self {
        self.disabled_seats.extend(seats);
        self
    }

    /// Mark seats as already booked
    pub fn booked(mut self, seats: impl IntoIterator<Item = SeatId>) -> Self {
        self.booked_seats.extend(seats);
        self
    }

    /// Mark seats as already locked by other users
    pub fn locked(mut self, seats: impl IntoIterator<Item = SeatId>) -> Self {
        self.locked_seats.extend(seats);
        self
    }

    /// Set the pricing table
    pub const fn pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Validate and build the seat map
    ///
    /// # Errors
    ///
    /// Returns [`SeatMapError`] if the grid is empty, a listed seat or VIP
    /// row is outside it, or a seat is both booked and locked.
    pub fn build(self) -> Result<SeatMapData, SeatMapError> {
        if self.rows == 0 || self.seats_per_row == 0 {
            return Err(SeatMapError::EmptyLayout);
        }

        if let Some(&row) = self.vip_rows.iter().find(|row| **row >= self.rows) {
            return Err(SeatMapError::RowOutOfBounds {
                row,
                rows: self.rows,
            });
        }

        let in_grid = |seat: &SeatId| {
            seat.row() < self.rows && seat.number() >= 1 && seat.number() <= self.seats_per_row
        };
        if let Some(&seat) = self
            .disabled_seats
            .iter()
            .chain(&self.booked_seats)
            .chain(&self.locked_seats)
            .find(|seat| !in_grid(seat))
        {
            return Err(SeatMapError::SeatOutOfBounds {
                seat,
                rows: self.rows,
                seats_per_row: self.seats_per_row,
            });
        }

        if let Some(&seat) = self.booked_seats.intersection(&self.locked_seats).next() {
            return Err(SeatMapError::ConflictingStatus(seat));
        }

        Ok(SeatMapData {
            showing_id: self.showing_id,
            rows: self.rows,
            seats_per_row: self.seats_per_row,
            vip_rows: self.vip_rows,
            disabled_seats: self.disabled_seats,
            booked_seats: self.booked_seats,
            locked_seats: self.locked_seats,
            pricing: self.pricing,
        })
    }
}

impl TryFrom<SeatMapBuilder> for SeatMapData {
    type Error = SeatMapError;

    fn try_from(builder: SeatMapBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seat(label: &str) -> SeatId {
        label.parse().unwrap()
    }

    #[test]
    fn test_build_valid_map() {
        let map = SeatMapData::builder(ShowingId::new(), 3, 4)
            .vip_rows([2])
            .disabled([seat("A1")])
            .booked([seat("B2")])
            .locked([seat("B3")])
            .build()
            .unwrap();

        assert_eq!(map.seat_count(), 12);
        assert_eq!(map.category_of(seat("A1")), SeatCategory::Disabled);
        assert_eq!(map.category_of(seat("C1")), SeatCategory::Vip);
        assert_eq!(map.category_of(seat("B1")), SeatCategory::Regular);
        assert_eq!(map.price_of(seat("A1")), None);
        assert!(map.is_booked(seat("B2")));
        assert!(map.is_locked(seat("B3")));
        assert!(map.contains(seat("C4")));
        assert!(!map.contains(seat("C5")));
        assert!(!map.contains(seat("D1")));
    }

    #[test]
    fn test_seat_ids_are_row_major() {
        let map = SeatMapData::builder(ShowingId::new(), 2, 2).build().unwrap();
        let labels: Vec<String> = map.seat_ids().map(|id| id.to_string()).collect();
        assert_eq!(labels, vec!["A1", "A2", "B1", "B2"]);
    }

    #[test]
    fn test_empty_layout_rejected() {
        assert_eq!(
            SeatMapData::builder(ShowingId::new(), 0, 4).build(),
            Err(SeatMapError::EmptyLayout)
        );
        assert_eq!(
            SeatMapData::builder(ShowingId::new(), 4, 0).build(),
            Err(SeatMapError::EmptyLayout)
        );
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let err = SeatMapData::builder(ShowingId::new(), 1, 4)
            .booked([seat("A5")])
            .build()
            .unwrap_err();
        assert!(matches!(err, SeatMapError::SeatOutOfBounds { .. }));

        let err = SeatMapData::builder(ShowingId::new(), 1, 4)
            .vip_rows([1])
            .build()
            .unwrap_err();
        assert_eq!(err, SeatMapError::RowOutOfBounds { row: 1, rows: 1 });
    }

    #[test]
    fn test_conflicting_status_rejected() {
        let err = SeatMapData::builder(ShowingId::new(), 1, 4)
            .booked([seat("A2")])
            .locked([seat("A2")])
            .build()
            .unwrap_err();
        assert_eq!(err, SeatMapError::ConflictingStatus(seat("A2")));
    }

    #[test]
    fn test_status_updates_keep_sets_disjoint() {
        let mut map = SeatMapData::builder(ShowingId::new(), 1, 4).build().unwrap();
        map.mark_locked(seat("A1"));
        map.mark_booked(seat("A1"));
        assert!(map.is_booked(seat("A1")));
        assert!(!map.is_locked(seat("A1")));

        map.mark_locked(seat("A1"));
        assert!(!map.is_booked(seat("A1")));
        map.mark_available(seat("A1"));
        assert!(!map.is_locked(seat("A1")));
    }

    #[test]
    fn test_deserialize_round_trips_valid_map() {
        let map = SeatMapData::builder(ShowingId::new(), 2, 3)
            .vip_rows([1])
            .booked([seat("A1")])
            .locked([seat("B3")])
            .build()
            .unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(serde_json::from_str::<SeatMapData>(&json).unwrap(), map);
    }

    #[test]
    fn test_deserialize_validates_layout() {
        let showing_id = ShowingId::new();
        let empty = format!(r#"{{"showing_id":"{showing_id}","rows":0,"seats_per_row":4}}"#);
        let err = serde_json::from_str::<SeatMapData>(&empty).unwrap_err();
        assert!(err.to_string().contains("at least one row"), "{err}");

        let conflicting = format!(
            r#"{{"showing_id":"{showing_id}","rows":1,"seats_per_row":4,"booked_seats":["A2"],"locked_seats":["A2"]}}"#
        );
        let err = serde_json::from_str::<SeatMapData>(&conflicting).unwrap_err();
        assert!(err.to_string().contains("A2"), "{err}");
    }
}
