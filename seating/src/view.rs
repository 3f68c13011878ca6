//! Derived view model: seats, order summary and legend counts.
//!
//! Nothing here is stored. Every call recomputes from the seat map and the
//! current selection.

use crate::seat_map::SeatMapData;
use crate::types::{Money, Seat, SeatCategory, SeatId, SeatStatus};
use serde::{Deserialize, Serialize};

/// Derive one seat, or `None` if the id is outside the grid
///
/// Status precedence is booked, then locked, then selected, then available.
#[must_use]
pub fn derive_seat(map: &SeatMapData, selection: &[SeatId], id: SeatId) -> Option<Seat> {
    if !map.contains(id) {
        return None;
    }

    let status = if map.is_booked(id) {
        SeatStatus::Booked
    } else if map.is_locked(id) {
        SeatStatus::Locked
    } else if selection.contains(&id) {
        SeatStatus::Selected
    } else {
        SeatStatus::Available
    };

    Some(Seat {
        id,
        category: map.category_of(id),
        status,
        price: map.price_of(id),
    })
}

/// Derive every seat, row-major
#[must_use]
pub fn derive_seats(map: &SeatMapData, selection: &[SeatId]) -> Vec<Seat> {
    map.seat_ids()
        .filter_map(|id| derive_seat(map, selection, id))
        .collect()
}

/// One line of the order summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    /// Selected seat
    pub seat_id: SeatId,
    /// Its category
    pub category: SeatCategory,
    /// Its price
    pub price: Money,
}

/// Order summary for the current selection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSummary {
    /// Number of selected seats
    pub count: usize,
    /// Sum of the seat prices
    pub total: Money,
    /// Selected seats in selection order
    pub seats: Vec<SummaryLine>,
}

impl SelectionSummary {
    /// Build the summary for a selection
    #[must_use]
    pub fn from_selection(map: &SeatMapData, selection: &[SeatId]) -> Self {
        let seats: Vec<SummaryLine> = selection
            .iter()
            .filter_map(|&seat_id| {
                let price = map.price_of(seat_id)?;
                Some(SummaryLine {
                    seat_id,
                    category: map.category_of(seat_id),
                    price,
                })
            })
            .collect();

        Self {
            count: seats.len(),
            total: seats.iter().map(|line| line.price).sum(),
            seats,
        }
    }

    /// Whether nothing is selected
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Legend counts for the seat map
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMapStats {
    /// Selectable seats not in the selection
    pub available: usize,
    /// Seats in the selection
    pub selected: usize,
    /// Sold seats
    pub booked: usize,
    /// Seats held by other users
    pub locked: usize,
    /// Disabled seats
    pub disabled: usize,
    /// VIP seats, whatever their status
    pub vip: usize,
}

impl SeatMapStats {
    /// Count seats by status and category
    ///
    /// A disabled seat counts as disabled rather than available.
    #[must_use]
    pub fn from_seats(seats: &[Seat]) -> Self {
        seats.iter().fold(Self::default(), |mut stats, seat| {
            if seat.category == SeatCategory::Vip {
                stats.vip += 1;
            }
            match seat.status {
                SeatStatus::Booked => stats.booked += 1,
                SeatStatus::Locked => stats.locked += 1,
                SeatStatus::Selected => stats.selected += 1,
                SeatStatus::Available if seat.category == SeatCategory::Disabled => {
                    stats.disabled += 1;
                },
                SeatStatus::Available => stats.available += 1,
            }
            stats
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Pricing, ShowingId};

    fn seat(label: &str) -> SeatId {
        label.parse().unwrap()
    }

    fn map() -> SeatMapData {
        SeatMapData::builder(ShowingId::new(), 2, 3)
            .vip_rows([1])
            .disabled([seat("A3")])
            .booked([seat("B1")])
            .locked([seat("A2")])
            .pricing(Pricing::new(Money::from_cents(1_000), Money::from_cents(2_500)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_status_precedence() {
        let map = map();
        // a seat in the selection that is also booked shows as booked
        let selection = [seat("A1"), seat("B1")];
        assert_eq!(derive_seat(&map, &selection, seat("A1")).unwrap().status, SeatStatus::Selected);
        assert_eq!(derive_seat(&map, &selection, seat("B1")).unwrap().status, SeatStatus::Booked);
        assert_eq!(derive_seat(&map, &selection, seat("A2")).unwrap().status, SeatStatus::Locked);
        assert_eq!(derive_seat(&map, &selection, seat("B2")).unwrap().status, SeatStatus::Available);
        assert!(derive_seat(&map, &selection, seat("C1")).is_none());
    }

    #[test]
    fn test_derive_seats_covers_grid() {
        let seats = derive_seats(&map(), &[]);
        assert_eq!(seats.len(), 6);
        assert_eq!(seats[0].id, seat("A1"));
        assert_eq!(seats[5].id, seat("B3"));
        assert_eq!(seats[2].price, None);
        assert_eq!(seats[4].price, Some(Money::from_cents(2_500)));
    }

    #[test]
    fn test_summary_keeps_selection_order() {
        let map = map();
        let summary = SelectionSummary::from_selection(&map, &[seat("B3"), seat("A1")]);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, Money::from_cents(3_500));
        assert_eq!(summary.seats[0].seat_id, seat("B3"));
        assert_eq!(summary.seats[0].category, SeatCategory::Vip);
        assert_eq!(summary.seats[1].seat_id, seat("A1"));
        assert!(SelectionSummary::from_selection(&map, &[]).is_empty());
    }

    #[test]
    fn test_stats() {
        let map = map();
        let stats = SeatMapStats::from_seats(&derive_seats(&map, &[seat("A1")]));
        assert_eq!(
            stats,
            SeatMapStats {
                available: 2,
                selected: 1,
                booked: 1,
                locked: 1,
                disabled: 1,
                vip: 3,
            }
        );
    }
}
