//! Domain types for seat selection.
//!
//! Identifiers, seats and the money value object shared by the seat map,
//! the selection reducer and the push decoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a showing (one screening or event occurrence)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowingId(Uuid);

impl ShowingId {
    /// Creates a new random `ShowingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ShowingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Push topic carrying this showing's seat and booking events
    #[must_use]
    pub fn topic(&self) -> String {
        format!("showing:{}", self.0)
    }
}

impl Default for ShowingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShowingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seat identifiers
// ============================================================================

/// Errors from parsing a seat label such as `B12`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatIdParseError {
    /// The label has no row letters
    #[error("Seat label '{0}' has no row letters")]
    MissingRow(String),

    /// The label has no seat number, or it is not a positive integer
    #[error("Seat label '{0}' has no valid seat number")]
    InvalidNumber(String),

    /// The row letters describe a row beyond the supported range
    #[error("Seat label '{0}' has too many row letters")]
    RowOverflow(String),
}

/// A seat position: zero-based row index and one-based seat number
///
/// Labels use spreadsheet-style row letters, so row 0 is `A`, row 25 is `Z`
/// and row 26 is `AA`. Seats order row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    row: u32,
    number: u32,
}

impl SeatId {
    /// Creates a `SeatId` from a zero-based row and one-based number
    #[must_use]
    pub const fn new(row: u32, number: u32) -> Self {
        Self { row, number }
    }

    /// Zero-based row index
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// One-based seat number within the row
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Row letters for a zero-based row index (`0` → `A`, `26` → `AA`)
    #[must_use]
    pub fn row_label(row: u32) -> String {
        let mut letters = Vec::new();
        let mut n = u64::from(row) + 1;
        while n > 0 {
            n -= 1;
            // n % 26 < 26, so the cast is lossless
            #[allow(clippy::cast_possible_truncation)]
            letters.push(char::from(b'A' + (n % 26) as u8));
            n /= 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::row_label(self.row), self.number)
    }
}

impl FromStr for SeatId {
    type Err = SeatIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let split = label
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(label.len());
        let (letters, digits) = label.split_at(split);

        if letters.is_empty() {
            return Err(SeatIdParseError::MissingRow(s.to_string()));
        }

        let mut row: u64 = 0;
        for c in letters.chars() {
            let value = u64::from(c.to_ascii_uppercase()) - u64::from('A') + 1;
            row = row
                .checked_mul(26)
                .and_then(|r| r.checked_add(value))
                .filter(|r| *r <= u64::from(u32::MAX))
                .ok_or_else(|| SeatIdParseError::RowOverflow(s.to_string()))?;
        }
        let row = u32::try_from(row - 1).map_err(|_| SeatIdParseError::RowOverflow(s.to_string()))?;

        // u32::from_str tolerates a leading '+', labels do not
        let number: u32 = Some(digits)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|d| d.parse().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| SeatIdParseError::InvalidNumber(s.to_string()))?;

        Ok(Self { row, number })
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(id: SeatId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, clamping at the maximum
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat category, fixed by the seat map layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatCategory {
    /// Standard seat
    Regular,
    /// Premium row
    Vip,
    /// Not sellable (wheelchair space, blocked view)
    Disabled,
}

/// Seat status as seen by the current user
///
/// Exactly one applies at a time. `Selected` means held or being held by
/// the current user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// Free to select
    Available,
    /// In the current user's selection
    Selected,
    /// Sold
    Booked,
    /// Held by someone else
    Locked,
}

/// Per-category seat prices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price of a regular seat
    pub regular: Money,
    /// Price of a VIP seat
    pub vip: Money,
}

impl Pricing {
    /// Creates a new `Pricing`
    #[must_use]
    pub const fn new(regular: Money, vip: Money) -> Self {
        Self { regular, vip }
    }

    /// Price for a category, `None` for seats that cannot be sold
    #[must_use]
    pub const fn price_for(&self, category: SeatCategory) -> Option<Money> {
        match category {
            SeatCategory::Regular => Some(self.regular),
            SeatCategory::Vip => Some(self.vip),
            SeatCategory::Disabled => None,
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(Money::from_cents(1_200), Money::from_cents(2_000))
    }
}

/// One seat of the derived view model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Position
    pub id: SeatId,
    /// Category from the layout
    pub category: SeatCategory,
    /// Current status
    pub status: SeatStatus,
    /// Price, `None` for disabled seats
    pub price: Option<Money>,
}

impl Seat {
    /// Whether a click on this seat may be dispatched
    #[must_use]
    pub fn is_clickable(&self) -> bool {
        self.category != SeatCategory::Disabled
            && matches!(self.status, SeatStatus::Available | SeatStatus::Selected)
    }
}
