use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for hotels known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HotelId(pub String);

/// Identifier wrapper for room-inventory offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

/// Identifier wrapper for delegation allocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationId(pub String);

/// Identifier wrapper for delegations from the upstream directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegationId(pub String);

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DelegationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room category keyed by sleeping capacity. The category is the ledger key;
/// the bed count is only a display/interchange attribute.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    Single,
    Double,
    Triple,
    Quad,
}

impl RoomCategory {
    pub const fn ordered() -> [Self; 4] {
        [Self::Single, Self::Double, Self::Triple, Self::Quad]
    }

    pub const fn beds(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quad => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Triple => "Triple",
            Self::Quad => "Quad",
        }
    }

    pub fn from_beds(beds: u8) -> Option<Self> {
        match beds {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Quad),
            _ => None,
        }
    }
}

impl fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Draft,
    Confirmed,
    Rejected,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-open stay window `[check_in, check_out)`. The checkout day is not a
/// ledger night, so the number of nights equals the day difference.
/// Constructed only through `new`, which rejects inverted or empty windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, ValidationError> {
        if check_out <= check_in {
            return Err(ValidationError::StayOrder {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Iterate the ledger nights, checkout excluded.
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in
            .iter_days()
            .take_while(move |night| *night < check_out)
    }

    pub fn night_count(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn contains(&self, night: NaiveDate) -> bool {
        night >= self.check_in && night < self.check_out
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.check_in, self.check_out)
    }
}

/// One room line of an offer: how many rooms of a category the hotel puts up,
/// and at what nightly rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRoomLine {
    pub category: RoomCategory,
    pub rooms: u32,
    pub price_per_night: u32,
    #[serde(default)]
    pub complimentary: bool,
}

/// One room line of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRoomLine {
    pub category: RoomCategory,
    pub rooms: u32,
}

/// A hotel's declared room inventory for a stay window.
///
/// `ever_confirmed` survives later transitions; an offer that was confirmed
/// at some point is append-only history and refuses hard deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub id: OfferId,
    pub hotel_id: HotelId,
    pub stay: StayRange,
    pub status: OfferStatus,
    pub rooms: Vec<OfferRoomLine>,
    pub ever_confirmed: bool,
}

/// A reservation request linking one delegation to one hotel for a stay
/// window and room breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub delegation_id: DelegationId,
    pub hotel_id: HotelId,
    pub stay: StayRange,
    pub status: AllocationStatus,
    pub rooms: Vec<AllocationRoomLine>,
}

/// Derived capacity ledger row: total rooms a single offer contributes for
/// one (hotel, night, category) key. Consumers must sum across offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityEntry {
    pub offer_id: OfferId,
    pub hotel_id: HotelId,
    pub night: NaiveDate,
    pub category: RoomCategory,
    pub rooms_total: u32,
}

/// Derived reservation ledger row: rooms one confirmed allocation holds for
/// one (hotel, night, category) key. Exists only while the owning allocation
/// is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationEntry {
    pub allocation_id: AllocationId,
    pub delegation_id: DelegationId,
    pub hotel_id: HotelId,
    pub night: NaiveDate,
    pub category: RoomCategory,
    pub rooms_reserved: u32,
}

/// Deterministic input errors, surfaced before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    BlankIdentifier { field: &'static str },
    #[error("check-out {check_out} must fall after check-in {check_in}")]
    StayOrder {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    #[error("check_in and check_out must be provided together")]
    PartialStay,
    #[error("at least one room line with a positive count is required")]
    NoRoomsRequested,
}

/// Rejected lifecycle moves. Nothing is mutated when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("offer {id} is {status}; dates and room counts are locked outside draft")]
    OfferLocked { id: OfferId, status: OfferStatus },
    #[error("offer {id} is rejected and cannot be confirmed")]
    OfferRejected { id: OfferId },
    #[error("offer {id} was confirmed at least once and is kept as history")]
    OfferRetained { id: OfferId },
    #[error("allocation {id} is {status}; only draft allocations can be edited")]
    AllocationLocked {
        id: AllocationId,
        status: AllocationStatus,
    },
    #[error("allocation {id} is {status} and cannot be confirmed")]
    NotConfirmable {
        id: AllocationId,
        status: AllocationStatus,
    },
    #[error("allocation {id} is {status}; only confirmed allocations revert to draft")]
    NotRevertible {
        id: AllocationId,
        status: AllocationStatus,
    },
    #[error("allocation {id} is already cancelled")]
    AlreadyCancelled { id: AllocationId },
    #[error("allocation {id} is confirmed; cancel it instead of deleting")]
    ConfirmedDelete { id: AllocationId },
}
