//! Accommodation capacity & allocation engine.
//!
//! Confirmed hotel offers fan out into a per-night capacity ledger; confirmed
//! delegation allocations fan out into a per-night reservation ledger. Both
//! ledgers are pure projections of their source records and can be discarded
//! and rebuilt at any time. The one invariant everything here protects: for
//! every (hotel, night, category), reserved rooms never exceed total rooms.

pub mod availability;
pub mod capacity;
pub mod domain;
pub mod ledger;
pub mod memory;
pub mod reporting;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use availability::bottleneck;
pub use capacity::expand_offer;
pub use domain::{
    Allocation, AllocationId, AllocationRoomLine, AllocationStatus, CapacityEntry, DelegationId,
    HotelId, Offer, OfferId, OfferRoomLine, OfferStatus, ReservationEntry, RoomCategory, StayRange,
    TransitionError, ValidationError,
};
pub use ledger::reservation_rows;
pub use memory::{InMemoryEngineStore, StaticHotelDirectory};
pub use reporting::{GridScope, OccupancyReporter, ReportFilters};
pub use repository::{
    DelegationProfile, EngineRepository, HotelDirectory, HotelProfile, RepositoryError,
};
pub use router::{engine_router, EngineState};
pub use service::{AccommodationService, EngineError, NightShortfall, OverbookingReport};
