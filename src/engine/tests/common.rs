use std::sync::Arc;

use chrono::NaiveDate;

use crate::engine::domain::{
    AllocationRoomLine, HotelId, Offer, OfferRoomLine, RoomCategory, StayRange,
};
use crate::engine::memory::{InMemoryEngineStore, StaticHotelDirectory};
use crate::engine::repository::{DelegationProfile, HotelProfile};
use crate::engine::service::AccommodationService;

pub(super) type TestService = AccommodationService<InMemoryEngineStore, StaticHotelDirectory>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn stay(from: NaiveDate, to: NaiveDate) -> StayRange {
    StayRange::new(from, to).expect("valid stay range")
}

/// Shared two-night window: nights of 2026-10-16 and 2026-10-17.
pub(super) fn october_window() -> StayRange {
    stay(date(2026, 10, 16), date(2026, 10, 18))
}

pub(super) fn hotel_a() -> HotelId {
    HotelId("hotel-a".to_string())
}

pub(super) fn hotel_b() -> HotelId {
    HotelId("hotel-b".to_string())
}

pub(super) fn delegation_x() -> crate::engine::domain::DelegationId {
    crate::engine::domain::DelegationId("delegation-x".to_string())
}

pub(super) fn delegation_y() -> crate::engine::domain::DelegationId {
    crate::engine::domain::DelegationId("delegation-y".to_string())
}

pub(super) fn doubles(rooms: u32) -> Vec<AllocationRoomLine> {
    vec![AllocationRoomLine {
        category: RoomCategory::Double,
        rooms,
    }]
}

pub(super) fn offer_doubles(rooms: u32) -> Vec<OfferRoomLine> {
    vec![OfferRoomLine {
        category: RoomCategory::Double,
        rooms,
        price_per_night: 150,
        complimentary: false,
    }]
}

pub(super) fn directory() -> StaticHotelDirectory {
    StaticHotelDirectory::default()
        .with_hotel(HotelProfile {
            id: hotel_a(),
            name: "Hotel Aurora".to_string(),
            city: "Geneva".to_string(),
        })
        .with_hotel(HotelProfile {
            id: hotel_b(),
            name: "Hotel Borealis".to_string(),
            city: "Lausanne".to_string(),
        })
        .with_delegation(DelegationProfile {
            id: delegation_x(),
            name: "Delegation X".to_string(),
            requested_rooms: doubles(3),
        })
        .with_delegation(DelegationProfile {
            id: delegation_y(),
            name: "Delegation Y".to_string(),
            requested_rooms: doubles(4),
        })
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryEngineStore>) {
    let store = Arc::new(InMemoryEngineStore::default());
    let service = AccommodationService::new(store.clone(), Arc::new(directory()));
    (service, store)
}

/// Create and confirm an offer of `rooms` doubles at hotel A over the shared
/// window, returning the confirmed record.
pub(super) fn seeded_offer(service: &TestService, rooms: u32) -> Offer {
    let offer = service
        .create_offer(hotel_a(), october_window(), offer_doubles(rooms))
        .expect("offer created");
    service.confirm_offer(&offer.id).expect("offer confirmed")
}
