use super::common::*;
use crate::engine::capacity::expand_offer;
use crate::engine::domain::{
    Offer, OfferId, OfferRoomLine, OfferStatus, RoomCategory,
};

fn confirmed_offer(rooms: Vec<OfferRoomLine>) -> Offer {
    Offer {
        id: OfferId("off-test".to_string()),
        hotel_id: hotel_a(),
        stay: october_window(),
        status: OfferStatus::Confirmed,
        rooms,
        ever_confirmed: true,
    }
}

#[test]
fn expansion_covers_each_night_excluding_checkout() {
    let offer = confirmed_offer(offer_doubles(5));
    let entries = expand_offer(&offer);

    assert_eq!(entries.len(), 2);
    let nights: Vec<_> = entries.iter().map(|entry| entry.night).collect();
    assert_eq!(nights, vec![date(2026, 10, 16), date(2026, 10, 17)]);
    assert!(entries.iter().all(|entry| entry.rooms_total == 5));
    assert!(entries.iter().all(|entry| entry.category == RoomCategory::Double));
    assert!(entries.iter().all(|entry| entry.offer_id == offer.id));
}

#[test]
fn expansion_fans_out_per_room_line() {
    let mut rooms = offer_doubles(5);
    rooms.push(OfferRoomLine {
        category: RoomCategory::Single,
        rooms: 2,
        price_per_night: 100,
        complimentary: false,
    });
    let entries = expand_offer(&confirmed_offer(rooms));

    // 2 nights x 2 lines
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries
            .iter()
            .filter(|entry| entry.category == RoomCategory::Single)
            .count(),
        2
    );
}

#[test]
fn draft_and_rejected_offers_contribute_nothing() {
    let mut offer = confirmed_offer(offer_doubles(5));
    offer.status = OfferStatus::Draft;
    assert!(expand_offer(&offer).is_empty());

    offer.status = OfferStatus::Rejected;
    assert!(expand_offer(&offer).is_empty());
}

#[test]
fn zero_room_lines_are_skipped() {
    let entries = expand_offer(&confirmed_offer(offer_doubles(0)));
    assert!(entries.is_empty());
}

#[test]
fn expansion_is_capped_at_ninety_nights() {
    let mut offer = confirmed_offer(offer_doubles(1));
    offer.stay = stay(date(2026, 1, 1), date(2026, 6, 1));
    assert!(offer.stay.night_count() > 90);

    let entries = expand_offer(&offer);
    assert_eq!(entries.len(), 90);
}

#[test]
fn reconfirming_an_offer_regenerates_without_duplicates() {
    let (service, store) = build_service();
    let offer = seeded_offer(&service, 5);

    let first = store.capacity_rows();
    service.confirm_offer(&offer.id).expect("reconfirm");
    let second = store.capacity_rows();

    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
}

#[test]
fn rejecting_a_confirmed_offer_clears_its_capacity() {
    let (service, store) = build_service();
    let offer = seeded_offer(&service, 5);
    assert_eq!(store.capacity_rows().len(), 2);

    service.reject_offer(&offer.id).expect("reject");
    assert!(store.capacity_rows().is_empty());
}
