use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AllocationId, AllocationRoomLine, DelegationId, HotelId, OfferId, OfferRoomLine, RoomCategory,
    StayRange, ValidationError,
};
use super::reporting::{GridScope, OccupancyReporter, ReportFilters};
use super::repository::{EngineRepository, HotelDirectory};
use super::service::{AccommodationService, EngineError};

/// Shared handler state: the lifecycle service plus the read-only reporter.
pub struct EngineState<R, D> {
    pub service: Arc<AccommodationService<R, D>>,
    pub reports: Arc<OccupancyReporter<R, D>>,
}

impl<R, D> Clone for EngineState<R, D> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            reports: Arc::clone(&self.reports),
        }
    }
}

/// Router builder exposing the engine's HTTP surface.
pub fn engine_router<R, D>(state: EngineState<R, D>) -> Router
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    Router::new()
        .route("/api/v1/offers", post(create_offer::<R, D>))
        .route(
            "/api/v1/offers/:offer_id",
            put(update_offer::<R, D>).delete(delete_offer::<R, D>),
        )
        .route("/api/v1/offers/:offer_id/confirm", post(confirm_offer::<R, D>))
        .route("/api/v1/offers/:offer_id/reject", post(reject_offer::<R, D>))
        .route("/api/v1/allocations", post(create_allocation::<R, D>))
        .route(
            "/api/v1/allocations/:allocation_id",
            put(update_allocation::<R, D>).delete(delete_allocation::<R, D>),
        )
        .route(
            "/api/v1/allocations/:allocation_id/confirm",
            post(confirm_allocation::<R, D>),
        )
        .route(
            "/api/v1/allocations/:allocation_id/cancel",
            post(cancel_allocation::<R, D>),
        )
        .route(
            "/api/v1/allocations/:allocation_id/revert",
            post(revert_allocation::<R, D>),
        )
        .route("/api/v1/availability", get(availability::<R, D>))
        .route("/api/v1/reports/cities", get(city_report::<R, D>))
        .route("/api/v1/reports/occupancy", get(occupancy_report::<R, D>))
        .route("/api/v1/reports/delegations", get(delegation_report::<R, D>))
        .route("/api/v1/reports/grid", get(grid_report::<R, D>))
        .with_state(state)
}

fn error_response(err: EngineError) -> Response {
    match err {
        EngineError::Validation(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        EngineError::Transition(err) => (
            StatusCode::CONFLICT,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        EngineError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        EngineError::Overbooked(report) => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "overbooked",
                "allocation_id": report.allocation_id,
                "nights": report.shortfalls,
            })),
        )
            .into_response(),
        EngineError::Repository(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

fn stay_from(check_in: NaiveDate, check_out: NaiveDate) -> Result<StayRange, EngineError> {
    StayRange::new(check_in, check_out).map_err(EngineError::from)
}

fn optional_stay(
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
) -> Result<Option<StayRange>, EngineError> {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => stay_from(check_in, check_out).map(Some),
        (None, None) => Ok(None),
        _ => Err(ValidationError::PartialStay.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub rooms: Vec<OfferRoomLine>,
}

#[derive(Debug, Deserialize)]
pub struct OfferUpdateRequest {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub rooms: Option<Vec<OfferRoomLine>>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    pub delegation_id: String,
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub rooms: Vec<AllocationRoomLine>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationUpdateRequest {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub rooms: Option<Vec<AllocationRoomLine>>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub hotel_id: String,
    pub category: RoomCategory,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub exclude: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub city: Option<String>,
    pub hotel_id: Option<String>,
    pub delegation_id: Option<String>,
    pub category: Option<RoomCategory>,
    pub scope: Option<GridScope>,
}

impl ReportQuery {
    fn filters(&self) -> ReportFilters {
        ReportFilters {
            hotel: self.hotel_id.clone().map(HotelId),
            delegation: self.delegation_id.clone().map(DelegationId),
            category: self.category,
        }
    }
}

async fn create_offer<R, D>(
    State(state): State<EngineState<R, D>>,
    axum::Json(request): axum::Json<OfferRequest>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(request.check_in, request.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state
        .service
        .create_offer(HotelId(request.hotel_id), stay, request.rooms)
    {
        Ok(offer) => (StatusCode::CREATED, axum::Json(offer)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_offer<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(offer_id): Path<String>,
    axum::Json(request): axum::Json<OfferUpdateRequest>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match optional_stay(request.check_in, request.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state
        .service
        .update_offer(&OfferId(offer_id), stay, request.rooms)
    {
        Ok(offer) => (StatusCode::OK, axum::Json(offer)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn confirm_offer<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.confirm_offer(&OfferId(offer_id)) {
        Ok(offer) => (StatusCode::OK, axum::Json(offer)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reject_offer<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.reject_offer(&OfferId(offer_id)) {
        Ok(offer) => (StatusCode::OK, axum::Json(offer)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_offer<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.delete_offer(&OfferId(offer_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    axum::Json(request): axum::Json<AllocationRequest>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(request.check_in, request.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state.service.create_allocation(
        DelegationId(request.delegation_id),
        HotelId(request.hotel_id),
        stay,
        request.rooms,
    ) {
        Ok(allocation) => (StatusCode::CREATED, axum::Json(allocation)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(allocation_id): Path<String>,
    axum::Json(request): axum::Json<AllocationUpdateRequest>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match optional_stay(request.check_in, request.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state
        .service
        .update_allocation(&AllocationId(allocation_id), stay, request.rooms)
    {
        Ok(allocation) => (StatusCode::OK, axum::Json(allocation)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn confirm_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(allocation_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.confirm_allocation(&AllocationId(allocation_id)) {
        Ok(allocation) => (StatusCode::OK, axum::Json(allocation)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn cancel_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(allocation_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.cancel_allocation(&AllocationId(allocation_id)) {
        Ok(allocation) => (StatusCode::OK, axum::Json(allocation)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn revert_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(allocation_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.revert_allocation(&AllocationId(allocation_id)) {
        Ok(allocation) => (StatusCode::OK, axum::Json(allocation)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_allocation<R, D>(
    State(state): State<EngineState<R, D>>,
    Path(allocation_id): Path<String>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    match state.service.delete_allocation(&AllocationId(allocation_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn availability<R, D>(
    State(state): State<EngineState<R, D>>,
    Query(query): Query<AvailabilityQuery>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(query.check_in, query.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    let exclude = query.exclude.map(AllocationId);
    match state.service.availability(
        &HotelId(query.hotel_id),
        query.category,
        stay,
        exclude.as_ref(),
    ) {
        Ok(available) => (
            StatusCode::OK,
            axum::Json(json!({ "available": available })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn city_report<R, D>(
    State(state): State<EngineState<R, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(query.check_in, query.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state.reports.city_report(stay, query.city.as_deref()) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn occupancy_report<R, D>(
    State(state): State<EngineState<R, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(query.check_in, query.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state.reports.hotel_day_report(stay, &query.filters()) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delegation_report<R, D>(
    State(state): State<EngineState<R, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(query.check_in, query.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    match state.reports.delegation_stay_report(stay, &query.filters()) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn grid_report<R, D>(
    State(state): State<EngineState<R, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    let stay = match stay_from(query.check_in, query.check_out) {
        Ok(stay) => stay,
        Err(err) => return error_response(err),
    };
    let scope = query.scope.unwrap_or(GridScope::Hotel);
    match state.reports.daily_grid(stay, scope) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}
