use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use lodging_ledger::config::AppConfig;
use lodging_ledger::engine::{
    engine_router, AccommodationService, AllocationRoomLine, DelegationId, DelegationProfile,
    EngineError, EngineState, GridScope, HotelId, HotelProfile, InMemoryEngineStore,
    OccupancyReporter, OfferRoomLine, RoomCategory, StaticHotelDirectory, StayRange,
};
use lodging_ledger::error::AppError;
use lodging_ledger::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Lodging Ledger",
    about = "Run the accommodation capacity & allocation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed an in-memory engine and print occupancy reports
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// First ledger night (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    check_in: Option<NaiveDate>,
    /// Number of nights in the demo window
    #[arg(long, default_value_t = 3)]
    nights: u32,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

fn demo_directory() -> StaticHotelDirectory {
    StaticHotelDirectory::default()
        .with_hotel(HotelProfile {
            id: HotelId("hotel-grand".to_string()),
            name: "Grand Riverside".to_string(),
            city: "Geneva".to_string(),
        })
        .with_hotel(HotelProfile {
            id: HotelId("hotel-harbour".to_string()),
            name: "Harbour Lodge".to_string(),
            city: "Lausanne".to_string(),
        })
        .with_delegation(DelegationProfile {
            id: DelegationId("delegation-arg".to_string()),
            name: "Argentina".to_string(),
            requested_rooms: vec![AllocationRoomLine {
                category: RoomCategory::Double,
                rooms: 3,
            }],
        })
        .with_delegation(DelegationProfile {
            id: DelegationId("delegation-bra".to_string()),
            name: "Brazil".to_string(),
            requested_rooms: vec![AllocationRoomLine {
                category: RoomCategory::Double,
                rooms: 4,
            }],
        })
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = Arc::new(InMemoryEngineStore::default());
    let directory = Arc::new(demo_directory());
    let engine_state = EngineState {
        service: Arc::new(AccommodationService::new(store.clone(), directory.clone())),
        reports: Arc::new(OccupancyReporter::new(store, directory)),
    };

    let ops = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let app = ops
        .merge(engine_router(engine_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "accommodation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let check_in = args.check_in.unwrap_or_else(|| Local::now().date_naive());
    let check_out = check_in + Duration::days(i64::from(args.nights.max(1)));
    let window = StayRange::new(check_in, check_out).map_err(EngineError::from)?;

    let store = Arc::new(InMemoryEngineStore::default());
    let directory = Arc::new(demo_directory());
    let service = AccommodationService::new(store.clone(), directory.clone());
    let reports = OccupancyReporter::new(store, directory);

    let grand = HotelId("hotel-grand".to_string());
    let harbour = HotelId("hotel-harbour".to_string());

    let offer = service.create_offer(
        grand.clone(),
        window,
        vec![
            OfferRoomLine {
                category: RoomCategory::Double,
                rooms: 5,
                price_per_night: 180,
                complimentary: false,
            },
            OfferRoomLine {
                category: RoomCategory::Single,
                rooms: 2,
                price_per_night: 120,
                complimentary: false,
            },
        ],
    )?;
    service.confirm_offer(&offer.id)?;

    let offer = service.create_offer(
        harbour.clone(),
        window,
        vec![OfferRoomLine {
            category: RoomCategory::Double,
            rooms: 3,
            price_per_night: 140,
            complimentary: true,
        }],
    )?;
    service.confirm_offer(&offer.id)?;

    // Argentina books from its registered request; Brazil's identical window
    // then overbooks the Grand Riverside doubles.
    let argentina = service.create_allocation(
        DelegationId("delegation-arg".to_string()),
        grand.clone(),
        window,
        Vec::new(),
    )?;
    service.confirm_allocation(&argentina.id)?;

    let brazil = service.create_allocation(
        DelegationId("delegation-bra".to_string()),
        grand.clone(),
        window,
        Vec::new(),
    )?;

    println!("Accommodation engine demo");
    println!("Window: {window}");

    match service.confirm_allocation(&brazil.id) {
        Ok(_) => println!("\nBrazil confirmed (unexpected with this seed data)"),
        Err(EngineError::Overbooked(report)) => {
            println!("\nBrazil rejected: {report}");
        }
        Err(other) => return Err(other.into()),
    }

    let doubles_left = service.availability(&grand, RoomCategory::Double, window, None)?;
    println!("\nDoubles left at Grand Riverside: {doubles_left}");

    println!("\nCity rollup");
    for row in reports.city_report(window, None)? {
        println!(
            "- {}: {}/{} rooms reserved ({:.0}%)",
            row.city, row.rooms_reserved, row.rooms_total, row.occupancy_pct
        );
    }

    println!("\nDaily grid (per hotel)");
    for row in reports.daily_grid(window, GridScope::Hotel)? {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| format!("{} {:.0}% [{}]", cell.night, cell.occupancy_pct, cell.band_label))
            .collect();
        println!("- {}: {}", row.label, cells.join(" | "));
    }

    println!("\nDelegation stays");
    for row in reports.delegation_stay_report(window, &Default::default())? {
        println!(
            "- {} | {} | {} | {} x{} | {}",
            row.delegation_name, row.hotel_id, row.night, row.category_label, row.rooms,
            row.status_label
        );
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
