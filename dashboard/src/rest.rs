use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use common::anomaly::{detect_anomalies, Grouping};
use common::db::{self, TelemetryQuery};
use common::metrics::{ANOMALIES_TOTAL, REQUESTS_TOTAL};
use common::model::{DashboardResponse, GpsFix};
use common::rest::ApiError;
use common::search::{SearchFilter, TelemetryField};
use common::serialize::{rows_to_safe_json, to_safe_json};
use common::window::{resolve_window, DateWindow, RangeToken};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use std::future::Future;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

const DEFAULT_RANGE: &str = "last24hours";
const GPS_ERROR: &str = "Error fetching GPS coordinates";
const GPS_FALLBACK_MESSAGE: &str =
    "No valid GPS coordinates found within the selected range, returning nearest valid coordinates.";

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub grouping: Grouping,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    search_term: Option<String>,
    search_category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    date_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    date_range: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/last-recorded-time", get(get_last_recorded_time))
        .route("/api/device-dashboard", get(get_device_dashboard))
        .route("/api/last-recorded-gps", get(get_last_recorded_gps))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn day_window(
    date_range: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    latest: Option<chrono::DateTime<Utc>>,
) -> DateWindow {
    let range = RangeToken::parse(date_range.unwrap_or(DEFAULT_RANGE));
    let window = resolve_window(range, start_date, end_date, latest, Utc::now()).to_days();
    debug!("Resolved {:?} to {} .. {}", range, window.start, window.end);
    window
}

async fn get_last_recorded_time(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    REQUESTS_TOTAL.with_label_values(&["last-recorded-time"]).inc();

    let latest = db::latest_timestamp(&state.pool)
        .await
        .map_err(ApiError::internal("Error fetching last recorded time"))?;

    Ok(Json(match latest {
        Some(ts) => json!({ "last_recorded_time": ts }),
        None => json!({ "message": "No data found" }),
    }))
}

async fn get_device_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    REQUESTS_TOTAL.with_label_values(&["device-dashboard"]).inc();

    // Reject unknown categories before touching the pool
    let search = SearchFilter::<TelemetryField>::from_params(
        params.search_term.as_deref(),
        params.search_category.as_deref(),
    )?;

    let latest = db::latest_timestamp(&state.pool)
        .await
        .map_err(ApiError::internal("Error fetching device data"))?;

    let window = day_window(
        params.date_range.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        latest,
    );

    let rows = db::fetch_telemetry(&state.pool, &TelemetryQuery::for_window(window, search))
        .await
        .map_err(ApiError::internal("Error fetching device data"))?;

    let anomalies = detect_anomalies(&rows, state.grouping);
    ANOMALIES_TOTAL.inc_by(anomalies.len() as u64);
    info!(
        "Device dashboard: {} rows, {} anomalies",
        rows.len(),
        anomalies.len()
    );

    let data = rows_to_safe_json(&rows).map_err(ApiError::internal("Error fetching device data"))?;

    Ok(Json(DashboardResponse { data, anomalies }))
}

async fn get_last_recorded_gps(
    State(state): State<AppState>,
    Query(params): Query<GpsQuery>,
) -> Result<Json<Value>, ApiError> {
    REQUESTS_TOTAL.with_label_values(&["last-recorded-gps"]).inc();

    let latest = db::latest_gps_timestamp(&state.pool)
        .await
        .map_err(ApiError::internal(GPS_ERROR))?;

    let window = day_window(
        params.date_range.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        latest,
    );

    let lookup = lookup_gps(db::gps_fix_within(&state.pool, window), || {
        db::latest_gps_fix(&state.pool)
    })
    .await
    .map_err(ApiError::internal(GPS_ERROR))?;

    if let GpsLookup::Nearest(fix) = &lookup {
        info!(
            "No GPS fix between {} and {}, falling back to {}",
            window.start, window.end, fix.timestamp
        );
    }

    lookup.into_body().map(Json)
}

/// Runs the in-window lookup and only queries the whole table when it
/// comes back empty.
async fn lookup_gps<W, N, F>(within: W, nearest: N) -> common::errors::Result<GpsLookup>
where
    W: Future<Output = common::errors::Result<Option<GpsFix>>>,
    N: FnOnce() -> F,
    F: Future<Output = common::errors::Result<Option<GpsFix>>>,
{
    if let Some(fix) = within.await? {
        return Ok(GpsLookup::InRange(fix));
    }

    Ok(match nearest().await? {
        Some(fix) => GpsLookup::Nearest(fix),
        None => GpsLookup::Missing,
    })
}

/// Outcome of the two-step GPS lookup.
#[derive(Debug)]
enum GpsLookup {
    InRange(GpsFix),
    /// Nothing inside the window; latest fix over all readings.
    Nearest(GpsFix),
    Missing,
}

impl GpsLookup {
    fn into_body(self) -> Result<Value, ApiError> {
        match self {
            GpsLookup::InRange(fix) => {
                let coordinates = to_safe_json(&fix).map_err(ApiError::internal(GPS_ERROR))?;
                Ok(json!({ "coordinates": coordinates }))
            }
            GpsLookup::Nearest(fix) => {
                let coordinates = to_safe_json(&fix).map_err(ApiError::internal(GPS_ERROR))?;
                Ok(json!({
                    "message": GPS_FALLBACK_MESSAGE,
                    "coordinates": coordinates,
                }))
            }
            GpsLookup::Missing => Err(ApiError::NotFound(
                "No valid GPS coordinates found".to_string(),
            )),
        }
    }
}
