use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use common::db::{self, TelemetryQuery};
use common::metrics::REQUESTS_TOTAL;
use common::rest::ApiError;
use common::search::{InventoryField, SearchFilter, TelemetryField};
use common::serialize::rows_to_safe_json;
use common::window::parse_date_param;
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: MySqlPool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    search_term: Option<String>,
    search_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataQuery {
    search_term: Option<String>,
    search_category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl DeviceDataQuery {
    /// Validates the search and turns the optional dates into day bounds.
    /// Dates that do not parse are dropped.
    fn to_query(&self) -> Result<TelemetryQuery, ApiError> {
        let search = SearchFilter::<TelemetryField>::from_params(
            self.search_term.as_deref(),
            self.search_category.as_deref(),
        )?;

        Ok(TelemetryQuery {
            search,
            from: self
                .start_date
                .as_deref()
                .and_then(parse_date_param)
                .map(|d| d.date_naive()),
            to: self
                .end_date
                .as_deref()
                .and_then(parse_date_param)
                .map(|d| d.date_naive()),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/inventory", get(get_inventory))
        .route("/api/device-data", get(get_device_data))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn get_inventory(
    State(state): State<AppState>,
    Query(params): Query<InventoryQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    REQUESTS_TOTAL.with_label_values(&["inventory"]).inc();

    let search = SearchFilter::<InventoryField>::from_params(
        params.search_term.as_deref(),
        params.search_category.as_deref(),
    )?;

    let rows = db::fetch_inventory(&state.pool, search.as_ref())
        .await
        .map_err(ApiError::internal("Error fetching inventory data"))?;
    info!("Inventory: {} devices", rows.len());

    rows_to_safe_json(&rows)
        .map(Json)
        .map_err(ApiError::internal("Error fetching inventory data"))
}

async fn get_device_data(
    State(state): State<AppState>,
    Query(params): Query<DeviceDataQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    REQUESTS_TOTAL.with_label_values(&["device-data"]).inc();

    let query = params.to_query()?;
    let rows = db::fetch_telemetry(&state.pool, &query)
        .await
        .map_err(ApiError::internal("Error fetching device data"))?;
    info!("Device data: {} rows", rows.len());

    rows_to_safe_json(&rows)
        .map(Json)
        .map_err(ApiError::internal("Error fetching device data"))
}
