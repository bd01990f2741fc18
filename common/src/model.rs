use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One telematics reading from `dya_telematics_units_data`.
///
/// `id` is the BIGINT row id; `telematics_id` and `h2gen_id` are unit
/// identifiers and always decode as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TelemetryRecord {
    pub id: i64,
    pub telematics_id: Option<String>,
    pub h2gen_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub fuel_lifetime: Option<f64>,
    pub fuel_telematics: Option<f64>,
    pub odometer: Option<f64>,
    pub engine_speed: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub runtime: Option<f64>,
    pub speed: Option<f64>,
}

/// Telematics unit joined with its H2Gen unit, customer and dealer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryRecord {
    pub device_id: i64,
    pub device_type: Option<String>,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub dealer_id: Option<i64>,
    pub dealer_name: Option<String>,
    pub h2gen_unit_id: Option<String>,
    pub enabled: Option<bool>,
    pub h2gen_installed: Option<bool>,
    pub fuel_lifetime: Option<f64>,
    pub fuel_telematics: Option<f64>,
    pub fuel_baseline_telematics: Option<f64>,
    pub fuel_baseline_lifetime: Option<f64>,
    pub odometer_lifetime: Option<f64>,
    pub odometer_baseline: Option<f64>,
    pub efficiency_baseline: Option<f64>,
    pub runtime_baseline: Option<f64>,
    pub runtime_lifetime: Option<f64>,
    pub baseline_date: Option<NaiveDate>,
    pub fuel_baseline_forced_calc: Option<bool>,
}

/// Last known position of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Device dashboard response body
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub data: Vec<serde_json::Value>,
    pub anomalies: Vec<String>,
}
