use crate::config::Config;
use crate::errors::Result;
use crate::metrics::{DB_ERRORS_TOTAL, QUERY_LATENCY_SECONDS, ROWS_RETURNED};
use crate::model::{GpsFix, InventoryRecord, TelemetryRecord};
use crate::search::{InventoryField, SearchFilter, TelemetryField};
use crate::window::DateWindow;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::future::Future;
use tracing::{debug, error, info};

// Unit identifiers are decoded as text whatever their column type, so both
// record types agree on them.
const TELEMETRY_COLUMNS: &str = r#"
    tu.id AS id,
    CAST(tu.telematics_id AS CHAR) AS telematics_id,
    CAST(tu.h2gen_id AS CHAR) AS h2gen_id,
    tu.timestamp,
    tu.fuel_lifetime,
    tu.fuel_telematics,
    tu.odometer,
    tu.engine_speed,
    tu.latitude,
    tu.longitude,
    tu.runtime,
    tu.speed
"#;

const INVENTORY_SELECT: &str = r#"
    SELECT
        tu.id AS device_id,
        tu.type AS device_type,
        ui.customer_id,
        o1.name AS customer_name,
        ui.dealer_id,
        o2.name AS dealer_name,
        CAST(tu.h2gen_unit_id AS CHAR) AS h2gen_unit_id,
        tu.enabled,
        tu.h2gen_installed,
        tu.fuel_lifetime,
        tu.fuel_telematics,
        tu.fuel_baseline_telematics,
        tu.fuel_baseline_lifetime,
        tu.odometer_lifetime,
        tu.odometer_baseline,
        tu.efficiency_baseline,
        tu.runtime_baseline,
        tu.runtime_lifetime,
        tu.baseline_date,
        tu.fuel_baseline_forced_calc
    FROM dya_telematics_units AS tu
    LEFT JOIN dya_h2gen_unit_info AS ui ON tu.h2gen_unit_id = ui.h2gen_id
    LEFT JOIN dya_organizations AS o1 ON ui.customer_id = o1.id
    LEFT JOIN dya_organizations AS o2 ON ui.dealer_id = o2.parent_id
"#;

/// Creates the process-wide pool. Requests beyond `max_connections` wait for
/// a free connection up to the acquire timeout.
pub async fn make_pool(config: &Config) -> Result<MySqlPool> {
    info!("Connecting to database...");
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    info!(
        "Database connection established (max_connections={})",
        config.max_connections
    );
    Ok(pool)
}

/// Runs one query future, recording its latency and failures.
async fn timed<T, F>(label: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let timer = QUERY_LATENCY_SECONDS
        .with_label_values(&[label])
        .start_timer();
    let result = fut.await;
    timer.observe_duration();

    result.map_err(|e| {
        DB_ERRORS_TOTAL.inc();
        error!("Query {} failed: {}", label, e);
        e.into()
    })
}

/// Most recent reading timestamp, `None` for an empty table.
pub async fn latest_timestamp(pool: &MySqlPool) -> Result<Option<DateTime<Utc>>> {
    timed(
        "latest_timestamp",
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(timestamp) AS last_recorded_time FROM dya_telematics_units_data",
        )
        .fetch_one(pool),
    )
    .await
}

/// Most recent timestamp of a reading that carries coordinates.
pub async fn latest_gps_timestamp(pool: &MySqlPool) -> Result<Option<DateTime<Utc>>> {
    timed(
        "latest_gps_timestamp",
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(timestamp) AS last_recorded_time FROM dya_telematics_units_data \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL",
        )
        .fetch_one(pool),
    )
    .await
}

/// Filters for a telemetry read. Bounds are whole days, compared against the
/// raw timestamp column.
#[derive(Debug, Clone, Default)]
pub struct TelemetryQuery {
    pub search: Option<SearchFilter<TelemetryField>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TelemetryQuery {
    pub fn for_window(window: DateWindow, search: Option<SearchFilter<TelemetryField>>) -> Self {
        TelemetryQuery {
            search,
            from: Some(window.start),
            to: Some(window.end),
        }
    }

    /// SQL text with `?` placeholders in the order [`fetch_telemetry`] binds.
    pub fn sql(&self) -> String {
        let mut conditions = Vec::new();
        if self.from.is_some() {
            conditions.push("tu.timestamp >= ?".to_string());
        }
        if self.to.is_some() {
            conditions.push("tu.timestamp <= ?".to_string());
        }
        if let Some(search) = &self.search {
            conditions.push(search.condition());
        }

        format!(
            "SELECT {} FROM dya_telematics_units_data AS tu {}",
            TELEMETRY_COLUMNS.trim(),
            where_clause(&conditions)
        )
    }
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// Telemetry rows in storage order.
pub async fn fetch_telemetry(
    pool: &MySqlPool,
    query: &TelemetryQuery,
) -> Result<Vec<TelemetryRecord>> {
    let sql = query.sql();
    debug!("Telemetry query: {}", sql);

    let mut query_builder = sqlx::query_as::<_, TelemetryRecord>(&sql);
    if let Some(from) = query.from {
        query_builder = query_builder.bind(from);
    }
    if let Some(to) = query.to {
        query_builder = query_builder.bind(to);
    }
    if let Some(search) = &query.search {
        query_builder = query_builder.bind(search.pattern());
    }

    let rows = timed("telemetry", query_builder.fetch_all(pool)).await?;
    ROWS_RETURNED.observe(rows.len() as f64);
    Ok(rows)
}

pub fn inventory_sql(search: Option<&SearchFilter<InventoryField>>) -> String {
    let conditions: Vec<String> = search.map(|s| s.condition()).into_iter().collect();
    format!("{} {}", INVENTORY_SELECT.trim(), where_clause(&conditions))
}

/// Telematics units with their customer and dealer names.
pub async fn fetch_inventory(
    pool: &MySqlPool,
    search: Option<&SearchFilter<InventoryField>>,
) -> Result<Vec<InventoryRecord>> {
    let sql = inventory_sql(search);
    debug!("Inventory query: {}", sql);

    let mut query_builder = sqlx::query_as::<_, InventoryRecord>(&sql);
    if let Some(search) = search {
        query_builder = query_builder.bind(search.pattern());
    }

    let rows = timed("inventory", query_builder.fetch_all(pool)).await?;
    ROWS_RETURNED.observe(rows.len() as f64);
    Ok(rows)
}

/// Latest reading with coordinates inside the window.
pub async fn gps_fix_within(pool: &MySqlPool, window: DateWindow) -> Result<Option<GpsFix>> {
    timed(
        "gps_within_window",
        sqlx::query_as::<_, GpsFix>(
            "SELECT latitude, longitude, timestamp FROM dya_telematics_units_data \
             WHERE timestamp >= ? AND timestamp <= ? \
             AND latitude IS NOT NULL AND longitude IS NOT NULL \
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_optional(pool),
    )
    .await
}

/// Latest reading with coordinates over the whole table.
pub async fn latest_gps_fix(pool: &MySqlPool) -> Result<Option<GpsFix>> {
    timed(
        "gps_latest",
        sqlx::query_as::<_, GpsFix>(
            "SELECT latitude, longitude, timestamp FROM dya_telematics_units_data \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
             ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(pool),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unfiltered_telemetry_sql() {
        let sql = TelemetryQuery::default().sql();
        assert!(sql.starts_with("SELECT tu.id AS id,"));
        assert!(sql.ends_with("FROM dya_telematics_units_data AS tu "));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_window_and_search_conditions_in_bind_order() {
        let window = DateWindow {
            start: day(2024, 3, 9),
            end: day(2024, 3, 10),
        };
        let search = SearchFilter {
            category: TelemetryField::Odometer,
            term: "12".to_string(),
        };
        let sql = TelemetryQuery::for_window(window, Some(search)).sql();

        assert!(sql.ends_with(
            "WHERE tu.timestamp >= ? AND tu.timestamp <= ? AND LOWER(tu.odometer) LIKE LOWER(?)"
        ));
        assert_eq!(sql.matches('?').count(), 3);
    }

    #[test]
    fn test_open_ended_range() {
        let query = TelemetryQuery {
            search: None,
            from: None,
            to: Some(day(2024, 1, 1)),
        };
        assert!(query.sql().ends_with("WHERE tu.timestamp <= ?"));
    }

    #[test]
    fn test_unit_ids_are_selected_as_text() {
        let telemetry = TelemetryQuery::default().sql();
        assert!(telemetry.contains("CAST(tu.telematics_id AS CHAR) AS telematics_id"));
        assert!(telemetry.contains("CAST(tu.h2gen_id AS CHAR) AS h2gen_id"));

        let inventory = inventory_sql(None);
        assert!(inventory.contains("CAST(tu.h2gen_unit_id AS CHAR) AS h2gen_unit_id"));
    }

    #[test]
    fn test_inventory_sql() {
        let plain = inventory_sql(None);
        assert!(plain.contains("LEFT JOIN dya_organizations AS o2 ON ui.dealer_id = o2.parent_id"));
        assert!(!plain.contains("WHERE"));

        let search = SearchFilter {
            category: InventoryField::DealerName,
            term: "north".to_string(),
        };
        let filtered = inventory_sql(Some(&search));
        assert!(filtered.ends_with("WHERE LOWER(o2.name) LIKE LOWER(?)"));
    }
}
