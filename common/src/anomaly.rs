use crate::model::TelemetryRecord;
use chrono::SecondsFormat;
use std::collections::HashMap;
use std::str::FromStr;

/// How a reading picks the reading it is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grouping {
    /// Compare with the previous row of the result set, whatever its device.
    /// A change of device between two rows can report a reset.
    #[default]
    Sequential,
    /// Compare with the previous row of the same telematics unit.
    PerDevice,
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Grouping::Sequential),
            "per-device" | "per_device" => Ok(Grouping::PerDevice),
            other => Err(format!("unknown anomaly grouping: {}", other)),
        }
    }
}

/// Scans readings (ascending by timestamp) for counter resets and missing
/// fuel/runtime values on a moving unit.
///
/// Returns one message per triggered rule; a reading without a predecessor
/// is never reported.
pub fn detect_anomalies(records: &[TelemetryRecord], grouping: Grouping) -> Vec<String> {
    let mut anomalies = Vec::new();

    match grouping {
        Grouping::Sequential => {
            for pair in records.windows(2) {
                check(&pair[0], &pair[1], &mut anomalies);
            }
        }
        Grouping::PerDevice => {
            let mut last_seen: HashMap<Option<&str>, &TelemetryRecord> = HashMap::new();
            for entry in records {
                if let Some(prev) = last_seen.insert(entry.telematics_id.as_deref(), entry) {
                    check(prev, entry, &mut anomalies);
                }
            }
        }
    }

    anomalies
}

fn check(prev: &TelemetryRecord, entry: &TelemetryRecord, out: &mut Vec<String>) {
    let counters = [
        ("Odometer", entry.odometer, prev.odometer),
        ("Fuel Lifetime", entry.fuel_lifetime, prev.fuel_lifetime),
        ("Runtime", entry.runtime, prev.runtime),
    ];

    for (label, current, previous) in counters {
        if decreased(current, previous) {
            out.push(format!("{} reset detected for {}", label, describe(entry)));
        }
    }

    let moving = entry.speed.is_some_and(|speed| speed > 0.0);
    if moving && (entry.fuel_lifetime.is_none() || entry.runtime.is_none()) {
        out.push(format!("Missing fuel or runtime data for {}", describe(entry)));
    }
}

// Nulls on either side never count as a decrease.
fn decreased(current: Option<f64>, previous: Option<f64>) -> bool {
    matches!((current, previous), (Some(c), Some(p)) if c < p)
}

fn describe(entry: &TelemetryRecord) -> String {
    format!(
        "{} at {}",
        entry.telematics_id.as_deref().unwrap_or("unknown"),
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
