//! Synthetic sustainability reports for demos.
//!
//! Two flavours exist: a "critical" facility report with elevated but plausible
//! consumption, and a "crisis" report whose rows carry explicit failure alerts
//! and consumption of at least 5000 kWh.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngExt;

use super::document::DocumentMetadata;

const LOCATIONS: &[&str] = &[
    "Data Center Alpha",
    "Manufacturing Floor B",
    "Industrial Cooling Unit",
    "High-Performance Computing Lab",
    "Chemical Processing Plant",
    "Steel Fabrication Unit",
];

const CRISIS_ALERTS: &[&str] = &[
    "CRITICAL FAILURE",
    "EMERGENCY LEAK",
    "CRITICAL FAILURE - OVERRIDE",
    "EMERGENCY LEAK DETECTED",
];

const CRITICAL_ROWS: usize = 12;
const CRISIS_ROWS: usize = 10;

/// Consumption above which a demo row counts as critical.
const CRITICAL_CONSUMPTION: u32 = 800;
const CRISIS_CONSUMPTION: u32 = 5000;

/// Which synthetic report to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Critical,
    Crisis,
}

impl ScenarioKind {
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Critical => "demo_critical_waste_analysis.csv",
            Self::Crisis => "crisis_critical_alert.csv",
        }
    }

    fn critical_threshold(&self) -> u32 {
        match self {
            Self::Critical => CRITICAL_CONSUMPTION,
            Self::Crisis => CRISIS_CONSUMPTION,
        }
    }
}

/// One generated reading.
#[derive(Debug, Clone)]
pub struct SyntheticRow {
    pub timestamp: DateTime<Utc>,
    pub location: &'static str,
    pub consumption: u32,
    pub energy_kwh: f64,
    pub waste_kg: f64,
    pub efficiency_score: u32,
    pub alert: Option<&'static str>,
}

/// A generated report rendered as CSV.
#[derive(Debug, Clone)]
pub struct SyntheticReport {
    pub kind: ScenarioKind,
    pub rows: Vec<SyntheticRow>,
    pub csv: String,
    pub metadata: DocumentMetadata,
}

impl SyntheticReport {
    /// Generate a report ending at `now`, one row per interval going backwards.
    pub fn generate(kind: ScenarioKind, now: DateTime<Utc>) -> Self {
        let rows = match kind {
            ScenarioKind::Critical => critical_rows(now),
            ScenarioKind::Crisis => crisis_rows(now),
        };
        let headers = headers(kind);
        let csv = render_csv(&headers, &rows);
        let metadata = DocumentMetadata::tabular(
            csv.len() as u64,
            rows.len() as u32,
            headers.iter().map(|h| h.to_string()).collect(),
        );

        Self {
            kind,
            rows,
            csv,
            metadata,
        }
    }

    pub fn filename(&self) -> &'static str {
        self.kind.filename()
    }

    /// Rows whose consumption exceeds the scenario's critical threshold.
    pub fn critical_values(&self) -> usize {
        let threshold = self.kind.critical_threshold();
        self.rows
            .iter()
            .filter(|row| row.consumption > threshold)
            .count()
    }

    pub fn max_consumption(&self) -> u32 {
        self.rows
            .iter()
            .map(|row| row.consumption)
            .max()
            .unwrap_or(0)
    }
}

fn critical_rows(now: DateTime<Utc>) -> Vec<SyntheticRow> {
    let mut rng = rand::rng();
    (0..CRITICAL_ROWS)
        .map(|i| {
            let consumption: u32 = rng.random_range(800..1500);
            let consumption_f = f64::from(consumption);
            let efficiency =
                ((1000.0 - consumption_f) / 15.0).floor() + rng.random_range(0.0..10.0);
            SyntheticRow {
                timestamp: now - Duration::hours(i as i64),
                location: LOCATIONS[i % LOCATIONS.len()],
                consumption,
                energy_kwh: round2(consumption_f * 0.28 + rng.random_range(0.0..50.0)),
                waste_kg: round2(consumption_f * 0.08 + rng.random_range(0.0..20.0)),
                efficiency_score: efficiency.max(5.0).round() as u32,
                alert: None,
            }
        })
        .collect()
}

fn crisis_rows(now: DateTime<Utc>) -> Vec<SyntheticRow> {
    let mut rng = rand::rng();
    (0..CRISIS_ROWS)
        .map(|i| {
            let consumption: u32 = rng.random_range(5000..8000);
            let consumption_f = f64::from(consumption);
            SyntheticRow {
                timestamp: now - Duration::minutes(45 * i as i64),
                location: LOCATIONS[i % LOCATIONS.len()],
                consumption,
                energy_kwh: round2(consumption_f * 0.35 + rng.random_range(0.0..200.0)),
                waste_kg: round2(consumption_f * 0.12 + rng.random_range(0.0..80.0)),
                efficiency_score: ((8000.0 - consumption_f) / 20.0).floor().max(0.0) as u32,
                alert: Some(CRISIS_ALERTS[i % CRISIS_ALERTS.len()]),
            }
        })
        .collect()
}

fn headers(kind: ScenarioKind) -> Vec<&'static str> {
    let mut headers = vec![
        "timestamp",
        "location",
        "consumption",
        "energy_kwh",
        "waste_kg",
        "efficiency_score",
    ];
    if kind == ScenarioKind::Crisis {
        headers.push("alert");
    }
    headers
}

fn render_csv(headers: &[&str], rows: &[SyntheticRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));

    for row in rows {
        let mut fields = vec![
            row.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            format!("\"{}\"", row.location),
            row.consumption.to_string(),
            row.energy_kwh.to_string(),
            row.waste_kg.to_string(),
            row.efficiency_score.to_string(),
        ];
        if headers.contains(&"alert") {
            fields.push(row.alert.map(|a| format!("\"{}\"", a)).unwrap_or_default());
        }
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
