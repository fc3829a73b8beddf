//! Randomised building telemetry for the dashboard pages.
//!
//! Each feed waits for the configured delay before answering, standing in
//! for a slow backend.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }
}

impl FeedConfig {
    /// Reads `FEED_DELAY_MS`.
    pub fn from_env() -> Self {
        let delay = std::env::var("FEED_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::default().delay);
        Self { delay }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// kWh this month
    pub total_energy_saved: u32,
    pub active_alerts: u32,
    /// percent
    pub occupancy_rate: u32,
    /// percent
    pub overall_comfort_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPoint {
    pub time: String,
    pub usage: f64,
    pub prediction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityEventKind {
    Entry,
    Anomaly,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SecurityEventKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// ppm
    pub co2: u32,
    /// percent
    pub humidity: u32,
    pub voc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComfortReadings {
    /// °C
    pub temperature: u32,
    /// percent
    pub lighting_level: u32,
    pub air_quality: AirQuality,
}

/// Energy samples every three hours with the maximum usage for that slot.
const ENERGY_SLOTS: [(&str, f64, f64); 8] = [
    ("00:00", 10.0, 2.0),
    ("03:00", 8.0, 1.0),
    ("06:00", 12.0, 3.0),
    ("09:00", 20.0, 5.0),
    ("12:00", 25.0, 4.0),
    ("15:00", 22.0, 3.0),
    ("18:00", 18.0, 2.0),
    ("21:00", 15.0, 1.0),
];

pub fn dashboard_stats(rng: &mut impl Rng) -> DashboardStats {
    DashboardStats {
        total_energy_saved: rng.gen_range(500..1500),
        active_alerts: rng.gen_range(0..5),
        occupancy_rate: rng.gen_range(40..100),
        overall_comfort_score: rng.gen_range(70..100),
    }
}

pub fn energy_series(rng: &mut impl Rng) -> Vec<EnergyPoint> {
    ENERGY_SLOTS
        .iter()
        .map(|&(time, max, offset)| EnergyPoint {
            time: time.to_string(),
            usage: rng.gen_range(0.0..max),
            prediction: rng.gen_range(0.0..max) + offset,
        })
        .collect()
}

pub fn security_log(now: DateTime<Utc>) -> Vec<SecurityEvent> {
    vec![
        SecurityEvent {
            id: "S001".to_string(),
            timestamp: now - ChronoDuration::minutes(60),
            kind: SecurityEventKind::Entry,
            description: "User John Doe entered Zone A.".to_string(),
            severity: None,
        },
        SecurityEvent {
            id: "S002".to_string(),
            timestamp: now - ChronoDuration::minutes(30),
            kind: SecurityEventKind::Anomaly,
            description: "Unusual motion detected near West Entrance after hours.".to_string(),
            severity: Some(Severity::Medium),
        },
        SecurityEvent {
            id: "S003".to_string(),
            timestamp: now - ChronoDuration::minutes(10),
            kind: SecurityEventKind::Alert,
            description: "Fire alarm triggered in Kitchen Area.".to_string(),
            severity: Some(Severity::High),
        },
    ]
}

pub fn comfort_readings(rng: &mut impl Rng) -> ComfortReadings {
    let voc: f64 = rng.gen_range(0.0..0.5);
    ComfortReadings {
        temperature: rng.gen_range(20..25),
        lighting_level: rng.gen_range(60..100),
        air_quality: AirQuality {
            co2: rng.gen_range(400..800),
            humidity: rng.gen_range(40..60),
            voc: (voc * 100.0).round() / 100.0,
        },
    }
}

/// The four feeds behind a simulated delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockFeeds {
    config: FeedConfig,
}

impl MockFeeds {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    async fn wait(&self, feed: &str) {
        debug!(feed, delay_ms = self.config.delay.as_millis() as u64, "serving mock feed");
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        self.wait("dashboard").await;
        dashboard_stats(&mut rand::thread_rng())
    }

    pub async fn energy_series(&self) -> Vec<EnergyPoint> {
        self.wait("energy").await;
        energy_series(&mut rand::thread_rng())
    }

    pub async fn security_log(&self) -> Vec<SecurityEvent> {
        self.wait("security").await;
        security_log(Utc::now())
    }

    pub async fn comfort_readings(&self) -> ComfortReadings {
        self.wait("comfort").await;
        comfort_readings(&mut rand::thread_rng())
    }
}
