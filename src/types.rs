// src/types.rs

use crate::error::AnalysisError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub clustering: ClusteringConfig,
    pub forecast: ForecastConfig,
    pub signal: SignalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub input_path: String,
    pub output_path: String,
    pub flow_window_minutes: i64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            input_path: "traffic_data.csv".to_string(),
            output_path: "predicted_traffic_patterns.csv".to_string(),
            flow_window_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub seed: u64,
    pub max_iterations: usize,
    pub restarts: usize,
    pub use_time_features: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 100,
            restarts: 10,
            use_time_features: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub min_training_samples: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub horizon_hours: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_training_samples: 24,
            epochs: 200,
            learning_rate: 0.1,
            horizon_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub green_secs: u32,
    pub yellow_secs: u32,
    pub red_secs: u32,
    pub min_green_secs: u32,
    pub min_red_secs: u32,
    pub max_cycle_secs: u32,
    pub multipliers: SeverityMultipliers,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            green_secs: 30,
            yellow_secs: 4,
            red_secs: 25,
            min_green_secs: 15,
            min_red_secs: 10,
            max_cycle_secs: 90,
            multipliers: SeverityMultipliers::default(),
        }
    }
}

/// Green-phase scaling per severity level. Validated non-decreasing
/// at config load so higher severity never shortens the green phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityMultipliers {
    pub light: f64,
    pub moderate: f64,
    pub heavy: f64,
    pub congested: f64,
}

impl Default for SeverityMultipliers {
    fn default() -> Self {
        Self {
            light: 1.0,
            moderate: 1.2,
            heavy: 1.5,
            congested: 1.8,
        }
    }
}

impl SeverityMultipliers {
    pub fn for_label(&self, label: PatternLabel) -> f64 {
        match label {
            PatternLabel::Light => self.light,
            PatternLabel::Moderate => self.moderate,
            PatternLabel::Heavy => self.heavy,
            PatternLabel::Congested => self.congested,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "traffic_patterns=info".to_string(),
        }
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

/// One telemetry sample from the acquisition collaborator.
/// Immutable once recorded; `flow_rate` stays 0 until the sliding-window
/// pass fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub vehicle_count: u32,
    pub density: f64,
    pub flow_rate: f64,
}

/// Observation plus calendar features derived from its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub observation: Observation,
    /// 0-23
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
}

impl EnrichedObservation {
    pub fn vehicle_count(&self) -> u32 {
        self.observation.vehicle_count
    }

    pub fn density(&self) -> f64 {
        self.observation.density
    }

    pub fn flow_rate(&self) -> f64 {
        self.observation.flow_rate
    }
}

// ============================================================================
// PATTERNS
// ============================================================================

/// Traffic severity states, ordered by increasing typical vehicle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternLabel {
    Light,
    Moderate,
    Heavy,
    Congested,
}

impl PatternLabel {
    /// Every label, in ascending severity order.
    pub const ALL: [PatternLabel; 4] = [
        PatternLabel::Light,
        PatternLabel::Moderate,
        PatternLabel::Heavy,
        PatternLabel::Congested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Moderate => "Moderate",
            Self::Heavy => "Heavy",
            Self::Congested => "Congested",
        }
    }

    /// Label for a severity rank, 0 = least severe.
    pub fn from_rank(rank: usize) -> Option<PatternLabel> {
        Self::ALL.get(rank).copied()
    }
}

impl FromStr for PatternLabel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Light" => Ok(Self::Light),
            "Moderate" => Ok(Self::Moderate),
            "Heavy" => Ok(Self::Heavy),
            "Congested" => Ok(Self::Congested),
            other => Err(AnalysisError::UnknownPattern(other.to_string())),
        }
    }
}

impl std::fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SIGNAL TIMING
// ============================================================================

/// Signal phase durations for one severity label, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingPlan {
    pub label: PatternLabel,
    pub green_secs: u32,
    pub yellow_secs: u32,
    pub red_secs: u32,
}

impl TimingPlan {
    pub fn total_cycle(&self) -> u32 {
        self.green_secs + self.yellow_secs + self.red_secs
    }

    /// Phase name / duration pairs in cycle order, for display and export.
    pub fn phases(&self) -> [(&'static str, u32); 3] {
        [
            ("green", self.green_secs),
            ("yellow", self.yellow_secs),
            ("red", self.red_secs),
        ]
    }
}

// ============================================================================
// FORECAST
// ============================================================================

/// One future hourly step: predicted count plus the severity label it
/// classifies to. Counts are clamped non-negative but never rounded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRow {
    pub hour: u32,
    pub vehicle_count: f64,
    pub pattern: PatternLabel,
}
