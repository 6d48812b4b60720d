// src/analysis/trend_forecaster.rs
//
// Learns vehicle counts as a function of calendar features and projects
// them forward. Explicit two-state machine: the forecaster starts
// untrained and `train` is the only transition; forecasting before that
// fails with ModelNotTrained rather than guessing.

use super::pattern_classifier::{CentroidTable, ClassifiedBatch};
use crate::error::AnalysisError;
use crate::types::{ForecastConfig, ForecastRow};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Bias, sin/cos of hour-of-day, sin/cos of day-of-week, weekend flag.
const FEATURE_DIM: usize = 6;

// ============================================================================
// TYPES
// ============================================================================

/// Training diagnostics returned to the caller: one mean-squared-error
/// entry per epoch, in normalized target units.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub epochs: usize,
    pub loss_history: Vec<f64>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> f64 {
        self.loss_history.last().copied().unwrap_or(f64::NAN)
    }
}

/// The fitted state: regression weights, the count scale the targets were
/// normalized by, and the centroid table predictions are labeled against.
#[derive(Debug, Clone)]
struct TrendModel {
    weights: [f64; FEATURE_DIM],
    count_scale: f64,
    centroids: CentroidTable,
}

impl TrendModel {
    fn predict_count(&self, hour: u32, day_of_week: u32) -> f64 {
        let features = calendar_features(hour, day_of_week);
        let normalized: f64 = self
            .weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum();
        (normalized * self.count_scale).max(0.0)
    }
}

// ============================================================================
// FORECASTER
// ============================================================================

pub struct TrendForecaster {
    config: ForecastConfig,
    model: Option<TrendModel>,
}

impl TrendForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fit the regression against a labeled batch. Replaces any previously
    /// trained model; the caller's data is untouched.
    pub fn train(&mut self, batch: &ClassifiedBatch) -> Result<TrainingReport, AnalysisError> {
        let samples = &batch.observations;
        if samples.len() < self.config.min_training_samples {
            return Err(AnalysisError::InsufficientData {
                needed: self.config.min_training_samples,
                got: samples.len(),
            });
        }

        // Normalize targets by the batch maximum so one learning rate
        // works across intersections of very different volume.
        let count_scale = samples
            .iter()
            .map(|labeled| f64::from(labeled.observation.vehicle_count()))
            .fold(0.0f64, f64::max)
            .max(1.0);

        let rows: Vec<[f64; FEATURE_DIM]> = samples
            .iter()
            .map(|labeled| {
                calendar_features(labeled.observation.hour, labeled.observation.day_of_week)
            })
            .collect();
        let targets: Vec<f64> = samples
            .iter()
            .map(|labeled| f64::from(labeled.observation.vehicle_count()) / count_scale)
            .collect();

        let n = rows.len() as f64;
        let mut weights = [0.0f64; FEATURE_DIM];
        let mut loss_history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            let mut gradient = [0.0f64; FEATURE_DIM];
            let mut squared_error = 0.0;

            for (features, &target) in rows.iter().zip(&targets) {
                let predicted: f64 = weights
                    .iter()
                    .zip(features.iter())
                    .map(|(w, x)| w * x)
                    .sum();
                let error = predicted - target;
                squared_error += error * error;
                for (g, x) in gradient.iter_mut().zip(features.iter()) {
                    *g += error * x;
                }
            }

            for (w, g) in weights.iter_mut().zip(gradient.iter()) {
                *w -= self.config.learning_rate * g / n;
            }

            let loss = squared_error / n;
            loss_history.push(loss);
            if epoch == 0 || (epoch + 1) % 50 == 0 {
                debug!(epoch = epoch + 1, loss, "training epoch");
            }
        }

        self.model = Some(TrendModel {
            weights,
            count_scale,
            centroids: batch.centroids.clone(),
        });

        let report = TrainingReport {
            samples: samples.len(),
            epochs: self.config.epochs,
            loss_history,
        };
        info!(
            samples = report.samples,
            epochs = report.epochs,
            final_loss = report.final_loss(),
            "trend model trained"
        );
        Ok(report)
    }

    /// Forecast the next `horizon_hours` hourly steps starting from the
    /// current instant. Re-derives features from the invocation time on
    /// every call; nothing is cached.
    pub fn forecast(&self, horizon_hours: u32) -> Result<Vec<ForecastRow>, AnalysisError> {
        self.forecast_from(Utc::now(), horizon_hours)
    }

    /// Deterministic seam for callers that already hold a clock: forecast
    /// the `horizon_hours` hours following `start`.
    pub fn forecast_from(
        &self,
        start: DateTime<Utc>,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastRow>, AnalysisError> {
        let model = self.model.as_ref().ok_or(AnalysisError::ModelNotTrained)?;

        let mut rows = Vec::with_capacity(horizon_hours as usize);
        for step in 1..=i64::from(horizon_hours) {
            let instant = start + Duration::hours(step);
            let hour = instant.hour();
            let day_of_week = instant.weekday().num_days_from_monday();
            let vehicle_count = model.predict_count(hour, day_of_week);
            rows.push(ForecastRow {
                hour,
                vehicle_count,
                pattern: model.centroids.classify_count(vehicle_count),
            });
        }
        Ok(rows)
    }
}

/// Cyclical encoding keeps hour 23 adjacent to hour 0 and Sunday adjacent
/// to Monday, which a raw 0-23 / 0-6 column would tear apart.
fn calendar_features(hour: u32, day_of_week: u32) -> [f64; FEATURE_DIM] {
    use std::f64::consts::TAU;
    let hour_angle = TAU * f64::from(hour) / 24.0;
    let day_angle = TAU * f64::from(day_of_week) / 7.0;
    [
        1.0,
        hour_angle.sin(),
        hour_angle.cos(),
        day_angle.sin(),
        day_angle.cos(),
        if day_of_week >= 5 { 1.0 } else { 0.0 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::enrich;
    use crate::analysis::pattern_classifier::PatternClassifier;
    use crate::types::{ClusteringConfig, Observation};
    use chrono::{TimeZone, Utc};

    /// A week of hourly observations with a deterministic daily shape:
    /// quiet nights, heavy commute peaks.
    fn weekly_batch() -> ClassifiedBatch {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let mut observations = Vec::new();
        for step in 0..(7 * 24) {
            let timestamp = start + Duration::hours(step);
            let hour = timestamp.hour();
            let vehicle_count = match hour {
                0..=5 => 6,
                6..=9 => 80,
                10..=15 => 35,
                16..=19 => 90,
                _ => 18,
            };
            observations.push(enrich(&Observation {
                timestamp,
                vehicle_count,
                density: f64::from(vehicle_count) * 1e-5,
                flow_rate: 1.0,
            }));
        }
        PatternClassifier::new(ClusteringConfig::default())
            .classify(&observations)
            .unwrap()
    }

    fn forecaster() -> TrendForecaster {
        TrendForecaster::new(ForecastConfig::default())
    }

    #[test]
    fn test_forecast_before_train_fails() {
        let untrained = forecaster();
        let err = untrained.forecast(6).unwrap_err();
        assert_eq!(err, AnalysisError::ModelNotTrained);
    }

    #[test]
    fn test_train_rejects_tiny_batch() {
        let batch = weekly_batch();
        let truncated = ClassifiedBatch {
            observations: batch.observations[..10].to_vec(),
            summary: batch.summary.clone(),
            centroids: batch.centroids.clone(),
        };
        let err = forecaster().train(&truncated).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData { needed: 24, got: 10 }
        );
    }

    #[test]
    fn test_training_report_has_one_loss_per_epoch() {
        let batch = weekly_batch();
        let mut model = forecaster();
        let report = model.train(&batch).unwrap();
        assert_eq!(report.loss_history.len(), report.epochs);
        assert!(report.loss_history.iter().all(|loss| loss.is_finite()));
        // Gradient descent must actually make progress on this batch.
        assert!(report.final_loss() < report.loss_history[0]);
        assert!(model.is_trained());
    }

    #[test]
    fn test_forecast_shape_and_bounds() {
        let batch = weekly_batch();
        let mut model = forecaster();
        model.train(&batch).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 11, 9, 30, 0).unwrap();
        let rows = model.forecast_from(start, 24).unwrap();
        assert_eq!(rows.len(), 24);

        // Hours advance by one per step, wrapping at midnight.
        assert_eq!(rows[0].hour, 10);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].hour, (pair[0].hour + 1) % 24);
        }
        for row in &rows {
            assert!(row.vehicle_count >= 0.0);
        }
    }

    #[test]
    fn test_forecast_labels_come_from_centroid_table() {
        let batch = weekly_batch();
        let mut model = forecaster();
        model.train(&batch).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        for row in model.forecast_from(start, 24).unwrap() {
            assert_eq!(
                row.pattern,
                batch.centroids.classify_count(row.vehicle_count)
            );
        }
    }

    #[test]
    fn test_retrain_replaces_model() {
        let batch = weekly_batch();
        let mut model = forecaster();
        model.train(&batch).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        let first = model.forecast_from(start, 6).unwrap();

        // Retraining on the same data is a no-op for predictions.
        model.train(&batch).unwrap();
        let second = model.forecast_from(start, 6).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.hour, b.hour);
            assert!((a.vehicle_count - b.vehicle_count).abs() < 1e-12);
            assert_eq!(a.pattern, b.pattern);
        }
    }

    #[test]
    fn test_commute_hours_forecast_heavier_than_night() {
        let batch = weekly_batch();
        let mut model = forecaster();
        model.train(&batch).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        let rows = model.forecast_from(start, 24).unwrap();
        let at_hour = |hour: u32| {
            rows.iter()
                .find(|row| row.hour == hour)
                .map(|row| row.vehicle_count)
                .unwrap()
        };
        // The cyclical features must at least separate the 3am trough
        // from the 8am and 17pm peaks.
        assert!(at_hour(8) > at_hour(3));
        assert!(at_hour(17) > at_hour(3));
    }

    #[test]
    fn test_sunday_is_weekend_feature() {
        let features = calendar_features(12, 6);
        assert_eq!(features[5], 1.0);
        let weekday = calendar_features(12, 2);
        assert_eq!(weekday[5], 0.0);
    }
}
