// src/analysis/mod.rs
//
// Traffic pattern analysis core.
//
// Signal flow:
//   Observations → features ─→ pattern_classifier (kmeans) ─→ ClassifiedBatch
//                                   │ centroid table
//                                   ▼
//                              trend_forecaster ─→ [ForecastRow]
//   PatternLabel ─→ timing_optimizer ─→ TimingPlan   (independent of the rest)
//
// Orchestrated by main.rs.

pub mod features;
pub mod kmeans;
pub mod pattern_classifier;
pub mod timing_optimizer;
pub mod trend_forecaster;

// Re-exports for ergonomic access from main.rs
pub use features::{enrich, enrich_all};
pub use pattern_classifier::{
    ClassifiedBatch, LabeledObservation, Pattern, PatternClassifier, PatternStats, PatternSummary,
};
pub use timing_optimizer::TimingOptimizer;
pub use trend_forecaster::{TrainingReport, TrendForecaster};
