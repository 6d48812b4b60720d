// src/main.rs

mod analysis;
mod config;
mod error;
mod telemetry;
mod types;

use analysis::{PatternClassifier, TimingOptimizer, TrendForecaster};
use anyhow::Result;
use std::path::Path;
use tracing::{error, info};
use types::{Config, PatternLabel};

fn main() -> Result<()> {
    let config = Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.as_str())
        .init();

    info!("🚦 Traffic Signal Optimization Starting");
    info!("✓ Configuration loaded");

    let input_path = Path::new(&config.telemetry.input_path);
    let mut observations = telemetry::load_observations(input_path)?;
    if observations.is_empty() {
        error!("No telemetry rows found in {}", input_path.display());
        return Ok(());
    }
    info!(
        "Loaded {} observations from {}",
        observations.len(),
        input_path.display()
    );

    telemetry::compute_flow_rates(&mut observations, config.telemetry.flow_window_minutes);
    let enriched = analysis::enrich_all(&observations);

    // ── CLASSIFY ────────────────────────────────────────────────
    let classifier = PatternClassifier::new(config.clustering.clone());
    let classified = classifier.classify(&enriched)?;

    info!("Traffic Pattern Summary:");
    for stats in &classified.summary.rows {
        info!(
            "  {:<9} {:>4} obs | avg count {:>6.1} | avg density {:.6} | avg flow {:>5.2}/min",
            stats.label,
            stats.observations,
            stats.mean_vehicle_count,
            stats.mean_density,
            stats.mean_flow_rate
        );
    }

    // ── TRAIN ───────────────────────────────────────────────────
    let mut forecaster = TrendForecaster::new(config.forecast.clone());
    let report = forecaster.train(&classified)?;
    info!(
        "✓ Prediction model trained on {} samples ({} epochs, final loss {:.6})",
        report.samples,
        report.epochs,
        report.final_loss()
    );

    // ── OPTIMIZE ────────────────────────────────────────────────
    let optimizer = TimingOptimizer::new(config.signal.clone());
    for label in PatternLabel::ALL {
        let plan = optimizer.plan_for(label);
        info!("Optimal Signal Timing for {} Traffic:", label);
        for (phase, secs) in plan.phases() {
            info!("  {phase}: {secs} seconds");
        }
        info!("  cycle: {} seconds", plan.total_cycle());
    }

    // ── FORECAST ────────────────────────────────────────────────
    let horizon = config.forecast.horizon_hours;
    let predictions = forecaster.forecast(horizon)?;
    info!("Predicted Traffic Patterns for Next {horizon} Hours:");
    for row in &predictions {
        info!(
            "  {:02}:00 | {:>6.1} vehicles | {}",
            row.hour, row.vehicle_count, row.pattern
        );
    }

    let output_path = Path::new(&config.telemetry.output_path);
    telemetry::save_forecast(output_path, &predictions)?;
    info!("✓ Predictions saved to {}", output_path.display());

    Ok(())
}
