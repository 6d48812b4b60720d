// src/telemetry.rs
//
// Acquisition/persistence boundary: chronological observation batches come
// in as CSV (columns: timestamp, vehicle_count, density, flow_rate),
// forecasts go out as CSV (columns: hour, vehicle_count, pattern).
// Also hosts the sliding-window flow-rate pass that backfills the
// flow_rate column the detector leaves at zero.

use crate::types::{ForecastRow, Observation};
use anyhow::{Context, Result};
use chrono::Duration;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let file =
        File::open(path).with_context(|| format!("opening telemetry file {}", path.display()))?;
    read_observations(file)
        .with_context(|| format!("parsing telemetry file {}", path.display()))
}

pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut observations = Vec::new();
    for record in csv_reader.deserialize() {
        let observation: Observation = record?;
        observations.push(observation);
    }
    debug!("loaded {} telemetry rows", observations.len());
    Ok(observations)
}

pub fn save_forecast(path: &Path, rows: &[ForecastRow]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating forecast file {}", path.display()))?;
    write_forecast(file, rows)
}

pub fn write_forecast<W: Write>(writer: W, rows: &[ForecastRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Backfill `flow_rate` for each observation from the window of samples in
/// the `window_minutes` ending at that observation (inclusive). A window
/// with fewer than two samples, or spanning zero minutes, leaves the
/// recorded value untouched. Assumes the batch is in chronological order.
pub fn compute_flow_rates(observations: &mut [Observation], window_minutes: i64) {
    let window = Duration::minutes(window_minutes);

    for i in 0..observations.len() {
        let window_start = observations[i].timestamp - window;

        let mut samples = 0u32;
        let mut count_sum = 0u64;
        let mut earliest = observations[i].timestamp;

        for observation in observations[..=i].iter().rev() {
            if observation.timestamp <= window_start {
                break;
            }
            samples += 1;
            count_sum += u64::from(observation.vehicle_count);
            earliest = observation.timestamp;
        }

        if samples < 2 {
            continue;
        }

        let span_minutes =
            (observations[i].timestamp - earliest).num_seconds() as f64 / 60.0;
        if span_minutes > 0.0 {
            let mean_count = count_sum as f64 / f64::from(samples);
            observations[i].flow_rate = mean_count / span_minutes;
        }
    }
}
