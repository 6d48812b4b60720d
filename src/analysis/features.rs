// src/analysis/features.rs
//
// Calendar feature derivation. Pure and total: every timestamp has an
// hour and a weekday, so there is nothing to fail.

use crate::types::{EnrichedObservation, Observation};
use chrono::{Datelike, Timelike};

pub fn enrich(observation: &Observation) -> EnrichedObservation {
    EnrichedObservation {
        hour: observation.timestamp.hour(),
        day_of_week: observation.timestamp.weekday().num_days_from_monday(),
        observation: observation.clone(),
    }
}

pub fn enrich_all(observations: &[Observation]) -> Vec<EnrichedObservation> {
    observations.iter().map(enrich).collect()
}
