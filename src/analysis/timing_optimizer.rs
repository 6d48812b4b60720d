// src/analysis/timing_optimizer.rs
//
// Stateless severity-to-phase-duration mapping. The yellow safety phase
// is fixed and never trimmed; when the scaled cycle exceeds the cap, the
// red phase gives way first, down to its floor, then green absorbs the
// remainder.

use crate::error::AnalysisError;
use crate::types::{PatternLabel, SignalConfig, TimingPlan};

pub struct TimingOptimizer {
    config: SignalConfig,
}

impl TimingOptimizer {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Phase durations for one severity label. Pure function of the label
    /// and the static signal configuration.
    pub fn plan_for(&self, label: PatternLabel) -> TimingPlan {
        let config = &self.config;
        let multiplier = config.multipliers.for_label(label);

        let scaled_green = (f64::from(config.green_secs) * multiplier).round() as u32;
        let mut green_secs = scaled_green.max(config.min_green_secs);
        let yellow_secs = config.yellow_secs;
        let mut red_secs = config.red_secs;

        let total = green_secs + yellow_secs + red_secs;
        if total > config.max_cycle_secs {
            let mut excess = total - config.max_cycle_secs;

            let red_slack = red_secs.saturating_sub(config.min_red_secs);
            let red_trim = excess.min(red_slack);
            red_secs -= red_trim;
            excess -= red_trim;

            if excess > 0 {
                let green_slack = green_secs.saturating_sub(config.min_green_secs);
                green_secs -= excess.min(green_slack);
            }
        }

        TimingPlan {
            label,
            green_secs,
            yellow_secs,
            red_secs,
        }
    }

    /// Parse-and-plan entry point for callers holding a label by name.
    pub fn plan_for_name(&self, name: &str) -> Result<TimingPlan, AnalysisError> {
        let label: PatternLabel = name.parse()?;
        Ok(self.plan_for(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeverityMultipliers;

    fn optimizer() -> TimingOptimizer {
        TimingOptimizer::new(SignalConfig::default())
    }

    #[test]
    fn test_heavy_scales_green_and_keeps_yellow() {
        // Base {green: 30, yellow: 4, red: 25}, heavy multiplier 1.5.
        let plan = optimizer().plan_for(PatternLabel::Heavy);
        assert_eq!(plan.green_secs, 45);
        assert_eq!(plan.yellow_secs, 4);
        assert!(plan.total_cycle() <= SignalConfig::default().max_cycle_secs);
    }

    #[test]
    fn test_green_monotone_across_severity() {
        let optimizer = optimizer();
        let greens: Vec<u32> = PatternLabel::ALL
            .iter()
            .map(|&label| optimizer.plan_for(label).green_secs)
            .collect();
        for pair in greens.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_every_plan_respects_cycle_invariants() {
        let config = SignalConfig::default();
        let optimizer = TimingOptimizer::new(config.clone());
        for label in PatternLabel::ALL {
            let plan = optimizer.plan_for(label);
            assert_eq!(plan.yellow_secs, config.yellow_secs);
            assert!(plan.green_secs > 0);
            assert!(plan.red_secs > 0);
            assert!(plan.total_cycle() <= config.max_cycle_secs);
        }
    }

    #[test]
    fn test_cap_trims_red_before_green() {
        let config = SignalConfig {
            max_cycle_secs: 70,
            ..SignalConfig::default()
        };
        let optimizer = TimingOptimizer::new(config);
        // Congested: green 54 + yellow 4 + red 25 = 83, 13 over the cap.
        let plan = optimizer.plan_for(PatternLabel::Congested);
        assert_eq!(plan.green_secs, 54);
        assert_eq!(plan.yellow_secs, 4);
        assert_eq!(plan.red_secs, 12);
        assert_eq!(plan.total_cycle(), 70);
    }

    #[test]
    fn test_cap_falls_back_to_green_after_red_floor() {
        let config = SignalConfig {
            max_cycle_secs: 60,
            ..SignalConfig::default()
        };
        let optimizer = TimingOptimizer::new(config);
        // Congested: 23 over the cap; red can only give 15, green gives 8.
        let plan = optimizer.plan_for(PatternLabel::Congested);
        assert_eq!(plan.red_secs, 10);
        assert_eq!(plan.green_secs, 46);
        assert_eq!(plan.yellow_secs, 4);
        assert_eq!(plan.total_cycle(), 60);
    }

    #[test]
    fn test_unknown_label_name_is_rejected() {
        let err = optimizer().plan_for_name("Unknown").unwrap_err();
        assert_eq!(err, AnalysisError::UnknownPattern("Unknown".to_string()));
    }

    #[test]
    fn test_plan_for_name_accepts_canonical_labels() {
        let plan = optimizer().plan_for_name("Congested").unwrap();
        assert_eq!(plan.label, PatternLabel::Congested);
    }

    #[test]
    fn test_fractional_multiplier_rounds() {
        let config = SignalConfig {
            multipliers: SeverityMultipliers {
                light: 0.75,
                moderate: 1.0,
                heavy: 1.25,
                congested: 1.55,
            },
            ..SignalConfig::default()
        };
        let optimizer = TimingOptimizer::new(config);
        // 30 * 0.75 = 22.5 -> 23, floored at min_green 15 does not apply.
        assert_eq!(optimizer.plan_for(PatternLabel::Light).green_secs, 23);
        // 30 * 1.55 = 46.5 -> 47 (round half away from zero).
        assert_eq!(optimizer.plan_for(PatternLabel::Congested).green_secs, 47);
    }
}
