// src/config.rs

use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config file {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that serde cannot express. Rejecting these at
    /// load time keeps the timing invariants unreachable by configuration.
    pub fn validate(&self) -> Result<()> {
        let s = &self.signal;
        let m = &s.multipliers;

        if m.light > m.moderate || m.moderate > m.heavy || m.heavy > m.congested {
            bail!(
                "signal.multipliers must be non-decreasing by severity \
                 (got {} / {} / {} / {})",
                m.light,
                m.moderate,
                m.heavy,
                m.congested
            );
        }
        if m.light <= 0.0 {
            bail!("signal.multipliers.light must be positive, got {}", m.light);
        }
        if s.green_secs == 0 || s.yellow_secs == 0 || s.red_secs == 0 {
            bail!("signal phase durations must be positive");
        }
        if s.min_green_secs == 0 || s.min_red_secs == 0 {
            bail!("signal phase floors must be positive");
        }
        // The cap must leave room for the incompressible part of the cycle.
        let floor_cycle = s.min_green_secs + s.yellow_secs + s.min_red_secs;
        if floor_cycle > s.max_cycle_secs {
            bail!(
                "signal.max_cycle_secs ({}) is below the minimum feasible cycle ({})",
                s.max_cycle_secs,
                floor_cycle
            );
        }

        if self.forecast.epochs == 0 {
            bail!("forecast.epochs must be positive");
        }
        if self.forecast.learning_rate <= 0.0 {
            bail!(
                "forecast.learning_rate must be positive, got {}",
                self.forecast.learning_rate
            );
        }
        if self.telemetry.flow_window_minutes <= 0 {
            bail!(
                "telemetry.flow_window_minutes must be positive, got {}",
                self.telemetry.flow_window_minutes
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{
        ClusteringConfig, Config, ForecastConfig, LoggingConfig, SignalConfig, TelemetryConfig,
    };

    fn default_config() -> Config {
        Config {
            telemetry: TelemetryConfig::default(),
            clustering: ClusteringConfig::default(),
            forecast: ForecastConfig::default(),
            signal: SignalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config_passes_validation() {
        assert!(default_config().validate().is_ok());
    }

    #[test]
    fn test_decreasing_multipliers_rejected() {
        let mut config = default_config();
        config.signal.multipliers.heavy = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_infeasible_cycle_cap_rejected() {
        let mut config = default_config();
        config.signal.max_cycle_secs = 20;
        assert!(config.validate().is_err());
    }
}
