use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::stream::{MilestoneRule, MilestoneTier};

/// Tunables for the three live components. Every field has a default so a
/// partial JSON file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveConfig {
    /// Posts fetched on stream start and on reload.
    pub page_size: usize,
    pub milestones: Vec<MilestoneRule>,
    pub celebration_duration_ms: u64,
    pub highlight_duration_ms: u64,
    /// Viewport offsets above this count as "at the top".
    pub scroll_threshold_px: f64,
    pub reshuffle_interval_ms: u64,
    pub pool_capacity: usize,
    pub mosaic_digits: String,
    pub glyph_gap: usize,
    pub schedule_tick_ms: u64,
    /// Suppresses the ambient mosaic reshuffle.
    pub reduced_motion: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            milestones: vec![
                MilestoneRule::new(10, MilestoneTier::Small),
                MilestoneRule::new(25, MilestoneTier::Medium),
                MilestoneRule::new(50, MilestoneTier::Medium),
                MilestoneRule::new(100, MilestoneTier::Large),
            ],
            celebration_duration_ms: 4_000,
            highlight_duration_ms: 1_500,
            scroll_threshold_px: 100.0,
            reshuffle_interval_ms: 6_000,
            pool_capacity: 120,
            mosaic_digits: "2025".into(),
            glyph_gap: 1,
            schedule_tick_ms: 30_000,
            reduced_motion: false,
        }
    }
}

impl LiveConfig {
    /// Read a JSON config file. A missing file yields the defaults; a file
    /// that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: LiveConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EVENTDAY_REDUCED_MOTION` and `EVENTDAY_DEBUG` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if env_flag("EVENTDAY_REDUCED_MOTION") {
            self.reduced_motion = true;
        }
        if env_flag("EVENTDAY_DEBUG") {
            self.schedule_tick_ms = 1_000;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("pageSize must be greater than zero");
        }
        if self.pool_capacity == 0 {
            bail!("poolCapacity must be greater than zero");
        }
        if self.reshuffle_interval_ms == 0 || self.schedule_tick_ms == 0 {
            bail!("reshuffle and schedule intervals must be greater than zero");
        }
        if self.milestones.iter().any(|rule| rule.every == 0) {
            bail!("milestone thresholds must be greater than zero");
        }
        Ok(())
    }

    pub fn celebration_duration(&self) -> Duration {
        Duration::from_millis(self.celebration_duration_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }

    pub fn reshuffle_interval(&self) -> Duration {
        Duration::from_millis(self.reshuffle_interval_ms)
    }

    pub fn schedule_tick(&self) -> Duration {
        Duration::from_millis(self.schedule_tick_ms)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LiveConfig =
            serde_json::from_str(r#"{ "pageSize": 20, "reducedMotion": true }"#).unwrap();
        assert_eq!(config.page_size, 20);
        assert!(config.reduced_motion);
        assert_eq!(config.pool_capacity, 120);
        assert_eq!(config.celebration_duration(), Duration::from_secs(4));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = LiveConfig::load(Path::new("/nonexistent/eventday.json")).unwrap();
        assert_eq!(config, LiveConfig::default());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = LiveConfig {
            page_size: 0,
            ..LiveConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
