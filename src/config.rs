// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use crate::error::EngineError;
use crate::geometry::{DEFAULT_CENTROID_MIN_POINTS, DEFAULT_MARGIN_RATIO};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub margin_ratio: f64,
    pub centroid_min_points: usize,
    /// Degrees a centroid has to move on either axis before places refresh.
    pub centroid_epsilon: f64,
    pub search_radius_m: u32,
    pub search_category: String,
    /// Wait before asking for the next page of places.
    pub page_delay_ms: u64,
    /// Pages fetched per refresh, the first included.
    pub max_pages: u32,
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            margin_ratio: DEFAULT_MARGIN_RATIO,
            centroid_min_points: DEFAULT_CENTROID_MIN_POINTS,
            centroid_epsilon: 1e-9,
            search_radius_m: 2000,
            search_category: "food".to_string(),
            page_delay_ms: 2005,
            max_pages: 3,
            command_buffer: 64,
        }
    }
}

fn env_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), EngineError> {
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse::<T>()
            .map_err(|_| EngineError::InvalidConfig(format!("{} has unparseable value '{}'", key, raw)))?;
    }
    Ok(())
}

impl EngineConfig {
    /// Defaults overridden by `MEETPOINT_*` environment variables, after
    /// loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();
        EngineConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `MEETPOINT_*` key, then validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut config = EngineConfig::default();
        env_override(&lookup, "MEETPOINT_MARGIN_RATIO", &mut config.margin_ratio)?;
        env_override(&lookup, "MEETPOINT_CENTROID_MIN_POINTS", &mut config.centroid_min_points)?;
        env_override(&lookup, "MEETPOINT_CENTROID_EPSILON", &mut config.centroid_epsilon)?;
        env_override(&lookup, "MEETPOINT_SEARCH_RADIUS_M", &mut config.search_radius_m)?;
        env_override(&lookup, "MEETPOINT_SEARCH_CATEGORY", &mut config.search_category)?;
        env_override(&lookup, "MEETPOINT_PAGE_DELAY_MS", &mut config.page_delay_ms)?;
        env_override(&lookup, "MEETPOINT_MAX_PAGES", &mut config.max_pages)?;
        env_override(&lookup, "MEETPOINT_COMMAND_BUFFER", &mut config.command_buffer)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.margin_ratio.is_finite() || self.margin_ratio < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "margin_ratio must be a non-negative number, got {}",
                self.margin_ratio
            )));
        }
        if self.centroid_min_points == 0 {
            return Err(EngineError::InvalidConfig(
                "centroid_min_points must be at least 1".to_string(),
            ));
        }
        if !self.centroid_epsilon.is_finite() || self.centroid_epsilon < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "centroid_epsilon must be a non-negative number, got {}",
                self.centroid_epsilon
            )));
        }
        if self.max_pages == 0 {
            return Err(EngineError::InvalidConfig("max_pages must be at least 1".to_string()));
        }
        if self.command_buffer == 0 {
            return Err(EngineError::InvalidConfig(
                "command_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}
