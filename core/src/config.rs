use crate::{
    error::{MapError, MapResult},
    model::TrackType,
    types::Tick,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONFIG_FILE: &str = "railmap.json";

/// Largest accepted `scan.radius_chunks`; a radius r scans (2r+1)^2 chunks per anchor.
pub const MAX_RADIUS_CHUNKS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Chebyshev radius, in chunks, scanned around each anchor.
    pub radius_chunks: u32,
    /// Longest step the path sequencer may take between two cells.
    pub connectivity_threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            radius_chunks: 4,
            connectivity_threshold: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub update_interval_ticks: Tick,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { update_interval_ticks: 20 }
    }
}

/// Placement policy applied through the audit service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditPolicy {
    pub enabled:            bool,
    pub player_placed_only: bool,
    /// Zero disables the bound.
    pub min_age_days:       i64,
    /// Zero disables the bound.
    pub max_age_days:       i64,
    pub ignore_players:     Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub network_palette: Vec<String>,
    pub type_colors:     BTreeMap<TrackType, String>,
    /// Zero disables the auto-render task.
    pub auto_render_interval_ticks: Tick,
    pub output_dir: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let network_palette = [
            "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8",
            "#F7DC6F", "#BB8FCE", "#85C1E2", "#F8B88B", "#76D7C4",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        let type_colors = [
            (TrackType::Plain,         "#888888"),
            (TrackType::PoweredRail,   "#FFD700"),
            (TrackType::DetectorRail,  "#FF4444"),
            (TrackType::ActivatorRail, "#4444FF"),
        ]
        .into_iter()
        .map(|(t, c)| (t, c.to_string()))
        .collect();
        Self {
            network_palette,
            type_colors,
            auto_render_interval_ticks: 0,
            output_dir: "./web/railwaymapper".into(),
        }
    }
}

impl RenderConfig {
    /// Colour for a network id; ids start at 1 and cycle through the palette.
    pub fn network_color(&self, network_id: u32) -> String {
        if self.network_palette.is_empty() {
            return "#FF6B6B".into();
        }
        let idx = (network_id.saturating_sub(1) as usize) % self.network_palette.len();
        self.network_palette[idx].clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    #[serde(default)]
    pub scan:     ScanConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub audit:    AuditPolicy,
    #[serde(default)]
    pub render:   RenderConfig,
}

impl MapperConfig {
    /// Load from `<data_dir>/railmap.json`.
    /// In tests, use MapperConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/{CONFIG_FILE}");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: MapperConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scanner and renderer cannot work with.
    pub fn validate(&self) -> MapResult<()> {
        if self.render.network_palette.is_empty() {
            return Err(MapError::InvalidConfig {
                reason: "render.network_palette must not be empty".into(),
            });
        }
        if self.scan.radius_chunks > MAX_RADIUS_CHUNKS {
            return Err(MapError::InvalidConfig {
                reason: format!(
                    "scan.radius_chunks must be at most {MAX_RADIUS_CHUNKS}, got {}",
                    self.scan.radius_chunks
                ),
            });
        }
        let threshold = self.scan.connectivity_threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(MapError::InvalidConfig {
                reason: format!(
                    "scan.connectivity_threshold must be positive, got {threshold}"
                ),
            });
        }
        let audit = &self.audit;
        if audit.min_age_days < 0 || audit.max_age_days < 0 {
            return Err(MapError::InvalidConfig {
                reason: "audit age bounds must not be negative".into(),
            });
        }
        if audit.min_age_days > 0 && audit.max_age_days > 0 && audit.min_age_days > audit.max_age_days {
            return Err(MapError::InvalidConfig {
                reason: format!(
                    "audit.min_age_days ({}) exceeds audit.max_age_days ({})",
                    audit.min_age_days, audit.max_age_days
                ),
            });
        }
        if self.tracking.update_interval_ticks == 0 {
            return Err(MapError::InvalidConfig {
                reason: "tracking.update_interval_ticks must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            scan: ScanConfig {
                radius_chunks: 1,
                connectivity_threshold: 2.5,
            },
            tracking: TrackingConfig { update_interval_ticks: 5 },
            audit: AuditPolicy::default(),
            render: RenderConfig {
                auto_render_interval_ticks: 0,
                output_dir: std::env::temp_dir()
                    .join("railmap-test-render")
                    .to_string_lossy()
                    .into_owned(),
                ..RenderConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_from_network_one() {
        let render = RenderConfig::default();
        assert_eq!(render.network_color(1), "#FF6B6B");
        assert_eq!(render.network_color(2), "#4ECDC4");
        assert_eq!(render.network_color(11), "#FF6B6B");
    }

    #[test]
    fn inverted_age_bounds_are_rejected() {
        let mut config = MapperConfig::default_test();
        config.audit.min_age_days = 10;
        config.audit.max_age_days = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json_with_defaults() {
        let config: MapperConfig =
            serde_json::from_str(r#"{"audit":{"enabled":true,"player_placed_only":true,"min_age_days":0,"max_age_days":0}}"#)
                .expect("parse partial config");
        assert!(config.audit.enabled);
        assert!(config.audit.ignore_players.is_empty());
        assert_eq!(config.scan, ScanConfig::default());
        assert_eq!(config.render.type_colors[&TrackType::PoweredRail], "#FFD700");
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_sections_fill_missing_fields_from_defaults() {
        let config: MapperConfig = serde_json::from_str(
            r#"{"scan":{"radius_chunks":2},"audit":{"enabled":true,"player_placed_only":true},"render":{"auto_render_interval_ticks":40}}"#,
        )
        .expect("parse partial sections");
        assert_eq!(config.scan.radius_chunks, 2);
        assert_eq!(config.scan.connectivity_threshold, 2.5);
        assert!(config.audit.enabled && config.audit.player_placed_only);
        assert_eq!(config.audit.min_age_days, 0);
        assert_eq!(config.render.auto_render_interval_ticks, 40);
        assert_eq!(config.render.network_palette.len(), 10);
        assert_eq!(config.tracking, TrackingConfig::default());
        config.validate().expect("partial config is valid");
    }

    #[test]
    fn oversized_scan_radius_is_rejected() {
        let mut config = MapperConfig::default_test();
        config.scan.radius_chunks = MAX_RADIUS_CHUNKS;
        assert!(config.validate().is_ok());
        config.scan.radius_chunks = u32::MAX;
        assert!(config.validate().is_err());
    }
}
