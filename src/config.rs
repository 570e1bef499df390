use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted nominal frame interval, in seconds.
const MAX_FRAME_INTERVAL: f32 = 1.0;

/// Tunables shared by the host controller and the render worker.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Upper bound applied to the device pixel ratio before sizing the surface.
    pub max_pixel_ratio: f32,
    /// Longest allowed surface edge in physical pixels.
    pub max_dimension: u32,
    /// Delta assumed for the first tick after every `start`, in seconds.
    pub nominal_frame_interval: f32,
    /// Largest delta a single tick may apply, in seconds.
    pub max_frame_delta: f32,
    /// Overrides the pointer smoothing time constant of every effect.
    pub pointer_smoothing: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            max_dimension: 4096,
            nominal_frame_interval: 1.0 / 60.0,
            max_frame_delta: 0.1,
            pointer_smoothing: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(source).context("failed to parse pipeline configuration")?;
        Ok(config.sanitized())
    }

    /// Reads a JSON configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_json_str(&source)
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let usable = |value: f32| value.is_finite() && value > 0.0;
        if !usable(self.max_pixel_ratio) {
            self.max_pixel_ratio = defaults.max_pixel_ratio;
        }
        self.max_dimension = self.max_dimension.max(1);
        let interval = self.nominal_frame_interval;
        if !usable(interval) || interval > MAX_FRAME_INTERVAL {
            self.nominal_frame_interval = defaults.nominal_frame_interval;
        }
        if !self.max_frame_delta.is_finite() {
            self.max_frame_delta = defaults.max_frame_delta;
        }
        if self.max_frame_delta < self.nominal_frame_interval {
            self.max_frame_delta = self.nominal_frame_interval;
        }
        self.pointer_smoothing = self.pointer_smoothing.filter(|tau| usable(*tau));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_object_uses_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"maxPixelRatio": 0, "maxDimension": 0, "maxFrameDelta": 0.001, "pointerSmoothing": -1}"#,
        )
        .unwrap();
        assert_eq!(config.max_pixel_ratio, 2.0);
        assert_eq!(config.max_dimension, 1);
        assert_eq!(config.max_frame_delta, config.nominal_frame_interval);
        assert_eq!(config.pointer_smoothing, None);
    }

    #[test]
    fn overflowing_values_fall_back_to_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"maxPixelRatio": 1e39, "nominalFrameInterval": 1e39, "maxFrameDelta": 1e39, "pointerSmoothing": 1e39}"#,
        )
        .unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.max_pixel_ratio, defaults.max_pixel_ratio);
        assert_eq!(config.nominal_frame_interval, defaults.nominal_frame_interval);
        assert_eq!(config.max_frame_delta, defaults.max_frame_delta);
        assert_eq!(config.pointer_smoothing, None);
        std::time::Duration::from_secs_f32(config.nominal_frame_interval);

        let slow = PipelineConfig::from_json_str(r#"{"nominalFrameInterval": 1e30}"#).unwrap();
        assert_eq!(slow.nominal_frame_interval, defaults.nominal_frame_interval);
    }

    #[test]
    fn load_reads_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(br#"{"maxPixelRatio": 1.5, "pointerSmoothing": 0.25}"#)
            .unwrap();
        let config = PipelineConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_pixel_ratio, 1.5);
        assert_eq!(config.pointer_smoothing, Some(0.25));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(PipelineConfig::load("/definitely/not/here.json").is_err());
    }
}
