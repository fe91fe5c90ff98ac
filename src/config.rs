//! Rendering and routing tunables.

use serde::{Deserialize, Serialize};

use crate::route::strategy::{ARROW_LENGTH, ARROW_WIDTH, HANDLE_OFFSET};
use crate::route::{EdgePathStrategy, FlushOffsets, StepOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MeasurementFlush,
    #[default]
    FixedOffsetWithArrowhead,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {value}")]
    Value { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub strategy: StrategyKind,
    pub flush_offsets: FlushOffsets,
    pub handle_offset: f64,
    pub arrow_length: f64,
    pub arrow_width: f64,
    pub hit_width: f64,
    pub step_gap: f64,
    pub corner_radius: f64,
    pub default_stroke_width: f64,
    pub canvas_padding: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            flush_offsets: FlushOffsets::Zero,
            handle_offset: HANDLE_OFFSET,
            arrow_length: ARROW_LENGTH,
            arrow_width: ARROW_WIDTH,
            hit_width: 20.0,
            step_gap: 20.0,
            corner_radius: 0.0,
            default_stroke_width: 2.0,
            canvas_padding: 20.0,
        }
    }
}

impl RoutingConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("handle_offset", self.handle_offset),
            ("arrow_length", self.arrow_length),
            ("arrow_width", self.arrow_width),
            ("hit_width", self.hit_width),
            ("step_gap", self.step_gap),
            ("corner_radius", self.corner_radius),
            ("default_stroke_width", self.default_stroke_width),
            ("canvas_padding", self.canvas_padding),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Value { field, value });
            }
        }
        Ok(())
    }

    pub fn strategy(&self) -> EdgePathStrategy {
        match self.strategy {
            StrategyKind::MeasurementFlush => EdgePathStrategy::MeasurementFlush {
                offsets: self.flush_offsets,
            },
            StrategyKind::FixedOffsetWithArrowhead => EdgePathStrategy::FixedOffsetWithArrowhead {
                handle_offset: self.handle_offset,
                arrow_length: self.arrow_length,
            },
        }
    }

    pub fn step_options(&self) -> StepOptions {
        StepOptions {
            gap: self.step_gap,
            corner_radius: self.corner_radius,
        }
    }
}
