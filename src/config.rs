//! Tuning knobs for the broad and narrow phase.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::aabb::AABB;
use crate::math::vec2::Vec2;

/// Error type for loading a [`CollisionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A quad tree node must be able to hold at least one body.
    #[error("node capacity must be positive")]
    ZeroCapacity,
    /// The root node must be allowed to split at least once.
    #[error("max depth must be positive")]
    ZeroDepth,
    /// The indexed region has no area or is not finite.
    #[error("region {0:?} is empty")]
    EmptyRegion(AABB),
}

/// How the per-body share of a position correction is rounded before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetRounding {
    /// Away from zero on each axis, so a corrected pair never stays in contact.
    #[default]
    Outward,
    /// Toward zero on each axis.
    TowardZero,
    /// Apply the exact share.
    Exact,
}

impl OffsetRounding {
    pub fn apply(self, offset: Vec2) -> Vec2 {
        match self {
            OffsetRounding::Outward => offset.expand_to_next_int(),
            OffsetRounding::TowardZero => offset.truncate_toward_zero(),
            OffsetRounding::Exact => offset,
        }
    }
}

/// Which quad tree query produces the candidates of a reference body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhase {
    /// Only the path to the deepest node fully containing the body.
    #[default]
    Containing,
    /// Every node the body's rectangle reaches.
    Overlapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// World area covered by the quad tree root.
    pub region: AABB,
    /// Bodies a node holds before it splits.
    pub node_capacity: usize,
    /// Deepest level a node may split into. The root is level 0.
    pub max_depth: usize,
    pub offset_rounding: OffsetRounding,
    pub broad_phase: BroadPhase,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            region: AABB::new(Vec2::ZERO, Vec2::new(1024.0, 1024.0)),
            node_capacity: 10,
            max_depth: 5,
            offset_rounding: OffsetRounding::default(),
            broad_phase: BroadPhase::default(),
        }
    }
}

impl CollisionConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ConfigError> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.region.is_empty() || !self.region.min.is_finite() || !self.region.max.is_finite()
        {
            return Err(ConfigError::EmptyRegion(self.region));
        }
        Ok(())
    }
}
