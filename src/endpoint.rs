use serde::{Deserialize, Serialize};

use crate::geometry::{Orientation, Point};

/// Size hints of the symbol owning a handle. Only used by the offset heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

/// One side of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEndpoint {
    pub x: f64,
    pub y: f64,
    pub orientation: Orientation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_metadata: Option<SymbolMetadata>,
}

#[derive(Debug, thiserror::Error)]
#[error("Endpoint coordinates must be finite, got ({0}, {1})")]
pub struct NonFiniteEndpoint(pub f64, pub f64);

impl ConnectionEndpoint {
    pub fn new(x: f64, y: f64, orientation: Orientation) -> Result<Self, NonFiniteEndpoint> {
        if !x.is_finite() || !y.is_finite() {
            return Err(NonFiniteEndpoint(x, y));
        }
        Ok(Self {
            x,
            y,
            orientation,
            owner_node_id: None,
            symbol_metadata: None,
        })
    }

    pub fn with_owner(mut self, node_id: impl Into<String>) -> Self {
        self.owner_node_id = Some(node_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: SymbolMetadata) -> Self {
        self.symbol_metadata = Some(metadata);
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Check the invariant that deserialized endpoints may have skipped.
    pub fn validate(&self) -> Result<(), NonFiniteEndpoint> {
        if self.point().is_finite() {
            Ok(())
        } else {
            Err(NonFiniteEndpoint(self.x, self.y))
        }
    }
}
