//! Inward offset resolution for connection endpoints.
//!
//! Symbols with non-rectangular outlines (T-junctions, valves drawn inside
//! their bounding box) recede from the bounding-box edge on some sides. The
//! resolver turns a measured boundary depth, or a size heuristic when no
//! measurement exists, into the distance an edge should reach past its handle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::endpoint::{ConnectionEndpoint, SymbolMetadata};
use crate::geometry::Orientation;

/// Added to measured depths so the stroke crosses into the outline instead of
/// stopping on a rounded boundary pixel.
pub const DEPTH_BUFFER: f64 = 2.0;
pub const MIN_OFFSET: f64 = 8.0;
pub const MAX_MEASURED_OFFSET: f64 = 30.0;
pub const MAX_HEURISTIC_OFFSET: f64 = 25.0;
/// Offset for a symbol rendered at the reference size.
pub const DEFAULT_OFFSET: f64 = 12.0;
pub const REFERENCE_SYMBOL_SIZE: f64 = 60.0;

#[derive(Debug, thiserror::Error)]
pub enum DepthError {
    #[error("Measurement surface is not available")]
    Unavailable,
    #[error("Malformed depth attribute {attribute} on {element}: {value:?}")]
    Malformed {
        element: String,
        attribute: String,
        value: String,
    },
}

/// Lookup of boundary depths by `(node id, side)`.
pub trait DepthSource {
    /// `Ok(None)` means the symbol has no measurement for that side.
    fn boundary_depth(&self, node_id: &str, side: Orientation) -> Result<Option<f64>, DepthError>;
}

/// In-memory depth table, keyed node id -> side -> depth in pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryDepthTable {
    depths: BTreeMap<String, BTreeMap<Orientation, f64>>,
}

impl BoundaryDepthTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: impl Into<String>, side: Orientation, depth: f64) {
        self.depths.entry(node_id.into()).or_default().insert(side, depth);
    }

    pub fn get(&self, node_id: &str, side: Orientation) -> Option<f64> {
        self.depths.get(node_id)?.get(&side).copied()
    }

    /// Drop all measurements of a node, e.g. after its symbol was replaced.
    pub fn remove_node(&mut self, node_id: &str) {
        self.depths.remove(node_id);
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

impl DepthSource for BoundaryDepthTable {
    fn boundary_depth(&self, node_id: &str, side: Orientation) -> Result<Option<f64>, DepthError> {
        Ok(self.get(node_id, side))
    }
}

/// Depths published as string attributes on per-node measurement elements.
///
/// Symbol rendering code writes `data-depth-{side}` onto an element named
/// `symbol-measure-{node id}`. A missing element or attribute is simply "not
/// measured"; a value that does not parse is malformed.
#[derive(Debug, Clone, Default)]
pub struct MeasuredElements {
    attached: bool,
    elements: BTreeMap<String, BTreeMap<String, String>>,
}

impl MeasuredElements {
    pub fn new() -> Self {
        Self {
            attached: true,
            elements: BTreeMap::new(),
        }
    }

    /// A source whose measurement surface has not been mounted yet.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn element_name(node_id: &str) -> String {
        format!("symbol-measure-{}", node_id)
    }

    pub fn attribute_name(side: Orientation) -> String {
        format!("data-depth-{}", side.as_str())
    }

    pub fn set_attribute(&mut self, node_id: &str, side: Orientation, value: impl Into<String>) {
        self.attached = true;
        self.elements
            .entry(Self::element_name(node_id))
            .or_default()
            .insert(Self::attribute_name(side), value.into());
    }
}

impl DepthSource for MeasuredElements {
    fn boundary_depth(&self, node_id: &str, side: Orientation) -> Result<Option<f64>, DepthError> {
        if !self.attached {
            return Err(DepthError::Unavailable);
        }
        let element = Self::element_name(node_id);
        let Some(attrs) = self.elements.get(&element) else {
            return Ok(None);
        };
        let attribute = Self::attribute_name(side);
        let Some(raw) = attrs.get(&attribute) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DepthError::Malformed {
                element,
                attribute,
                value: raw.clone(),
            })
    }
}

/// Resolve how far past its handle an edge should reach, in `[8, 30]`.
///
/// Priority: a measured depth for the endpoint's owner and side, then the
/// size heuristic from symbol metadata, then the constant default. Errors from
/// the depth source are absorbed into the constant default.
pub fn resolve_offset(endpoint: &ConnectionEndpoint, depths: Option<&dyn DepthSource>) -> f64 {
    if let (Some(source), Some(node_id)) = (depths, endpoint.owner_node_id.as_deref()) {
        match source.boundary_depth(node_id, endpoint.orientation) {
            Ok(Some(depth)) if depth.is_finite() => {
                return (depth + DEPTH_BUFFER).clamp(MIN_OFFSET, MAX_MEASURED_OFFSET);
            }
            Ok(Some(depth)) => {
                tracing::debug!(node_id, side = %endpoint.orientation, depth, "non-finite boundary depth");
                return DEFAULT_OFFSET;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(node_id, side = %endpoint.orientation, %err, "boundary depth lookup failed");
                return DEFAULT_OFFSET;
            }
        }
    }

    match endpoint.symbol_metadata {
        Some(metadata) => heuristic_offset(&metadata),
        None => DEFAULT_OFFSET,
    }
}

/// Scales the default linearly with width; degenerate widths land on the floor.
fn heuristic_offset(metadata: &SymbolMetadata) -> f64 {
    let mut offset = DEFAULT_OFFSET;
    if let Some(width) = metadata.width.filter(|w| w.is_finite()) {
        offset = (offset * width / REFERENCE_SYMBOL_SIZE).round();
    }
    if let Some(stroke) = metadata.stroke_width.filter(|s| s.is_finite()) {
        offset += stroke.round();
    }
    offset.clamp(MIN_OFFSET, MAX_HEURISTIC_OFFSET)
}
