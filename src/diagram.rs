//! Diagram document and its JSON interchange format.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::edge::Edge;
use crate::endpoint::{ConnectionEndpoint, SymbolMetadata};
use crate::geometry::Orientation;

pub const FORMAT_VERSION: &str = "1.0";
pub const DEFAULT_NAME: &str = "Untitled Diagram";

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid diagram format: {0}")]
    Format(String),
}

fn default_size() -> f64 {
    60.0
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

/// A placed symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramElement {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_path: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_size")]
    pub width: f64,
    #[serde(default = "default_size")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Properties owned by other parts of the editor, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiagramElement {
    pub fn new(id: impl Into<String>, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol_id: None,
            symbol_path: None,
            x,
            y,
            width: default_size(),
            height: default_size(),
            stroke_width: None,
            extra: Map::new(),
        }
    }

    /// Handle position on the middle of `side`.
    pub fn handle_point(&self, side: Orientation) -> (f64, f64) {
        match side {
            Orientation::Top => (self.x + self.width / 2.0, self.y),
            Orientation::Right => (self.x + self.width, self.y + self.height / 2.0),
            Orientation::Bottom => (self.x + self.width / 2.0, self.y + self.height),
            Orientation::Left => (self.x, self.y + self.height / 2.0),
        }
    }
}

/// A connection between two elements, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Handle id such as `right` or `right-source`; the side is its first part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiagramConnection {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            label: None,
            style: None,
            extra: Map::new(),
        }
    }
}

fn handle_side(handle: Option<&str>, default: Orientation) -> Orientation {
    handle
        .and_then(|h| h.split(['-', '_']).find_map(|part| part.parse().ok()))
        .unwrap_or(default)
}

/// The versioned file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default = "default_name")]
    name: String,
    elements: Vec<DiagramElement>,
    #[serde(default)]
    connections: Vec<DiagramConnection>,
    #[serde(default)]
    element_name_counts: Vec<(String, u32)>,
}

/// In-memory diagram document.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub name: String,
    pub elements: Vec<DiagramElement>,
    pub connections: Vec<DiagramConnection>,
    pub element_name_counts: BTreeMap<String, u32>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self {
            name: default_name(),
            elements: Vec::new(),
            connections: Vec::new(),
            element_name_counts: BTreeMap::new(),
        }
    }
}

impl Diagram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn element(&self, id: &str) -> Option<&DiagramElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Serialize with the current time as timestamp.
    pub fn export_json(&self) -> Result<String, DiagramError> {
        self.export_json_at(&now_timestamp())
    }

    /// Serialize as is. Connections to unknown elements are written out too;
    /// `import_json` drops them, so such a document does not round-trip.
    pub fn export_json_at(&self, timestamp: &str) -> Result<String, DiagramError> {
        let file = DiagramFile {
            version: FORMAT_VERSION.to_string(),
            timestamp: timestamp.to_string(),
            name: self.name.clone(),
            elements: self.elements.clone(),
            connections: self.connections.clone(),
            element_name_counts: self
                .element_name_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Parse and validate an exported diagram without touching any state.
    pub fn parse_json(source: &str) -> Result<Diagram, DiagramError> {
        let value: Value = serde_json::from_str(source)?;
        match value.get("elements") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(DiagramError::Format("`elements` must be an array".into())),
            None => return Err(DiagramError::Format("missing `elements` array".into())),
        }
        let file: DiagramFile = serde_json::from_value(value)?;
        if !file.version.is_empty() && file.version != FORMAT_VERSION {
            tracing::warn!(version = %file.version, "importing diagram with unknown format version");
        }

        let mut ids = HashSet::new();
        for element in &file.elements {
            if !ids.insert(element.id.as_str()) {
                return Err(DiagramError::Format(format!(
                    "duplicate element id `{}`",
                    element.id
                )));
            }
            if !element.x.is_finite() || !element.y.is_finite() {
                return Err(DiagramError::Format(format!(
                    "element `{}` has non-finite position",
                    element.id
                )));
            }
        }

        let connections = file
            .connections
            .into_iter()
            .filter(|c| {
                let known = ids.contains(c.source.as_str()) && ids.contains(c.target.as_str());
                if !known {
                    tracing::warn!(connection = %c.id, source = %c.source, target = %c.target, "dropping connection to unknown element");
                }
                known
            })
            .collect();

        Ok(Diagram {
            name: file.name,
            elements: file.elements,
            connections,
            element_name_counts: file.element_name_counts.into_iter().collect(),
        })
    }

    /// Replace this document with an imported one.
    ///
    /// The payload is fully validated first; on error `self` is unchanged.
    /// Connections whose source or target element is missing are dropped
    /// with a warning rather than failing the import, so exporting a
    /// document that holds such connections and importing it back loses
    /// them.
    pub fn import_json(&mut self, source: &str) -> Result<(), DiagramError> {
        let imported = Self::parse_json(source)?;
        *self = imported;
        Ok(())
    }

    /// Routable edge for a stored connection.
    pub fn edge(&self, connection: &DiagramConnection) -> Option<Edge> {
        let source = self.element(&connection.source)?;
        let target = self.element(&connection.target)?;
        let source_side = handle_side(connection.source_handle.as_deref(), Orientation::Bottom);
        let target_side = handle_side(connection.target_handle.as_deref(), Orientation::Top);
        Some(Edge {
            id: connection.id.clone(),
            source: endpoint(source, source_side)?,
            target: endpoint(target, target_side)?,
            label: connection.label.clone(),
            style: connection.style.clone(),
            strategy: None,
        })
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.connections.iter().filter_map(|c| self.edge(c)).collect()
    }
}

fn endpoint(element: &DiagramElement, side: Orientation) -> Option<ConnectionEndpoint> {
    let (x, y) = element.handle_point(side);
    let endpoint = ConnectionEndpoint::new(x, y, side).ok()?;
    Some(
        endpoint
            .with_owner(element.id.clone())
            .with_metadata(SymbolMetadata {
                width: Some(element.width),
                stroke_width: element.stroke_width,
            }),
    )
}

#[cfg(target_arch = "wasm32")]
fn now_timestamp() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagram {
        let mut d = Diagram::new("Boiler feed");
        let mut pump = DiagramElement::new("pump-1", "Pump 1", 0.0, 0.0);
        pump.symbol_id = Some("iso_equipment_12".into());
        pump.extra.insert("rotation".into(), Value::from(90));
        d.elements.push(pump);
        d.elements.push(DiagramElement::new("valve-1", "Gate Valve 1", 200.0, 0.0));
        d.elements.push(DiagramElement::new("tank-1", "Tank 1", 400.0, 100.0));

        let mut c1 = DiagramConnection::new("c1", "pump-1", "valve-1");
        c1.source_handle = Some("right-source".into());
        c1.target_handle = Some("left-target".into());
        c1.label = Some("DN50".into());
        let mut c2 = DiagramConnection::new("c2", "valve-1", "tank-1");
        c2.style = Some("stroke: #d62728".into());
        d.connections.push(c1);
        d.connections.push(c2);

        d.element_name_counts.insert("Pump".into(), 1);
        d.element_name_counts.insert("Gate Valve".into(), 1);
        d
    }

    fn sorted<T: Clone>(items: &[T], key: impl Fn(&T) -> String) -> Vec<T> {
        let mut v = items.to_vec();
        v.sort_by_key(|i| key(i));
        v
    }

    #[test]
    fn test_export_import_round_trip() {
        let original = sample();
        let json = original.export_json().unwrap();

        let mut restored = Diagram::default();
        restored.clear();
        restored.import_json(&json).unwrap();

        assert_eq!(restored.name, original.name);
        assert_eq!(
            sorted(&restored.elements, |e| e.id.clone()),
            sorted(&original.elements, |e| e.id.clone())
        );
        assert_eq!(
            sorted(&restored.connections, |c| c.id.clone()),
            sorted(&original.connections, |c| c.id.clone())
        );
        assert_eq!(restored.element_name_counts, original.element_name_counts);
    }

    #[test]
    fn test_export_layout() {
        let json = sample().export_json_at("2026-01-01T00:00:00.000Z").unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00.000Z");
        assert_eq!(value["elements"].as_array().unwrap().len(), 3);
        assert_eq!(value["elements"][0]["rotation"], 90);
        assert_eq!(value["elements"][0]["symbolId"], "iso_equipment_12");
        assert_eq!(value["connections"][0]["sourceHandle"], "right-source");
        assert!(value["elementNameCounts"].is_array());
    }

    #[test]
    fn test_import_without_elements_leaves_state() {
        let mut diagram = sample();
        let before = diagram.clone();

        let err = diagram
            .import_json(r#"{"version":"1.0","name":"x","connections":[]}"#)
            .unwrap_err();
        assert!(matches!(err, DiagramError::Format(_)));
        assert_eq!(diagram, before);

        let err = diagram.import_json(r#"{"elements":{"a":1}}"#).unwrap_err();
        assert!(matches!(err, DiagramError::Format(_)));
        assert_eq!(diagram, before);

        assert!(matches!(diagram.import_json("not json"), Err(DiagramError::Json(_))));
        assert_eq!(diagram, before);
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let mut diagram = sample();
        let before = diagram.clone();
        let json = r#"{"elements":[{"id":"a","x":0,"y":0},{"id":"a","x":5,"y":5}]}"#;
        assert!(matches!(diagram.import_json(json), Err(DiagramError::Format(_))));
        assert_eq!(diagram, before);
    }

    #[test]
    fn test_import_defaults_and_dangling_connections() {
        let json = r#"{
            "elements": [{"id":"a","x":0,"y":0},{"id":"b","x":100,"y":0}],
            "connections": [
                {"id":"c1","source":"a","target":"b"},
                {"id":"c2","source":"a","target":"ghost"}
            ]
        }"#;
        let diagram = Diagram::parse_json(json).unwrap();
        assert_eq!(diagram.name, DEFAULT_NAME);
        assert_eq!(diagram.elements[0].width, 60.0);
        assert_eq!(diagram.connections.len(), 1);
        assert!(diagram.element_name_counts.is_empty());
    }

    #[test]
    fn test_dangling_connection_is_exported_then_dropped() {
        let mut original = sample();
        original
            .connections
            .push(DiagramConnection::new("c9", "pump-1", "ghost"));
        let json = original.export_json_at("2026-01-01T00:00:00.000Z").unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["connections"].as_array().unwrap().len(),
            original.connections.len()
        );

        let mut restored = Diagram::default();
        restored.import_json(&json).unwrap();
        assert_eq!(restored.connections.len(), original.connections.len() - 1);
        assert!(restored.connections.iter().all(|c| c.id != "c9"));
        assert_eq!(restored.elements, original.elements);
    }

    #[test]
    fn test_edge_from_connection_handles() {
        let d = sample();
        let edge = d.edge(&d.connections[0]).unwrap();
        assert_eq!(edge.source.orientation, Orientation::Right);
        assert_eq!((edge.source.x, edge.source.y), (60.0, 30.0));
        assert_eq!(edge.target.orientation, Orientation::Left);
        assert_eq!((edge.target.x, edge.target.y), (200.0, 30.0));
        assert_eq!(edge.source.owner_node_id.as_deref(), Some("pump-1"));

        let edge = d.edge(&d.connections[1]).unwrap();
        assert_eq!(edge.source.orientation, Orientation::Bottom);
        assert_eq!(edge.target.orientation, Orientation::Top);
        assert_eq!(d.edges().len(), 2);
    }
}
