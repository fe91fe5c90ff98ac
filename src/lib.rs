pub mod config;
pub mod diagram;
pub mod edge;
pub mod endpoint;
pub mod export;
pub mod geometry;
pub mod marker;
pub mod measure;
pub mod observe;
pub mod offset;
pub mod route;
pub mod svg;
pub mod symbols;

use wasm_bindgen::prelude::*;

use diagram::Diagram;
use edge::{Edge, EdgeRenderer};
use marker::MarkerId;
use offset::BoundaryDepthTable;
use svg::SvgRenderer;
use symbols::SymbolCatalog;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Route one edge and return its `EdgeRender` as JSON.
///
/// `depths` is an optional boundary-depth table,
/// `{"node-id": {"right": 10.5, ...}}`. The returned `markerEnd` points at
/// the marker the host registers for this edge.
#[wasm_bindgen(js_name = "routeEdge")]
pub fn route_edge(edge_json: &str, depths_json: Option<String>) -> Result<String, String> {
    let edge: Edge = serde_json::from_str(edge_json).map_err(|e| e.to_string())?;
    edge.source.validate().map_err(|e| e.to_string())?;
    edge.target.validate().map_err(|e| e.to_string())?;

    let depths = match depths_json.as_deref() {
        Some(json) if !json.trim().is_empty() => Some(
            serde_json::from_str::<BoundaryDepthTable>(json).map_err(|e| e.to_string())?,
        ),
        _ => None,
    };

    let marker = MarkerId::for_edge(&edge.id).url();
    let render = EdgeRenderer::default().render(
        &edge,
        depths.as_ref().map(|d| d as &dyn offset::DepthSource),
        Some(marker),
    );
    serde_json::to_string(&render).map_err(|e| e.to_string())
}

/// Render exported diagram JSON to SVG
#[wasm_bindgen(js_name = "diagramToSvg")]
pub fn diagram_to_svg(json: &str) -> Result<String, String> {
    let diagram = Diagram::parse_json(json).map_err(|e| e.to_string())?;
    Ok(SvgRenderer::default().render(&diagram, None))
}

/// Import then re-export a diagram, applying defaults and dropping
/// connections to unknown elements.
#[wasm_bindgen(js_name = "normalizeDiagram")]
pub fn normalize_diagram(json: &str) -> Result<String, String> {
    let diagram = Diagram::parse_json(json).map_err(|e| e.to_string())?;
    diagram.export_json().map_err(|e| e.to_string())
}

/// Build the symbol catalog from a JSON array of asset paths.
#[wasm_bindgen(js_name = "symbolCatalog")]
pub fn symbol_catalog(paths_json: &str) -> Result<String, String> {
    let paths: Vec<String> = serde_json::from_str(paths_json).map_err(|e| e.to_string())?;
    let catalog = SymbolCatalog::from_paths(&paths);
    serde_json::to_string(&catalog).map_err(|e| e.to_string())
}
