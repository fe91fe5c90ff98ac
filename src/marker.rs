//! Arrow marker definitions shared by all edges of a diagram view.
//!
//! A view owns one drawing surface whose `<defs>` container holds one arrow
//! marker per edge, colored like the edge stroke. Everything here runs on the
//! single UI thread, so the surface is shared through `Rc<RefCell<_>>` and a
//! check-then-insert is enough to keep registration idempotent.

use std::cell::RefCell;
use std::fmt::{self, Write};
use std::rc::Rc;

use serde::Serialize;

use crate::route::strategy::{ARROW_LENGTH, ARROW_WIDTH};

pub const MARKER_PREFIX: &str = "pid-arrow-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn for_edge(edge_id: &str) -> Self {
        Self(format!("{}{}", MARKER_PREFIX, edge_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for a `marker-end` attribute.
    pub fn url(&self) -> String {
        format!("url(#{})", self.0)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A right-pointing sharp triangle, oriented along the path's end tangent.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDef {
    pub id: MarkerId,
    pub color: String,
    pub length: f64,
    pub width: f64,
}

impl MarkerDef {
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let half = self.width / 2.0;
        // refX 0: the stroke ends at the arrow's base and the tip overhangs it.
        write!(
            svg,
            r#"<marker id="{id}" viewBox="0 0 {l} {w}" refX="0" refY="{half}" markerWidth="{l}" markerHeight="{w}" markerUnits="userSpaceOnUse" orient="auto">"#,
            id = self.id,
            l = self.length,
            w = self.width,
            half = half,
        )
        .unwrap();
        write!(
            svg,
            r#"<path d="M0,0 L{l},{half} L0,{w} z" fill="{color}" /></marker>"#,
            l = self.length,
            half = half,
            w = self.width,
            color = crate::svg::escape_xml(&self.color),
        )
        .unwrap();
        svg
    }
}

/// The `<defs>` container of a drawing surface.
#[derive(Debug, Default)]
pub struct Definitions {
    markers: Vec<MarkerDef>,
}

impl Definitions {
    pub fn contains(&self, id: &MarkerId) -> bool {
        self.markers.iter().any(|m| &m.id == id)
    }

    pub fn get(&self, id: &MarkerId) -> Option<&MarkerDef> {
        self.markers.iter().find(|m| &m.id == id)
    }

    pub fn markers(&self) -> &[MarkerDef] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn insert(&mut self, def: MarkerDef) {
        self.markers.push(def);
    }

    fn remove(&mut self, id: &MarkerId) -> bool {
        let before = self.markers.len();
        self.markers.retain(|m| &m.id != id);
        self.markers.len() != before
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::from("<defs>");
        for marker in &self.markers {
            svg.push_str(&marker.to_svg());
        }
        svg.push_str("</defs>");
        svg
    }
}

/// The rendering root of a mounted diagram view.
#[derive(Debug, Default)]
pub struct DrawingSurface {
    defs: Option<Definitions>,
}

impl DrawingSurface {
    pub fn defs(&self) -> Option<&Definitions> {
        self.defs.as_ref()
    }

    /// The definitions container, created if missing.
    pub fn defs_mut(&mut self) -> &mut Definitions {
        self.defs.get_or_insert_with(Definitions::default)
    }

    /// Remove the definitions container with everything in it.
    pub fn clear_defs(&mut self) {
        self.defs = None;
    }
}

/// Handle to the drawing surface of one diagram view, which may not be mounted yet.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSlot(Rc<RefCell<Option<DrawingSurface>>>);

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted() -> Self {
        let slot = Self::new();
        slot.mount();
        slot
    }

    pub fn mount(&self) {
        let mut surface = self.0.borrow_mut();
        if surface.is_none() {
            *surface = Some(DrawingSurface::default());
        }
    }

    /// Tear the view down; its definitions go with it.
    pub fn unmount(&self) {
        self.0.borrow_mut().take();
    }

    pub fn is_mounted(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&DrawingSurface) -> R) -> Option<R> {
        self.0.borrow().as_ref().map(f)
    }

    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut DrawingSurface) -> R) -> Option<R> {
        self.0.borrow_mut().as_mut().map(f)
    }

    /// Number of marker definitions whose id refers to `edge_id`.
    pub fn markers_for_edge(&self, edge_id: &str) -> usize {
        let id = MarkerId::for_edge(edge_id);
        self.with_surface(|s| s.defs().map_or(0, |d| usize::from(d.contains(&id))))
            .unwrap_or(0)
    }

    pub fn defs_svg(&self) -> Option<String> {
        self.with_surface(|s| s.defs().map(Definitions::to_svg)).flatten()
    }
}

/// Registers and removes arrow markers on an injected surface.
#[derive(Debug, Clone)]
pub struct MarkerManager {
    surface: SurfaceSlot,
    length: f64,
    width: f64,
}

impl MarkerManager {
    pub fn new(surface: SurfaceSlot) -> Self {
        Self {
            surface,
            length: ARROW_LENGTH,
            width: ARROW_WIDTH,
        }
    }

    pub fn with_size(mut self, length: f64, width: f64) -> Self {
        self.length = length;
        self.width = width;
        self
    }

    pub fn surface(&self) -> &SurfaceSlot {
        &self.surface
    }

    /// Ensure a marker exists for `edge_id`.
    ///
    /// An existing definition is left untouched, color included. Returns
    /// `None` when no surface is mounted; the edge then renders without an
    /// arrow.
    pub fn register_marker(&self, edge_id: &str, stroke_color: &str) -> Option<MarkerId> {
        let id = MarkerId::for_edge(edge_id);
        let registered = self.surface.with_surface_mut(|surface| {
            let defs = surface.defs_mut();
            if !defs.contains(&id) {
                defs.insert(MarkerDef {
                    id: id.clone(),
                    color: stroke_color.to_string(),
                    length: self.length,
                    width: self.width,
                });
                tracing::debug!(marker = %id, color = stroke_color, "registered arrow marker");
            }
        });
        match registered {
            Some(()) => Some(id),
            None => {
                tracing::debug!(edge_id, "no drawing surface, skipping arrow marker");
                None
            }
        }
    }

    /// Remove a marker. Missing surface, container or marker are all fine.
    pub fn unregister_marker(&self, id: &MarkerId) {
        let removed = self
            .surface
            .with_surface_mut(|surface| surface.defs.as_mut().is_some_and(|d| d.remove(id)))
            .unwrap_or(false);
        if removed {
            tracing::debug!(marker = %id, "removed arrow marker");
        }
    }
}

/// The arrow marker owned by one edge; removed when dropped.
#[derive(Debug)]
pub struct EdgeMarker {
    manager: MarkerManager,
    edge_id: String,
    color: String,
    id: Option<MarkerId>,
}

impl EdgeMarker {
    pub fn new(manager: MarkerManager, edge_id: impl Into<String>, color: impl Into<String>) -> Self {
        let mut marker = Self {
            manager,
            edge_id: edge_id.into(),
            color: color.into(),
            id: None,
        };
        marker.on_mount();
        marker
    }

    /// Register again once a surface is mounted. Covers both a surface that
    /// appeared after construction and one that was torn down and remounted.
    pub fn on_mount(&mut self) {
        if self.url().is_none() {
            self.id = self.manager.register_marker(&self.edge_id, &self.color);
        }
    }

    pub fn id(&self) -> Option<&MarkerId> {
        self.id.as_ref()
    }

    /// `marker-end` value, if the marker is registered and still present.
    pub fn url(&self) -> Option<String> {
        let id = self.id.as_ref()?;
        let present = self
            .manager
            .surface
            .with_surface(|s| s.defs().is_some_and(|d| d.contains(id)))
            .unwrap_or(false);
        present.then(|| id.url())
    }
}

impl Drop for EdgeMarker {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.manager.unregister_marker(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let slot = SurfaceSlot::mounted();
        let manager = MarkerManager::new(slot.clone());
        let a = manager.register_marker("e1", "#ff0000");
        let b = manager.register_marker("e1", "#00ff00");
        assert_eq!(a, b);
        let defs_len = slot.with_surface(|s| s.defs().map(|d| d.len())).flatten();
        assert_eq!(defs_len, Some(1));
        let color = slot
            .with_surface(|s| s.defs().and_then(|d| d.get(&MarkerId::for_edge("e1"))).map(|m| m.color.clone()))
            .flatten();
        assert_eq!(color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_defs_created_lazily() {
        let slot = SurfaceSlot::mounted();
        assert!(slot.with_surface(|s| s.defs().is_none()).unwrap());
        MarkerManager::new(slot.clone()).register_marker("e1", "black");
        assert!(slot.with_surface(|s| s.defs().is_some()).unwrap());
    }

    #[test]
    fn test_register_without_surface_is_skipped() {
        let manager = MarkerManager::new(SurfaceSlot::new());
        assert_eq!(manager.register_marker("e1", "black"), None);
    }

    #[test]
    fn test_unregister_without_surface_or_defs() {
        let slot = SurfaceSlot::mounted();
        let manager = MarkerManager::new(slot.clone());
        let id = manager.register_marker("e1", "black").unwrap();

        slot.with_surface_mut(|s| s.clear_defs());
        manager.unregister_marker(&id);

        slot.unmount();
        manager.unregister_marker(&id);
        assert_eq!(slot.markers_for_edge("e1"), 0);
    }

    #[test]
    fn test_edge_marker_removed_on_drop() {
        let slot = SurfaceSlot::mounted();
        let manager = MarkerManager::new(slot.clone());
        {
            let marker = EdgeMarker::new(manager.clone(), "e7", "#123456");
            assert_eq!(marker.url().as_deref(), Some("url(#pid-arrow-e7)"));
            assert_eq!(slot.markers_for_edge("e7"), 1);
        }
        assert_eq!(slot.markers_for_edge("e7"), 0);
    }

    #[test]
    fn test_edge_marker_drop_after_unmount() {
        let slot = SurfaceSlot::mounted();
        let marker = EdgeMarker::new(MarkerManager::new(slot.clone()), "e1", "black");
        slot.unmount();
        drop(marker);
        assert_eq!(slot.markers_for_edge("e1"), 0);
    }

    #[test]
    fn test_edge_marker_deferred_attachment() {
        let slot = SurfaceSlot::new();
        let mut marker = EdgeMarker::new(MarkerManager::new(slot.clone()), "e2", "blue");
        assert!(marker.id().is_none());
        assert!(marker.url().is_none());

        slot.mount();
        marker.on_mount();
        assert_eq!(slot.markers_for_edge("e2"), 1);
    }

    #[test]
    fn test_edge_marker_reattaches_after_remount() {
        let slot = SurfaceSlot::mounted();
        let mut marker = EdgeMarker::new(MarkerManager::new(slot.clone()), "e1", "red");
        slot.unmount();
        slot.mount();
        assert!(marker.url().is_none());

        marker.on_mount();
        assert_eq!(slot.markers_for_edge("e1"), 1);
        assert_eq!(marker.url().as_deref(), Some("url(#pid-arrow-e1)"));

        // Already present: a second mount signal adds nothing.
        marker.on_mount();
        assert_eq!(slot.with_surface(|s| s.defs().map(|d| d.len())).flatten(), Some(1));
    }

    #[test]
    fn test_marker_svg_geometry() {
        let def = MarkerDef {
            id: MarkerId::for_edge("e1"),
            color: "#333".into(),
            length: ARROW_LENGTH,
            width: ARROW_WIDTH,
        };
        let svg = def.to_svg();
        assert!(svg.contains(r#"id="pid-arrow-e1""#));
        assert!(svg.contains(r#"orient="auto""#));
        assert!(svg.contains(r#"markerUnits="userSpaceOnUse""#));
        assert!(svg.contains("M0,0 L8.8,3.5 L0,7 z"));
        assert!(svg.contains(r##"fill="#333""##));
    }
}
