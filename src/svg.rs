use crate::config::RoutingConfig;
use crate::diagram::{Diagram, DiagramElement};
use crate::edge::{EdgeRender, EdgeRenderer};
use crate::marker::{MarkerManager, SurfaceSlot};
use crate::measure::TextMetrics;
use crate::offset::DepthSource;
use std::fmt::Write;

pub struct SvgRenderer {
    metrics: TextMetrics,
    config: RoutingConfig,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }
}

impl SvgRenderer {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            metrics: TextMetrics::default(),
            config,
        }
    }

    /// Render the whole diagram as a standalone SVG document.
    pub fn render(&self, diagram: &Diagram, depths: Option<&dyn DepthSource>) -> String {
        let edge_renderer = EdgeRenderer::from_config(&self.config);

        // A private surface per export keeps the editor's live markers untouched.
        let surface = SurfaceSlot::mounted();
        let markers = MarkerManager::new(surface.clone())
            .with_size(self.config.arrow_length, self.config.arrow_width);

        let edges: Vec<EdgeRender> = diagram
            .edges()
            .iter()
            .map(|edge| {
                let color = edge_renderer.style(edge).color;
                let marker = markers.register_marker(&edge.id, &color).map(|id| id.url());
                edge_renderer.render(edge, depths, marker)
            })
            .collect();

        let mut bounds = Bounds::empty();
        for element in &diagram.elements {
            bounds.include(element.x, element.y);
            bounds.include(element.x + element.width, element.y + element.height);
        }
        for edge in &edges {
            for p in &edge.points {
                bounds.include(p.x, p.y);
            }
        }
        if bounds.is_empty() {
            bounds.include(0.0, 0.0);
            bounds.include(100.0, 100.0);
        }

        let pad = self.config.canvas_padding;
        let width = bounds.max_x - bounds.min_x + pad * 2.0;
        let height = bounds.max_y - bounds.min_y + pad * 2.0;

        let mut svg = String::new();
        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<style>
  .pid-element-border {{ fill: #fff; stroke: #333; stroke-width: 1.5; }}
  .pid-element-name {{ font-family: sans-serif; font-size: 11px; fill: #333; }}
  .pid-edge-label {{ font-family: sans-serif; fill: #333; }}
</style>"#
        )
        .unwrap();

        if let Some(defs) = surface.defs_svg() {
            writeln!(&mut svg, "{}", defs).unwrap();
        }

        writeln!(
            &mut svg,
            r#"<g transform="translate({},{})">"#,
            pad - bounds.min_x,
            pad - bounds.min_y
        )
        .unwrap();

        // Edges first (behind symbols)
        for edge in &edges {
            svg.push_str(&edge.to_svg(&self.metrics));
        }

        for element in &diagram.elements {
            self.render_element(&mut svg, element);
        }

        writeln!(&mut svg, "</g>").unwrap();
        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }

    fn render_element(&self, svg: &mut String, element: &DiagramElement) {
        let DiagramElement {
            x, y, width, height, ..
        } = *element;

        writeln!(
            svg,
            r#"<g class="pid-element" data-id="{}">"#,
            escape_xml(&element.id)
        )
        .unwrap();

        match &element.symbol_path {
            Some(path) => {
                writeln!(
                    svg,
                    r#"<image href="{}" x="{}" y="{}" width="{}" height="{}" />"#,
                    escape_xml(path),
                    x,
                    y,
                    width,
                    height
                )
                .unwrap();
            }
            None => {
                writeln!(
                    svg,
                    r#"<rect class="pid-element-border" x="{}" y="{}" width="{}" height="{}" />"#,
                    x, y, width, height
                )
                .unwrap();
            }
        }

        if !element.name.is_empty() {
            writeln!(
                svg,
                r#"<text class="pid-element-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                x + width / 2.0,
                y + height + self.metrics.line_height,
                escape_xml(&element.name)
            )
            .unwrap();
        }

        writeln!(svg, "</g>").unwrap();
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::DiagramConnection;
    use crate::geometry::Orientation;
    use crate::offset::BoundaryDepthTable;

    fn diagram() -> Diagram {
        let mut d = Diagram::new("Test");
        d.elements.push(DiagramElement::new("pump-1", "Pump & Motor", 0.0, 0.0));
        let mut valve = DiagramElement::new("valve-1", "Gate Valve 1", 200.0, 0.0);
        valve.symbol_path = Some("/symbols/ISO/PID-ISO-Valves-Symbols/svg/pid_iso_valves_000_gate_valve.svg".into());
        d.elements.push(valve);
        let mut c = DiagramConnection::new("c1", "pump-1", "valve-1");
        c.source_handle = Some("right".into());
        c.target_handle = Some("left".into());
        c.label = Some("DN50".into());
        c.style = Some("stroke: #d62728".into());
        d.connections.push(c);
        d
    }

    #[test]
    fn test_render_basic() {
        let svg = SvgRenderer::default().render(&diagram(), None);

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Pump &amp; Motor"));
        assert!(svg.contains("<image href="));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn test_render_with_edges() {
        let svg = SvgRenderer::default().render(&diagram(), None);

        assert!(svg.contains("DN50"));
        assert!(svg.contains(r#"class="pid-edge-line""#));
        assert!(svg.contains(r#"marker-end="url(#pid-arrow-c1)""#));
        assert!(svg.contains(r#"<marker id="pid-arrow-c1""#));
        assert!(svg.contains(r##"fill="#d62728""##));
    }

    #[test]
    fn test_render_empty_diagram() {
        let svg = SvgRenderer::default().render(&Diagram::default(), None);
        assert!(svg.contains(r#"width="140""#));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn test_render_uses_depths_for_flush_strategy() {
        let config = RoutingConfig {
            strategy: crate::config::StrategyKind::MeasurementFlush,
            flush_offsets: crate::route::FlushOffsets::Resolved,
            ..RoutingConfig::default()
        };
        let mut depths = BoundaryDepthTable::new();
        depths.insert("pump-1", Orientation::Right, 20.0);
        let svg = SvgRenderer::new(config).render(&diagram(), Some(&depths));
        // pump right handle at x=60, pulled 22px inward
        assert!(svg.contains("M38 30"));
    }
}
