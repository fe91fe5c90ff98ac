//! Edges and their renderable primitives.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;
use crate::endpoint::ConnectionEndpoint;
use crate::geometry::Point;
use crate::measure::TextMetrics;
use crate::offset::DepthSource;
use crate::route::{EdgePathStrategy, StepOptions};
use crate::svg::escape_xml;

pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const HIT_STROKE_WIDTH: f64 = 20.0;

/// A directed connection between two handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: ConnectionEndpoint,
    pub target: ConnectionEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// CSS-like style descriptor, e.g. `stroke: #1f77b4; stroke-width: 2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Overrides the configured strategy for this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<EdgePathStrategy>,
}

/// Stroke settings extracted from a style descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub color: String,
    pub width: f64,
}

impl EdgeStyle {
    /// Read `stroke:` and `stroke-width:` from a descriptor. Missing or
    /// malformed values fall back to black and `default_width`.
    pub fn parse(descriptor: Option<&str>, default_width: f64) -> Self {
        let mut style = Self {
            color: DEFAULT_STROKE_COLOR.to_string(),
            width: default_width,
        };
        let Some(descriptor) = descriptor else {
            return style;
        };
        for declaration in descriptor.split(';') {
            let Some((key, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "stroke" if is_plain_color(value) => style.color = value.to_string(),
                "stroke-width" => {
                    if let Ok(w) = value.trim_end_matches("px").trim().parse::<f64>() {
                        if w.is_finite() && w > 0.0 {
                            style.width = w;
                        }
                    }
                }
                _ => {}
            }
        }
        style
    }
}

fn is_plain_color(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Everything needed to draw one edge. Both strokes share `d`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRender {
    pub id: String,
    pub d: String,
    pub points: Vec<Point>,
    pub visible: Stroke,
    pub hit: Stroke,
    pub label: Option<EdgeLabel>,
    pub marker_end: Option<String>,
    pub source_offset: f64,
    pub target_offset: f64,
}

impl EdgeRender {
    pub fn to_svg(&self, metrics: &TextMetrics) -> String {
        let mut svg = String::new();
        writeln!(svg, r#"<g class="pid-edge" data-id="{}">"#, escape_xml(&self.id)).unwrap();
        writeln!(
            svg,
            r#"<path class="pid-edge-hit" d="{}" fill="none" stroke="{}" stroke-width="{}" />"#,
            self.d, self.hit.color, self.hit.width
        )
        .unwrap();
        write!(
            svg,
            r#"<path class="pid-edge-line" d="{}" fill="none" stroke="{}" stroke-width="{}""#,
            self.d,
            escape_xml(&self.visible.color),
            self.visible.width
        )
        .unwrap();
        if let Some(marker) = &self.marker_end {
            write!(svg, r#" marker-end="{}""#, escape_xml(marker)).unwrap();
        }
        writeln!(svg, " />").unwrap();

        if let Some(label) = &self.label {
            let (w, h) = metrics.label_box(&label.text);
            writeln!(
                svg,
                r##"<rect class="pid-edge-label-bg" x="{}" y="{}" width="{}" height="{}" fill="#fff" />"##,
                label.x - w / 2.0,
                label.y - h / 2.0,
                w,
                h
            )
            .unwrap();
            writeln!(
                svg,
                r#"<text class="pid-edge-label" x="{}" y="{}" text-anchor="middle" dominant-baseline="central" font-size="{}">{}</text>"#,
                label.x,
                label.y,
                metrics.font_size,
                escape_xml(&label.text)
            )
            .unwrap();
        }
        writeln!(svg, "</g>").unwrap();
        svg
    }
}

/// Binds path routing, style and marker into an `EdgeRender`.
#[derive(Debug, Clone)]
pub struct EdgeRenderer {
    pub strategy: EdgePathStrategy,
    pub step: StepOptions,
    pub hit_width: f64,
    pub default_stroke_width: f64,
}

impl Default for EdgeRenderer {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

impl EdgeRenderer {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            strategy: config.strategy(),
            step: config.step_options(),
            hit_width: config.hit_width,
            default_stroke_width: config.default_stroke_width,
        }
    }

    pub fn style(&self, edge: &Edge) -> EdgeStyle {
        EdgeStyle::parse(edge.style.as_deref(), self.default_stroke_width)
    }

    pub fn render(
        &self,
        edge: &Edge,
        depths: Option<&dyn DepthSource>,
        marker_end: Option<String>,
    ) -> EdgeRender {
        let strategy = edge.strategy.unwrap_or(self.strategy);
        let routed = strategy.route(&edge.source, &edge.target, depths, &self.step);
        let style = self.style(edge);

        let label = edge
            .label
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| EdgeLabel {
                text: text.to_string(),
                x: routed.label.x,
                y: routed.label.y,
            });

        EdgeRender {
            id: edge.id.clone(),
            d: routed.d,
            points: routed.points,
            visible: Stroke {
                color: style.color,
                width: style.width,
            },
            hit: Stroke {
                color: "transparent".to_string(),
                width: self.hit_width,
            },
            label,
            marker_end,
            source_offset: routed.source_offset,
            target_offset: routed.target_offset,
        }
    }
}
