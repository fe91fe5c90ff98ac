//! Anchoring strategies: where a path starts and ends relative to its handles.

use serde::{Deserialize, Serialize};

use super::step::{StepOptions, step_path};
use crate::endpoint::ConnectionEndpoint;
use crate::geometry::Point;
use crate::offset::{DepthSource, resolve_offset};

/// Half the rendered diameter of a connection handle.
pub const HANDLE_OFFSET: f64 = 4.0;
/// Length of the arrow marker, tip to base.
pub const ARROW_LENGTH: f64 = 8.8;
pub const ARROW_WIDTH: f64 = 7.0;

/// How `MeasurementFlush` treats resolved offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOffsets {
    /// Handles already sit on the visual outline; endpoints are used as is.
    #[default]
    Zero,
    /// Pull each endpoint inward by its resolved offset.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgePathStrategy {
    MeasurementFlush {
        #[serde(default)]
        offsets: FlushOffsets,
    },
    FixedOffsetWithArrowhead {
        #[serde(default = "default_handle_offset")]
        handle_offset: f64,
        #[serde(default = "default_arrow_length")]
        arrow_length: f64,
    },
}

fn default_handle_offset() -> f64 {
    HANDLE_OFFSET
}

fn default_arrow_length() -> f64 {
    ARROW_LENGTH
}

impl Default for EdgePathStrategy {
    fn default() -> Self {
        Self::FixedOffsetWithArrowhead {
            handle_offset: HANDLE_OFFSET,
            arrow_length: ARROW_LENGTH,
        }
    }
}

/// Output of a strategy: adjusted endpoints plus the step path between them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedPath {
    pub source: Point,
    pub target: Point,
    /// Inward distance applied at each end.
    pub source_offset: f64,
    pub target_offset: f64,
    pub points: Vec<Point>,
    pub d: String,
    pub label: Point,
}

impl EdgePathStrategy {
    /// Adjusted `(source, target)` points and the inward distances applied.
    pub fn adjust(
        &self,
        source: &ConnectionEndpoint,
        target: &ConnectionEndpoint,
        depths: Option<&dyn DepthSource>,
    ) -> (Point, Point, f64, f64) {
        match *self {
            Self::MeasurementFlush { offsets } => {
                let (source_offset, target_offset) = match offsets {
                    FlushOffsets::Zero => (0.0, 0.0),
                    FlushOffsets::Resolved => {
                        (resolve_offset(source, depths), resolve_offset(target, depths))
                    }
                };
                (
                    source.orientation.nudge_inward(source.point(), source_offset),
                    target.orientation.nudge_inward(target.point(), target_offset),
                    source_offset,
                    target_offset,
                )
            }
            Self::FixedOffsetWithArrowhead {
                handle_offset,
                arrow_length,
            } => {
                let source_point = source.orientation.nudge_inward(source.point(), handle_offset);
                // The marker draws the tip, so the stroke stops at its base.
                let target_point = target.orientation.nudge_inward(
                    target.orientation.nudge_inward(target.point(), handle_offset),
                    -arrow_length,
                );
                (
                    source_point,
                    target_point,
                    handle_offset,
                    handle_offset - arrow_length,
                )
            }
        }
    }

    pub fn route(
        &self,
        source: &ConnectionEndpoint,
        target: &ConnectionEndpoint,
        depths: Option<&dyn DepthSource>,
        options: &StepOptions,
    ) -> RoutedPath {
        let (source_point, target_point, source_offset, target_offset) =
            self.adjust(source, target, depths);
        let step = step_path(
            source_point,
            source.orientation,
            target_point,
            target.orientation,
            options,
        );
        let label = match self {
            Self::MeasurementFlush { .. } => step.label,
            Self::FixedOffsetWithArrowhead { .. } => source_point.midpoint(target_point),
        };
        RoutedPath {
            source: source_point,
            target: target_point,
            source_offset,
            target_offset,
            points: step.points,
            d: step.d,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Orientation;
    use crate::offset::BoundaryDepthTable;

    const EPS: f64 = 1e-9;

    fn approx(p: Point, x: f64, y: f64) -> bool {
        (p.x - x).abs() < EPS && (p.y - y).abs() < EPS
    }

    fn at_origin(side: Orientation) -> ConnectionEndpoint {
        ConnectionEndpoint::new(0.0, 0.0, side).unwrap()
    }

    #[test]
    fn test_fixed_offset_target_table() {
        let strategy = EdgePathStrategy::default();
        let source = at_origin(Orientation::Right);
        let expected = [
            (Orientation::Left, -4.8, 0.0),
            (Orientation::Right, 4.8, 0.0),
            (Orientation::Top, 0.0, -4.8),
            (Orientation::Bottom, 0.0, 4.8),
        ];
        for (side, x, y) in expected {
            let (_, target, _, _) = strategy.adjust(&source, &at_origin(side), None);
            assert!(approx(target, x, y), "{side}: {target:?}");
        }
    }

    #[test]
    fn test_fixed_offset_source_table() {
        let strategy = EdgePathStrategy::default();
        let target = at_origin(Orientation::Left);
        let expected = [
            (Orientation::Left, 4.0, 0.0),
            (Orientation::Right, -4.0, 0.0),
            (Orientation::Top, 0.0, 4.0),
            (Orientation::Bottom, 0.0, -4.0),
        ];
        for (side, x, y) in expected {
            let (source, _, _, _) = strategy.adjust(&at_origin(side), &target, None);
            assert!(approx(source, x, y), "{side}: {source:?}");
        }
    }

    #[test]
    fn test_fixed_offset_label_at_adjusted_midpoint() {
        let strategy = EdgePathStrategy::default();
        let source = ConnectionEndpoint::new(0.0, 0.0, Orientation::Right).unwrap();
        let target = ConnectionEndpoint::new(100.0, 50.0, Orientation::Left).unwrap();
        let routed = strategy.route(&source, &target, None, &StepOptions::default());
        // source -> (-4, 0), target -> (95.2, 50)
        assert!(approx(routed.label, 45.6, 25.0), "{:?}", routed.label);
        assert_eq!(routed.points.first(), Some(&routed.source));
        assert_eq!(routed.points.last(), Some(&routed.target));
    }

    #[test]
    fn test_flush_passes_endpoints_through() {
        let strategy = EdgePathStrategy::MeasurementFlush {
            offsets: FlushOffsets::Zero,
        };
        let mut depths = BoundaryDepthTable::new();
        depths.insert("a", Orientation::Right, 20.0);
        let source = ConnectionEndpoint::new(10.0, 20.0, Orientation::Right)
            .unwrap()
            .with_owner("a");
        let target = ConnectionEndpoint::new(200.0, 80.0, Orientation::Left).unwrap();
        let routed = strategy.route(&source, &target, Some(&depths), &StepOptions::default());
        assert_eq!(routed.source, Point::new(10.0, 20.0));
        assert_eq!(routed.target, Point::new(200.0, 80.0));
        assert_eq!((routed.source_offset, routed.target_offset), (0.0, 0.0));
        assert_eq!(routed.label, Point::new(105.0, 50.0));
        assert!(routed.d.starts_with("M10 20"));
    }

    #[test]
    fn test_flush_resolved_offsets_pull_inward() {
        let strategy = EdgePathStrategy::MeasurementFlush {
            offsets: FlushOffsets::Resolved,
        };
        let mut depths = BoundaryDepthTable::new();
        depths.insert("a", Orientation::Top, 10.0);
        let source = ConnectionEndpoint::new(50.0, 0.0, Orientation::Top)
            .unwrap()
            .with_owner("a");
        let target = ConnectionEndpoint::new(50.0, 200.0, Orientation::Bottom).unwrap();
        let (s, t, so, to) = strategy.adjust(&source, &target, Some(&depths));
        assert_eq!(so, 12.0);
        assert_eq!(to, 12.0);
        assert_eq!(s, Point::new(50.0, 12.0));
        assert_eq!(t, Point::new(50.0, 188.0));
    }

    #[test]
    fn test_strategy_config_shape() {
        let s: EdgePathStrategy = serde_json::from_str(r#"{"kind":"measurement_flush"}"#).unwrap();
        assert_eq!(
            s,
            EdgePathStrategy::MeasurementFlush {
                offsets: FlushOffsets::Zero
            }
        );
    }

    #[test]
    fn test_fixed_offset_config_defaults() {
        let s: EdgePathStrategy =
            serde_json::from_str(r#"{"kind":"fixed_offset_with_arrowhead"}"#).unwrap();
        assert_eq!(s, EdgePathStrategy::default());

        let s: EdgePathStrategy =
            serde_json::from_str(r#"{"kind":"fixed_offset_with_arrowhead","arrow_length":10}"#)
                .unwrap();
        assert_eq!(
            s,
            EdgePathStrategy::FixedOffsetWithArrowhead {
                handle_offset: HANDLE_OFFSET,
                arrow_length: 10.0
            }
        );
    }
}
