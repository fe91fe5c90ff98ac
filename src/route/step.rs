//! Step (Manhattan) path routing between two oriented handles.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::geometry::{Orientation, Point};

/// Tunables of the step routine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOptions {
    /// Distance the path travels straight out of a handle before its first bend.
    pub gap: f64,
    /// Radius of the bends; 0 gives sharp right angles.
    pub corner_radius: f64,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            gap: 20.0,
            corner_radius: 0.0,
        }
    }
}

/// A routed step path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPath {
    /// Source, turns, target. Consecutive points share an x or a y.
    pub points: Vec<Point>,
    /// SVG path description.
    pub d: String,
    /// Label anchor on the longest run of the path.
    pub label: Point,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, v: (f64, f64)) -> f64 {
        match self {
            Axis::X => v.0,
            Axis::Y => v.1,
        }
    }

    fn of_point(self, p: Point) -> f64 {
        self.of((p.x, p.y))
    }

    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn vector(self, value: f64) -> (f64, f64) {
        match self {
            Axis::X => (value, 0.0),
            Axis::Y => (0.0, value),
        }
    }
}

/// Main travel direction of the path, decided by the source side.
fn travel_direction(source: Point, source_side: Orientation, target: Point) -> (f64, f64) {
    if source_side.is_horizontal() {
        if source.x < target.x { (1.0, 0.0) } else { (-1.0, 0.0) }
    } else if source.y < target.y {
        (0.0, 1.0)
    } else {
        (0.0, -1.0)
    }
}

/// Route an orthogonal path from `source` (on `source_side`) to `target`.
pub fn step_path(
    source: Point,
    source_side: Orientation,
    target: Point,
    target_side: Orientation,
    options: &StepOptions,
) -> StepPath {
    let gap = options.gap;
    let source_dir = source_side.outward();
    let target_dir = target_side.outward();
    let source_gapped = source.translate(source_dir.0 * gap, source_dir.1 * gap);
    let target_gapped = target.translate(target_dir.0 * gap, target_dir.1 * gap);

    let dir = travel_direction(source_gapped, source_side, target_gapped);
    let axis = if dir.0 != 0.0 { Axis::X } else { Axis::Y };
    let current = axis.of(dir);

    let center = source.midpoint(target);
    let offset_x = (target.x - source.x).abs() / 2.0;
    let offset_y = (target.y - source.y).abs() / 2.0;

    let mut source_gap_offset = (0.0, 0.0);
    let mut target_gap_offset = (0.0, 0.0);
    let turns: Vec<Point>;
    let label: Point;

    if axis.of(source_dir) * axis.of(target_dir) == -1.0 {
        // Handles face each other along the travel axis: split at the center.
        let vertical_split = vec![
            Point::new(center.x, source_gapped.y),
            Point::new(center.x, target_gapped.y),
        ];
        let horizontal_split = vec![
            Point::new(source_gapped.x, center.y),
            Point::new(target_gapped.x, center.y),
        ];
        let heads_toward_target = axis.of(source_dir) == current;
        turns = match (axis, heads_toward_target) {
            (Axis::X, true) | (Axis::Y, false) => vertical_split,
            (Axis::X, false) | (Axis::Y, true) => horizontal_split,
        };
        label = center;
    } else {
        let source_target = Point::new(source_gapped.x, target_gapped.y);
        let target_source = Point::new(target_gapped.x, source_gapped.y);

        let mut corner = match axis {
            Axis::X if source_dir.0 == current => target_source,
            Axis::X => source_target,
            Axis::Y if source_dir.1 == current => source_target,
            Axis::Y => target_source,
        };

        if source_side == target_side {
            // Same-facing handles closer than the gap would overlap their stubs.
            let diff = (axis.of_point(source) - axis.of_point(target)).abs();
            if diff <= gap {
                let shrink = (gap - 1.0).min(gap - diff);
                if axis.of(source_dir) == current {
                    let sign = if axis.of_point(source_gapped) > axis.of_point(source) { -1.0 } else { 1.0 };
                    source_gap_offset = axis.vector(sign * shrink);
                } else {
                    let sign = if axis.of_point(target_gapped) > axis.of_point(target) { -1.0 } else { 1.0 };
                    target_gap_offset = axis.vector(sign * shrink);
                }
            }
        } else {
            // Mixed sides (e.g. right -> bottom): pick the corner that does
            // not cut back across either symbol.
            let opposite = axis.other();
            let same_dir = axis.of(source_dir) == opposite.of(target_dir);
            let source_gt = opposite.of_point(source_gapped) > opposite.of_point(target_gapped);
            let source_lt = opposite.of_point(source_gapped) < opposite.of_point(target_gapped);
            let flip = if axis.of(source_dir) == 1.0 {
                (!same_dir && source_gt) || (same_dir && source_lt)
            } else {
                (!same_dir && source_lt) || (same_dir && source_gt)
            };
            if flip {
                corner = match axis {
                    Axis::X => source_target,
                    Axis::Y => target_source,
                };
            }
        }

        let source_gap_point = source_gapped.translate(source_gap_offset.0, source_gap_offset.1);
        let target_gap_point = target_gapped.translate(target_gap_offset.0, target_gap_offset.1);
        let max_x = (source_gap_point.x - corner.x)
            .abs()
            .max((target_gap_point.x - corner.x).abs());
        let max_y = (source_gap_point.y - corner.y)
            .abs()
            .max((target_gap_point.y - corner.y).abs());
        label = if max_x >= max_y {
            Point::new((source_gap_point.x + target_gap_point.x) / 2.0, corner.y)
        } else {
            Point::new(corner.x, (source_gap_point.y + target_gap_point.y) / 2.0)
        };
        turns = vec![corner];
    }

    let mut points = Vec::with_capacity(turns.len() + 4);
    points.push(source);
    points.push(source_gapped.translate(source_gap_offset.0, source_gap_offset.1));
    points.extend(turns);
    points.push(target_gapped.translate(target_gap_offset.0, target_gap_offset.1));
    points.push(target);

    let d = path_description(&points, options.corner_radius);

    StepPath {
        points,
        d,
        label,
        offset_x,
        offset_y,
    }
}

/// Write `points` as an SVG path, rounding interior corners by `radius`.
pub fn path_description(points: &[Point], radius: f64) -> String {
    let mut d = String::new();
    let last = points.len().saturating_sub(1);
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            write!(d, "M{} {}", p.x, p.y).unwrap();
        } else if i == last || radius <= 0.0 {
            write!(d, "L{} {}", p.x, p.y).unwrap();
        } else {
            write_bend(&mut d, points[i - 1], *p, points[i + 1], radius);
        }
    }
    d
}

fn write_bend(d: &mut String, a: Point, b: Point, c: Point, radius: f64) {
    let dist = |p: Point, q: Point| ((q.x - p.x).powi(2) + (q.y - p.y).powi(2)).sqrt();
    let size = (dist(a, b) / 2.0).min(dist(b, c) / 2.0).min(radius);
    let Point { x, y } = b;

    if (a.x == x && x == c.x) || (a.y == y && y == c.y) {
        write!(d, "L{} {}", x, y).unwrap();
        return;
    }

    if a.y == y {
        let x_dir = if a.x < c.x { -1.0 } else { 1.0 };
        let y_dir = if a.y < c.y { 1.0 } else { -1.0 };
        write!(
            d,
            "L {},{}Q {},{} {},{}",
            x + size * x_dir,
            y,
            x,
            y,
            x,
            y + size * y_dir
        )
        .unwrap();
    } else {
        let x_dir = if a.x < c.x { 1.0 } else { -1.0 };
        let y_dir = if a.y < c.y { -1.0 } else { 1.0 };
        write!(
            d,
            "L {},{}Q {},{} {},{}",
            x,
            y + size * y_dir,
            x,
            y,
            x + size * x_dir,
            y
        )
        .unwrap();
    }
}
