// THEORY:
// Once shots accumulate, the number a shooter actually cares about is the size of
// the group: the diameter of the smallest circle that encloses every hole. This
// module keeps that running tally.
//
// The minimum enclosing circle is always supported by either two points (as a
// diameter) or three points (circumscribed). Groups are small - a handful to a
// few dozen shots - so every pair and every triple is tried and the smallest
// circle containing all points wins.
//
// Degenerate geometry never raises: three (nearly) collinear points have no
// finite circumcircle, so the circle on their widest pair stands in for it.
//
// The group also guards against counting one hole twice. The detector's gate
// forgets a hole after a few seconds, so a hole that keeps differing from a
// stale baseline is reported again later; the group drops any shot that lands
// within `min_repeat_px` of the previous shot or `min_neighbor_px` of any shot.

use crate::core_modules::smart_blob::Point;
use serde::{Deserialize, Serialize};

const CONTAINMENT_EPSILON: f64 = 1e-6;
const COLLINEAR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn contains(&self, p: &Point) -> bool {
        self.center.distance_to(p) <= self.radius + CONTAINMENT_EPSILON
    }

    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }
}

/// The circle with `a` and `b` as a diameter.
pub fn circle_from_two(a: &Point, b: &Point) -> Circle {
    Circle {
        center: Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
        radius: a.distance_to(b) / 2.0,
    }
}

/// The circumcircle of `a`, `b`, `c`, or `None` when they are collinear.
pub fn circle_from_three(a: &Point, b: &Point, c: &Point) -> Option<Circle> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < COLLINEAR_EPSILON {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = Point::new(ux, uy);
    Some(Circle {
        center,
        radius: center.distance_to(a),
    })
}

/// Like `circle_from_three`, but collinear triples fall back to the widest pair.
pub fn circle_through_three(a: &Point, b: &Point, c: &Point) -> Circle {
    circle_from_three(a, b, c).unwrap_or_else(|| {
        [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)]
            .into_iter()
            .fold(circle_from_two(a, b), |widest, candidate| {
                if candidate.radius > widest.radius { candidate } else { widest }
            })
    })
}

/// Smallest circle enclosing all `points`.
pub fn minimum_enclosing_circle(points: &[Point]) -> Circle {
    let Some(first) = points.first() else {
        return Circle {
            center: Point::default(),
            radius: 0.0,
        };
    };

    let encloses_all = |c: &Circle| points.iter().all(|p| c.contains(p));
    let mut best: Option<Circle> = None;
    let mut consider = |c: Circle| {
        if encloses_all(&c) && best.is_none_or(|b| c.radius < b.radius) {
            best = Some(c);
        }
    };

    for i in 0..points.len() {
        for j in i + 1..points.len() {
            consider(circle_from_two(&points[i], &points[j]));
        }
    }
    for i in 0..points.len() {
        for j in i + 1..points.len() {
            for k in j + 1..points.len() {
                consider(circle_through_three(&points[i], &points[j], &points[k]));
            }
        }
    }

    best.unwrap_or(Circle {
        center: *first,
        radius: 0.0,
    })
}

/// Diameter of the minimum enclosing circle, in the points' units.
pub fn group_diameter(points: &[Point]) -> f64 {
    minimum_enclosing_circle(points).diameter()
}

/// Minimum spacing a new shot needs to count as a separate hole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSpacing {
    /// Distance from the most recent shot.
    pub min_repeat_px: f64,
    /// Distance from every shot in the group.
    pub min_neighbor_px: f64,
}

impl Default for GroupSpacing {
    fn default() -> Self {
        Self {
            min_repeat_px: 14.0,
            min_neighbor_px: 18.0,
        }
    }
}

impl GroupSpacing {
    /// Accepts every finite shot.
    pub const NONE: GroupSpacing = GroupSpacing {
        min_repeat_px: 0.0,
        min_neighbor_px: 0.0,
    };
}

/// A running collection of accepted shot positions.
#[derive(Debug, Clone, Default)]
pub struct ShotGroup {
    shots: Vec<Point>,
    spacing: GroupSpacing,
}

impl ShotGroup {
    /// An empty group with the default 14 px / 18 px spacing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spacing(spacing: GroupSpacing) -> Self {
        Self {
            shots: Vec::new(),
            spacing,
        }
    }

    /// Only the neighbour radius; the repeat radius is disabled.
    pub fn with_min_neighbor_px(min_neighbor_px: f64) -> Self {
        Self::with_spacing(GroupSpacing {
            min_repeat_px: 0.0,
            min_neighbor_px,
        })
    }

    pub fn spacing(&self) -> GroupSpacing {
        self.spacing
    }

    /// Adds a shot unless it has non-finite coordinates or sits too close to
    /// a shot already in the group. Returns whether it was added.
    pub fn push(&mut self, shot: Point) -> bool {
        if !(shot.x.is_finite() && shot.y.is_finite()) {
            return false;
        }
        let repeat = self.shots.last().is_some_and(|last| {
            last.distance_to(&shot) < self.spacing.min_repeat_px
        });
        if repeat {
            log::trace!("dropping repeat of the last shot at {shot:?}");
            return false;
        }
        if self
            .shots
            .iter()
            .any(|s| s.distance_to(&shot) < self.spacing.min_neighbor_px)
        {
            log::trace!("dropping shot at {shot:?}: too close to an earlier one");
            return false;
        }
        self.shots.push(shot);
        true
    }

    /// Pushes each shot in order and returns how many were added.
    pub fn extend<I: IntoIterator<Item = Point>>(&mut self, shots: I) -> usize {
        shots.into_iter().filter(|&shot| self.push(shot)).count()
    }

    /// Removes the most recent shot.
    pub fn undo(&mut self) -> Option<Point> {
        self.shots.pop()
    }

    pub fn clear(&mut self) {
        self.shots.clear();
    }

    pub fn shots(&self) -> &[Point] {
        &self.shots
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn enclosing_circle(&self) -> Circle {
        minimum_enclosing_circle(&self.shots)
    }

    pub fn diameter(&self) -> f64 {
        group_diameter(&self.shots)
    }
}
