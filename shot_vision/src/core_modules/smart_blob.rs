// THEORY:
// The `smart_blob` module holds the data containers of the spatial grouping
// layer. A `Component` is one 4-connected region of "on" cells in the
// downsampled mask: how many cells it has, where its centroid sits, and the box
// that encloses it. A `Candidate` is a component that passed the shape filter
// with its centroid mapped back into full-resolution frame pixels; its area and
// bounding box stay in downsampled mask cells.
//
// Both are transient: produced and discarded inside one frame's processing. They
// carry no memory of previous frames; temporal reasoning belongs to the gate.

use serde::{Deserialize, Serialize};

/// A 2D point in continuous pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Inclusive axis-aligned box on an integer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// One connected region of the mask, in downsampled-grid units.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Discovery order within the frame (raster scan of seed cells). Not persistent.
    pub id: u32,
    pub pixel_count: usize,
    /// Mean cell coordinate.
    pub centroid: Point,
    pub bounding_box: BoundingBox,
}

impl Component {
    /// Fraction of the bounding box actually covered by the component.
    pub fn fill_ratio(&self) -> f64 {
        self.pixel_count as f64 / self.bounding_box.area() as f64
    }
}

/// A component that passed the shape filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Frame pixels (mask centroid times the downsample factor).
    pub centroid: Point,
    /// Area in mask cells.
    pub pixel_count: usize,
    /// Inclusive bounds in mask cells, not frame pixels.
    pub bounding_box: BoundingBox,
}
