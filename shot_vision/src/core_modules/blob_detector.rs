// THEORY:
// The `BlobDetector` is the engine of the spatial grouping layer. It turns the
// cleaned binary mask into a list of connected components and then decides which
// of them look like a fresh hole.
//
// Algorithm steps:
// 1.  **Seeding**: scan the mask in raster order; every "on" cell that has not
//     been labeled yet seeds a new component. Discovery order is therefore
//     top-to-bottom, left-to-right by seed, and the pipeline gates candidates in
//     exactly that order.
// 2.  **Region Growing**: an explicit stack drives a 4-connected flood fill. No
//     recursion: masks run to tens of thousands of cells and one large blob would
//     otherwise blow the call stack.
// 3.  **Data Aggregation**: while growing, accumulate the cell count, coordinate
//     sums (for the centroid) and the bounding box.
// 4.  **Shape Filtering**: a component becomes a `Candidate` only if its area is
//     within bounds and its fill ratio lies strictly inside the configured open
//     interval. Sparse line-like noise has a low fill; large solid regions (a
//     lighting change, a hand) have a fill close to 1. Round holes sit between.
// 5.  **Stateless Utility**: no memory of previous frames.

use crate::core_modules::morphology::BinaryMask;
use crate::core_modules::smart_blob::{BoundingBox, Candidate, Component, Point};
use serde::{Deserialize, Serialize};

/// Shape bounds a component must satisfy to become a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobFilter {
    /// Minimum cell count, inclusive, in downsampled-grid units.
    pub min_area: usize,
    /// Maximum cell count, inclusive, in downsampled-grid units.
    pub max_area: usize,
    /// Exclusive lower bound on the fill ratio.
    pub min_fill: f64,
    /// Exclusive upper bound on the fill ratio.
    pub max_fill: f64,
}

impl Default for BlobFilter {
    fn default() -> Self {
        Self {
            min_area: 8,
            max_area: 900,
            min_fill: 0.20,
            max_fill: 0.85,
        }
    }
}

impl BlobFilter {
    pub fn accepts(&self, component: &Component) -> bool {
        if component.pixel_count < self.min_area || component.pixel_count > self.max_area {
            return false;
        }
        let fill = component.fill_ratio();
        fill > self.min_fill && fill < self.max_fill
    }
}

pub mod blob_detector {
    use super::*;

    /// Labels every 4-connected component of the mask, in raster discovery order.
    pub fn label_components(mask: &BinaryMask) -> Vec<Component> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let cells = mask.cells();

        let mut labeled = vec![false; cells.len()];
        let mut stack: Vec<usize> = Vec::new();
        let mut components = Vec::new();

        for seed in 0..cells.len() {
            if !cells[seed] || labeled[seed] {
                continue;
            }

            labeled[seed] = true;
            stack.push(seed);

            let (seed_x, seed_y) = ((seed % width) as u32, (seed / width) as u32);
            let mut bounding_box = BoundingBox::at(seed_x, seed_y);
            let (mut sum_x, mut sum_y, mut count) = (0u64, 0u64, 0usize);

            while let Some(index) = stack.pop() {
                let x = index % width;
                let y = index / width;
                sum_x += x as u64;
                sum_y += y as u64;
                count += 1;
                bounding_box.include(x as u32, y as u32);

                // Check all 4 direct neighbors (not diagonals).
                let mut visit = |neighbor: usize| {
                    if cells[neighbor] && !labeled[neighbor] {
                        labeled[neighbor] = true;
                        stack.push(neighbor);
                    }
                };
                if x > 0 {
                    visit(index - 1);
                }
                if x + 1 < width {
                    visit(index + 1);
                }
                if y > 0 {
                    visit(index - width);
                }
                if y + 1 < height {
                    visit(index + width);
                }
            }

            components.push(Component {
                id: components.len() as u32,
                pixel_count: count,
                centroid: Point::new(sum_x as f64 / count as f64, sum_y as f64 / count as f64),
                bounding_box,
            });
        }

        components
    }

    /// Labels the mask and keeps the components that pass `filter`, with their
    /// centroids scaled by `downsample` into frame pixels. Bounding boxes stay in
    /// mask cells. Order is preserved.
    pub fn find_candidates(
        mask: &BinaryMask,
        filter: &BlobFilter,
        downsample: u32,
    ) -> Vec<Candidate> {
        let scale = downsample as f64;
        label_components(mask)
            .into_iter()
            .filter(|c| filter.accepts(c))
            .map(|c| Candidate {
                centroid: Point::new(c.centroid.x * scale, c.centroid.y * scale),
                pixel_count: c.pixel_count,
                bounding_box: c.bounding_box,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::blob_detector::*;
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(mask: &mut BinaryMask, x0: u32, y0: u32, size: u32) {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn two_separated_squares_give_two_centered_components() {
        let mut mask = BinaryMask::new(30, 20);
        square(&mut mask, 2, 3, 5);
        square(&mut mask, 20, 10, 5);

        let components = label_components(&mask);
        assert_eq!(components.len(), 2);

        assert_eq!(components[0].pixel_count, 25);
        assert_abs_diff_eq!(components[0].centroid.x, 4.0);
        assert_abs_diff_eq!(components[0].centroid.y, 5.0);
        let expected = BoundingBox {
            min_x: 2,
            min_y: 3,
            max_x: 6,
            max_y: 7,
        };
        assert_eq!(components[0].bounding_box, expected);

        assert_abs_diff_eq!(components[1].centroid.x, 22.0);
        assert_abs_diff_eq!(components[1].centroid.y, 12.0);
        assert_abs_diff_eq!(components[1].fill_ratio(), 1.0);
    }

    #[test]
    fn diagonal_neighbors_are_separate_components() {
        let mask = BinaryMask::from_rows(&[&[1, 0], &[0, 1]]);
        assert_eq!(label_components(&mask).len(), 2);
    }

    #[test]
    fn large_region_does_not_recurse() {
        let mut mask = BinaryMask::new(300, 300);
        square(&mut mask, 0, 0, 300);
        let components = label_components(&mask);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].pixel_count, 90_000);
    }

    #[test]
    fn discovery_order_follows_raster_scan() {
        let mut mask = BinaryMask::new(20, 20);
        square(&mut mask, 14, 1, 2);
        square(&mut mask, 1, 10, 2);
        square(&mut mask, 8, 5, 2);
        let xs: Vec<f64> = label_components(&mask).iter().map(|c| c.centroid.x).collect();
        assert_eq!(xs, vec![14.5, 8.5, 1.5]);
    }

    #[test]
    fn filter_rejects_solid_blocks_and_specks() {
        let filter = BlobFilter::default();

        let mut solid = BinaryMask::new(20, 20);
        square(&mut solid, 2, 2, 6);
        assert!(find_candidates(&solid, &filter, 2).is_empty());

        let mut speck = BinaryMask::new(20, 20);
        square(&mut speck, 2, 2, 2);
        assert!(find_candidates(&speck, &filter, 2).is_empty());
    }

    #[test]
    fn filter_rejects_sparse_shapes() {
        // 20 cells spread over an 11x10 box.
        let mut staircase = BinaryMask::new(30, 30);
        for i in 0..10 {
            staircase.set(i, i, true);
            staircase.set(i + 1, i, true);
        }
        let components = label_components(&staircase);
        assert_eq!(components.len(), 1);
        assert!(components[0].fill_ratio() < 0.20);
        assert!(!BlobFilter::default().accepts(&components[0]));
    }

    #[test]
    fn round_blob_is_a_candidate_scaled_to_frame_pixels() {
        // A 7x7 disk-ish blob: fill ratio 37/49 ~ 0.755.
        let mask = BinaryMask::from_rows(&[
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
            &[0, 0, 0, 1, 1, 1, 0, 0, 0],
            &[0, 0, 1, 1, 1, 1, 1, 0, 0],
            &[0, 1, 1, 1, 1, 1, 1, 1, 0],
            &[0, 1, 1, 1, 1, 1, 1, 1, 0],
            &[0, 1, 1, 1, 1, 1, 1, 1, 0],
            &[0, 0, 1, 1, 1, 1, 1, 0, 0],
            &[0, 0, 0, 1, 1, 1, 0, 0, 0],
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
        ]);
        let candidates = find_candidates(&mask, &BlobFilter::default(), 2);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pixel_count, 37);
        assert_abs_diff_eq!(candidates[0].centroid.x, 8.0);
        assert_abs_diff_eq!(candidates[0].centroid.y, 8.0);
        // Only the centroid is scaled; the box is still in mask cells.
        let bbox = candidates[0].bounding_box;
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (1, 1, 7, 7));
        assert_eq!(bbox.area(), 49);
    }
}
