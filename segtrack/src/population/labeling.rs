//! Connected component labeling of 2D and 3D rasters using union-find.
//!
//! Single raster-order pass over the voxels: each foreground voxel looks at
//! the already-visited half of its neighborhood, takes the first provisional
//! label it finds and unions the others into it. A final flatten maps the
//! provisional labels to sequential `1..=n`.

use common::Buffer3;

use crate::geometry::Connectivity;
use crate::raster::{Image3, LabelImage, Raster};

/// Labels every voxel of `mask` with a positive value. Returns the label
/// image (same footprint and calibration as `mask`) and the number of
/// components.
pub fn label_components(mask: &dyn Raster, connectivity: Connectivity) -> (LabelImage, usize) {
    let (sx, sy, sz) = (mask.size_x(), mask.size_y(), mask.size_z());
    let mut labels = Buffer3::<u32>::new_default(sx, sy, sz);
    let half = connectivity.half_offsets();
    let mut uf = UnionFind::new();

    for z in 0..sz {
        for y in 0..sy {
            for x in 0..sx {
                if mask.get_pixel(x, y, z) <= 0.0 {
                    continue;
                }
                let mut current = 0u32;
                for o in &half {
                    let (nx, ny, nz) = (x as i32 + o.x, y as i32 + o.y, z as i32 + o.z);
                    if nx < 0 || ny < 0 || nz < 0 || nx as usize >= sx || ny as usize >= sy {
                        continue;
                    }
                    let neighbor = labels[(nx as usize, ny as usize, nz as usize)];
                    if neighbor == 0 {
                        continue;
                    }
                    if current == 0 {
                        current = neighbor;
                    } else if neighbor != current {
                        uf.union(current, neighbor);
                    }
                }
                if current == 0 {
                    current = uf.make_set();
                }
                labels[(x, y, z)] = current;
            }
        }
    }

    let count = uf.flatten_labels(labels.voxels_mut());
    let image = Image3::from_buffer(labels)
        .with_offset(mask.offset())
        .with_calibration(mask.calibration());
    (LabelImage::narrowed(image), count)
}

// ============================================================================
// Union-Find
// ============================================================================

#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
    next_label: u32,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: Vec::with_capacity(256),
            next_label: 1,
        }
    }

    #[inline]
    fn make_set(&mut self) -> u32 {
        let label = self.next_label;
        self.parent.push(label);
        self.next_label += 1;
        label
    }

    /// Root with path compression.
    #[inline]
    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[(root - 1) as usize] != root {
            root = self.parent[(root - 1) as usize];
        }

        let mut current = label;
        while current != root {
            let idx = (current - 1) as usize;
            current = self.parent[idx];
            self.parent[idx] = root;
        }
        root
    }

    #[inline]
    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[(larger - 1) as usize] = smaller;
        }
    }

    /// Rewrites `labels` to sequential `1..=n` in first-seen order and
    /// returns `n`.
    fn flatten_labels(&mut self, labels: &mut [u32]) -> usize {
        let len = self.parent.len();
        let mut label_map = vec![0u32; len + 1];
        let mut num_labels = 0u32;

        for i in 1..=len as u32 {
            let root = self.find(i);
            if label_map[root as usize] == 0 {
                num_labels += 1;
                label_map[root as usize] = num_labels;
            }
            label_map[i as usize] = label_map[root as usize];
        }

        for l in labels.iter_mut() {
            if *l != 0 {
                *l = label_map[*l as usize];
            }
        }
        num_labels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Image3<u8> {
        let width = rows[0].len();
        Image3::from_fn(width, rows.len(), 1, |x, y, _| {
            (rows[y].as_bytes()[x] == b'#') as u8
        })
    }

    #[test]
    fn test_four_vs_eight_connectivity() {
        let mask = mask_from(&[
            "#..#", //
            ".#.#", //
            "...#", //
        ]);
        let (_, four) = label_components(&mask, Connectivity::Four);
        assert_eq!(four, 3);
        let (_, eight) = label_components(&mask, Connectivity::Eight);
        assert_eq!(eight, 2);
    }

    #[test]
    fn test_u_shape_merges_late() {
        let mask = mask_from(&[
            "#.#", //
            "#.#", //
            "###", //
        ]);
        let (labels, count) = label_components(&mask, Connectivity::Four);
        assert_eq!(count, 1);
        assert_eq!(labels.label(0, 0, 0), 1);
        assert_eq!(labels.label(2, 0, 0), 1);
        assert_eq!(labels.label(1, 0, 0), 0);
    }

    #[test]
    fn test_3d_components_and_offset() {
        let mut mask = Image3::<u8>::new(3, 3, 3).with_offset(glam::IVec3::new(10, 0, 5));
        mask.set(0, 0, 0, 1);
        mask.set(0, 0, 1, 1);
        mask.set(2, 2, 2, 1);
        mask.set(1, 1, 1, 1);

        let (labels, six) = label_components(&mask, Connectivity::Six);
        assert_eq!(six, 3);
        assert_eq!(labels.label(10, 0, 5), labels.label(10, 0, 6));
        assert_ne!(labels.label(10, 0, 5), 0);

        let (_, twenty_six) = label_components(&mask, Connectivity::TwentySix);
        assert_eq!(twenty_six, 1);
    }
}
