//! Boundary polygons of a region, one or more closed rings per z-plane.
//!
//! Vertices lie on pixel corners: vertex `(x, y)` is the top-left corner of
//! pixel `(x, y)`. Rings built from voxels follow the crack boundary between
//! member and non-member pixels, so holes come out as separate rings and the
//! even-odd fill reproduces the exact voxel set.

use std::collections::BTreeMap;

use glam::{IVec2, IVec3};

use crate::geometry::{Voxel, VoxelSet};

/// One closed polygon on plane `z`. The last vertex connects to the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub z: i32,
    pub vertices: Vec<IVec2>,
}

impl Ring {
    /// Polygon length in pixels.
    pub fn perimeter(&self) -> f64 {
        self.edges()
            .map(|(a, b)| (b - a).as_dvec2().length())
            .sum()
    }

    fn edges(&self) -> impl Iterator<Item = (IVec2, IVec2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    rings: Vec<Ring>,
}

impl Outline {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    #[inline]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(|r| r.vertices.len() < 3)
    }

    pub fn perimeter(&self) -> f64 {
        self.rings.iter().map(Ring::perimeter).sum()
    }

    pub fn translated(&self, offset: IVec3) -> Outline {
        let shift = offset.truncate();
        Outline {
            rings: self
                .rings
                .iter()
                .map(|ring| Ring {
                    z: ring.z + offset.z,
                    vertices: ring.vertices.iter().map(|&v| v + shift).collect(),
                })
                .collect(),
        }
    }

    /// Traces the crack boundary of every plane of `voxels`.
    pub fn from_voxels(voxels: &VoxelSet) -> Self {
        let mut planes: BTreeMap<i32, Vec<(i32, i32)>> = BTreeMap::new();
        for v in voxels {
            planes.entry(v.z).or_default().push((v.x, v.y));
        }

        let mut rings = Vec::new();
        for (z, pixels) in planes {
            trace_plane(z, &pixels, &mut rings);
        }
        Self { rings }
    }

    /// Even-odd scanline fill sampled at pixel centers.
    pub fn fill(&self) -> VoxelSet {
        // (z, y) -> x positions where a ring crosses the row center
        let mut crossings: BTreeMap<(i32, i32), Vec<f64>> = BTreeMap::new();
        for ring in &self.rings {
            if ring.vertices.len() < 3 {
                continue;
            }
            for (a, b) in ring.edges() {
                if a.y == b.y {
                    continue;
                }
                let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
                for y in lo.y..hi.y {
                    let yc = y as f64 + 0.5;
                    let t = (yc - lo.y as f64) / (hi.y - lo.y) as f64;
                    let x = lo.x as f64 + t * (hi.x - lo.x) as f64;
                    crossings.entry((ring.z, y)).or_default().push(x);
                }
            }
        }

        let mut voxels = VoxelSet::new();
        for ((z, y), mut xs) in crossings {
            xs.sort_by(f64::total_cmp);
            for pair in xs.chunks_exact(2) {
                let first = (pair[0] - 0.5).ceil() as i32;
                let last = (pair[1] - 0.5).ceil() as i32 - 1;
                for x in first..=last {
                    voxels.insert(Voxel::new(x, y, z));
                }
            }
        }
        voxels
    }
}

/// Directed crack edges keep the member pixel on the right (y grows down),
/// which makes every vertex balanced and lets edges chain into closed loops.
fn trace_plane(z: i32, pixels: &[(i32, i32)], rings: &mut Vec<Ring>) {
    let members: hashbrown::HashSet<(i32, i32)> = pixels.iter().copied().collect();
    let mut edges: BTreeMap<(i32, i32), Vec<(i32, i32)>> = BTreeMap::new();
    let mut push = |from: (i32, i32), to: (i32, i32)| edges.entry(from).or_default().push(to);

    for &(x, y) in pixels {
        if !members.contains(&(x, y - 1)) {
            push((x, y), (x + 1, y));
        }
        if !members.contains(&(x + 1, y)) {
            push((x + 1, y), (x + 1, y + 1));
        }
        if !members.contains(&(x, y + 1)) {
            push((x + 1, y + 1), (x, y + 1));
        }
        if !members.contains(&(x - 1, y)) {
            push((x, y + 1), (x, y));
        }
    }

    while let Some(start) = edges.keys().next().copied() {
        let mut path = vec![start];
        let mut current = start;
        loop {
            let Some(targets) = edges.get_mut(&current) else {
                break;
            };
            let Some(next) = targets.pop() else {
                break;
            };
            if targets.is_empty() {
                edges.remove(&current);
            }
            if next == start {
                break;
            }
            path.push(next);
            current = next;
        }
        rings.push(Ring {
            z,
            vertices: simplify(&path),
        });
    }
}

/// Drops vertices lying on a straight run.
fn simplify(path: &[(i32, i32)]) -> Vec<IVec2> {
    let n = path.len();
    let points: Vec<IVec2> = path.iter().map(|&(x, y)| IVec2::new(x, y)).collect();
    if n < 3 {
        return points;
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            (points[i] - prev).perp_dot(next - points[i]) != 0
        })
        .map(|i| points[i])
        .collect()
}
