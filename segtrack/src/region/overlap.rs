//! Overlap and intersection across encodings and dimensionalities.
//!
//! A 2D operand is treated as extending through the full z-range of a 3D
//! one. Two 2D operands only compare xy. Optional offsets translate each
//! operand into the common frame before comparison.

use glam::{DVec3, IVec3};

use super::{circle_overlap, Region, Shape};
use crate::geometry::{BoundingBox, Voxel, VoxelSet};

/// Linear sub-sampling factor used when both operands are analytical.
const OVERSAMPLING: usize = 2;

impl Region {
    /// Overlap volume in native voxel units.
    ///
    /// Two 2D spots use the closed-form lens area. Two analytical operands
    /// are sampled on a 2x grid along each spanned axis and the hit count is
    /// divided by the number of sub-samples per voxel (4 when both are 2D,
    /// 8 otherwise). Every other combination counts voxels exactly.
    pub fn overlap_area(
        &self,
        other: &Region,
        offset_self: Option<IVec3>,
        offset_other: Option<IVec3>,
    ) -> f64 {
        let off_self = offset_self.unwrap_or(IVec3::ZERO);
        let off_other = offset_other.unwrap_or(IVec3::ZERO);

        if let (Shape::Spot(a), Shape::Spot(b)) = (&self.shape, &other.shape) {
            if self.is_2d && other.is_2d {
                let ca = a.center + off_self.as_dvec3();
                let cb = b.center + off_other.as_dvec3();
                return circle_overlap(a.radius, b.radius, ca.truncate().distance(cb.truncate()));
            }
        }

        let Some(window) = self.overlap_window(other, off_self, off_other) else {
            return 0.0;
        };

        if self.is_analytical() && other.is_analytical() {
            return self.oversampled_overlap(other, off_self, off_other, &window);
        }

        let mut count = 0usize;
        self.visit_intersection(other, off_self, off_other, &window, |_| count += 1);
        count as f64
    }

    /// Voxels shared by both operands, in the common frame. When one operand
    /// is 2D and the other 3D the voxels come from the 3D operand.
    pub fn intersection(
        &self,
        other: &Region,
        offset_self: Option<IVec3>,
        offset_other: Option<IVec3>,
    ) -> VoxelSet {
        let off_self = offset_self.unwrap_or(IVec3::ZERO);
        let off_other = offset_other.unwrap_or(IVec3::ZERO);
        let mut voxels = VoxelSet::new();
        if let Some(window) = self.overlap_window(other, off_self, off_other) {
            self.visit_intersection(other, off_self, off_other, &window, |v| {
                voxels.insert(v);
            });
        }
        voxels
    }

    /// Integer-box intersection of both operands after flattening 2D boxes
    /// onto the z-range of the other operand.
    fn overlap_window(&self, other: &Region, off_self: IVec3, off_other: IVec3) -> Option<BoundingBox> {
        let mut a = self.bounds().translate(off_self);
        let mut b = other.bounds().translate(off_other);
        if a.is_empty() || b.is_empty() {
            return None;
        }
        match (self.is_2d, other.is_2d) {
            (true, false) => a = a.with_z_range(b.z_min, b.z_max),
            (false, true) => b = b.with_z_range(a.z_min, a.z_max),
            (true, true) => b = b.with_z_range(a.z_min, a.z_max),
            (false, false) => {}
        }
        a.intersection(&b)
    }

    /// Calls `visit` with every shared voxel at native resolution.
    ///
    /// Iterates the voxels of a raster operand when one can supply the
    /// result coordinates, otherwise scans the window.
    fn visit_intersection(
        &self,
        other: &Region,
        off_self: IVec3,
        off_other: IVec3,
        window: &BoundingBox,
        mut visit: impl FnMut(Voxel),
    ) {
        let both_2d = self.is_2d && other.is_2d;
        let in_window = |v: &Voxel| {
            if both_2d {
                window.contains_2d(v.x, v.y)
            } else {
                window.contains_voxel(v)
            }
        };
        let can_drive = |r: &Region, o: &Region| !r.is_analytical() && (r.is_2d == o.is_2d || !r.is_2d);

        let (driver, driver_off, probe, probe_off) = if can_drive(self, other) {
            (self, off_self, other, off_other)
        } else if can_drive(other, self) {
            (other, off_other, self, off_self)
        } else {
            for p in window.iter() {
                if self.contains_ivec(p - off_self) && other.contains_ivec(p - off_other) {
                    visit(Voxel::from_ivec(p));
                }
            }
            return;
        };

        for v in driver.voxels() {
            let global = v.translated(driver_off);
            if in_window(&global) && probe.contains_voxel(&global.translated(-probe_off)) {
                visit(global);
            }
        }
    }

    fn oversampled_overlap(
        &self,
        other: &Region,
        off_self: IVec3,
        off_other: IVec3,
        window: &BoundingBox,
    ) -> f64 {
        let both_2d = self.is_2d && other.is_2d;
        let z_samples = if both_2d { 1 } else { OVERSAMPLING };
        let step = 1.0 / OVERSAMPLING as f64;
        let sub = |i: usize| (i as f64 + 0.5) * step - 0.5;
        let (fs, fo) = (off_self.as_dvec3(), off_other.as_dvec3());

        let mut hits = 0usize;
        for p in window.iter() {
            let base = p.as_dvec3();
            for sz in 0..z_samples {
                let dz = if both_2d { 0.0 } else { sub(sz) };
                for sy in 0..OVERSAMPLING {
                    for sx in 0..OVERSAMPLING {
                        let q = base + DVec3::new(sub(sx), sub(sy), dz);
                        if self.contains_point(q - fs) && other.contains_point(q - fo) {
                            hits += 1;
                        }
                    }
                }
            }
        }
        let samples_per_voxel = OVERSAMPLING * OVERSAMPLING * z_samples;
        hits as f64 / samples_per_voxel as f64
    }

    #[inline]
    fn contains_ivec(&self, p: IVec3) -> bool {
        self.contains(p.x, p.y, p.z)
    }
}
