//! Closed-form region shapes.
//!
//! Both shapes answer containment through an implicit equation
//! (`equation <= 1`) and only materialize voxels on request.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::StructuralError;
use crate::geometry::{BoundingBox, Voxel, VoxelSet};

/// Rotated 2D ellipse. Axis lengths are full diameters in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: DVec3,
    pub major: f64,
    pub minor: f64,
    /// Rotation of the major axis from the x axis, radians.
    pub angle: f64,
    pub intensity: f64,
}

impl Ellipse {
    pub fn new(center: DVec3, major: f64, minor: f64, angle: f64) -> Self {
        Self {
            center,
            major,
            minor,
            angle,
            intensity: 0.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn set_axes(&mut self, major: f64, minor: f64) -> Result<(), StructuralError> {
        check_positive("major", major)?;
        check_positive("minor", minor)?;
        self.major = major;
        self.minor = minor;
        Ok(())
    }

    pub fn set_angle(&mut self, angle: f64) -> Result<(), StructuralError> {
        if !angle.is_finite() {
            return Err(StructuralError::InvalidParameter {
                parameter: "angle",
                value: angle,
            });
        }
        self.angle = angle;
        Ok(())
    }

    /// `<= 1` inside. Ignores z.
    #[inline]
    pub fn equation(&self, x: f64, y: f64) -> f64 {
        let a = self.major * 0.5;
        let b = self.minor * 0.5;
        let (sin, cos) = self.angle.sin_cos();
        let dx = x - self.center.x;
        let dy = y - self.center.y;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        (u * u) / (a * a) + (v * v) / (b * b)
    }

    /// Degenerate ellipses contain only their center pixel.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.is_degenerate() {
            let c = center_voxel(self.center);
            return x.round() as i32 == c.x && y.round() as i32 == c.y;
        }
        self.equation(x, y) <= 1.0
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.major * self.minor * 0.25
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.major.is_finite() && self.minor.is_finite() && self.major > 0.0 && self.minor > 0.0)
    }

    /// Pixel box enclosing the ellipse on its center plane.
    pub fn bounds(&self) -> BoundingBox {
        let z = self.center.z.round() as i32;
        if self.is_degenerate() {
            return center_box(self.center).with_z_range(z, z);
        }
        let a = self.major * 0.5;
        let b = self.minor * 0.5;
        let (sin, cos) = self.angle.sin_cos();
        let half_x = (a * a * cos * cos + b * b * sin * sin).sqrt();
        let half_y = (a * a * sin * sin + b * b * cos * cos).sqrt();
        BoundingBox::new(
            (self.center.x - half_x).floor() as i32,
            (self.center.x + half_x).ceil() as i32,
            (self.center.y - half_y).floor() as i32,
            (self.center.y + half_y).ceil() as i32,
            z,
            z,
        )
    }

    pub(super) fn materialize(&self) -> VoxelSet {
        let voxels: VoxelSet = if self.is_degenerate() {
            VoxelSet::new()
        } else {
            self.bounds()
                .iter()
                .filter(|p| self.contains(p.x as f64, p.y as f64))
                .map(Voxel::from_ivec)
                .collect()
        };
        or_center_voxel(voxels, self.center, "ellipse")
    }
}

/// Circle (2D) or sphere (3D). In 3D the z distance is scaled by the
/// calibration aspect ratio so the radius is expressed in xy pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub center: DVec3,
    pub radius: f64,
    pub intensity: f64,
}

impl Spot {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius,
            intensity: 0.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), StructuralError> {
        check_positive("radius", radius)?;
        self.radius = radius;
        Ok(())
    }

    /// `<= 1` inside. `z_aspect` is ignored when `is_2d`.
    #[inline]
    pub fn equation(&self, p: DVec3, is_2d: bool, z_aspect: f64) -> f64 {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        let mut d2 = dx * dx + dy * dy;
        if !is_2d {
            let dz = (p.z - self.center.z) * z_aspect;
            d2 += dz * dz;
        }
        d2 / (self.radius * self.radius)
    }

    /// Degenerate spots contain only their center voxel.
    #[inline]
    pub fn contains(&self, p: DVec3, is_2d: bool, z_aspect: f64) -> bool {
        if self.is_degenerate() {
            let c = center_voxel(self.center);
            let same_plane = is_2d || p.z.round() as i32 == c.z;
            return same_plane && p.x.round() as i32 == c.x && p.y.round() as i32 == c.y;
        }
        self.equation(p, is_2d, z_aspect) <= 1.0
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.radius.is_finite() && self.radius > 0.0)
    }

    pub fn bounds(&self, is_2d: bool, z_aspect: f64) -> BoundingBox {
        if self.is_degenerate() {
            return center_box(self.center);
        }
        let r = self.radius;
        let (z_min, z_max) = if is_2d {
            let z = self.center.z.round() as i32;
            (z, z)
        } else {
            let rz = r / z_aspect;
            (
                (self.center.z - rz).floor() as i32,
                (self.center.z + rz).ceil() as i32,
            )
        };
        BoundingBox::new(
            (self.center.x - r).floor() as i32,
            (self.center.x + r).ceil() as i32,
            (self.center.y - r).floor() as i32,
            (self.center.y + r).ceil() as i32,
            z_min,
            z_max,
        )
    }

    pub(super) fn materialize(&self, is_2d: bool, z_aspect: f64) -> VoxelSet {
        let voxels: VoxelSet = if self.is_degenerate() {
            VoxelSet::new()
        } else {
            self.bounds(is_2d, z_aspect)
                .iter()
                .filter(|p| self.contains(p.as_dvec3(), is_2d, z_aspect))
                .map(Voxel::from_ivec)
                .collect()
        };
        or_center_voxel(voxels, self.center, "spot")
    }
}

/// Area of intersection of two circles of radii `r1`, `r2` whose centers are
/// `d` apart.
pub fn circle_overlap(r1: f64, r2: f64, d: f64) -> f64 {
    use std::f64::consts::PI;

    if r1 <= 0.0 || r2 <= 0.0 || d >= r1 + r2 {
        return 0.0;
    }
    let small = r1.min(r2);
    if d <= (r1 - r2).abs() {
        return PI * small * small;
    }
    let d2 = d * d;
    let (r1s, r2s) = (r1 * r1, r2 * r2);
    let alpha = ((d2 + r1s - r2s) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let beta = ((d2 + r2s - r1s) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = 0.5 * ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).sqrt();
    r1s * alpha + r2s * beta - kite
}

fn check_positive(parameter: &'static str, value: f64) -> Result<(), StructuralError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StructuralError::InvalidParameter { parameter, value })
    }
}

fn center_voxel(center: DVec3) -> Voxel {
    Voxel::new(
        center.x.round() as i32,
        center.y.round() as i32,
        center.z.round() as i32,
    )
}

fn center_box(center: DVec3) -> BoundingBox {
    let v = center_voxel(center);
    BoundingBox::new(v.x, v.x, v.y, v.y, v.z, v.z)
}

fn or_center_voxel(voxels: VoxelSet, center: DVec3, shape: &str) -> VoxelSet {
    if !voxels.is_empty() {
        return voxels;
    }
    tracing::warn!(
        shape,
        x = center.x,
        y = center.y,
        z = center.z,
        "degenerate analytical region, falling back to its center voxel"
    );
    let mut fallback = VoxelSet::with_capacity(1);
    fallback.insert(center_voxel(center));
    fallback
}
