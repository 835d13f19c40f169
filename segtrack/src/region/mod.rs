//! A single segmented object and its geometric algebra.
//!
//! A [`Region`] holds exactly one authoritative [`Shape`]. Raster shapes keep
//! one [`Body`] encoding (voxel set, mask or outline) and derive the other two
//! on demand; analytical shapes ([`Ellipse`], [`Spot`]) answer containment in
//! closed form and materialize voxels only when asked. Derived encodings,
//! bounds and center live in compute-once cells that every mutation resets.

mod algebra;
mod analytical;
mod body;
mod contour;
mod morphology;
mod outline;
mod overlap;


use std::sync::OnceLock;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::error::StructuralError;
use crate::geometry::{BoundingBox, Connectivity, Voxel, VoxelSet};
use crate::raster::{Calibration, Raster};

pub use analytical::{circle_overlap, Ellipse, Spot};
pub use body::{Body, Mask};
pub use contour::connected_components;
pub use morphology::ThresholdSide;
pub use outline::{Outline, Ring};

/// Encoding tag of a region's authoritative shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ShapeKind {
    Voxels,
    Mask,
    Outline,
    Ellipse,
    Spot,
}

/// What a shape supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Voxel-level edits (add, remove, merge, erode, ...).
    pub structural_edit: bool,
    /// Containment from an implicit equation.
    pub closed_form: bool,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Voxels(Body),
    Ellipse(Ellipse),
    Spot(Spot),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Voxels(Body::Voxels(_)) => ShapeKind::Voxels,
            Shape::Voxels(Body::Mask(_)) => ShapeKind::Mask,
            Shape::Voxels(Body::Outline(_)) => ShapeKind::Outline,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Spot(_) => ShapeKind::Spot,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Shape::Voxels(_) => Capabilities {
                structural_edit: true,
                closed_form: false,
            },
            Shape::Ellipse(_) | Shape::Spot(_) => Capabilities {
                structural_edit: false,
                closed_form: true,
            },
        }
    }
}

/// Classification result attached to a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub index: u32,
    pub probability: f64,
}

#[derive(Debug, Clone, Default)]
struct Derived {
    voxels: OnceLock<VoxelSet>,
    mask: OnceLock<Mask>,
    outline: OnceLock<Outline>,
    bounds: OnceLock<BoundingBox>,
    center: OnceLock<DVec3>,
}

/// One segmented spatial object.
#[derive(Debug, Clone)]
pub struct Region {
    label: u32,
    shape: Shape,
    is_2d: bool,
    calibration: Calibration,
    quality: f64,
    absolute_landmark: bool,
    category: Option<Category>,
    derived: Derived,
}

impl Region {
    fn with_shape(shape: Shape, label: u32, is_2d: bool, calibration: Calibration) -> Self {
        Self {
            label,
            shape,
            is_2d,
            calibration,
            quality: f64::NAN,
            absolute_landmark: false,
            category: None,
            derived: Derived::default(),
        }
    }

    pub fn from_voxels(voxels: VoxelSet, label: u32, is_2d: bool, calibration: Calibration) -> Self {
        Self::with_shape(Shape::Voxels(Body::Voxels(voxels)), label, is_2d, calibration)
    }

    pub fn from_mask(mask: Mask, label: u32, is_2d: bool, calibration: Calibration) -> Self {
        Self::with_shape(Shape::Voxels(Body::Mask(mask)), label, is_2d, calibration)
    }

    pub fn from_outline(outline: Outline, label: u32, is_2d: bool, calibration: Calibration) -> Self {
        Self::with_shape(Shape::Voxels(Body::Outline(outline)), label, is_2d, calibration)
    }

    /// Ellipses are always 2D.
    pub fn ellipse(ellipse: Ellipse, label: u32, calibration: Calibration) -> Self {
        Self::with_shape(Shape::Ellipse(ellipse), label, true, calibration)
    }

    pub fn spot(spot: Spot, label: u32, is_2d: bool, calibration: Calibration) -> Self {
        Self::with_shape(Shape::Spot(spot), label, is_2d, calibration)
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_absolute_landmark(mut self, absolute: bool) -> Self {
        self.absolute_landmark = absolute;
        self
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    #[inline]
    pub fn label(&self) -> u32 {
        self.label
    }

    #[inline]
    pub fn set_label(&mut self, label: u32) {
        self.label = label;
    }

    #[inline]
    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    #[inline]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// NaN when unset.
    #[inline]
    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn set_quality(&mut self, quality: f64) {
        self.quality = quality;
    }

    #[inline]
    pub fn absolute_landmark(&self) -> bool {
        self.absolute_landmark
    }

    /// Flags the stored coordinates as root-relative (`true`) or
    /// parent-relative (`false`) without moving them.
    pub fn set_absolute_landmark(&mut self, absolute: bool) {
        self.absolute_landmark = absolute;
    }

    #[inline]
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.shape.capabilities()
    }

    #[inline]
    pub fn is_analytical(&self) -> bool {
        self.capabilities().closed_form
    }

    // ========================================================================
    // Derived encodings
    // ========================================================================

    /// Voxel body, materialized and cached on first use for non-voxel shapes.
    pub fn voxels(&self) -> &VoxelSet {
        match &self.shape {
            Shape::Voxels(Body::Voxels(voxels)) => voxels,
            _ => self.derived.voxels.get_or_init(|| self.derive_voxels()),
        }
    }

    pub fn mask(&self) -> &Mask {
        match &self.shape {
            Shape::Voxels(Body::Mask(mask)) => mask,
            _ => self.derived.mask.get_or_init(|| Mask::from_voxels(self.voxels())),
        }
    }

    pub fn outline(&self) -> &Outline {
        match &self.shape {
            Shape::Voxels(Body::Outline(outline)) => outline,
            _ => self.derived.outline.get_or_init(|| Outline::from_voxels(self.voxels())),
        }
    }

    /// Tight box for voxel and outline bodies, the raster footprint for a
    /// mask, closed-form for analytical shapes.
    pub fn bounds(&self) -> BoundingBox {
        *self.derived.bounds.get_or_init(|| match &self.shape {
            Shape::Voxels(Body::Mask(mask)) => mask.bounds(),
            Shape::Voxels(_) => BoundingBox::from_voxels(self.voxels()),
            Shape::Ellipse(ellipse) => ellipse.bounds(),
            Shape::Spot(spot) => spot.bounds(self.is_2d, self.calibration.z_aspect_ratio()),
        })
    }

    /// Geometric center. NaN for an empty body.
    pub fn center(&self) -> DVec3 {
        *self.derived.center.get_or_init(|| match &self.shape {
            Shape::Ellipse(ellipse) => ellipse.center,
            Shape::Spot(spot) => spot.center,
            Shape::Voxels(_) => {
                let voxels = self.voxels();
                if voxels.is_empty() {
                    return DVec3::splat(f64::NAN);
                }
                voxels.iter().map(Voxel::dvec).sum::<DVec3>() / voxels.len() as f64
            }
        })
    }

    /// Intensity-weighted center over `image`. Falls back to [`Region::center`]
    /// when the region has no positive intensity inside the image.
    pub fn mass_center(&self, image: &dyn Raster) -> DVec3 {
        let mut sum = DVec3::ZERO;
        let mut weight = 0.0;
        for v in self.voxels() {
            if let Some(value) = image.value_at(v) {
                sum += v.dvec() * value;
                weight += value;
            }
        }
        if weight > 0.0 {
            sum / weight
        } else {
            self.center()
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        match &self.shape {
            Shape::Voxels(Body::Mask(mask)) => mask.count(),
            _ => self.voxels().len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn derive_voxels(&self) -> VoxelSet {
        match &self.shape {
            Shape::Voxels(Body::Voxels(voxels)) => voxels.clone(),
            Shape::Voxels(Body::Mask(mask)) => mask.voxels(),
            Shape::Voxels(Body::Outline(outline)) => outline.fill(),
            Shape::Ellipse(ellipse) => ellipse.materialize(),
            Shape::Spot(spot) => spot.materialize(self.is_2d, self.calibration.z_aspect_ratio()),
        }
    }

    // ========================================================================
    // Containment
    // ========================================================================

    /// Membership test. 2D regions ignore `z`.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        match &self.shape {
            Shape::Ellipse(ellipse) => ellipse.contains(x as f64, y as f64),
            Shape::Spot(spot) => spot.contains(
                DVec3::new(x as f64, y as f64, z as f64),
                self.is_2d,
                self.calibration.z_aspect_ratio(),
            ),
            Shape::Voxels(_) => {
                let mask = self.mask();
                if self.is_2d {
                    mask.contains_2d(x, y)
                } else {
                    mask.contains(x, y, z)
                }
            }
        }
    }

    #[inline]
    pub fn contains_voxel(&self, v: &Voxel) -> bool {
        self.contains(v.x, v.y, v.z)
    }

    /// Sub-voxel membership: analytical shapes evaluate the equation at `p`,
    /// raster shapes test the nearest voxel.
    pub fn contains_point(&self, p: DVec3) -> bool {
        match &self.shape {
            Shape::Ellipse(ellipse) => ellipse.contains(p.x, p.y),
            Shape::Spot(spot) => spot.contains(p, self.is_2d, self.calibration.z_aspect_ratio()),
            Shape::Voxels(_) => self.contains(
                p.x.round() as i32,
                p.y.round() as i32,
                p.z.round() as i32,
            ),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    fn invalidate(&mut self) {
        self.derived = Derived::default();
    }

    /// Converts a raster body to an owned voxel set for in-place editing and
    /// resets the caches. Analytical shapes refuse.
    pub(crate) fn voxels_mut(&mut self, operation: &'static str) -> Result<&mut VoxelSet, StructuralError> {
        match &self.shape {
            Shape::Ellipse(_) | Shape::Spot(_) => {
                return Err(StructuralError::AnalyticalEdit {
                    operation,
                    kind: self.kind(),
                });
            }
            Shape::Voxels(Body::Voxels(_)) => {}
            Shape::Voxels(_) => {
                let voxels = match self.derived.voxels.take() {
                    Some(voxels) => voxels,
                    None => self.derive_voxels(),
                };
                self.shape = Shape::Voxels(Body::Voxels(voxels));
            }
        }
        self.invalidate();
        match &mut self.shape {
            Shape::Voxels(Body::Voxels(voxels)) => Ok(voxels),
            _ => unreachable!("body was converted to voxels above"),
        }
    }

    /// Replaces the body. Analytical shapes refuse.
    pub fn set_body(&mut self, body: Body) -> Result<(), StructuralError> {
        if self.is_analytical() {
            return Err(StructuralError::AnalyticalEdit {
                operation: "set_body",
                kind: self.kind(),
            });
        }
        self.shape = Shape::Voxels(body);
        self.invalidate();
        Ok(())
    }

    pub fn set_voxels(&mut self, voxels: VoxelSet) -> Result<(), StructuralError> {
        self.set_body(Body::Voxels(voxels))
    }

    pub fn set_axes(&mut self, major: f64, minor: f64) -> Result<(), StructuralError> {
        match &mut self.shape {
            Shape::Ellipse(ellipse) => ellipse.set_axes(major, minor)?,
            _ => {
                return Err(StructuralError::Unsupported {
                    operation: "set_axes",
                    kind: self.kind(),
                })
            }
        }
        self.invalidate();
        Ok(())
    }

    pub fn set_angle(&mut self, angle: f64) -> Result<(), StructuralError> {
        match &mut self.shape {
            Shape::Ellipse(ellipse) => ellipse.set_angle(angle)?,
            _ => {
                return Err(StructuralError::Unsupported {
                    operation: "set_angle",
                    kind: self.kind(),
                })
            }
        }
        self.invalidate();
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), StructuralError> {
        match &mut self.shape {
            Shape::Spot(spot) => spot.set_radius(radius)?,
            _ => {
                return Err(StructuralError::Unsupported {
                    operation: "set_radius",
                    kind: self.kind(),
                })
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Moves the region by `offset`, keeping its encoding.
    pub fn translate(&mut self, offset: IVec3) {
        if offset == IVec3::ZERO {
            return;
        }
        let delta = offset.as_dvec3();
        self.shape = match &self.shape {
            Shape::Voxels(body) => Shape::Voxels(body.translated(offset)),
            Shape::Ellipse(ellipse) => Shape::Ellipse(Ellipse {
                center: ellipse.center + delta,
                ..*ellipse
            }),
            Shape::Spot(spot) => Shape::Spot(Spot {
                center: spot.center + delta,
                ..*spot
            }),
        };
        self.invalidate();
    }

    /// Parent-relative to root-relative coordinates.
    pub fn to_absolute(&mut self, parent_origin: IVec3) {
        if !self.absolute_landmark {
            self.translate(parent_origin);
            self.absolute_landmark = true;
        }
    }

    /// Root-relative to parent-relative coordinates.
    pub fn to_relative(&mut self, parent_origin: IVec3) {
        if self.absolute_landmark {
            self.translate(-parent_origin);
            self.absolute_landmark = false;
        }
    }

    /// Connected components of the voxel body, largest first.
    pub fn components(&self, connectivity: Connectivity) -> Vec<VoxelSet> {
        connected_components(self.voxels(), connectivity)
    }

    #[cfg(test)]
    pub(crate) fn cached_voxels_ptr(&self) -> Option<*const VoxelSet> {
        self.derived.voxels.get().map(|v| v as *const VoxelSet)
    }
}
