use common::Buffer3;
use glam::IVec3;

use super::{Calibration, Raster};
use crate::geometry::BoundingBox;

/// Scalar pixel types an [`Image3`] can hold.
pub trait Pixel: Copy + Default + PartialEq + Send + Sync + 'static {
    const MAX: f64;

    fn to_f64(self) -> f64;
    /// Rounds and saturates for integer types.
    fn from_f64(value: f64) -> Self;
}

macro_rules! int_pixel {
    ($t:ty) => {
        impl Pixel for $t {
            const MAX: f64 = <$t>::MAX as f64;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                // `as` saturates on overflow and maps NaN to 0
                value.round() as $t
            }
        }
    };
}

int_pixel!(u8);
int_pixel!(u16);
int_pixel!(u32);

impl Pixel for f32 {
    const MAX: f64 = f32::MAX as f64;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Pixel for f64 {
    const MAX: f64 = f64::MAX;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Dense raster placed at a global offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Image3<T: Pixel> {
    buffer: Buffer3<T>,
    offset: IVec3,
    calibration: Calibration,
}

impl<T: Pixel> Image3<T> {
    pub fn new(size_x: usize, size_y: usize, size_z: usize) -> Self {
        Self::from_buffer(Buffer3::new_default(size_x, size_y, size_z))
    }

    pub fn from_buffer(buffer: Buffer3<T>) -> Self {
        Self {
            buffer,
            offset: IVec3::ZERO,
            calibration: Calibration::default(),
        }
    }

    /// Zero image covering `bounds`.
    pub fn covering(bounds: &BoundingBox, calibration: Calibration) -> Self {
        assert!(!bounds.is_empty(), "cannot allocate an image over an empty box");
        Self::new(bounds.size_x(), bounds.size_y(), bounds.size_z())
            .with_offset(bounds.origin())
            .with_calibration(calibration)
    }

    /// Image of the given size filled by `f(x, y, z)` on local coordinates.
    pub fn from_fn(
        size_x: usize,
        size_y: usize,
        size_z: usize,
        f: impl Fn(usize, usize, usize) -> T,
    ) -> Self {
        let mut voxels = Vec::with_capacity(size_x * size_y * size_z);
        for z in 0..size_z {
            for y in 0..size_y {
                for x in 0..size_x {
                    voxels.push(f(x, y, z));
                }
            }
        }
        Self::from_buffer(Buffer3::new(size_x, size_y, size_z, voxels))
    }

    pub fn with_offset(mut self, offset: IVec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer3<T> {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut Buffer3<T> {
        &mut self.buffer
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        *self.buffer.get(x, y, z)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        *self.buffer.get_mut(x, y, z) = value;
    }

    /// Same footprint, pixels converted to `U`.
    pub fn convert<U: Pixel>(&self) -> Image3<U> {
        Image3 {
            buffer: self.buffer.map(|v| U::from_f64(v.to_f64())),
            offset: self.offset,
            calibration: self.calibration,
        }
    }
}

impl<T: Pixel> Raster for Image3<T> {
    #[inline]
    fn size_x(&self) -> usize {
        self.buffer.width()
    }

    #[inline]
    fn size_y(&self) -> usize {
        self.buffer.height()
    }

    #[inline]
    fn size_z(&self) -> usize {
        self.buffer.depth()
    }

    #[inline]
    fn offset(&self) -> IVec3 {
        self.offset
    }

    #[inline]
    fn get_pixel(&self, x: usize, y: usize, z: usize) -> f64 {
        self.buffer.get(x, y, z).to_f64()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, z: usize, value: f64) {
        *self.buffer.get_mut(x, y, z) = T::from_f64(value);
    }

    #[inline]
    fn capacity(&self) -> f64 {
        T::MAX
    }

    #[inline]
    fn calibration(&self) -> Calibration {
        self.calibration
    }
}
