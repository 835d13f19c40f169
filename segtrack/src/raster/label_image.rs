use glam::IVec3;

use super::{Calibration, Image3, Raster};
use crate::geometry::BoundingBox;

/// Storage width of a [`LabelImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum LabelPixelType {
    U8,
    U16,
    U32,
}

impl LabelPixelType {
    /// Narrowest type that can store `max_label`.
    pub fn for_max_label(max_label: u32) -> Self {
        if max_label <= u8::MAX as u32 {
            LabelPixelType::U8
        } else if max_label <= u16::MAX as u32 {
            LabelPixelType::U16
        } else {
            LabelPixelType::U32
        }
    }

    pub fn capacity(self) -> u32 {
        match self {
            LabelPixelType::U8 => u8::MAX as u32,
            LabelPixelType::U16 => u16::MAX as u32,
            LabelPixelType::U32 => u32::MAX,
        }
    }
}

/// Label raster: `0` is background, `L > 0` belongs to the region labelled `L`.
///
/// Writing a label larger than the current pixel type can hold reallocates
/// the raster with a wider type, keeping every existing label.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelImage {
    U8(Image3<u8>),
    U16(Image3<u16>),
    U32(Image3<u32>),
}

macro_rules! dispatch {
    ($self:expr, $img:ident => $body:expr) => {
        match $self {
            LabelImage::U8($img) => $body,
            LabelImage::U16($img) => $body,
            LabelImage::U32($img) => $body,
        }
    };
}

impl LabelImage {
    /// Empty label raster covering `bounds`, sized for labels up to `max_label`.
    pub fn covering(bounds: &BoundingBox, calibration: Calibration, max_label: u32) -> Self {
        match LabelPixelType::for_max_label(max_label) {
            LabelPixelType::U8 => LabelImage::U8(Image3::covering(bounds, calibration)),
            LabelPixelType::U16 => LabelImage::U16(Image3::covering(bounds, calibration)),
            LabelPixelType::U32 => LabelImage::U32(Image3::covering(bounds, calibration)),
        }
    }

    /// Stores `image` in the narrowest pixel type holding its largest label.
    pub fn narrowed(image: Image3<u32>) -> Self {
        let max_label = image.buffer().iter().copied().max().unwrap_or(0);
        match LabelPixelType::for_max_label(max_label) {
            LabelPixelType::U8 => LabelImage::U8(image.convert()),
            LabelPixelType::U16 => LabelImage::U16(image.convert()),
            LabelPixelType::U32 => LabelImage::U32(image),
        }
    }

    pub fn pixel_type(&self) -> LabelPixelType {
        match self {
            LabelImage::U8(_) => LabelPixelType::U8,
            LabelImage::U16(_) => LabelPixelType::U16,
            LabelImage::U32(_) => LabelPixelType::U32,
        }
    }

    /// Label at a global position, `0` outside the raster.
    #[inline]
    pub fn label(&self, x: i32, y: i32, z: i32) -> u32 {
        self.get_global(x, y, z).map_or(0, |v| v as u32)
    }

    /// Writes a label at a global position, widening the pixel type if needed.
    /// Returns false outside the raster.
    pub fn set_label(&mut self, x: i32, y: i32, z: i32, label: u32) -> bool {
        self.ensure_capacity(label);
        self.set_global(x, y, z, label as f64)
    }

    /// Reallocates with a wider pixel type when `max_label` does not fit.
    pub fn ensure_capacity(&mut self, max_label: u32) {
        let needed = LabelPixelType::for_max_label(max_label);
        if needed <= self.pixel_type() {
            return;
        }
        tracing::debug!(
            from = %self.pixel_type(),
            to = %needed,
            max_label,
            "widening label image"
        );
        let widened = match needed {
            LabelPixelType::U8 => unreachable!("U8 is the narrowest label type"),
            LabelPixelType::U16 => LabelImage::U16(dispatch!(&*self, img => img.convert())),
            LabelPixelType::U32 => LabelImage::U32(dispatch!(&*self, img => img.convert())),
        };
        *self = widened;
    }

    /// Sets every pixel to background.
    pub fn clear(&mut self) {
        dispatch!(self, img => img.buffer_mut().fill(0))
    }

    /// Largest label present.
    pub fn max_label(&self) -> u32 {
        dispatch!(self, img => img.buffer().iter().map(|&v| v as u32).max().unwrap_or(0))
    }

    /// Labels of every voxel in raster order (local index order).
    pub fn labels(&self) -> Vec<u32> {
        dispatch!(self, img => img.buffer().iter().map(|&v| v as u32).collect())
    }
}

impl Raster for LabelImage {
    fn size_x(&self) -> usize {
        dispatch!(self, img => img.size_x())
    }

    fn size_y(&self) -> usize {
        dispatch!(self, img => img.size_y())
    }

    fn size_z(&self) -> usize {
        dispatch!(self, img => img.size_z())
    }

    fn offset(&self) -> IVec3 {
        dispatch!(self, img => img.offset())
    }

    #[inline]
    fn get_pixel(&self, x: usize, y: usize, z: usize) -> f64 {
        dispatch!(self, img => img.get_pixel(x, y, z))
    }

    fn set_pixel(&mut self, x: usize, y: usize, z: usize, value: f64) {
        assert!(value >= 0.0, "labels are non-negative, got {}", value);
        self.ensure_capacity(value as u32);
        dispatch!(self, img => img.set_pixel(x, y, z, value))
    }

    fn capacity(&self) -> f64 {
        self.pixel_type().capacity() as f64
    }

    fn calibration(&self) -> Calibration {
        dispatch!(self, img => img.calibration())
    }
}

impl From<Image3<u8>> for LabelImage {
    fn from(img: Image3<u8>) -> Self {
        LabelImage::U8(img)
    }
}

impl From<Image3<u16>> for LabelImage {
    fn from(img: Image3<u16>) -> Self {
        LabelImage::U16(img)
    }
}

impl From<Image3<u32>> for LabelImage {
    fn from(img: Image3<u32>) -> Self {
        LabelImage::U32(img)
    }
}
