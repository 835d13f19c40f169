use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

/// Dense 3D buffer stored plane by plane, rows within a plane, x fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer3<T> {
    voxels: Vec<T>,
    width: usize,
    height: usize,
    depth: usize,
}

impl<T> Buffer3<T> {
    pub fn new(width: usize, height: usize, depth: usize, voxels: Vec<T>) -> Self {
        assert_eq!(
            voxels.len(),
            width * height * depth,
            "voxels length must equal width * height * depth"
        );
        Self {
            voxels,
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &T {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        &self.voxels[self.index(x, y, z)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        let idx = self.index(x, y, z);
        &mut self.voxels[idx]
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Inverse of [`Buffer3::index`].
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let plane = self.width * self.height;
        let z = idx / plane;
        let rem = idx % plane;
        (rem % self.width, rem / self.width, z)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn voxels(&self) -> &[T] {
        &self.voxels
    }

    #[inline]
    pub fn voxels_mut(&mut self) -> &mut [T] {
        &mut self.voxels
    }

    /// One z-plane as a row-major slice.
    #[inline]
    pub fn plane(&self, z: usize) -> &[T] {
        let len = self.plane_len();
        &self.voxels[z * len..(z + 1) * len]
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.voxels
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.voxels.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.voxels.iter_mut()
    }

    /// Converts every element, keeping the dimensions.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Buffer3<U> {
        Buffer3 {
            voxels: self.voxels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

impl<T: Default + Clone> Buffer3<T> {
    pub fn new_default(width: usize, height: usize, depth: usize) -> Self {
        Self {
            voxels: vec![T::default(); width * height * depth],
            width,
            height,
            depth,
        }
    }
}

impl<T: Clone> Buffer3<T> {
    pub fn new_filled(width: usize, height: usize, depth: usize, value: T) -> Self {
        Self {
            voxels: vec![value; width * height * depth],
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.voxels.fill(value);
    }
}

impl<T> Index<(usize, usize, usize)> for Buffer3<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y, z): (usize, usize, usize)) -> &Self::Output {
        &self.voxels[(z * self.height + y) * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Buffer3<T> {
    #[inline]
    fn index_mut(&mut self, (x, y, z): (usize, usize, usize)) -> &mut Self::Output {
        &mut self.voxels[(z * self.height + y) * self.width + x]
    }
}

impl<T> Index<usize> for Buffer3<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.voxels[idx]
    }
}

impl<T> IndexMut<usize> for Buffer3<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.voxels[idx]
    }
}

impl<T> Deref for Buffer3<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.voxels
    }
}

impl<T> DerefMut for Buffer3<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voxels
    }
}

impl<'a, T> IntoIterator for &'a Buffer3<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.voxels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stores_dimensions() {
        let buf = Buffer3::new(3, 2, 2, (0..12).collect());
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.depth(), 2);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.plane_len(), 6);
    }

    #[test]
    #[should_panic(expected = "voxels length must equal width * height * depth")]
    fn test_new_panics_on_size_mismatch() {
        Buffer3::new(3, 2, 2, vec![1, 2, 3]);
    }

    #[test]
    fn test_index_layout() {
        let buf = Buffer3::new(3, 2, 2, (0..12).collect::<Vec<i32>>());
        // (x, y, z) => (z * height + y) * width + x
        assert_eq!(*buf.get(0, 0, 0), 0);
        assert_eq!(*buf.get(2, 0, 0), 2);
        assert_eq!(*buf.get(0, 1, 0), 3);
        assert_eq!(*buf.get(0, 0, 1), 6);
        assert_eq!(buf[(2, 1, 1)], 11);
    }

    #[test]
    fn test_coords_inverts_index() {
        let buf = Buffer3::<u8>::new_default(4, 3, 5);
        for idx in 0..buf.len() {
            let (x, y, z) = buf.coords(idx);
            assert_eq!(buf.index(x, y, z), idx);
        }
    }

    #[test]
    fn test_plane_slice() {
        let buf = Buffer3::new(2, 2, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(buf.plane(1), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_get_mut_and_fill() {
        let mut buf = Buffer3::new_filled(2, 2, 1, 0u16);
        *buf.get_mut(1, 1, 0) = 9;
        assert_eq!(buf[(1, 1, 0)], 9);
        buf.fill(3);
        assert!(buf.iter().all(|&v| v == 3));
    }

    #[test]
    fn test_map_keeps_dimensions() {
        let buf = Buffer3::new(2, 1, 2, vec![1u8, 0, 0, 1]);
        let mapped = buf.map(|&v| v != 0);
        assert_eq!(mapped.width(), 2);
        assert_eq!(mapped.depth(), 2);
        assert_eq!(mapped.voxels(), &[true, false, false, true]);
    }
}
