//! Dense 3D grids with toroidal addressing.
//!
//! The value grid holds one `Vec4` sample per cell; the loss grid holds the
//! per-cell loss from the most recent loss pass. Neighbor lookups wrap
//! modulo the extent on every axis so the optimized grid tiles seamlessly.

use crate::{Error, IVec3, UVec3, Vec4};

pub fn flat_index(extent: UVec3, c: UVec3) -> usize {
    (c.x + extent.x * (c.y + extent.y * c.z)) as usize
}

pub fn coord_of(extent: UVec3, i: usize) -> UVec3 {
    let i = i as u32;
    UVec3::new(
        i % extent.x,
        (i / extent.x) % extent.y,
        i / (extent.x * extent.y),
    )
}

/// Shortest distance between two cells on the torus.
pub fn toroidal_distance(extent: UVec3, a: UVec3, b: UVec3) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..3 {
        let n = extent[i];
        let d = a[i].abs_diff(b[i]);
        let d = d.min(n - d) as f32;
        acc += d * d;
    }
    acc.sqrt()
}

#[derive(Clone, Debug)]
pub struct Grid<T> {
    data: Vec<T>,
    extent: UVec3,
}

pub type ValueGrid = Grid<Vec4>;
pub type LossGrid = Grid<f32>;

impl<T: Copy + Default> Grid<T> {
    pub fn new(extent: UVec3) -> Result<Self, Error> {
        if extent.x == 0 || extent.y == 0 || extent.z == 0 {
            return Err(Error::ZeroExtent {
                extent: extent.to_array(),
            });
        }
        let len = (extent.x * extent.y * extent.z) as usize;
        Ok(Self {
            data: vec![T::default(); len],
            extent,
        })
    }

    pub fn extent(&self) -> UVec3 {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn flat_index(&self, c: UVec3) -> usize {
        flat_index(self.extent, c)
    }

    pub fn coord_of(&self, i: usize) -> UVec3 {
        coord_of(self.extent, i)
    }

    /// Wraps a possibly out-of-range coordinate onto the torus.
    pub fn wrap(&self, c: IVec3) -> UVec3 {
        let e = self.extent.as_ivec3();
        UVec3::new(
            c.x.rem_euclid(e.x) as u32,
            c.y.rem_euclid(e.y) as u32,
            c.z.rem_euclid(e.z) as u32,
        )
    }

    pub fn get(&self, c: UVec3) -> T {
        self.data[flat_index(self.extent, c)]
    }

    pub fn set(&mut self, c: UVec3, value: T) {
        let i = flat_index(self.extent, c);
        self.data[i] = value;
    }

    pub fn get_wrapped(&self, c: IVec3) -> T {
        self.get(self.wrap(c))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Host-side snapshot of the current contents.
    pub fn readback(&self) -> Vec<T> {
        self.data.clone()
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl LossGrid {
    pub fn sum(&self) -> f32 {
        self.data.iter().map(|x| *x as f64).sum::<f64>() as f32
    }
}
