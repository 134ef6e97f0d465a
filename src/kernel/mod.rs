//! Kernel parameter blocks and the dispatch abstraction they run on.
//!
//! Each kernel (initialize, loss, swap) is a pure function of the grid state
//! and its parameter block, executed cell-parallel over the grid extent. A
//! [`Dispatch`] impl must complete every cell's work before returning, so one
//! kernel pass acts as a barrier with respect to the next.

use crate::filter::{FilterType, FilterWindow};
use crate::sampling::{SampleDistribution, SampleSpace};
use crate::util::parallel_for;
use crate::{uvec3, Error, UVec3, Vec3};

pub mod init;
pub mod loss;
pub mod swap;

#[derive(Clone, Copy, Debug)]
pub struct InitParams {
    pub key: [u32; 4],
    pub scramble_bits: u32,
    pub rng_seed: u32,
    pub distribution: SampleDistribution,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            key: [0; 4],
            scramble_bits: 0,
            rng_seed: 1338,
            distribution: SampleDistribution::Uniform1D,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LossParams {
    pub space: SampleSpace,
    pub filter: FilterType,
    pub window: FilterWindow,
    /// Blend between the spatial-only and temporal-only loss; 1 is pure
    /// spatial, 0 pure temporal. Only meaningful when `separate` is set and
    /// the grid has more than one frame.
    pub separate: bool,
    pub separate_weight: f32,
    pub axis_weight: Vec3,
    pub key: [u32; 4],
    pub scramble_bits: u32,
}

impl Default for LossParams {
    fn default() -> Self {
        Self {
            space: SampleSpace::Real,
            filter: FilterType::Box,
            window: FilterWindow::default(),
            separate: false,
            separate_weight: 0.5,
            axis_weight: Vec3::ONE,
            key: [0; 4],
            scramble_bits: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SwapParams {
    pub iteration: u32,
    pub key: [u32; 4],
    pub scramble_bits: u32,
    /// Swaps are rejected when either endpoint lies within this toroidal
    /// distance of an endpoint already swapped in the same pass.
    pub swap_suppression: u32,
}

impl Default for SwapParams {
    fn default() -> Self {
        Self {
            iteration: 0,
            key: [0; 4],
            scramble_bits: 0,
            swap_suppression: 64,
        }
    }
}

/// Executes `body` for every cell in `extent`. All cell work must retire
/// before the call returns; no cell may observe another cell's in-progress
/// update from the same pass.
pub trait Dispatch {
    fn dispatch(
        &self,
        kernel: &'static str,
        extent: UVec3,
        body: &(dyn Fn(UVec3) + Sync),
    ) -> Result<(), Error>;
}

/// Rayon-backed dispatcher; the production execution environment.
#[derive(Clone, Copy, Debug)]
pub struct CpuDispatch {
    pub chunk_size: usize,
}

impl Default for CpuDispatch {
    fn default() -> Self {
        Self { chunk_size: 256 }
    }
}

impl Dispatch for CpuDispatch {
    fn dispatch(
        &self,
        _kernel: &'static str,
        extent: UVec3,
        body: &(dyn Fn(UVec3) + Sync),
    ) -> Result<(), Error> {
        let count = (extent.x * extent.y * extent.z) as usize;
        parallel_for(count, self.chunk_size, |i| {
            let i = i as u32;
            body(uvec3(
                i % extent.x,
                (i / extent.x) % extent.y,
                i / (extent.x * extent.y),
            ));
        });
        Ok(())
    }
}
