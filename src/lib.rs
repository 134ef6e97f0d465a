pub use glam;
pub use glam::{uvec3, vec2, vec3, vec4, IVec3, UVec3, Vec2, Vec3, Vec4};
pub use rayon::prelude::*;

pub mod error;
pub mod filter;
pub mod grid;
pub mod kernel;
pub mod optimizer;
pub mod rng;
pub mod sampling;
pub mod util;

pub use error::Error;
pub use filter::{FilterType, FilterWindow};
pub use grid::{Grid, LossGrid, ValueGrid};
pub use kernel::{CpuDispatch, Dispatch, InitParams, LossParams, SwapParams};
pub use optimizer::{OptimizeConfig, OptimizeStats, Optimizer, Phase};
pub use sampling::{SampleDistribution, SampleSpace};
