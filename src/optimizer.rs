//! The iteration driver: owns the grids, sequences the kernels, and tracks
//! convergence across passes.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::filter::{FilterType, FilterWindow};
use crate::grid::{LossGrid, ValueGrid};
use crate::kernel::{init, loss, swap, Dispatch, InitParams, LossParams, SwapParams};
use crate::rng::index_bits;
use crate::sampling::{SampleDistribution, SampleSpace};
use crate::util::create_progress_bar;
use crate::{Error, IVec3, UVec3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    LossComputed,
    Swapped,
    Done,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Uninitialized => "Uninitialized",
            Phase::Initialized => "Initialized",
            Phase::LossComputed => "LossComputed",
            Phase::Swapped => "Swapped",
            Phase::Done => "Done",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub extent: [u32; 3],
    pub filter: FilterType,
    pub space: SampleSpace,
    pub distribution: SampleDistribution,
    pub filter_min: [i32; 3],
    pub filter_max: [i32; 3],
    pub filter_offset: [i32; 3],
    pub separate: bool,
    pub separate_weight: f32,
    pub axis_weight: [f32; 3],
    pub swap_suppression: u32,
    /// Low index bits randomized when picking swap partners; 0 means derive
    /// enough bits to cover the whole grid.
    pub scramble_bits: u32,
    pub key: [u32; 4],
    pub rng_seed: u32,
    pub iterations: u32,
    /// When set, stop early once the aggregate loss changes by no more than
    /// this between consecutive passes.
    pub convergence_epsilon: Option<f32>,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            extent: [64, 64, 1],
            filter: FilterType::Box,
            space: SampleSpace::Real,
            distribution: SampleDistribution::Uniform1D,
            filter_min: [0; 3],
            filter_max: [0; 3],
            filter_offset: [0; 3],
            separate: false,
            separate_weight: 0.5,
            axis_weight: [1.0; 3],
            swap_suppression: 64,
            scramble_bits: 0,
            key: [0; 4],
            rng_seed: 1338,
            iterations: 0,
            convergence_epsilon: None,
        }
    }
}

impl OptimizeConfig {
    pub fn extent(&self) -> UVec3 {
        UVec3::from_array(self.extent)
    }

    pub fn window(&self) -> FilterWindow {
        FilterWindow::new(
            IVec3::from_array(self.filter_min),
            IVec3::from_array(self.filter_max),
            IVec3::from_array(self.filter_offset),
        )
    }

    /// Fails fast before any kernel runs; nothing is mutated on error.
    pub fn validate(&self) -> Result<(), Error> {
        let extent = self.extent();
        if extent.x == 0 || extent.y == 0 || extent.z == 0 {
            return Err(Error::ZeroExtent { extent: self.extent });
        }
        self.window().validate(extent)
    }

    fn cells(&self) -> usize {
        (self.extent[0] * self.extent[1] * self.extent[2]) as usize
    }

    fn effective_scramble_bits(&self) -> u32 {
        if self.scramble_bits > 0 {
            self.scramble_bits
        } else {
            index_bits(self.cells())
        }
    }

    fn init_params(&self) -> InitParams {
        InitParams {
            key: self.key,
            scramble_bits: self.effective_scramble_bits(),
            rng_seed: self.rng_seed,
            distribution: self.distribution,
        }
    }

    fn loss_params(&self) -> LossParams {
        LossParams {
            space: self.space,
            filter: self.filter,
            window: self.window(),
            separate: self.separate,
            separate_weight: self.separate_weight,
            axis_weight: Vec3::from_array(self.axis_weight),
            key: self.key,
            scramble_bits: self.effective_scramble_bits(),
        }
    }

    fn swap_params(&self, iteration: u32) -> SwapParams {
        SwapParams {
            iteration,
            key: self.key,
            scramble_bits: self.effective_scramble_bits(),
            swap_suppression: self.swap_suppression,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OptimizeStats {
    /// Aggregate loss before each swap pass, plus the final value.
    pub pass_loss: Vec<f32>,
    /// Accepted swaps per pass.
    pub accepted_swaps: Vec<u32>,
    pub converged: bool,
    pub elapsed: f64,
}

pub struct Optimizer<D> {
    config: OptimizeConfig,
    dispatch: D,
    values: ValueGrid,
    loss: LossGrid,
    iteration: u32,
    phase: Phase,
    stats: OptimizeStats,
}

impl<D: Dispatch> Optimizer<D> {
    pub fn new(config: OptimizeConfig, dispatch: D) -> Result<Self, Error> {
        config.validate()?;
        let extent = config.extent();
        Ok(Self {
            config,
            dispatch,
            values: ValueGrid::new(extent)?,
            loss: LossGrid::new(extent)?,
            iteration: 0,
            phase: Phase::Uninitialized,
            stats: OptimizeStats::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn values(&self) -> &ValueGrid {
        &self.values
    }

    pub fn loss(&self) -> &LossGrid {
        &self.loss
    }

    pub fn stats(&self) -> &OptimizeStats {
        &self.stats
    }

    fn expect_phase(&self, op: &'static str, allowed: &[Phase]) -> Result<(), Error> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Error::OutOfOrder {
                op,
                phase: self.phase.name(),
            })
        }
    }

    fn fail(&self, kernel: &'static str, e: Error) -> Error {
        match e {
            Error::Dispatch { .. } => e,
            other => Error::Dispatch {
                kernel,
                iteration: self.iteration,
                reason: other.to_string(),
            },
        }
    }

    /// Runs the initialization kernel once.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.expect_phase(init::KERNEL, &[Phase::Uninitialized])?;
        let params = self.config.init_params();
        init::run(&self.dispatch, &params, &mut self.values)
            .map_err(|e| self.fail(init::KERNEL, e))?;
        self.phase = Phase::Initialized;
        Ok(())
    }

    /// Recomputes the loss grid; returns the aggregate loss.
    pub fn compute_loss(&mut self) -> Result<f32, Error> {
        self.expect_phase(
            loss::KERNEL,
            &[Phase::Initialized, Phase::LossComputed, Phase::Swapped],
        )?;
        let params = self.config.loss_params();
        loss::run(&self.dispatch, &params, &self.values, &mut self.loss)
            .map_err(|e| self.fail(loss::KERNEL, e))?;
        self.phase = Phase::LossComputed;
        Ok(self.loss.sum())
    }

    /// Runs one swap pass and advances the iteration counter. Returns the
    /// number of accepted swaps.
    pub fn swap_pass(&mut self) -> Result<u32, Error> {
        self.expect_phase(swap::KERNEL, &[Phase::LossComputed])?;
        let params = self.config.swap_params(self.iteration);
        let loss_params = self.config.loss_params();
        let accepted = swap::run(&self.dispatch, &params, &loss_params, &mut self.values)
            .map_err(|e| self.fail(swap::KERNEL, e))?;
        self.iteration += 1;
        self.phase = Phase::Swapped;
        Ok(accepted)
    }

    /// Full optimization: initialize, then loss/swap until the iteration
    /// budget is spent or the aggregate loss stops moving.
    pub fn run(&mut self) -> Result<&OptimizeStats, Error> {
        let tic = Instant::now();
        self.initialize()?;
        let pb = create_progress_bar(self.config.iterations as usize, "passes");
        let mut prev_sum: Option<f32> = None;
        for _ in 0..self.config.iterations {
            let pass_tic = Instant::now();
            let sum = self.compute_loss()?;
            if let (Some(eps), Some(prev)) = (self.config.convergence_epsilon, prev_sum) {
                if (prev - sum).abs() <= eps {
                    log::info!(
                        "Converged at iteration {} (loss {:.6})",
                        self.iteration,
                        sum
                    );
                    self.stats.converged = true;
                    break;
                }
            }
            prev_sum = Some(sum);
            self.stats.pass_loss.push(sum);
            let accepted = self.swap_pass()?;
            self.stats.accepted_swaps.push(accepted);
            log::info!(
                "Pass {}: loss {:.6}, {} swaps, {:.1}ms",
                self.iteration,
                sum,
                accepted,
                pass_tic.elapsed().as_secs_f64() * 1e3
            );
            pb.inc(1);
        }
        let final_sum = self.compute_loss()?;
        self.stats.pass_loss.push(final_sum);
        self.stats.elapsed = tic.elapsed().as_secs_f64();
        self.phase = Phase::Done;
        pb.finish();
        log::info!(
            "Optimized {}x{}x{} grid to loss {:.6} in {:.3}s",
            self.config.extent[0],
            self.config.extent[1],
            self.config.extent[2],
            final_sum,
            self.stats.elapsed
        );
        Ok(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CpuDispatch;

    fn small_config() -> OptimizeConfig {
        OptimizeConfig {
            extent: [8, 8, 1],
            filter_min: [-1, -1, 0],
            filter_max: [1, 1, 0],
            swap_suppression: 0,
            iterations: 4,
            ..OptimizeConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_configs() {
        let bad = OptimizeConfig {
            extent: [0, 8, 1],
            ..OptimizeConfig::default()
        };
        assert!(matches!(
            Optimizer::new(bad, CpuDispatch::default()),
            Err(Error::ZeroExtent { .. })
        ));
        let bad = OptimizeConfig {
            extent: [4, 4, 1],
            filter_min: [-2, 0, 0],
            filter_max: [2, 0, 0],
            ..OptimizeConfig::default()
        };
        assert!(matches!(
            Optimizer::new(bad, CpuDispatch::default()),
            Err(Error::WindowExceedsExtent { .. })
        ));
    }

    #[test]
    fn enforces_kernel_ordering() {
        let mut opt = Optimizer::new(small_config(), CpuDispatch::default()).unwrap();
        assert!(matches!(opt.swap_pass(), Err(Error::OutOfOrder { .. })));
        assert!(matches!(opt.compute_loss(), Err(Error::OutOfOrder { .. })));
        opt.initialize().unwrap();
        assert!(matches!(opt.initialize(), Err(Error::OutOfOrder { .. })));
        opt.compute_loss().unwrap();
        opt.swap_pass().unwrap();
        assert_eq!(opt.iteration(), 1);
        assert!(matches!(opt.swap_pass(), Err(Error::OutOfOrder { .. })));
    }

    #[test]
    fn run_reaches_done_with_monotone_loss() {
        let mut opt = Optimizer::new(small_config(), CpuDispatch::default()).unwrap();
        let stats = opt.run().unwrap().clone();
        assert_eq!(opt.phase(), Phase::Done);
        assert_eq!(stats.accepted_swaps.len(), 4);
        for w in stats.pass_loss.windows(2) {
            assert!(w[1] <= w[0] + 1e-3, "loss went up: {} -> {}", w[0], w[1]);
        }
    }

    #[test]
    fn zero_iterations_still_initializes_and_scores() {
        // 4x4 grid, unit box window, no swap passes
        let config = OptimizeConfig {
            extent: [4, 4, 1],
            filter_min: [-1, -1, 0],
            filter_max: [1, 1, 0],
            iterations: 0,
            ..OptimizeConfig::default()
        };
        let mut a = Optimizer::new(config.clone(), CpuDispatch::default()).unwrap();
        let mut b = Optimizer::new(config, CpuDispatch::default()).unwrap();
        let sa = a.run().unwrap().clone();
        let sb = b.run().unwrap().clone();
        assert_eq!(a.values().len(), 16);
        assert!(a.values().as_slice().iter().all(|v| (0.0..1.0).contains(&v.x)));
        assert!(a.loss().as_slice().iter().all(|&l| l >= 0.0));
        // same seed, same aggregate loss, bit for bit
        assert_eq!(sa.pass_loss[0].to_bits(), sb.pass_loss[0].to_bits());
    }

    #[test]
    fn convergence_epsilon_stops_early() {
        let config = OptimizeConfig {
            convergence_epsilon: Some(f32::INFINITY),
            iterations: 16,
            ..small_config()
        };
        let mut opt = Optimizer::new(config, CpuDispatch::default()).unwrap();
        let stats = opt.run().unwrap();
        assert!(stats.converged);
        assert!(stats.accepted_swaps.len() < 16);
    }
}
