//! Loss kernel: per-cell aggregate neighborhood error.
//!
//! `loss(c) = sum over window offsets d of weight(d) * distance(v(c), v(c+d))`
//! with toroidal wrap at the grid boundary. In separate mode the spatial and
//! temporal axes are filtered independently and blended, which is what trades
//! spatial against temporal quality for frame-stacked grids.

use crate::filter::filter_weight;
use crate::grid::{flat_index, LossGrid, ValueGrid};
use crate::kernel::{Dispatch, LossParams};
use crate::sampling::distance;
use crate::util::UnsafePointer;
use crate::{Error, IVec3, UVec3, Vec4};

pub const KERNEL: &str = "loss";

#[derive(Clone, Copy)]
enum Axes {
    Full,
    Spatial,
    Temporal,
}

/// Reads a (wrapped) coordinate, optionally as if the values at `a` and `b`
/// had been exchanged.
fn read(values: &ValueGrid, coord: IVec3, exchanged: Option<(UVec3, UVec3)>) -> Vec4 {
    let c = values.wrap(coord);
    if let Some((a, b)) = exchanged {
        if c == a {
            return values.get(b);
        }
        if c == b {
            return values.get(a);
        }
    }
    values.get(c)
}

/// Sum of weighted distances from `at` to the window around it. `sign` +1
/// walks the window forward (the cell's own loss); -1 walks it backward,
/// giving the terms other cells contribute *about* `at`.
fn directed_loss(
    values: &ValueGrid,
    params: &LossParams,
    at: UVec3,
    exchanged: Option<(UVec3, UVec3)>,
    sign: i32,
    axes: Axes,
) -> f32 {
    let w = &params.window;
    let (min, max) = match axes {
        Axes::Full => (w.min, w.max),
        Axes::Spatial => (
            IVec3::new(w.min.x, w.min.y, 0),
            IVec3::new(w.max.x, w.max.y, 0),
        ),
        Axes::Temporal => (
            IVec3::new(0, 0, w.min.z),
            IVec3::new(0, 0, w.max.z),
        ),
    };
    let center = read(values, at.as_ivec3(), exchanged);
    let mut acc = 0.0f32;
    for dz in min.z..=max.z {
        for dy in min.y..=max.y {
            for dx in min.x..=max.x {
                let d = IVec3::new(dx, dy, dz);
                if d == IVec3::ZERO {
                    continue;
                }
                let weight = filter_weight(params.filter, w, d, params.axis_weight);
                let neighbor = read(values, at.as_ivec3() + d * sign, exchanged);
                acc += weight * distance(params.space, center, neighbor);
            }
        }
    }
    acc
}

fn blended_loss(
    values: &ValueGrid,
    params: &LossParams,
    at: UVec3,
    exchanged: Option<(UVec3, UVec3)>,
    sign: i32,
) -> f32 {
    if params.separate && values.extent().z > 1 {
        let s = directed_loss(values, params, at, exchanged, sign, Axes::Spatial);
        let t = directed_loss(values, params, at, exchanged, sign, Axes::Temporal);
        let w = params.separate_weight.clamp(0.0, 1.0);
        w * s + (1.0 - w) * t
    } else {
        directed_loss(values, params, at, exchanged, sign, Axes::Full)
    }
}

/// The loss value stored for one cell.
pub fn cell_loss(
    values: &ValueGrid,
    params: &LossParams,
    at: UVec3,
    exchanged: Option<(UVec3, UVec3)>,
) -> f32 {
    blended_loss(values, params, at, exchanged, 1)
}

/// Every loss term that mentions `a` or `b`: the two cells' own losses plus
/// the terms their neighbors hold about them. Terms counted twice (a and b
/// inside each other's windows) are invariant under exchanging the two
/// values, so deltas of this quantity are exact deltas of the total loss.
pub fn pair_energy(
    values: &ValueGrid,
    params: &LossParams,
    a: UVec3,
    b: UVec3,
    exchanged: Option<(UVec3, UVec3)>,
) -> f32 {
    blended_loss(values, params, a, exchanged, 1)
        + blended_loss(values, params, a, exchanged, -1)
        + blended_loss(values, params, b, exchanged, 1)
        + blended_loss(values, params, b, exchanged, -1)
}

/// Recomputes the whole loss grid from the current values.
pub fn run(
    dispatch: &dyn Dispatch,
    params: &LossParams,
    values: &ValueGrid,
    loss: &mut LossGrid,
) -> Result<(), Error> {
    assert_eq!(values.extent(), loss.extent());
    let extent = values.extent();
    let len = loss.len();
    let ptr = UnsafePointer::new(loss.as_mut_slice().as_mut_ptr());
    dispatch.dispatch(KERNEL, extent, &|coord| {
        let l = cell_loss(values, params, coord, None);
        let slice = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
        slice[flat_index(extent, coord)] = l;
    })
}
