//! Initialization kernel: fills the value grid with a deterministic
//! pseudo-random draw from the configured distribution.

use crate::grid::{flat_index, ValueGrid};
use crate::kernel::{Dispatch, InitParams};
use crate::rng::{key_hash, scramble_index, Pcg};
use crate::sampling::sample_value;
use crate::util::UnsafePointer;
use crate::Error;

pub const KERNEL: &str = "initialize";

/// Overwrites every cell. Re-running with identical params reproduces the
/// grid bit-for-bit.
pub fn run(
    dispatch: &dyn Dispatch,
    params: &InitParams,
    values: &mut ValueGrid,
) -> Result<(), Error> {
    let extent = values.extent();
    let len = values.len();
    let ptr = UnsafePointer::new(values.as_mut_slice().as_mut_ptr());
    dispatch.dispatch(KERNEL, extent, &|coord| {
        let flat = flat_index(extent, coord) as u32;
        let h = key_hash(params.key, flat, params.rng_seed);
        let idx = scramble_index(h[3], flat, params.scramble_bits);
        let mut rng = Pcg::new((((h[0] ^ idx) as u64) << 32) | h[1] as u64);
        let v = sample_value(params.distribution, &mut rng);
        // each cell writes only its own slot
        let slice = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
        slice[flat as usize] = v;
    })
}
