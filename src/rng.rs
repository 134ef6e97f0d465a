//! Keyed, counter-based random number generation.
//!
//! All randomness in the optimizer derives from a fixed 4-component key plus
//! integer counters (cell index, iteration, seed), so every run is bit-for-bit
//! reproducible. `pcg4d` is the stateless mixing function; `Pcg` is a small
//! stateful stream for drawing several variates from one per-cell seed.

use crate::{vec2, vec3, Vec2, Vec3};

/// 4D counter hash from the PCG family. Pure function of its input.
pub fn pcg4d(mut v: [u32; 4]) -> [u32; 4] {
    for x in v.iter_mut() {
        *x = x.wrapping_mul(1664525).wrapping_add(1013904223);
    }
    v[0] = v[0].wrapping_add(v[1].wrapping_mul(v[3]));
    v[1] = v[1].wrapping_add(v[2].wrapping_mul(v[0]));
    v[2] = v[2].wrapping_add(v[0].wrapping_mul(v[1]));
    v[3] = v[3].wrapping_add(v[1].wrapping_mul(v[2]));
    for x in v.iter_mut() {
        *x ^= *x >> 16;
    }
    v[0] = v[0].wrapping_add(v[1].wrapping_mul(v[3]));
    v[1] = v[1].wrapping_add(v[2].wrapping_mul(v[0]));
    v[2] = v[2].wrapping_add(v[0].wrapping_mul(v[1]));
    v[3] = v[3].wrapping_add(v[1].wrapping_mul(v[2]));
    v
}

/// Mixes the run key with two counters (e.g. cell index + seed, or cell
/// index + iteration).
pub fn key_hash(key: [u32; 4], a: u32, b: u32) -> [u32; 4] {
    pcg4d([
        key[0] ^ a,
        key[1] ^ b,
        key[2].wrapping_add(a),
        key[3].wrapping_add(b),
    ])
}

/// Replaces the low `bits` bits of `index` with generator output.
pub fn scramble_index(word: u32, index: u32, bits: u32) -> u32 {
    if bits == 0 {
        return index;
    }
    let mask = if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    };
    (index & !mask) | (word & mask)
}

/// Number of bits needed to address `len` cells.
pub fn index_bits(len: usize) -> u32 {
    32 - (len.saturating_sub(1) as u32).leading_zeros()
}

pub struct Pcg {
    state: u64,
}

impl Pcg {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INC: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        let mut r = Self {
            state: seed.wrapping_add(Self::INC),
        };
        let _ = r.next_u32();
        r
    }

    /// Per-cell stream seeded from the key and two counters.
    pub fn from_key(key: [u32; 4], a: u32, b: u32) -> Self {
        let h = key_hash(key, a, b);
        Self::new(((h[0] as u64) << 32) | h[1] as u64)
    }

    pub fn next_u32(&mut self) -> u32 {
        let x = self.state;
        let count = x >> 59;
        self.state = x.wrapping_mul(Self::MULTIPLIER).wrapping_add(Self::INC);
        let x = x ^ (x >> 18);
        ((x >> 27) as u32).rotate_right(count as u32)
    }

    /// Uniform in [0, 1). The top 24 bits keep the conversion exact so 1.0
    /// is never produced.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16777216.0)
    }

    pub fn next_2d(&mut self) -> Vec2 {
        vec2(self.next_f32(), self.next_f32())
    }

    pub fn next_3d(&mut self) -> Vec3 {
        vec3(self.next_f32(), self.next_f32(), self.next_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcg4d_is_deterministic() {
        let a = pcg4d([1, 2, 3, 4]);
        let b = pcg4d([1, 2, 3, 4]);
        assert_eq!(a, b);
        assert_ne!(pcg4d([1, 2, 3, 5]), a);
    }

    #[test]
    fn key_changes_whole_stream() {
        let mut a = Pcg::from_key([0, 0, 0, 0], 7, 1338);
        let mut b = Pcg::from_key([1, 0, 0, 0], 7, 1338);
        let xs: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = Pcg::from_key([9, 8, 7, 6], 42, 1338);
        let mut b = Pcg::from_key([9, 8, 7, 6], 42, 1338);
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn next_f32_in_unit_interval() {
        let mut rng = Pcg::new(123);
        for _ in 0..10000 {
            let x = rng.next_f32();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn scramble_keeps_high_bits() {
        let index = 0b1101_0110u32;
        let s = scramble_index(0xffff_ffff, index, 4);
        assert_eq!(s >> 4, index >> 4);
        assert_eq!(s & 0xf, 0xf);
        assert_eq!(scramble_index(0xffff_ffff, index, 0), index);
    }

    #[test]
    fn index_bits_covers_range() {
        assert_eq!(index_bits(1), 0);
        assert_eq!(index_bits(2), 1);
        assert_eq!(index_bits(16), 4);
        assert_eq!(index_bits(17), 5);
        assert_eq!(index_bits(4096), 12);
    }
}
