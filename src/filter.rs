//! Filter kernels and the neighborhood window they apply over.

use serde::{Deserialize, Serialize};

use crate::{Error, IVec3, UVec3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    Box,
    Gaussian,
    Binomial,
    Exponential,
    WeightedExponential,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::Box,
        FilterType::Gaussian,
        FilterType::Binomial,
        FilterType::Exponential,
        FilterType::WeightedExponential,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterType::Box => "Box",
            FilterType::Gaussian => "Gaussian",
            FilterType::Binomial => "Binomial",
            FilterType::Exponential => "Exponential",
            FilterType::WeightedExponential => "WeightedExponential",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownVariant {
                kind: "filter type",
                name: name.to_string(),
            })
    }
}

/// Per-axis inclusive neighbor range plus an offset of the kernel center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterWindow {
    pub min: IVec3,
    pub max: IVec3,
    pub offset: IVec3,
}

impl Default for FilterWindow {
    fn default() -> Self {
        Self {
            min: IVec3::ZERO,
            max: IVec3::ZERO,
            offset: IVec3::ZERO,
        }
    }
}

impl FilterWindow {
    pub fn new(min: IVec3, max: IVec3, offset: IVec3) -> Self {
        Self { min, max, offset }
    }

    /// Symmetric window of radius `r` over the spatial axes and `rz` over the
    /// temporal axis.
    pub fn symmetric(r: i32, rz: i32) -> Self {
        Self {
            min: IVec3::new(-r, -r, -rz),
            max: IVec3::new(r, r, rz),
            offset: IVec3::ZERO,
        }
    }

    pub fn validate(&self, extent: UVec3) -> Result<(), Error> {
        let axes = ['x', 'y', 'z'];
        let n = [extent.x, extent.y, extent.z];
        for i in 0..3 {
            let (lo, hi) = (self.min[i], self.max[i]);
            if lo > hi {
                return Err(Error::WindowInverted {
                    axis: axes[i],
                    lo,
                    hi,
                });
            }
            if (hi - lo) as u32 >= n[i] {
                return Err(Error::WindowExceedsExtent {
                    axis: axes[i],
                    lo,
                    hi,
                    extent: n[i],
                });
            }
        }
        Ok(())
    }

    /// Largest one-sided reach of the window on any axis, at least 1. Drives
    /// the falloff scale of the Gaussian and exponential kernels.
    fn radius(&self) -> f32 {
        let mut r = 1i32;
        for i in 0..3 {
            r = r.max(-self.min[i]).max(self.max[i]);
        }
        r as f32
    }
}

fn binomial(n: i32, k: i32) -> f32 {
    let k = k.min(n - k);
    let mut c = 1.0f64;
    for i in 0..k {
        c = c * (n - i) as f64 / (i + 1) as f64;
    }
    c as f32
}

/// Weight of a neighbor at window offset `delta`, relative to the kernel
/// center shifted by `window.offset`. `axis_weight` only participates in
/// `WeightedExponential`.
pub fn filter_weight(
    filter: FilterType,
    window: &FilterWindow,
    delta: IVec3,
    axis_weight: Vec3,
) -> f32 {
    let d = (delta - window.offset).as_vec3();
    match filter {
        FilterType::Box => 1.0,
        FilterType::Gaussian => {
            let sigma = (window.radius() * 0.5).max(1.0);
            (-d.length_squared() / (2.0 * sigma * sigma)).exp()
        }
        FilterType::Binomial => {
            let mut w = 1.0f32;
            for i in 0..3 {
                let n = window.max[i] - window.min[i];
                if n == 0 {
                    continue;
                }
                let k = (delta[i] - window.min[i]).clamp(0, n);
                w *= binomial(n, k) / binomial(n, n / 2);
            }
            w
        }
        FilterType::Exponential => {
            let lambda = (window.radius() * 0.5).max(1.0);
            (-d.length() / lambda).exp()
        }
        FilterType::WeightedExponential => {
            let lambda = (window.radius() * 0.5).max(1.0);
            (-(d * axis_weight).length() / lambda).exp()
        }
    }
}
