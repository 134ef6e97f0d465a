//! Sample spaces, distributions, and the distance metric between cell values.
//!
//! Every cell stores a `Vec4`; how many components are meaningful and how two
//! values compare is decided by [`SampleSpace`]. Circle values live in [0, 1)
//! as fractions of a turn; sphere values are unit vectors.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, SQRT_2};

use crate::rng::Pcg;
use crate::util::erf_inv;
use crate::{vec2, vec4, Error, Vec2, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSpace {
    Real,
    Circle,
    Vector2,
    Vector3,
    Vector4,
    Sphere,
}

impl SampleSpace {
    pub const ALL: [SampleSpace; 6] = [
        SampleSpace::Real,
        SampleSpace::Circle,
        SampleSpace::Vector2,
        SampleSpace::Vector3,
        SampleSpace::Vector4,
        SampleSpace::Sphere,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SampleSpace::Real => "Real",
            SampleSpace::Circle => "Circle",
            SampleSpace::Vector2 => "Vector2",
            SampleSpace::Vector3 => "Vector3",
            SampleSpace::Vector4 => "Vector4",
            SampleSpace::Sphere => "Sphere",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::UnknownVariant {
                kind: "sample space",
                name: name.to_string(),
            })
    }

    /// Number of meaningful components in a cell value.
    pub fn components(self) -> usize {
        match self {
            SampleSpace::Real | SampleSpace::Circle => 1,
            SampleSpace::Vector2 => 2,
            SampleSpace::Vector3 | SampleSpace::Sphere => 3,
            SampleSpace::Vector4 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleDistribution {
    Uniform1D,
    Gauss1D,
    Tent1D,
    Uniform2D,
    Uniform3D,
    Uniform4D,
    UniformSphere,
    UniformHemisphere,
    CosineHemisphere,
}

impl SampleDistribution {
    pub const ALL: [SampleDistribution; 9] = [
        SampleDistribution::Uniform1D,
        SampleDistribution::Gauss1D,
        SampleDistribution::Tent1D,
        SampleDistribution::Uniform2D,
        SampleDistribution::Uniform3D,
        SampleDistribution::Uniform4D,
        SampleDistribution::UniformSphere,
        SampleDistribution::UniformHemisphere,
        SampleDistribution::CosineHemisphere,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SampleDistribution::Uniform1D => "Uniform1D",
            SampleDistribution::Gauss1D => "Gauss1D",
            SampleDistribution::Tent1D => "Tent1D",
            SampleDistribution::Uniform2D => "Uniform2D",
            SampleDistribution::Uniform3D => "Uniform3D",
            SampleDistribution::Uniform4D => "Uniform4D",
            SampleDistribution::UniformSphere => "UniformSphere",
            SampleDistribution::UniformHemisphere => "UniformHemisphere",
            SampleDistribution::CosineHemisphere => "CosineHemisphere",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::UnknownVariant {
                kind: "sample distribution",
                name: name.to_string(),
            })
    }
}

pub fn uniform_sample_disk(u: Vec2) -> Vec2 {
    let r = u.x.sqrt();
    let phi = u.y * 2.0 * PI;
    vec2(r * phi.cos(), r * phi.sin())
}

/// Uniform direction on the unit sphere.
pub fn uniform_sample_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = u.y * 2.0 * PI;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction on the +z hemisphere.
pub fn uniform_sample_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = u.y * 2.0 * PI;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Cosine-weighted direction on the +z hemisphere (disk lift).
pub fn cos_sample_hemisphere(u: Vec2) -> Vec3 {
    let d = uniform_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Standard normal via the inverse CDF.
pub fn sample_gauss(u: f32) -> f32 {
    SQRT_2 * erf_inv(2.0 * u - 1.0)
}

/// Triangular on [0, 1] with the peak at 0.5.
pub fn sample_tent(u: Vec2) -> f32 {
    (u.x + u.y) * 0.5
}

/// Draws one cell value. Unused components are zero.
pub fn sample_value(distribution: SampleDistribution, rng: &mut Pcg) -> Vec4 {
    match distribution {
        SampleDistribution::Uniform1D => vec4(rng.next_f32(), 0.0, 0.0, 0.0),
        SampleDistribution::Gauss1D => vec4(sample_gauss(rng.next_f32()), 0.0, 0.0, 0.0),
        SampleDistribution::Tent1D => vec4(sample_tent(rng.next_2d()), 0.0, 0.0, 0.0),
        SampleDistribution::Uniform2D => {
            let u = rng.next_2d();
            vec4(u.x, u.y, 0.0, 0.0)
        }
        SampleDistribution::Uniform3D => {
            let u = rng.next_3d();
            vec4(u.x, u.y, u.z, 0.0)
        }
        SampleDistribution::Uniform4D => vec4(
            rng.next_f32(),
            rng.next_f32(),
            rng.next_f32(),
            rng.next_f32(),
        ),
        SampleDistribution::UniformSphere => {
            let v = uniform_sample_sphere(rng.next_2d());
            vec4(v.x, v.y, v.z, 0.0)
        }
        SampleDistribution::UniformHemisphere => {
            let v = uniform_sample_hemisphere(rng.next_2d());
            vec4(v.x, v.y, v.z, 0.0)
        }
        SampleDistribution::CosineHemisphere => {
            let v = cos_sample_hemisphere(rng.next_2d());
            vec4(v.x, v.y, v.z, 0.0)
        }
    }
}

/// Distance between two cell values under a sample space.
pub fn distance(space: SampleSpace, a: Vec4, b: Vec4) -> f32 {
    match space {
        SampleSpace::Real => (a.x - b.x).abs(),
        SampleSpace::Circle => {
            // shortest arc, values in fractions of a turn
            let d = (a.x - b.x).rem_euclid(1.0);
            d.min(1.0 - d)
        }
        SampleSpace::Vector2 => vec2(a.x, a.y).distance(vec2(b.x, b.y)),
        SampleSpace::Vector3 => a.truncate().distance(b.truncate()),
        SampleSpace::Vector4 => a.distance(b),
        SampleSpace::Sphere => a.truncate().dot(b.truncate()).clamp(-1.0, 1.0).acos(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::assert_almost_eq;

    #[test]
    fn unit_vectors_on_sphere() {
        let mut rng = Pcg::new(7);
        for _ in 0..1000 {
            let v = uniform_sample_sphere(rng.next_2d());
            assert_almost_eq!(v.length() as f64, 1.0, 1e-4);
        }
    }

    #[test]
    fn hemisphere_stays_positive_z() {
        let mut rng = Pcg::new(11);
        for _ in 0..1000 {
            assert!(uniform_sample_hemisphere(rng.next_2d()).z >= 0.0);
            assert!(cos_sample_hemisphere(rng.next_2d()).z >= 0.0);
        }
    }

    #[test]
    fn cosine_hemisphere_is_unit_length() {
        let mut rng = Pcg::new(13);
        for _ in 0..1000 {
            let v = cos_sample_hemisphere(rng.next_2d());
            assert_almost_eq!(v.length() as f64, 1.0, 1e-4);
        }
    }

    #[test]
    fn gauss_mean_near_zero() {
        let mut rng = Pcg::new(17);
        let n = 20000;
        let mean: f64 = (0..n).map(|_| sample_gauss(rng.next_f32()) as f64).sum::<f64>() / n as f64;
        assert_almost_eq!(mean, 0.0, 0.05);
    }

    #[test]
    fn tent_stays_in_unit_interval() {
        let mut rng = Pcg::new(19);
        for _ in 0..1000 {
            let x = sample_tent(rng.next_2d());
            assert!((0.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn circle_distance_wraps() {
        let a = vec4(0.1, 0.0, 0.0, 0.0);
        let b = vec4(0.9, 0.0, 0.0, 0.0);
        assert_almost_eq!(distance(SampleSpace::Circle, a, b) as f64, 0.2, 1e-6);
        assert_almost_eq!(
            distance(SampleSpace::Circle, a, b) as f64,
            distance(SampleSpace::Circle, b, a) as f64,
            1e-6
        );
    }

    #[test]
    fn sphere_distance_is_arc_length() {
        let x = vec4(1.0, 0.0, 0.0, 0.0);
        let y = vec4(0.0, 1.0, 0.0, 0.0);
        assert_almost_eq!(
            distance(SampleSpace::Sphere, x, y) as f64,
            std::f64::consts::FRAC_PI_2,
            1e-5
        );
        assert_almost_eq!(distance(SampleSpace::Sphere, x, x) as f64, 0.0, 1e-6);
    }

    #[test]
    fn enum_names_round_trip() {
        for s in SampleSpace::ALL {
            assert_eq!(SampleSpace::from_name(s.name()).unwrap(), s);
        }
        for d in SampleDistribution::ALL {
            assert_eq!(SampleDistribution::from_name(d.name()).unwrap(), d);
        }
        assert!(SampleSpace::from_name("Torus").is_err());
    }
}
