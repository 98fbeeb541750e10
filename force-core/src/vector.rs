//! Fixed-dimension vector abstraction shared by the tree, the forces and
//! the driver.
//!
//! Everything in the core is generic over a [`Vector`] so that the 2-D and
//! 3-D layouts share one implementation. The trait is implemented for
//! [`glam::DVec2`] and [`glam::DVec3`]; the child count of a tree cell
//! (`2^DIM`) is derived from [`Vector::DIM`].

use glam::{DVec2, DVec3};
use std::f64::consts::PI;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Sub, SubAssign};

/// Radius scale of the default spiral placement.
const INITIAL_RADIUS: f64 = 10.0;

/// A `DIM`-component `f64` vector.
pub trait Vector:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign<f64>
    + Index<usize, Output = f64>
    + IndexMut<usize>
    + Send
    + Sync
    + 'static
{
    /// Number of components.
    const DIM: usize;

    /// Number of children of an internal tree cell.
    const CHILDREN: usize = 1 << Self::DIM;

    /// The zero vector.
    const ZERO: Self;

    /// A vector with every component set to `v`.
    fn splat(v: f64) -> Self;

    fn dot(self, other: Self) -> f64;

    fn length_squared(self) -> f64;

    fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Componentwise minimum.
    fn min(self, other: Self) -> Self;

    /// Componentwise maximum.
    fn max(self, other: Self) -> Self;

    /// `true` if every component is finite.
    fn is_finite(self) -> bool;

    /// Default initial position of the node with dense index `index`.
    ///
    /// Nodes are laid out on a phyllotaxis spiral (a sphere-filling spiral
    /// in 3-D) so that no two start at the same point and the initial
    /// layout is independent of any random source.
    fn spiral(index: usize) -> Self;

    /// Components as a vector, in axis order.
    fn to_vec(self) -> Vec<f64> {
        (0..Self::DIM).map(|axis| self[axis]).collect()
    }

    /// Builds a vector from the first `DIM` entries of `values`.
    ///
    /// Returns `None` if `values` is shorter than `DIM`.
    fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() < Self::DIM {
            return None;
        }
        let mut v = Self::ZERO;
        for axis in 0..Self::DIM {
            v[axis] = values[axis];
        }
        Some(v)
    }
}

fn golden_angle() -> f64 {
    PI * (3.0 - 5.0_f64.sqrt())
}

impl Vector for DVec2 {
    const DIM: usize = 2;
    const ZERO: Self = DVec2::ZERO;

    #[inline]
    fn splat(v: f64) -> Self {
        DVec2::splat(v)
    }

    #[inline]
    fn dot(self, other: Self) -> f64 {
        DVec2::dot(self, other)
    }

    #[inline]
    fn length_squared(self) -> f64 {
        DVec2::length_squared(self)
    }

    #[inline]
    fn min(self, other: Self) -> Self {
        DVec2::min(self, other)
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        DVec2::max(self, other)
    }

    #[inline]
    fn is_finite(self) -> bool {
        DVec2::is_finite(self)
    }

    fn spiral(index: usize) -> Self {
        let i = index as f64;
        let radius = INITIAL_RADIUS * (0.5 + i).sqrt();
        let angle = i * golden_angle();
        DVec2::new(radius * angle.cos(), radius * angle.sin())
    }
}

impl Vector for DVec3 {
    const DIM: usize = 3;
    const ZERO: Self = DVec3::ZERO;

    #[inline]
    fn splat(v: f64) -> Self {
        DVec3::splat(v)
    }

    #[inline]
    fn dot(self, other: Self) -> f64 {
        DVec3::dot(self, other)
    }

    #[inline]
    fn length_squared(self) -> f64 {
        DVec3::length_squared(self)
    }

    #[inline]
    fn min(self, other: Self) -> Self {
        DVec3::min(self, other)
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        DVec3::max(self, other)
    }

    #[inline]
    fn is_finite(self) -> bool {
        DVec3::is_finite(self)
    }

    fn spiral(index: usize) -> Self {
        let i = index as f64;
        let radius = INITIAL_RADIUS * (0.5 + i).cbrt();
        let yaw = i * golden_angle();
        let roll = i * PI * 20.0 / (9.0 + 221.0_f64.sqrt());
        DVec3::new(
            radius * roll.sin() * yaw.cos(),
            radius * roll.cos(),
            radius * roll.sin() * yaw.sin(),
        )
    }
}
