//! Many-body force: every node pushes (or pulls) every other node, with
//! distant clusters approximated through a Barnes-Hut tree.

use super::{Force, ForceContext, NodeParam, jiggle_zeros};
use crate::{
    error::{SimResult, SimulationError, finite, non_negative},
    tree::{Extent, Interaction, MassAggregate, Tree},
    vector::Vector,
};

/// Repulsion (negative strength) or attraction (positive strength)
/// between all pairs of nodes.
///
/// Each step the force rebuilds a tree over the current positions, keyed
/// by the mass policy, and for every node sums the contributions of the
/// points and clusters reported by [`Tree::approximate`]:
///
/// `velocity += (other - position) * strength * mass * alpha / distance²`
///
/// Only an exactly zero separation is jiggled. Any other squared distance
/// below `distance_min²` is softened to `sqrt(distance_min² * distance²)`
/// rather than jittered, so trajectories are not bit-identical to layouts
/// that jitter every pair closer than `distance_min`. Pairs farther apart
/// than `distance_max` are ignored.
#[derive(Debug)]
pub struct ManyBody<V: Vector> {
    strength: f64,
    theta: f64,
    distance_min: f64,
    distance_max: f64,
    mass: NodeParam,
    tree: Tree<V, MassAggregate<V>>,
}

impl<V: Vector> Default for ManyBody<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vector> ManyBody<V> {
    /// Strength -30, theta 0.9, distance range `[1, inf)`, unit masses.
    pub fn new() -> Self {
        Self {
            strength: -30.0,
            theta: 0.9,
            distance_min: 1.0,
            distance_max: f64::INFINITY,
            mass: NodeParam::Constant(1.0),
            tree: Tree::new(Extent::covering([])),
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_distance_min(mut self, distance_min: f64) -> Self {
        self.distance_min = distance_min;
        self
    }

    pub fn with_distance_max(mut self, distance_max: f64) -> Self {
        self.distance_max = distance_max;
        self
    }

    pub fn with_mass(mut self, mass: impl Into<NodeParam>) -> Self {
        self.mass = mass.into();
        self
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn set_strength(&mut self, strength: f64) -> SimResult<()> {
        self.strength = finite("strength", strength)?;
        Ok(())
    }

    pub fn set_theta(&mut self, theta: f64) -> SimResult<()> {
        self.theta = non_negative("theta", theta)?;
        Ok(())
    }

    pub fn set_distance_range(&mut self, min: f64, max: f64) -> SimResult<()> {
        check_distance_range(min, max)?;
        self.distance_min = min;
        self.distance_max = max;
        Ok(())
    }

    /// The tree built during the last application.
    pub fn tree(&self) -> &Tree<V, MassAggregate<V>> {
        &self.tree
    }
}

fn check_distance_range(min: f64, max: f64) -> SimResult<()> {
    non_negative("distance_min", min)?;
    if max.is_nan() || max <= min {
        return Err(SimulationError::InvalidParameter {
            name: "distance_max",
            value: max,
            reason: "must be greater than distance_min",
        });
    }
    Ok(())
}

impl<V: Vector> Force<V> for ManyBody<V> {
    fn name(&self) -> &'static str {
        "many-body"
    }

    fn initialize(&mut self, node_count: usize) -> SimResult<()> {
        finite("strength", self.strength)?;
        non_negative("theta", self.theta)?;
        check_distance_range(self.distance_min, self.distance_max)?;
        self.mass.validate("mass", node_count, finite)
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        let n = ctx.nodes.len();
        if n == 0 {
            return;
        }

        let mass = &self.mass;
        self.tree.rebuild(ctx.nodes.positions, |i| mass.get(i));

        let k = self.strength * ctx.alpha;
        let theta = self.theta;
        let min2 = self.distance_min * self.distance_min;
        let max2 = self.distance_max * self.distance_max;
        let jitter = &mut *ctx.jitter;

        for i in 0..n {
            let p = ctx.nodes.positions[i];
            let mut dv = V::ZERO;

            self.tree.approximate(p, theta, |interaction| {
                let (other, m) = match interaction {
                    Interaction::Cluster {
                        centroid,
                        aggregate,
                    } => (centroid, aggregate.mass),
                    Interaction::Point {
                        index,
                        position,
                        weight,
                    } => {
                        if index == i {
                            return;
                        }
                        (position, weight)
                    }
                };

                let mut delta = other - p;
                let mut d2 = delta.length_squared();
                if d2 >= max2 {
                    return;
                }
                if d2 == 0.0 {
                    delta = jiggle_zeros(delta, jitter);
                    d2 = delta.length_squared();
                }
                if d2 < min2 {
                    d2 = (min2 * d2).sqrt();
                }
                dv += delta * (k * m / d2);
            });

            ctx.nodes.velocities[i] += dv;
        }
    }
}
