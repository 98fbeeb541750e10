//! Overlap separation between nodes treated as spheres.

use super::{Force, ForceContext, NodeParam, jiggle_zeros};
use crate::{
    error::{SimResult, at_least_one, non_negative, unit_interval},
    tree::{Extent, RadiusAggregate, Tree},
    vector::Vector,
};

/// Pushes apart nodes whose spheres overlap.
///
/// Works on predicted positions (`position + velocity`). For every
/// overlapping pair `(i, j)` with separation `d < r_i + r_j`, the overlap
/// `(r_i + r_j - d) * strength` is split between the two velocities in
/// proportion to the other node's squared radius, so that a small node
/// moves more than a large one. Pinned nodes keep their velocity and
/// their free partner takes the whole correction.
///
/// Pairs are found through a tree built over the predicted positions;
/// cells farther from a node than its radius plus the largest radius in
/// the cell are skipped. Each pair is resolved once per iteration.
#[derive(Debug)]
pub struct Collide<V: Vector> {
    radius: NodeParam,
    strength: f64,
    iterations: usize,
    node_count: usize,
    tree: Tree<V, RadiusAggregate>,
    predicted: Vec<V>,
    radii: Vec<f64>,
}

impl<V: Vector> Default for Collide<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vector> Collide<V> {
    /// Radius 1, strength 1, one iteration.
    pub fn new() -> Self {
        Self {
            radius: NodeParam::Constant(1.0),
            strength: 1.0,
            iterations: 1,
            node_count: 0,
            tree: Tree::new(Extent::covering([])),
            predicted: Vec::new(),
            radii: Vec::new(),
        }
    }

    pub fn with_radius(mut self, radius: impl Into<NodeParam>) -> Self {
        self.radius = radius.into();
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn set_strength(&mut self, strength: f64) -> SimResult<()> {
        self.strength = unit_interval("strength", strength)?;
        Ok(())
    }

    pub fn set_iterations(&mut self, iterations: usize) -> SimResult<()> {
        self.iterations = at_least_one("iterations", iterations)?;
        Ok(())
    }

    /// Replaces the radius policy. Per-node radii are checked for every
    /// node the force is attached to; before attaching, that check happens
    /// in [`Simulation::attach_force`](crate::Simulation::attach_force).
    pub fn set_radius(&mut self, radius: impl Into<NodeParam>) -> SimResult<()> {
        let radius = radius.into();
        radius.validate("radius", self.node_count, non_negative)?;
        self.radius = radius;
        Ok(())
    }
}

impl<V: Vector> Force<V> for Collide<V> {
    fn name(&self) -> &'static str {
        "collide"
    }

    fn initialize(&mut self, node_count: usize) -> SimResult<()> {
        unit_interval("strength", self.strength)?;
        at_least_one("iterations", self.iterations)?;
        self.radius.validate("radius", node_count, non_negative)?;
        self.node_count = node_count;
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        let n = ctx.nodes.len();
        if n < 2 {
            return;
        }

        let radius = &self.radius;
        self.radii.clear();
        self.radii.extend((0..n).map(|i| radius.get(i).max(0.0)));

        for _ in 0..self.iterations {
            self.predicted.clear();
            self.predicted.extend((0..n).map(|i| ctx.nodes.predicted(i)));
            let radii = &self.radii;
            self.tree.rebuild(&self.predicted, |i| radii[i]);

            for i in 0..n {
                let qi = self.predicted[i];
                let ri = radii[i];
                let ri2 = ri * ri;
                let nodes = &mut ctx.nodes;
                let jitter = &mut *ctx.jitter;
                let strength = self.strength;

                self.tree.visit(|cell| {
                    let reach = ri + cell.aggregate().max_radius;
                    if cell.extent().distance_squared(qi) > reach * reach {
                        return false;
                    }
                    for (j, _, rj) in cell.points() {
                        if j <= i {
                            continue;
                        }
                        let r = ri + rj;
                        let mut delta = qi - nodes.predicted(j);
                        let mut d2 = delta.length_squared();
                        if d2 >= r * r {
                            continue;
                        }
                        if d2 == 0.0 {
                            delta = jiggle_zeros(delta, jitter);
                            d2 = delta.length_squared();
                        }
                        let d = d2.sqrt();
                        let push = delta * ((r - d) / d * strength);
                        let rj2 = rj * rj;
                        let share_i = match (nodes.is_fixed(i), nodes.is_fixed(j)) {
                            (true, true) => continue,
                            (true, false) => 0.0,
                            (false, true) => 1.0,
                            (false, false) => rj2 / (ri2 + rj2),
                        };
                        nodes.velocities[i] += push * share_i;
                        nodes.velocities[j] -= push * (1.0 - share_i);
                    }
                    true
                });
            }
        }
    }
}
