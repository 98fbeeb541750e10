use super::{Force, ForceContext, NodeParam};
use crate::{
    error::{SimResult, SimulationError, finite, non_negative},
    vector::Vector,
};
use std::marker::PhantomData;

/// Pulls every node toward a target coordinate on one axis.
///
/// `velocity[axis] += (target - position[axis]) * strength * alpha`
///
/// Both target and strength are per-node parameters. Typical uses are an
/// x-force and a y-force that gather a layout around a point without the
/// rigid shift of [`super::Center`].
#[derive(Debug)]
pub struct Position<V> {
    axis: usize,
    target: NodeParam,
    strength: NodeParam,
    node_count: usize,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Vector> Position<V> {
    /// Target 0, strength 0.1.
    pub fn new(axis: usize) -> Self {
        Self {
            axis,
            target: NodeParam::Constant(0.0),
            strength: NodeParam::Constant(0.1),
            node_count: 0,
            _marker: PhantomData,
        }
    }

    pub fn x() -> Self {
        Self::new(0)
    }

    pub fn y() -> Self {
        Self::new(1)
    }

    /// The z-axis force; only valid for 3-D vectors.
    pub fn z() -> Self {
        Self::new(2)
    }

    pub fn with_target(mut self, target: impl Into<NodeParam>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_strength(mut self, strength: impl Into<NodeParam>) -> Self {
        self.strength = strength.into();
        self
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Replaces the target policy, checked against every attached node.
    pub fn set_target(&mut self, target: impl Into<NodeParam>) -> SimResult<()> {
        let target = target.into();
        target.validate("target", self.node_count, finite)?;
        self.target = target;
        Ok(())
    }

    pub fn set_strength(&mut self, strength: impl Into<NodeParam>) -> SimResult<()> {
        let strength = strength.into();
        strength.validate("strength", self.node_count, non_negative)?;
        self.strength = strength;
        Ok(())
    }
}

impl<V: Vector> Force<V> for Position<V> {
    fn name(&self) -> &'static str {
        "position"
    }

    fn initialize(&mut self, node_count: usize) -> SimResult<()> {
        if self.axis >= V::DIM {
            return Err(SimulationError::InvalidAxis {
                axis: self.axis,
                dim: V::DIM,
            });
        }
        self.target.validate("target", node_count, finite)?;
        self.strength.validate("strength", node_count, non_negative)?;
        self.node_count = node_count;
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        let axis = self.axis;
        for i in 0..ctx.nodes.len() {
            let p = ctx.nodes.positions[i][axis];
            let k = self.strength.get(i) * ctx.alpha;
            ctx.nodes.velocities[i][axis] += (self.target.get(i) - p) * k;
        }
    }
}
