//! Force kernels.
//!
//! A force is attached to a [`crate::simulation::Simulation`] once and then
//! applied every step, in registration order, through [`Force::apply`].
//! Forces never hold a reference to the simulation: each application gets
//! a [`ForceContext`] with a scoped mutable view of the node state, the
//! current alpha and the simulation's jitter generator.
//!
//! - [`ManyBody`] - Barnes-Hut repulsion/attraction.
//! - [`LinkForce`] - spring relaxation along links.
//! - [`Collide`] - overlap separation.
//! - [`Center`] - global centroid correction.
//! - [`Position`] - per-axis pull toward a target coordinate.
//! - [`Radial`] - pull toward a sphere around a center.

use crate::{
    error::SimResult, jitter::Lcg, node_state::NodesMut, types::NodeIndex, vector::Vector,
};
use std::any::Any;
use std::fmt;

pub mod center;
pub mod collide;
pub mod link;
pub mod many_body;
pub mod position;
pub mod radial;

pub use center::Center;
pub use collide::Collide;
pub use link::{Link, LinkForce, LinkParam, Stiffness};
pub use many_body::ManyBody;
pub use position::Position;
pub use radial::Radial;

/// Everything a force may read or write during one application.
#[derive(Debug)]
pub struct ForceContext<'a, V> {
    pub nodes: NodesMut<'a, V>,
    /// Current temperature; most forces scale their effect by it.
    pub alpha: f64,
    /// Deterministic generator used to separate coincident nodes.
    pub jitter: &'a mut Lcg,
}

/// Upcast to [`Any`], so typed force handles can get their force back.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A force kernel over `V`-dimensional nodes.
pub trait Force<V: Vector>: AsAny {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Validates the force against a simulation of `node_count` nodes.
    ///
    /// Called once when the force is attached; an error rejects the
    /// attachment. Forces also precompute per-node data here.
    fn initialize(&mut self, node_count: usize) -> SimResult<()>;

    /// Applies the force for one step.
    fn apply(&mut self, ctx: &mut ForceContext<'_, V>);
}

/// A per-node scalar: one value for every node or a function of the dense
/// index.
///
/// Functions are evaluated afresh every time the value is needed, so they
/// may close over state that changes between steps.
pub enum NodeParam {
    Constant(f64),
    PerNode(Box<dyn Fn(NodeIndex) -> f64>),
}

impl NodeParam {
    pub fn per_node(f: impl Fn(NodeIndex) -> f64 + 'static) -> Self {
        NodeParam::PerNode(Box::new(f))
    }

    #[inline]
    pub fn get(&self, i: NodeIndex) -> f64 {
        match self {
            NodeParam::Constant(v) => *v,
            NodeParam::PerNode(f) => f(i),
        }
    }

    /// Runs `check` on the value of every node in `0..node_count`.
    pub(crate) fn validate(
        &self,
        name: &'static str,
        node_count: usize,
        check: fn(&'static str, f64) -> SimResult<f64>,
    ) -> SimResult<()> {
        match self {
            NodeParam::Constant(v) => check(name, *v).map(|_| ()),
            NodeParam::PerNode(f) => (0..node_count).try_for_each(|i| check(name, f(i)).map(|_| ())),
        }
    }
}

impl From<f64> for NodeParam {
    fn from(v: f64) -> Self {
        NodeParam::Constant(v)
    }
}

impl fmt::Debug for NodeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeParam::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            NodeParam::PerNode(_) => f.write_str("PerNode(..)"),
        }
    }
}

/// Replaces an exactly-zero component with jitter.
#[inline]
pub(crate) fn jiggle_zeros<V: Vector>(mut v: V, jitter: &mut Lcg) -> V {
    for axis in 0..V::DIM {
        if v[axis] == 0.0 {
            v[axis] = jitter.jiggle();
        }
    }
    v
}
