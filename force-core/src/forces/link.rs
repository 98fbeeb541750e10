//! Spring force along links.

use super::{Force, ForceContext, jiggle_zeros};
use crate::{
    error::{SimResult, SimulationError, at_least_one, non_negative},
    types::NodeIndex,
    vector::Vector,
};
use std::fmt;

/// A link between two dense node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: NodeIndex,
    pub target: NodeIndex,
}

impl Link {
    pub fn new(source: NodeIndex, target: NodeIndex) -> Self {
        Self { source, target }
    }
}

/// A per-link scalar: one value for every link or a function of the link
/// and its position in the link list.
pub enum LinkParam {
    Constant(f64),
    PerLink(Box<dyn Fn(usize, &Link) -> f64>),
}

impl LinkParam {
    pub fn per_link(f: impl Fn(usize, &Link) -> f64 + 'static) -> Self {
        LinkParam::PerLink(Box::new(f))
    }

    #[inline]
    fn get(&self, i: usize, link: &Link) -> f64 {
        match self {
            LinkParam::Constant(v) => *v,
            LinkParam::PerLink(f) => f(i, link),
        }
    }
}

impl From<f64> for LinkParam {
    fn from(v: f64) -> Self {
        LinkParam::Constant(v)
    }
}

impl fmt::Debug for LinkParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkParam::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            LinkParam::PerLink(_) => f.write_str("PerLink(..)"),
        }
    }
}

/// How stiff each link is.
pub enum Stiffness {
    /// `1 / min(degree(source), degree(target))`, so that nodes with many
    /// links are not over-constrained.
    DegreeWeighted,
    Constant(f64),
    PerLink(Box<dyn Fn(usize, &Link) -> f64>),
}

impl Stiffness {
    pub fn per_link(f: impl Fn(usize, &Link) -> f64 + 'static) -> Self {
        Stiffness::PerLink(Box::new(f))
    }
}

impl From<f64> for Stiffness {
    fn from(v: f64) -> Self {
        Stiffness::Constant(v)
    }
}

impl fmt::Debug for Stiffness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stiffness::DegreeWeighted => f.write_str("DegreeWeighted"),
            Stiffness::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Stiffness::PerLink(_) => f.write_str("PerLink(..)"),
        }
    }
}

/// Pulls or pushes linked nodes toward their rest length.
///
/// For every link, on predicted positions (`position + velocity`):
///
/// `correction = (target - source) * (length - rest) / length * stiffness * alpha`
///
/// The target's velocity loses `bias` of the correction and the source's
/// gains the remaining `1 - bias`, where
/// `bias = degree(source) / (degree(source) + degree(target))`: the
/// endpoint with more links moves less. Pinned endpoints are not
/// corrected. With `iterations > 1` the links are relaxed repeatedly
/// within one step, each pass seeing the velocities left by the previous
/// one.
#[derive(Debug)]
pub struct LinkForce {
    links: Vec<Link>,
    distance: LinkParam,
    stiffness: Stiffness,
    iterations: usize,
    degree: Vec<usize>,
    bias: Vec<f64>,
}

impl LinkForce {
    /// Rest length 30, degree-weighted stiffness, one iteration.
    pub fn new(links: impl IntoIterator<Item = Link>) -> Self {
        Self {
            links: links.into_iter().collect(),
            distance: LinkParam::Constant(30.0),
            stiffness: Stiffness::DegreeWeighted,
            iterations: 1,
            degree: Vec::new(),
            bias: Vec::new(),
        }
    }

    pub fn with_distance(mut self, distance: impl Into<LinkParam>) -> Self {
        self.distance = distance.into();
        self
    }

    pub fn with_stiffness(mut self, stiffness: impl Into<Stiffness>) -> Self {
        self.stiffness = stiffness.into();
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of links touching each node, as counted on attach.
    pub fn degrees(&self) -> &[usize] {
        &self.degree
    }

    pub fn set_distance(&mut self, distance: impl Into<LinkParam>) -> SimResult<()> {
        let distance = distance.into();
        self.validate_distance(&distance)?;
        self.distance = distance;
        Ok(())
    }

    pub fn set_stiffness(&mut self, stiffness: impl Into<Stiffness>) -> SimResult<()> {
        let stiffness = stiffness.into();
        self.validate_stiffness(&stiffness)?;
        self.stiffness = stiffness;
        Ok(())
    }

    pub fn set_iterations(&mut self, iterations: usize) -> SimResult<()> {
        self.iterations = at_least_one("iterations", iterations)?;
        Ok(())
    }

    fn validate_distance(&self, distance: &LinkParam) -> SimResult<()> {
        match distance {
            LinkParam::Constant(v) => non_negative("distance", *v).map(|_| ()),
            LinkParam::PerLink(f) => self
                .links
                .iter()
                .enumerate()
                .try_for_each(|(i, link)| non_negative("distance", f(i, link)).map(|_| ())),
        }
    }

    fn validate_stiffness(&self, stiffness: &Stiffness) -> SimResult<()> {
        match stiffness {
            Stiffness::DegreeWeighted => Ok(()),
            Stiffness::Constant(v) => non_negative("stiffness", *v).map(|_| ()),
            Stiffness::PerLink(f) => self
                .links
                .iter()
                .enumerate()
                .try_for_each(|(i, link)| non_negative("stiffness", f(i, link)).map(|_| ())),
        }
    }

    #[inline]
    fn stiffness_of(&self, i: usize, link: &Link) -> f64 {
        match &self.stiffness {
            Stiffness::DegreeWeighted => {
                1.0 / self.degree[link.source].min(self.degree[link.target]) as f64
            }
            Stiffness::Constant(v) => *v,
            Stiffness::PerLink(f) => f(i, link),
        }
    }
}

impl<V: Vector> Force<V> for LinkForce {
    fn name(&self) -> &'static str {
        "link"
    }

    fn initialize(&mut self, node_count: usize) -> SimResult<()> {
        at_least_one("iterations", self.iterations)?;
        for (i, link) in self.links.iter().enumerate() {
            for index in [link.source, link.target] {
                if index >= node_count {
                    return Err(SimulationError::LinkOutOfRange {
                        link: i,
                        index,
                        len: node_count,
                    });
                }
            }
        }
        self.validate_distance(&self.distance)?;
        self.validate_stiffness(&self.stiffness)?;

        self.degree = vec![0; node_count];
        for link in &self.links {
            self.degree[link.source] += 1;
            self.degree[link.target] += 1;
        }
        self.bias = self
            .links
            .iter()
            .map(|link| {
                let s = self.degree[link.source] as f64;
                let t = self.degree[link.target] as f64;
                s / (s + t)
            })
            .collect();
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        let alpha = ctx.alpha;
        for _ in 0..self.iterations {
            for (i, link) in self.links.iter().enumerate() {
                let (s, t) = (link.source, link.target);
                if s == t {
                    continue;
                }

                let mut delta = ctx.nodes.predicted(t) - ctx.nodes.predicted(s);
                let mut length = delta.length();
                if length == 0.0 {
                    delta = jiggle_zeros(delta, ctx.jitter);
                    length = delta.length();
                }

                let rest = self.distance.get(i, link);
                let k = self.stiffness_of(i, link);
                let correction = delta * ((length - rest) / length * alpha * k);

                let b = self.bias[i];
                if !ctx.nodes.is_fixed(t) {
                    ctx.nodes.velocities[t] -= correction * b;
                }
                if !ctx.nodes.is_fixed(s) {
                    ctx.nodes.velocities[s] += correction * (1.0 - b);
                }
            }
        }
    }
}
