use super::{Force, ForceContext};
use crate::{
    error::{SimResult, finite, non_negative},
    vector::Vector,
};

/// Translates all nodes so that their mean position moves toward `target`.
///
/// Each application shifts every unpinned node by
/// `(target - mean(positions)) * strength`. The shift is rigid: relative
/// positions are preserved and alpha is ignored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Center<V> {
    target: V,
    strength: f64,
}

impl<V: Vector> Default for Center<V> {
    fn default() -> Self {
        Self::new(V::ZERO)
    }
}

impl<V: Vector> Center<V> {
    /// Centers on `target` with strength 1.
    pub fn new(target: V) -> Self {
        Self {
            target,
            strength: 1.0,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn target(&self) -> V {
        self.target
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn set_target(&mut self, target: V) -> SimResult<()> {
        for axis in 0..V::DIM {
            finite("target", target[axis])?;
        }
        self.target = target;
        Ok(())
    }

    pub fn set_strength(&mut self, strength: f64) -> SimResult<()> {
        self.strength = non_negative("strength", strength)?;
        Ok(())
    }
}

impl<V: Vector> Force<V> for Center<V> {
    fn name(&self) -> &'static str {
        "center"
    }

    fn initialize(&mut self, _node_count: usize) -> SimResult<()> {
        for axis in 0..V::DIM {
            finite("target", self.target[axis])?;
        }
        non_negative("strength", self.strength)?;
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        let n = ctx.nodes.len();
        if n == 0 {
            return;
        }

        let sum = ctx
            .nodes
            .positions
            .iter()
            .fold(V::ZERO, |acc, p| acc + *p);
        let shift = (sum / n as f64 - self.target) * self.strength;

        for i in 0..n {
            if !ctx.nodes.is_fixed(i) {
                ctx.nodes.positions[i] -= shift;
            }
        }
    }
}
