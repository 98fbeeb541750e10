use super::{Force, ForceContext, NodeParam};
use crate::{
    error::{SimResult, finite, non_negative},
    vector::Vector,
};

/// Distance below which a node counts as sitting on the center.
const MIN_DISTANCE: f64 = 1e-6;

/// Pulls every node toward a circle (sphere in 3-D) of a given radius.
///
/// With `offset = position - center` and `r = |offset|`:
///
/// `velocity += offset * (radius - r) * strength * alpha / r`
///
/// `r` is floored at a tiny positive value, so a node exactly on the
/// center has a zero offset and is left alone instead of producing NaN.
#[derive(Debug)]
pub struct Radial<V> {
    center: V,
    radius: NodeParam,
    strength: NodeParam,
    node_count: usize,
}

impl<V: Vector> Radial<V> {
    /// Circle of `radius` around the origin with strength 0.1.
    pub fn new(radius: impl Into<NodeParam>) -> Self {
        Self {
            center: V::ZERO,
            radius: radius.into(),
            strength: NodeParam::Constant(0.1),
            node_count: 0,
        }
    }

    pub fn with_center(mut self, center: V) -> Self {
        self.center = center;
        self
    }

    pub fn with_strength(mut self, strength: impl Into<NodeParam>) -> Self {
        self.strength = strength.into();
        self
    }

    pub fn center(&self) -> V {
        self.center
    }

    pub fn set_center(&mut self, center: V) -> SimResult<()> {
        check_center(center)?;
        self.center = center;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: impl Into<NodeParam>) -> SimResult<()> {
        let radius = radius.into();
        radius.validate("radius", self.node_count, non_negative)?;
        self.radius = radius;
        Ok(())
    }

    pub fn set_strength(&mut self, strength: impl Into<NodeParam>) -> SimResult<()> {
        let strength = strength.into();
        strength.validate("strength", self.node_count, non_negative)?;
        self.strength = strength;
        Ok(())
    }
}

fn check_center<V: Vector>(center: V) -> SimResult<()> {
    (0..V::DIM).try_for_each(|axis| finite("center", center[axis]).map(|_| ()))
}

impl<V: Vector> Force<V> for Radial<V> {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn initialize(&mut self, node_count: usize) -> SimResult<()> {
        check_center(self.center)?;
        self.radius.validate("radius", node_count, non_negative)?;
        self.strength.validate("strength", node_count, non_negative)?;
        self.node_count = node_count;
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_, V>) {
        for i in 0..ctx.nodes.len() {
            let offset = ctx.nodes.positions[i] - self.center;
            let r = offset.length().max(MIN_DISTANCE);
            let k = (self.radius.get(i) - r) * self.strength.get(i) * ctx.alpha / r;
            ctx.nodes.velocities[i] += offset * k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jitter::Lcg, node_state::NodeStates};
    use glam::{DVec2, DVec3};

    fn apply_once<V: Vector>(force: &mut Radial<V>, states: &mut NodeStates<V>) {
        let mut jitter = Lcg::default();
        force.initialize(states.len()).unwrap();
        let mut ctx = ForceContext {
            nodes: states.view_mut(),
            alpha: 1.0,
            jitter: &mut jitter,
        };
        force.apply(&mut ctx);
    }

    #[test]
    fn inside_nodes_move_out_and_outside_nodes_move_in() {
        let mut states =
            NodeStates::from_positions(vec![DVec2::new(5.0, 0.0), DVec2::new(0.0, 20.0)]);
        let mut force = Radial::new(10.0).with_strength(1.0);
        apply_once(&mut force, &mut states);

        assert_eq!(states.velocity(0), DVec2::new(5.0, 0.0));
        assert_eq!(states.velocity(1), DVec2::new(0.0, -10.0));
    }

    #[test]
    fn offset_center_in_3d() {
        let center = DVec3::new(1.0, 1.0, 1.0);
        let mut states = NodeStates::from_positions(vec![DVec3::new(1.0, 1.0, 3.0)]);
        let mut force = Radial::new(4.0).with_center(center).with_strength(0.5);
        apply_once(&mut force, &mut states);
        assert_eq!(states.velocity(0), DVec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn node_on_center_stays_finite() {
        let mut states = NodeStates::from_positions(vec![DVec2::ZERO]);
        apply_once(&mut Radial::new(10.0), &mut states);
        assert_eq!(states.velocity(0), DVec2::ZERO);
    }

    #[test]
    fn parameters_are_validated() {
        assert!(Radial::<DVec2>::new(-1.0).initialize(1).is_err());
        assert!(
            Radial::<DVec2>::new(1.0)
                .with_strength(NodeParam::per_node(|_| f64::NAN))
                .initialize(1)
                .is_err()
        );
        let mut force = Radial::<DVec2>::new(1.0);
        assert!(force.set_center(DVec2::new(0.0, f64::INFINITY)).is_err());
        assert!(force.set_center(DVec2::new(3.0, 4.0)).is_ok());
        assert_eq!(force.center(), DVec2::new(3.0, 4.0));
    }

    #[test]
    fn per_node_setters_check_every_attached_node() {
        let mut force = Radial::<DVec2>::new(3.0);
        force.initialize(2).unwrap();

        assert!(force.set_strength(NodeParam::per_node(|_| -5.0)).is_err());
        assert!(force.set_strength(NodeParam::per_node(|_| f64::NAN)).is_err());
        assert!(force.set_radius(NodeParam::per_node(|i| 1.0 - i as f64 * 2.0)).is_err());
        assert!(force.set_radius(NodeParam::per_node(|i| i as f64)).is_ok());
    }
}
