//! The simulation driver.
//!
//! A [`Simulation`] owns the dense node state, the attached forces, the
//! cooling schedule and the jitter generator. Callers construct it from a
//! list of external node IDs, attach forces, then call [`Simulation::step`]
//! (or [`Simulation::tick`]) and read the result with
//! [`Simulation::snapshot`]. Nothing runs in the background.

use crate::{
    config::SimulationConfig,
    error::{SimResult, SimulationError, finite, non_negative},
    forces::{Force, Link, LinkForce},
    jitter::Lcg,
    node_state::NodeStates,
    phases::{cooling_phase, force_phase, integration_phase},
    tree::{RadiusAggregate, Tree},
    types::NodeIndex,
    vector::Vector,
};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Typed reference to a force attached to a [`Simulation`].
///
/// Used with [`Simulation::force`] and [`Simulation::force_mut`] to read
/// or change the force's parameters after attachment.
pub struct ForceHandle<F> {
    index: usize,
    _marker: PhantomData<fn() -> F>,
}

impl<F> ForceHandle<F> {
    /// Position of the force in registration order.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<F> Clone for ForceHandle<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for ForceHandle<F> {}

impl<F> Debug for ForceHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceHandle")
            .field("index", &self.index)
            .finish()
    }
}

/// State of one node as seen from outside the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot<Id, V> {
    pub id: Id,
    pub position: V,
    pub velocity: V,
}

/// A force-directed layout over nodes identified by `Id`, in the space
/// of `V`.
pub struct Simulation<Id, V: Vector> {
    ids: Vec<Id>,
    index: HashMap<Id, NodeIndex>,
    states: NodeStates<V>,
    forces: Vec<Box<dyn Force<V>>>,
    config: SimulationConfig,
    alpha: f64,
    jitter: Lcg,
    converged: bool,
}

impl<Id, V> Simulation<Id, V>
where
    Id: Eq + Hash + Clone + Debug,
    V: Vector,
{
    /// Creates a simulation with nodes placed on the default spiral
    /// ([`Vector::spiral`]).
    ///
    /// ### Parameters
    /// - `ids` - External node IDs; their order fixes the dense indices.
    /// - `config` - Cooling schedule, friction and jitter seed.
    ///
    /// ### Returns
    /// The new simulation, or an error if an ID repeats or `config` is
    /// out of range.
    pub fn new(ids: impl IntoIterator<Item = Id>, config: SimulationConfig) -> SimResult<Self> {
        Self::with_positions(ids, |_, i| V::spiral(i), config)
    }

    /// Creates a simulation with caller-chosen initial positions.
    ///
    /// ### Parameters
    /// - `ids` - External node IDs; their order fixes the dense indices.
    /// - `initial_position` - Called once per node with its ID and dense
    ///   index; must return a finite position.
    /// - `config` - Cooling schedule, friction and jitter seed.
    pub fn with_positions(
        ids: impl IntoIterator<Item = Id>,
        initial_position: impl Fn(&Id, NodeIndex) -> V,
        config: SimulationConfig,
    ) -> SimResult<Self> {
        config.validate()?;

        let ids: Vec<Id> = ids.into_iter().collect();
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(SimulationError::DuplicateNode(format!("{id:?}")));
            }
        }

        let mut positions = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let p = initial_position(id, i);
            for axis in 0..V::DIM {
                finite("initial position", p[axis])?;
            }
            positions.push(p);
        }

        debug!(
            nodes = ids.len(),
            dim = V::DIM,
            seed = config.seed,
            "simulation constructed"
        );

        Ok(Self {
            ids,
            index,
            states: NodeStates::from_positions(positions),
            forces: Vec::new(),
            alpha: config.alpha,
            jitter: Lcg::new(config.seed),
            converged: config.alpha < config.alpha_min,
            config,
        })
    }

    /// Validates `force` against this simulation and appends it to the
    /// force list.
    ///
    /// ### Returns
    /// A handle for later access to the force, or the validation error;
    /// a rejected force is not attached.
    pub fn attach_force<F: Force<V>>(&mut self, mut force: F) -> SimResult<ForceHandle<F>> {
        force.initialize(self.len())?;
        let index = self.forces.len();
        debug!(force = force.name(), index, "force attached");
        self.forces.push(Box::new(force));
        Ok(ForceHandle {
            index,
            _marker: PhantomData,
        })
    }

    /// Builds a [`LinkForce`] from pairs of external IDs.
    ///
    /// Fails with [`SimulationError::UnknownNode`] on the first ID that is
    /// not part of the simulation.
    pub fn link_force(&self, edges: impl IntoIterator<Item = (Id, Id)>) -> SimResult<LinkForce> {
        let links = edges
            .into_iter()
            .map(|(source, target)| -> SimResult<Link> {
                Ok(Link::new(self.resolve(&source)?, self.resolve(&target)?))
            })
            .collect::<SimResult<Vec<_>>>()?;
        Ok(LinkForce::new(links))
    }

    pub fn force<F: Force<V>>(&self, handle: ForceHandle<F>) -> Option<&F> {
        let force: &dyn Force<V> = self.forces.get(handle.index)?.as_ref();
        force.as_any().downcast_ref()
    }

    pub fn force_mut<F: Force<V>>(&mut self, handle: ForceHandle<F>) -> Option<&mut F> {
        let force: &mut dyn Force<V> = self.forces.get_mut(handle.index)?.as_mut();
        force.as_any_mut().downcast_mut()
    }

    /// Advances the simulation by one step.
    ///
    /// 1. Cools alpha toward `alpha_target`.
    /// 2. Applies every force in registration order.
    /// 3. Applies friction and integrates positions.
    ///
    /// Stepping continues after convergence; [`Self::is_converged`] is
    /// informational only.
    pub fn step(&mut self) {
        self.alpha = cooling_phase(self.alpha, &self.config);
        trace!(alpha = self.alpha, "step");

        if !self.converged && self.is_converged() {
            self.converged = true;
            debug!(alpha = self.alpha, "simulation converged");
        }

        force_phase(&mut self.states, &mut self.forces, self.alpha, &mut self.jitter);
        integration_phase(&mut self.states, self.config.velocity_decay);
    }

    /// Runs `steps` steps.
    pub fn tick(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Every node's ID, position and velocity, in construction order.
    pub fn snapshot(&self) -> Vec<NodeSnapshot<Id, V>> {
        self.ids
            .iter()
            .zip(self.states.positions())
            .zip(self.states.velocities())
            .map(|((id, &position), &velocity)| NodeSnapshot {
                id: id.clone(),
                position,
                velocity,
            })
            .collect()
    }

    /// Pins the node at `position`, or unpins it with `None`.
    pub fn set_fixed(&mut self, id: &Id, position: Option<V>) -> SimResult<()> {
        let i = self.resolve(id)?;
        if let Some(p) = position {
            for axis in 0..V::DIM {
                finite("fixed position", p[axis])?;
            }
        }
        self.states.set_fixed(i, position);
        Ok(())
    }

    pub fn set_position(&mut self, id: &Id, position: V) -> SimResult<()> {
        let i = self.resolve(id)?;
        for axis in 0..V::DIM {
            finite("position", position[axis])?;
        }
        self.states.set_position(i, position);
        Ok(())
    }

    pub fn set_velocity(&mut self, id: &Id, velocity: V) -> SimResult<()> {
        let i = self.resolve(id)?;
        for axis in 0..V::DIM {
            finite("velocity", velocity[axis])?;
        }
        self.states.set_velocity(i, velocity);
        Ok(())
    }

    pub fn position(&self, id: &Id) -> Option<V> {
        self.index_of(id).map(|i| self.states.position(i))
    }

    pub fn velocity(&self, id: &Id) -> Option<V> {
        self.index_of(id).map(|i| self.states.velocity(i))
    }

    /// Dense index assigned to `id` at construction.
    pub fn index_of(&self, id: &Id) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// ID of the node closest to `position` within `radius`.
    pub fn find(&self, position: V, radius: f64) -> Option<&Id> {
        if self.is_empty() {
            return None;
        }
        let tree = Tree::<V, RadiusAggregate>::build(self.states.positions(), |_| 0.0);
        tree.find(position, radius).map(|i| &self.ids[i])
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn nodes(&self) -> &NodeStates<V> {
        &self.states
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Reheats (or cools) the simulation. Re-arms the converged signal
    /// when the new alpha is at or above `alpha_min`.
    pub fn set_alpha(&mut self, alpha: f64) -> SimResult<()> {
        self.alpha = non_negative("alpha", alpha)?;
        self.converged = self.is_converged();
        Ok(())
    }

    pub fn set_alpha_target(&mut self, alpha_target: f64) -> SimResult<()> {
        self.config.alpha_target = non_negative("alpha_target", alpha_target)?;
        Ok(())
    }

    /// `true` once alpha has dropped below `alpha_min`.
    pub fn is_converged(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    fn resolve(&self, id: &Id) -> SimResult<NodeIndex> {
        self.index_of(id)
            .ok_or_else(|| SimulationError::UnknownNode(format!("{id:?}")))
    }
}

impl<Id: Debug, V: Vector> Debug for Simulation<Id, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forces: Vec<&'static str> = self.forces.iter().map(|force| force.name()).collect();
        f.debug_struct("Simulation")
            .field("nodes", &self.ids.len())
            .field("forces", &forces)
            .field("alpha", &self.alpha)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{Center, Collide, ManyBody, NodeParam, Position, Radial};
    use glam::{DVec2, DVec3};

    fn sim(ids: &[&'static str]) -> Simulation<&'static str, DVec2> {
        Simulation::new(ids.iter().copied(), SimulationConfig::default()).unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Simulation::<_, DVec2>::new(["a", "b", "a"], SimulationConfig::default())
            .unwrap_err();
        assert_eq!(err, SimulationError::DuplicateNode("\"a\"".into()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = SimulationConfig::default();
        cfg.alpha_decay = 2.0;
        assert!(Simulation::<u32, DVec2>::new([1, 2], cfg).is_err());
    }

    #[test]
    fn default_placement_separates_nodes() {
        let s = sim(&["a", "b", "c"]);
        let snap = s.snapshot();
        assert_eq!(snap.len(), 3);
        for a in 0..3 {
            for b in a + 1..3 {
                assert!((snap[a].position - snap[b].position).length() > 1.0);
            }
        }
    }

    #[test]
    fn custom_initial_positions_and_order() {
        let s = Simulation::with_positions(
            [10_u32, 20, 30],
            |id, i| DVec3::new(f64::from(*id), i as f64, 0.0),
            SimulationConfig::default(),
        )
        .unwrap();

        let ids: Vec<u32> = s.snapshot().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(s.position(&20), Some(DVec3::new(20.0, 1.0, 0.0)));
        assert_eq!(s.index_of(&30), Some(2));
        assert_eq!(s.position(&99), None);
    }

    #[test]
    fn non_finite_initial_position_is_rejected() {
        let result = Simulation::with_positions(
            ["a"],
            |_, _| DVec2::new(f64::NAN, 0.0),
            SimulationConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn link_force_resolves_ids() {
        let s = sim(&["a", "b", "c"]);
        let links = s.link_force([("a", "c"), ("b", "a")]).unwrap();
        assert_eq!(links.links(), &[Link::new(0, 2), Link::new(1, 0)]);

        let err = s.link_force([("a", "zzz")]).unwrap_err();
        assert_eq!(err, SimulationError::UnknownNode("\"zzz\"".into()));
    }

    #[test]
    fn rejected_force_is_not_attached() {
        let mut s = sim(&["a", "b"]);
        assert!(s.attach_force(ManyBody::new().with_theta(-1.0)).is_err());
        let handle = s.attach_force(Center::default()).unwrap();
        assert_eq!(handle.index(), 0);
    }

    #[test]
    fn handles_give_typed_access() {
        let mut s = sim(&["a", "b"]);
        let many = s.attach_force(ManyBody::new()).unwrap();
        let collide = s.attach_force(Collide::new()).unwrap();

        s.force_mut(many).unwrap().set_strength(-80.0).unwrap();
        assert_eq!(s.force(many).unwrap().strength(), -80.0);
        assert_eq!(s.force(collide).unwrap().iterations(), 1);

        // A handle of the wrong type finds nothing.
        let wrong: ForceHandle<Center<DVec2>> = ForceHandle {
            index: many.index(),
            _marker: PhantomData,
        };
        assert!(s.force(wrong).is_none());
    }

    #[test]
    fn handle_setters_reject_bad_per_node_policies() {
        let mut s = sim(&["a", "b", "c"]);
        let x = s.attach_force(Position::x()).unwrap();
        let radial = s.attach_force(Radial::new(3.0)).unwrap();
        let collide = s.attach_force(Collide::new()).unwrap();

        let x_force = s.force_mut(x).unwrap();
        assert!(x_force.set_strength(NodeParam::per_node(|_| -5.0)).is_err());
        assert!(x_force.set_target(NodeParam::per_node(|_| f64::NAN)).is_err());

        let radial_force = s.force_mut(radial).unwrap();
        assert!(radial_force.set_strength(NodeParam::per_node(|_| f64::NAN)).is_err());
        assert!(radial_force.set_radius(NodeParam::per_node(|_| -1.0)).is_err());

        let collide_force = s.force_mut(collide).unwrap();
        assert!(collide_force.set_radius(NodeParam::per_node(|_| -4.0)).is_err());
        assert!(collide_force.set_radius(NodeParam::per_node(|i| i as f64 + 1.0)).is_ok());

        s.tick(20);
        assert!(s.snapshot().iter().all(|n| n.position.is_finite()));
    }

    #[test]
    fn alpha_cools_and_signals_convergence() {
        let mut s = sim(&["a"]);
        let mut previous = s.alpha();
        for _ in 0..299 {
            s.step();
            assert!(s.alpha() < previous);
            previous = s.alpha();
        }
        assert!(!s.is_converged());
        s.tick(2);
        assert!(s.is_converged());

        s.set_alpha(0.5).unwrap();
        assert!(!s.is_converged());
        assert!(s.set_alpha(-1.0).is_err());
    }

    #[test]
    fn pinned_node_stays_put() {
        let mut s = sim(&["a", "b"]);
        s.attach_force(ManyBody::new()).unwrap();
        s.set_fixed(&"a", Some(DVec2::new(3.0, 4.0))).unwrap();
        s.tick(10);
        assert_eq!(s.position(&"a"), Some(DVec2::new(3.0, 4.0)));
        assert_eq!(s.velocity(&"a"), Some(DVec2::ZERO));

        s.set_fixed(&"a", None).unwrap();
        s.step();
        assert_ne!(s.position(&"a"), Some(DVec2::new(3.0, 4.0)));

        assert!(s.set_fixed(&"nope", None).is_err());
    }

    #[test]
    fn find_returns_nearest_id() {
        let mut s = sim(&["a", "b", "c"]);
        s.set_position(&"a", DVec2::new(0.0, 0.0)).unwrap();
        s.set_position(&"b", DVec2::new(10.0, 0.0)).unwrap();
        s.set_position(&"c", DVec2::new(0.0, 10.0)).unwrap();

        assert_eq!(s.find(DVec2::new(9.0, 1.0), f64::INFINITY), Some(&"b"));
        assert_eq!(s.find(DVec2::new(5.0, 5.0), 2.0), None);
    }

    #[test]
    fn set_velocity_feeds_integration() {
        let mut s = sim(&["a"]);
        s.set_position(&"a", DVec2::ZERO).unwrap();
        s.set_velocity(&"a", DVec2::new(10.0, 0.0)).unwrap();
        s.step();
        // velocity_decay 0.4 leaves 6.
        assert_eq!(s.position(&"a"), Some(DVec2::new(6.0, 0.0)));
        assert!(s.set_velocity(&"a", DVec2::new(f64::NAN, 0.0)).is_err());
    }
}
