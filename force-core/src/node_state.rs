use crate::{types::NodeIndex, vector::Vector};

/// Dense per-node state of a simulation.
///
/// For each dense index `i` this stores:
///
/// - `positions[i]` - the current position.
/// - `velocities[i]` - the current velocity.
/// - `fixed[i]` - an optional pinned position; pinned nodes are held in
///   place by integration and ignored by positional corrections.
///
/// The three arrays always have the same length, fixed at construction.
#[derive(Debug, Clone)]
pub struct NodeStates<V> {
    positions: Vec<V>,
    velocities: Vec<V>,
    fixed: Vec<Option<V>>,
}

/// Mutable view of node state granted to one force for the duration of
/// its `apply` call.
///
/// Forces may write positions and velocities but cannot pin or unpin
/// nodes, and the view cannot outlive the call.
#[derive(Debug)]
pub struct NodesMut<'a, V> {
    pub positions: &'a mut [V],
    pub velocities: &'a mut [V],
    pub fixed: &'a [Option<V>],
}

impl<V: Vector> NodeStates<V> {
    /// Creates node state at the given positions with zero velocity and
    /// no pinned nodes.
    ///
    /// ### Parameters
    /// - `positions` - Initial position of each node, by dense index.
    ///
    /// ### Returns
    /// A new [`NodeStates`] of length `positions.len()`.
    pub fn from_positions(positions: Vec<V>) -> Self {
        let len = positions.len();
        Self {
            positions,
            velocities: vec![V::ZERO; len],
            fixed: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[V] {
        &self.positions
    }

    pub fn velocities(&self) -> &[V] {
        &self.velocities
    }

    pub fn fixed(&self) -> &[Option<V>] {
        &self.fixed
    }

    /// ### Panics
    /// Panics if `i` is out of bounds.
    #[inline]
    pub fn position(&self, i: NodeIndex) -> V {
        self.positions[i]
    }

    /// ### Panics
    /// Panics if `i` is out of bounds.
    #[inline]
    pub fn velocity(&self, i: NodeIndex) -> V {
        self.velocities[i]
    }

    /// Moves a node. A pinned node is unpinned first so that the new
    /// position is not overwritten by the next integration.
    pub fn set_position(&mut self, i: NodeIndex, position: V) {
        self.positions[i] = position;
        self.fixed[i] = None;
    }

    pub fn set_velocity(&mut self, i: NodeIndex, velocity: V) {
        self.velocities[i] = velocity;
    }

    /// Pins (`Some`) or unpins (`None`) a node.
    ///
    /// Pinning moves the node to the pinned position right away and
    /// clears its velocity; unpinning leaves it where it is.
    pub fn set_fixed(&mut self, i: NodeIndex, fixed: Option<V>) {
        if let Some(p) = fixed {
            self.positions[i] = p;
            self.velocities[i] = V::ZERO;
        }
        self.fixed[i] = fixed;
    }

    /// Borrows the state for one force application.
    pub fn view_mut(&mut self) -> NodesMut<'_, V> {
        NodesMut {
            positions: &mut self.positions,
            velocities: &mut self.velocities,
            fixed: &self.fixed,
        }
    }

    /// Borrows positions and velocities for integration alongside the
    /// read-only pin table.
    pub(crate) fn split_mut(&mut self) -> (&mut [V], &mut [V], &[Option<V>]) {
        (&mut self.positions, &mut self.velocities, &self.fixed)
    }
}

impl<V: Vector> NodesMut<'_, V> {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn is_fixed(&self, i: NodeIndex) -> bool {
        self.fixed[i].is_some()
    }

    /// Position after the pending velocity is applied.
    #[inline]
    pub fn predicted(&self, i: NodeIndex) -> V {
        self.positions[i] + self.velocities[i]
    }
}
