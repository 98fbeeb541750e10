/// Dense index of a node in a [`crate::simulation::Simulation`].
///
/// Assigned once at construction in `0..n`, in the order the external
/// node IDs were given, and never reused.
pub type NodeIndex = usize;

/// Index of a cell in a [`crate::tree::Tree`] arena.
///
/// Only meaningful for the tree (and the build) that produced it.
pub type CellId = usize;
