//! Force-directed graph layout core, generic over 2-D and 3-D vectors.
//!
//! Main components:
//! - [`vector`] - the [`vector::Vector`] trait over `glam` double vectors.
//! - [`tree`] - Barnes-Hut spatial tree with pluggable aggregates.
//! - [`forces`] - many-body, link, collide, center, position and radial forces.
//! - [`simulation`] - the driver: node IDs, cooling and stepping.
//! - [`phases`] - the phases of one step.
//! - [`node_state`] - dense per-node positions, velocities and pins.
//! - [`jitter`] - deterministic generator for breaking coincidences.
//! - [`config`] - cooling schedule and seed.
//! - [`error`] - setup errors.
//! - [`types`] - shared index aliases.

pub mod config;
pub mod error;
pub mod forces;
pub mod jitter;
pub mod node_state;
pub mod phases;
pub mod simulation;
pub mod tree;
pub mod types;
pub mod vector;

pub use config::SimulationConfig;
pub use error::{SimResult, SimulationError};
pub use simulation::{ForceHandle, NodeSnapshot, Simulation};
pub use vector::Vector;
