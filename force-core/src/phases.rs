//! Phases of one simulation step.
//!
//! [`crate::simulation::Simulation::step`] runs them in this order:
//! 1. [`cooling_phase`] - alpha moves toward `alpha_target`.
//! 2. [`force_phase`] - every attached force reads positions and writes
//!    velocity (or position) deltas through a scoped view.
//! 3. [`integration_phase`] - friction is applied and velocities are
//!    integrated into positions; pinned nodes are held in place.
//!
//! Only these phases write node state, and only one of them runs at a
//! time.

use crate::{
    config::SimulationConfig,
    forces::{Force, ForceContext},
    jitter::Lcg,
    node_state::NodeStates,
    vector::Vector,
};
use tracing::trace;

/// Advances the cooling schedule by one step.
///
/// `alpha += (alpha_target - alpha) * alpha_decay`
///
/// ### Parameters
/// - `alpha` - Temperature before the step.
/// - `cfg` - Provides `alpha_target` and `alpha_decay`.
///
/// ### Returns
/// The temperature for this step.
pub fn cooling_phase(alpha: f64, cfg: &SimulationConfig) -> f64 {
    alpha + (cfg.alpha_target - alpha) * cfg.alpha_decay
}

/// Applies every force once, in registration order.
///
/// Each force gets its own [`ForceContext`] borrowing the node state for
/// the duration of its `apply` call, so later forces see the deltas
/// written by earlier ones.
///
/// ### Parameters
/// - `states` - Node state; positions and velocities may be written.
/// - `forces` - Attached forces in registration order.
/// - `alpha` - Temperature returned by [`cooling_phase`].
/// - `jitter` - The simulation's deterministic generator.
pub fn force_phase<V: Vector>(
    states: &mut NodeStates<V>,
    forces: &mut [Box<dyn Force<V>>],
    alpha: f64,
    jitter: &mut Lcg,
) {
    for force in forces.iter_mut() {
        trace!(force = force.name(), alpha, "applying force");
        let mut ctx = ForceContext {
            nodes: states.view_mut(),
            alpha,
            jitter: &mut *jitter,
        };
        force.apply(&mut ctx);
    }
}

/// Applies friction and integrates velocities into positions.
///
/// For every node:
///
/// 1. If pinned, the position is reset to the pinned position and the
///    velocity to zero.
/// 2. Otherwise `velocity *= 1 - velocity_decay` and
///    `position += velocity`.
///
/// ### Parameters
/// - `states` - Node state to integrate.
/// - `velocity_decay` - Fraction of velocity removed, in `[0, 1]`.
pub fn integration_phase<V: Vector>(states: &mut NodeStates<V>, velocity_decay: f64) {
    let keep = 1.0 - velocity_decay;
    let (positions, velocities, fixed) = states.split_mut();
    for ((p, v), pin) in positions.iter_mut().zip(velocities.iter_mut()).zip(fixed) {
        match pin {
            Some(at) => {
                *p = *at;
                *v = V::ZERO;
            }
            None => {
                *v *= keep;
                *p += *v;
            }
        }
    }
}
