use crate::{
    error::{SimResult, SimulationError},
    jitter::DEFAULT_SEED,
};
use serde::{Deserialize, Serialize};

/// Cooling schedule, friction and jitter seed of a simulation.
///
/// Every field has a default, so a partial JSON document deserializes to
/// the defaults for the missing keys.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Initial temperature.
    pub alpha: f64,
    /// Below this temperature the simulation reports itself converged.
    pub alpha_min: f64,
    /// Fraction of the distance to `alpha_target` covered each step.
    pub alpha_decay: f64,
    /// Temperature the schedule converges to.
    pub alpha_target: f64,
    /// Fraction of velocity removed each step.
    pub velocity_decay: f64,
    /// Jitter generator seed.
    pub seed: u32,
}

impl SimulationConfig {
    /// The decay that takes alpha from 1 to `alpha_min` in `steps` steps
    /// when `alpha_target` is zero.
    pub fn decay_for(alpha_min: f64, steps: u32) -> f64 {
        1.0 - alpha_min.powf(1.0 / f64::from(steps))
    }

    /// Checks that every field is finite and within range.
    pub fn validate(&self) -> SimResult<()> {
        let checks = [
            ("alpha", self.alpha, self.alpha >= 0.0),
            ("alpha_min", self.alpha_min, self.alpha_min >= 0.0),
            ("alpha_target", self.alpha_target, self.alpha_target >= 0.0),
            (
                "alpha_decay",
                self.alpha_decay,
                (0.0..=1.0).contains(&self.alpha_decay),
            ),
            (
                "velocity_decay",
                self.velocity_decay,
                (0.0..=1.0).contains(&self.velocity_decay),
            ),
        ];
        for (name, value, in_range) in checks {
            if !value.is_finite() || !in_range {
                return Err(SimulationError::InvalidConfig(format!(
                    "{name} = {value} is out of range"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            alpha: 1.0,
            alpha_min,
            alpha_decay: Self::decay_for(alpha_min, 300),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            seed: DEFAULT_SEED,
        }
    }
}
