use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::input::{InputSample, MAX_AXIS};
use crate::physics::PredictedBody;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    /// Upward velocity change applied by a grounded jump (unit mass).
    pub jump_impulse: f32,
    pub gravity: Vec3,
    pub ground_probe_distance: f32,
    /// Largest accepted axis magnitude; anything above is rejected by the authority.
    pub max_axis: i16,
    pub actor_radius: f32,
    pub actor_height: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            sprint_multiplier: 2.0,
            jump_impulse: 7.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            ground_probe_distance: 1.1,
            max_axis: MAX_AXIS,
            actor_radius: 0.4,
            actor_height: 1.8,
        }
    }
}

/// One movement step. Horizontal velocity comes straight from the input axes;
/// vertical velocity carries over and only changes through the jump impulse
/// and gravity. `grounded` is only consulted when the sample asks to jump.
pub fn advance(
    velocity: Vec3,
    input: &InputSample,
    config: &MovementConfig,
    dt: f32,
    grounded: impl FnOnce() -> bool,
) -> Vec3 {
    let speed = if input.sprint() {
        config.move_speed * config.sprint_multiplier
    } else {
        config.move_speed
    };

    let horizontal = input.direction() * speed;
    let mut next = Vec3::new(horizontal.x, velocity.y, horizontal.z);

    if input.jump() && grounded() {
        next.y += config.jump_impulse;
    }

    next + config.gravity * dt
}

#[derive(Debug, Clone, Default)]
pub struct MovementModel {
    config: MovementConfig,
}

impl MovementModel {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Runs [`advance`] against the body's current velocity and writes the
    /// result back. Does not integrate; see [`MovementModel::step`].
    pub fn apply<B: PredictedBody>(&self, body: &mut B, input: &InputSample, dt: f32) {
        let probe = self.config.ground_probe_distance;
        let velocity = {
            let body = &*body;
            advance(body.velocity(), input, &self.config, dt, || {
                body.is_grounded(probe)
            })
        };
        body.set_velocity(velocity);
    }

    pub fn step<B: PredictedBody>(&self, body: &mut B, input: &InputSample, dt: f32) {
        self.apply(body, input, dt);
        body.simulate(dt);
    }
}
