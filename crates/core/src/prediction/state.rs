use glam::Vec3;

use crate::physics::PredictedBody;
use crate::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl MotionState {
    pub fn of<B: PredictedBody>(body: &B) -> Self {
        Self {
            position: body.position(),
            velocity: body.velocity(),
        }
    }
}

/// Authoritative result of one tick for one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedState {
    pub tick: Tick,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl ConfirmedState {
    pub fn new(tick: Tick, position: Vec3, velocity: Vec3) -> Self {
        Self {
            tick,
            position,
            velocity,
        }
    }

    pub fn capture<B: PredictedBody>(tick: Tick, body: &B) -> Self {
        Self::new(tick, body.position(), body.velocity())
    }
}
