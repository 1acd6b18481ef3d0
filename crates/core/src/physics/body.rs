use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;

use super::PhysicsWorld;

/// The physics collaborator as seen by movement prediction.
pub trait PredictedBody {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    /// Drops forces accumulated but not yet integrated.
    fn clear_pending_forces(&mut self);
    fn is_grounded(&self, probe_distance: f32) -> bool;
    /// Integrates one tick.
    fn simulate(&mut self, dt: f32);
}

/// A body living in a world of its own, as on an owning client where the
/// local actor is the only thing predicted against static geometry.
pub struct PhysicsActor {
    world: PhysicsWorld,
    handle: RigidBodyHandle,
}

impl PhysicsActor {
    pub fn new(mut world: PhysicsWorld, position: Vec3, radius: f32, height: f32) -> Self {
        let handle = world.add_actor(position, radius, height);
        Self { world, handle }
    }
}

impl PredictedBody for PhysicsActor {
    fn position(&self) -> Vec3 {
        self.world.body_position(self.handle).unwrap_or(Vec3::ZERO)
    }

    fn set_position(&mut self, position: Vec3) {
        self.world.set_body_position(self.handle, position);
    }

    fn velocity(&self) -> Vec3 {
        self.world.body_velocity(self.handle).unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.world.set_body_velocity(self.handle, velocity);
    }

    fn clear_pending_forces(&mut self) {
        self.world.clear_body_forces(self.handle);
    }

    fn is_grounded(&self, probe_distance: f32) -> bool {
        self.world.is_grounded(self.handle, probe_distance)
    }

    fn simulate(&mut self, dt: f32) {
        if (dt - self.world.dt()).abs() > f32::EPSILON {
            log::debug!(
                "simulating with dt {} but world timestep is {}",
                dt,
                self.world.dt()
            );
        }
        self.world.step();
    }
}

/// A body borrowed out of a shared world, as on the authority where every
/// actor lives in one world. `simulate` steps the entire world, so callers
/// driving many actors apply movement to all of them and step once.
pub struct BodyMut<'w> {
    world: &'w mut PhysicsWorld,
    handle: RigidBodyHandle,
}

impl<'w> BodyMut<'w> {
    pub fn new(world: &'w mut PhysicsWorld, handle: RigidBodyHandle) -> Self {
        Self { world, handle }
    }
}

impl PredictedBody for BodyMut<'_> {
    fn position(&self) -> Vec3 {
        self.world.body_position(self.handle).unwrap_or(Vec3::ZERO)
    }

    fn set_position(&mut self, position: Vec3) {
        self.world.set_body_position(self.handle, position);
    }

    fn velocity(&self) -> Vec3 {
        self.world.body_velocity(self.handle).unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.world.set_body_velocity(self.handle, velocity);
    }

    fn clear_pending_forces(&mut self) {
        self.world.clear_body_forces(self.handle);
    }

    fn is_grounded(&self, probe_distance: f32) -> bool {
        self.world.is_grounded(self.handle, probe_distance)
    }

    fn simulate(&mut self, _dt: f32) {
        self.world.step();
    }
}

/// Closed-form integrator over a flat floor. Fully deterministic, so it is
/// what replay tests and lightweight simulations run against.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pending_force: Vec3,
    floor: Option<f32>,
    standing_height: f32,
}

impl KinematicBody {
    pub const DEFAULT_STANDING_HEIGHT: f32 = 0.9;

    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            pending_force: Vec3::ZERO,
            floor: None,
            standing_height: Self::DEFAULT_STANDING_HEIGHT,
        }
    }

    /// Adds a floor plane at `floor_y`; the body's centre rests
    /// `standing_height` above it.
    pub fn with_floor(mut self, floor_y: f32) -> Self {
        self.floor = Some(floor_y);
        self
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.pending_force += force;
    }

    pub fn pending_force(&self) -> Vec3 {
        self.pending_force
    }
}

impl PredictedBody for KinematicBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn clear_pending_forces(&mut self) {
        self.pending_force = Vec3::ZERO;
    }

    fn is_grounded(&self, probe_distance: f32) -> bool {
        self.floor
            .is_some_and(|floor| self.position.y - floor <= probe_distance)
    }

    fn simulate(&mut self, dt: f32) {
        self.velocity += self.pending_force * dt;
        self.pending_force = Vec3::ZERO;
        self.position += self.velocity * dt;

        if let Some(floor) = self.floor {
            let rest = floor + self.standing_height;
            if self.position.y < rest {
                self.position.y = rest;
                if self.velocity.y < 0.0 {
                    self.velocity.y = 0.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinematic_body_rests_on_floor() {
        let mut body = KinematicBody::new(Vec3::new(0.0, 3.0, 0.0)).with_floor(0.0);
        assert!(!body.is_grounded(1.1));

        body.set_velocity(Vec3::new(0.0, -10.0, 0.0));
        for _ in 0..60 {
            body.simulate(1.0 / 60.0);
        }

        assert!((body.position.y - KinematicBody::DEFAULT_STANDING_HEIGHT).abs() < 1e-5);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.is_grounded(1.1));
    }

    #[test]
    fn pending_force_is_cleared() {
        let mut body = KinematicBody::new(Vec3::ZERO);
        body.add_force(Vec3::new(6.0, 0.0, 0.0));
        body.clear_pending_forces();
        body.simulate(0.5);

        assert_eq!(body.position, Vec3::ZERO);
        assert_eq!(body.pending_force(), Vec3::ZERO);
    }

    #[test]
    fn physics_actor_moves_with_velocity() {
        let mut actor = PhysicsActor::new(PhysicsWorld::new(), Vec3::new(0.0, 5.0, 0.0), 0.4, 1.8);
        actor.set_velocity(Vec3::new(6.0, 0.0, 0.0));
        actor.simulate(1.0 / 60.0);

        assert!(actor.position().x > 0.0);
        assert!((actor.position().y - 5.0).abs() < 0.01);
    }
}
