use glam::Vec3;

use super::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaObjectKind {
    Ground,
    StaticBox,
}

#[derive(Debug, Clone)]
pub struct ArenaObject {
    pub kind: ArenaObjectKind,
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl ArenaObject {
    pub fn ground(y: f32, half_size: f32) -> Self {
        Self {
            kind: ArenaObjectKind::Ground,
            position: Vec3::new(0.0, y, 0.0),
            half_extents: Vec3::new(half_size, 0.1, half_size),
        }
    }

    pub fn static_box(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            kind: ArenaObjectKind::StaticBox,
            position,
            half_extents,
        }
    }
}

/// Static geometry shared by the authority and every owning client. Both ends
/// must spawn the same arena or ground probes disagree during replay.
pub struct Arena {
    objects: Vec<ArenaObject>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub const GROUND_Y: f32 = 0.0;
    const HALF_SIZE: f32 = 40.0;
    const WALL_HEIGHT: f32 = 1.5;

    pub fn new() -> Self {
        let mut objects = vec![ArenaObject::ground(Self::GROUND_Y, Self::HALF_SIZE)];
        Self::add_walls(&mut objects);
        Self::add_pillars(&mut objects);
        Self { objects }
    }

    fn add_walls(objects: &mut Vec<ArenaObject>) {
        let h = Self::HALF_SIZE;
        let y = Self::WALL_HEIGHT * 0.5;
        let thickness = 0.5;

        objects.push(ArenaObject::static_box(
            Vec3::new(0.0, y, h),
            Vec3::new(h, y, thickness),
        ));
        objects.push(ArenaObject::static_box(
            Vec3::new(0.0, y, -h),
            Vec3::new(h, y, thickness),
        ));
        objects.push(ArenaObject::static_box(
            Vec3::new(h, y, 0.0),
            Vec3::new(thickness, y, h),
        ));
        objects.push(ArenaObject::static_box(
            Vec3::new(-h, y, 0.0),
            Vec3::new(thickness, y, h),
        ));
    }

    fn add_pillars(objects: &mut Vec<ArenaObject>) {
        for (x, z) in [(10.0, 10.0), (-10.0, 10.0), (10.0, -10.0), (-10.0, -10.0)] {
            objects.push(ArenaObject::static_box(
                Vec3::new(x, 1.0, z),
                Vec3::new(1.0, 1.0, 1.0),
            ));
        }
    }

    pub fn objects(&self) -> &[ArenaObject] {
        &self.objects
    }

    pub fn spawn(&self, physics: &mut PhysicsWorld) {
        for object in &self.objects {
            match object.kind {
                ArenaObjectKind::Ground => {
                    physics.add_ground(object.position.y, object.half_extents.x);
                }
                ArenaObjectKind::StaticBox => {
                    physics.add_static_box(object.position, object.half_extents);
                }
            }
        }
    }
}
