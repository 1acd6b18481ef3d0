mod arena;
mod body;
mod world;

pub use arena::{Arena, ArenaObject, ArenaObjectKind};
pub use body::{BodyMut, KinematicBody, PhysicsActor, PredictedBody};
pub use world::PhysicsWorld;
