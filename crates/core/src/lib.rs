pub mod collision;
pub mod history;
pub mod input;
pub mod net;
pub mod physics;
pub mod prediction;
pub mod tick;

pub use collision::{
    ActorId, ArbiterConfig, CollisionArbiter, CollisionEndpoint, CollisionKey, CollisionOutcome,
    CollisionResult, ContactSensor, EndpointConfig, ToggleBroadcast, Verdict, VerdictSink,
    VisibilityView,
};
pub use history::{HISTORY_CAPACITY, TickHistory};
pub use input::{InputButtons, InputError, InputSample};
pub use net::{Channel, ClientMessage, LinkConditions, LoopbackLink, PacketError, ServerMessage};
pub use physics::{Arena, KinematicBody, PhysicsActor, PhysicsWorld, PredictedBody};
pub use prediction::{
    AuthoritativeMover, ConfirmedState, MovementConfig, MovementModel, PredictedActor,
    ReconcileConfig,
};
pub use tick::{DEFAULT_TICK_RATE, FixedTimestep, ManualClock, Tick, TickClock};
