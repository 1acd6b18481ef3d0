mod authority;
mod controller;
mod engine;
mod state;

pub use authority::AuthoritativeMover;
pub use controller::{
    MAX_REPLAY_TICKS, PredictedActor, PredictionStats, ReconcileConfig, ReconcilePhase, ReplayReport,
};
pub use engine::{MovementConfig, MovementModel, advance};
pub use state::{ConfirmedState, MotionState};
