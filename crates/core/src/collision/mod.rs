mod arbiter;
mod endpoint;
mod key;
mod retry;
mod sensor;
mod visibility;

pub use arbiter::{ArbiterConfig, ArbiterStats, CollisionArbiter, CollisionOutcome, VerdictSink};
pub use endpoint::{CollisionEndpoint, EndpointConfig, Verdict};
pub use key::{ActorId, CollisionKey, CollisionResult, resolve};
pub use retry::{RetryQueue, ScheduledRetry};
pub use sensor::ContactSensor;
pub use visibility::{ToggleBroadcast, VisibilityView};

/// Serde helper storing a `Duration` as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
