use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::collision::{ActorId, CollisionResult};
use crate::input::InputSample;
use crate::prediction::ConfirmedState;
use crate::tick::Tick;

pub const MAX_PACKET_SIZE: usize = 1200;

/// Delivery class a message expects from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// May be dropped; at most one per tick per actor.
    Unreliable,
    /// Fire-and-forget but retransmitted by the transport.
    Reliable,
    /// Reliable, and the transport keeps the last value per key so observers
    /// joining later still receive it.
    ReliableBuffered,
}

impl Channel {
    pub fn is_reliable(&self) -> bool {
        !matches!(self, Self::Unreliable)
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientMessage {
    Input {
        actor: ActorId,
        sample: InputSample,
    },
    VelocityReport {
        actor: ActorId,
        velocity: [f32; 3],
    },
    CollisionReport {
        reporter: ActorId,
        other: ActorId,
    },
    ToggleRequest {
        actor: ActorId,
        disabled: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerMessage {
    ConfirmedState {
        actor: ActorId,
        tick: Tick,
        position: [f32; 3],
        velocity: [f32; 3],
    },
    CollisionVerdict {
        winner: ActorId,
        loser: ActorId,
    },
    ToggleBroadcast {
        actor: ActorId,
        disabled: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("packet too large: {0} bytes")]
    TooLarge(usize),
}

impl ClientMessage {
    pub fn velocity_report(actor: ActorId, velocity: Vec3) -> Self {
        Self::VelocityReport {
            actor,
            velocity: velocity.to_array(),
        }
    }

    /// The actor this message claims to speak for.
    pub fn actor(&self) -> ActorId {
        match self {
            Self::Input { actor, .. }
            | Self::VelocityReport { actor, .. }
            | Self::ToggleRequest { actor, .. } => *actor,
            Self::CollisionReport { reporter, .. } => *reporter,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::Input { .. } => Channel::Unreliable,
            Self::VelocityReport { .. } | Self::CollisionReport { .. } => Channel::Reliable,
            Self::ToggleRequest { .. } => Channel::Reliable,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)?;
        check_size(bytes)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)
    }
}

impl ServerMessage {
    pub fn confirmed(actor: ActorId, state: &ConfirmedState) -> Self {
        Self::ConfirmedState {
            actor,
            tick: state.tick,
            position: state.position.to_array(),
            velocity: state.velocity.to_array(),
        }
    }

    pub fn verdict(result: CollisionResult) -> Self {
        Self::CollisionVerdict {
            winner: result.winner,
            loser: result.loser,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::ConfirmedState { .. } => Channel::Unreliable,
            Self::CollisionVerdict { .. } => Channel::Reliable,
            Self::ToggleBroadcast { .. } => Channel::ReliableBuffered,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)?;
        check_size(bytes)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)
    }
}

fn check_size(bytes: Vec<u8>) -> Result<Vec<u8>, PacketError> {
    if bytes.len() > MAX_PACKET_SIZE {
        return Err(PacketError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}
