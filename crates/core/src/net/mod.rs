mod link;
mod protocol;

pub use link::{LinkConditions, LinkStats, LoopbackLink};
pub use protocol::{Channel, ClientMessage, MAX_PACKET_SIZE, PacketError, ServerMessage};
