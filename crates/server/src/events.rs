use clash::collision::ActorId;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientJoined {
        actor: ActorId,
    },
    ClientLeft {
        actor: ActorId,
    },
    CollisionResolved {
        winner: ActorId,
        loser: ActorId,
    },
    CollisionAbandoned {
        first: ActorId,
        second: ActorId,
    },
    VisibilityChanged {
        actor: ActorId,
        disabled: bool,
    },
    InputRejected {
        actor: ActorId,
        reason: String,
    },
    /// A client sent a message on behalf of an actor it does not own.
    Impersonation {
        sender: ActorId,
        claimed: ActorId,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn log(&self) {
        match self {
            ServerEvent::ClientJoined { actor } => log::info!("Actor {} joined", actor),
            ServerEvent::ClientLeft { actor } => log::info!("Actor {} left", actor),
            ServerEvent::CollisionResolved { winner, loser } => {
                log::info!("Collision resolved: {} beats {}", winner, loser)
            }
            ServerEvent::CollisionAbandoned { first, second } => {
                log::debug!("Collision {}-{} abandoned", first, second)
            }
            ServerEvent::VisibilityChanged { actor, disabled } => {
                log::info!(
                    "Actor {} {}",
                    actor,
                    if *disabled { "hidden" } else { "visible" }
                )
            }
            ServerEvent::InputRejected { actor, reason } => {
                log::warn!("Rejected input from actor {}: {}", actor, reason)
            }
            ServerEvent::Impersonation { sender, claimed } => {
                log::warn!("Actor {} sent a message for actor {}", sender, claimed)
            }
            ServerEvent::Error { message } => log::error!("{}", message),
        }
    }
}
