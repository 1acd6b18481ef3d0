use std::time::{Duration, Instant};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::net::ClientMessage;

use super::key::{ActorId, CollisionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// How long a losing actor stays hidden.
    #[serde(with = "super::millis")]
    pub cooldown: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Won,
    /// Hidden locally; the request must be sent to the authority.
    Lost(ClientMessage),
    NotInvolved,
    NotAttached,
}

/// Owner-side collision state for one actor: reports contacts, reacts to
/// verdicts and re-enables itself after the cooldown.
#[derive(Debug)]
pub struct CollisionEndpoint {
    actor: ActorId,
    is_owner: bool,
    attached: bool,
    visible: bool,
    hidden_until: Option<Instant>,
    config: EndpointConfig,
}

impl CollisionEndpoint {
    pub fn new(actor: ActorId, is_owner: bool, config: EndpointConfig) -> Self {
        Self {
            actor,
            is_owner,
            attached: false,
            visible: true,
            hidden_until: None,
            config,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn on_attach(&mut self) {
        self.attached = true;
    }

    /// Pending re-enable timers are dropped with the connection.
    pub fn on_detach(&mut self) {
        self.attached = false;
        self.hidden_until = None;
    }

    /// Messages to send when this actor touches `other`: the current velocity
    /// first, then the collision itself.
    pub fn on_contact(&self, other: ActorId, velocity: Vec3) -> Vec<ClientMessage> {
        if !self.is_owner || !self.attached || other == self.actor {
            return Vec::new();
        }
        vec![
            ClientMessage::velocity_report(self.actor, velocity),
            ClientMessage::CollisionReport {
                reporter: self.actor,
                other,
            },
        ]
    }

    pub fn apply_verdict(&mut self, result: CollisionResult, now: Instant) -> Verdict {
        if !self.attached {
            log::warn!(
                "Actor {} received a verdict while detached, ignoring",
                self.actor
            );
            return Verdict::NotAttached;
        }
        if !result.involves(self.actor) {
            return Verdict::NotInvolved;
        }
        if result.winner == self.actor {
            return Verdict::Won;
        }

        log::info!(
            "Actor {} lost collision against {}, hidden for {:?}",
            self.actor,
            result.winner,
            self.config.cooldown
        );
        self.visible = false;
        self.hidden_until = Some(now + self.config.cooldown);
        Verdict::Lost(ClientMessage::ToggleRequest {
            actor: self.actor,
            disabled: true,
        })
    }

    /// Shows the actor again once the cooldown has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<ClientMessage> {
        let until = self.hidden_until?;
        if now < until {
            return None;
        }
        self.hidden_until = None;
        self.visible = true;
        Some(ClientMessage::ToggleRequest {
            actor: self.actor,
            disabled: false,
        })
    }

    /// Applies a broadcast visibility value; returns whether it changed anything.
    pub fn on_toggle_broadcast(&mut self, disabled: bool) -> bool {
        if self.visible != disabled {
            return false;
        }
        self.visible = !disabled;
        true
    }
}
