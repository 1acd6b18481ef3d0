use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;
use tokio::sync::mpsc;

use clash::collision::{
    ActorId, ArbiterStats, CollisionArbiter, CollisionOutcome, CollisionResult, ToggleBroadcast,
    VerdictSink,
};
use clash::net::{ClientMessage, ServerMessage};
use clash::physics::{Arena, BodyMut, PhysicsWorld};
use clash::prediction::{AuthoritativeMover, MovementModel};
use clash::tick::Tick;

use crate::config::ServerConfig;
use crate::events::ServerEvent;

/// A message addressed to one connected actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub target: ActorId,
    pub message: ServerMessage,
}

/// Forwards verdicts from the arbiter into the authority's send queue.
struct VerdictOutbox(mpsc::UnboundedSender<(ActorId, CollisionResult)>);

impl VerdictSink for VerdictOutbox {
    fn deliver(&mut self, target: ActorId, result: CollisionResult) {
        if self.0.send((target, result)).is_err() {
            log::debug!("Verdict for actor {} dropped, outbox closed", target);
        }
    }
}

struct AuthorityActor {
    handle: RigidBodyHandle,
    mover: AuthoritativeMover,
}

/// The server-side simulation: one shared physics world, per-actor input
/// queues, collision arbitration and buffered visibility.
pub struct Authority {
    world: PhysicsWorld,
    model: MovementModel,
    actors: BTreeMap<ActorId, AuthorityActor>,
    arbiter: CollisionArbiter<VerdictOutbox>,
    verdict_tx: mpsc::UnboundedSender<(ActorId, CollisionResult)>,
    verdict_rx: mpsc::UnboundedReceiver<(ActorId, CollisionResult)>,
    visibility: ToggleBroadcast,
    tick: Tick,
    dt: f32,
    outgoing: Vec<Outgoing>,
    events: VecDeque<ServerEvent>,
}

impl Authority {
    pub fn new(config: &ServerConfig) -> Self {
        let dt = config.tick_delta();
        let mut world = PhysicsWorld::with_timestep(dt);
        Arena::new().spawn(&mut world);
        let (verdict_tx, verdict_rx) = mpsc::unbounded_channel();

        Self {
            world,
            model: MovementModel::new(config.movement.clone()),
            actors: BTreeMap::new(),
            arbiter: CollisionArbiter::new(config.arbiter.clone()),
            verdict_tx,
            verdict_rx,
            visibility: ToggleBroadcast::new(),
            tick: 0,
            dt,
            outgoing: Vec::new(),
            events: VecDeque::new(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn actor_position(&self, actor: ActorId) -> Option<Vec3> {
        let entry = self.actors.get(&actor)?;
        self.world.body_position(entry.handle)
    }

    pub fn is_disabled(&self, actor: ActorId) -> bool {
        self.visibility.get(actor).unwrap_or(false)
    }

    pub fn collision_stats(&self) -> &ArbiterStats {
        self.arbiter.stats()
    }

    pub fn rejected_inputs(&self) -> u64 {
        self.actors.values().map(|a| a.mover.rejected()).sum()
    }

    /// Spawns an actor and replays every buffered visibility value to it.
    pub fn join(&mut self, actor: ActorId, position: Vec3) -> bool {
        if self.actors.contains_key(&actor) {
            log::warn!("Actor {} is already present", actor);
            return false;
        }

        let config = self.model.config();
        let handle = self
            .world
            .add_actor(position, config.actor_radius, config.actor_height);
        self.actors.insert(
            actor,
            AuthorityActor {
                handle,
                mover: AuthoritativeMover::new(self.model.clone()),
            },
        );
        // A rejoining actor keeps the handler from its first join.
        if !self.arbiter.has_handler(actor) {
            self.arbiter
                .register_handler(actor, VerdictOutbox(self.verdict_tx.clone()));
        }

        for (other, disabled) in self.visibility.snapshot() {
            self.outgoing.push(Outgoing {
                target: actor,
                message: ServerMessage::ToggleBroadcast {
                    actor: other,
                    disabled,
                },
            });
        }

        self.events.push_back(ServerEvent::ClientJoined { actor });
        true
    }

    pub fn leave(&mut self, actor: ActorId) {
        let Some(entry) = self.actors.remove(&actor) else {
            return;
        };
        self.world.remove_body(entry.handle);
        self.visibility.remove(actor);
        self.events.push_back(ServerEvent::ClientLeft { actor });
    }

    /// Handles one message from the client owning `sender`. Messages speaking
    /// for any other actor are dropped.
    pub fn handle_message(&mut self, sender: ActorId, message: ClientMessage, now: Instant) {
        if message.actor() != sender {
            self.events.push_back(ServerEvent::Impersonation {
                sender,
                claimed: message.actor(),
            });
            return;
        }

        match message {
            ClientMessage::Input { actor, sample } => {
                let Some(entry) = self.actors.get_mut(&actor) else {
                    return;
                };
                if let Err(e) = entry.mover.receive_input(sample) {
                    self.events.push_back(ServerEvent::InputRejected {
                        actor,
                        reason: e.to_string(),
                    });
                }
            }
            ClientMessage::VelocityReport { actor, velocity } => {
                self.arbiter
                    .report_velocity(actor, Vec3::from_array(velocity));
            }
            ClientMessage::CollisionReport { reporter, other } => {
                let outcome = self.arbiter.report_collision(reporter, other, now);
                self.record_outcome(outcome);
                self.flush_verdicts();
            }
            ClientMessage::ToggleRequest { actor, disabled } => {
                if self.visibility.publish(actor, disabled) {
                    self.events
                        .push_back(ServerEvent::VisibilityChanged { actor, disabled });
                    self.broadcast(ServerMessage::ToggleBroadcast { actor, disabled });
                }
            }
        }
    }

    /// Fires due collision retries, applies at most one queued input per
    /// actor, steps the shared world once and broadcasts the confirmed states.
    pub fn step(&mut self, now: Instant) {
        for outcome in self.arbiter.poll_retries(now) {
            self.record_outcome(outcome);
        }
        self.flush_verdicts();

        let tick = self.tick;
        for entry in self.actors.values_mut() {
            let mut body = BodyMut::new(&mut self.world, entry.handle);
            entry.mover.apply_tick(&mut body, tick, self.dt);
        }
        self.world.step();

        let confirmed: Vec<ServerMessage> = self
            .actors
            .iter()
            .map(|(&actor, entry)| {
                let body = BodyMut::new(&mut self.world, entry.handle);
                ServerMessage::confirmed(actor, &entry.mover.confirm(tick, &body))
            })
            .collect();
        for message in confirmed {
            self.broadcast(message);
        }

        self.tick = self.tick.wrapping_add(1);
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.events.drain(..)
    }

    fn broadcast(&mut self, message: ServerMessage) {
        for &target in self.actors.keys() {
            self.outgoing.push(Outgoing {
                target,
                message: message.clone(),
            });
        }
    }

    fn flush_verdicts(&mut self) {
        while let Ok((target, result)) = self.verdict_rx.try_recv() {
            self.outgoing.push(Outgoing {
                target,
                message: ServerMessage::verdict(result),
            });
        }
    }

    fn record_outcome(&mut self, outcome: CollisionOutcome) {
        match outcome {
            CollisionOutcome::Resolved(result) => {
                self.events.push_back(ServerEvent::CollisionResolved {
                    winner: result.winner,
                    loser: result.loser,
                })
            }
            CollisionOutcome::Abandoned(key) => {
                self.events.push_back(ServerEvent::CollisionAbandoned {
                    first: key.low,
                    second: key.high,
                })
            }
            CollisionOutcome::Ignored
            | CollisionOutcome::Suppressed
            | CollisionOutcome::Deferred => {}
        }
    }
}
