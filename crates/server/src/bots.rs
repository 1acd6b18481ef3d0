use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_3;
use std::time::Instant;

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use clash::collision::{
    ActorId, CollisionEndpoint, CollisionResult, ContactSensor, Verdict, VisibilityView,
};
use clash::input::InputSample;
use clash::net::{ClientMessage, ServerMessage};
use clash::physics::{Arena, PhysicsActor, PhysicsWorld};
use clash::prediction::{ConfirmedState, MovementModel, PredictedActor, PredictionStats};
use clash::tick::{ManualClock, Tick, TickClock};

use crate::config::ServerConfig;

const MIN_HEADING_TICKS: u32 = 30;
const MAX_HEADING_TICKS: u32 = 90;
/// Bots further than this from the centre steer back toward it.
const ROAM_RADIUS: f32 = 12.0;

/// A simulated owning client: predicts its own actor, reconciles against
/// confirmed states and takes part in collision arbitration.
pub struct Bot {
    actor: ActorId,
    predicted: PredictedActor<PhysicsActor>,
    endpoint: CollisionEndpoint,
    sensor: ContactSensor,
    view: VisibilityView,
    peers: BTreeMap<ActorId, Vec3>,
    clock: ManualClock,
    rng: ChaCha8Rng,
    heading: Vec2,
    heading_ticks: u32,
    sprint: bool,
    dt: f32,
}

impl Bot {
    pub fn new(actor: ActorId, spawn: Vec3, config: &ServerConfig, seed: u64) -> Self {
        let dt = config.tick_delta();
        let mut world = PhysicsWorld::with_timestep(dt);
        Arena::new().spawn(&mut world);

        let movement = config.movement.clone();
        let body = PhysicsActor::new(world, spawn, movement.actor_radius, movement.actor_height);
        let predicted = PredictedActor::new(
            body,
            MovementModel::new(movement),
            config.reconcile.clone(),
        );

        let mut clock = ManualClock::new(config.tick_rate);
        clock.set_round_trip_time(config.link.round_trip_estimate());

        Self {
            actor,
            predicted,
            endpoint: CollisionEndpoint::new(actor, true, config.endpoint.clone()),
            sensor: ContactSensor::new(config.contact_radius),
            view: VisibilityView::new(),
            peers: BTreeMap::new(),
            clock,
            rng: ChaCha8Rng::seed_from_u64(seed),
            heading: Vec2::ZERO,
            heading_ticks: 0,
            sprint: false,
            dt,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn position(&self) -> Vec3 {
        self.predicted.position()
    }

    pub fn is_visible(&self) -> bool {
        self.endpoint.is_visible()
    }

    pub fn prediction_stats(&self) -> &PredictionStats {
        self.predicted.stats()
    }

    pub fn attach(&mut self, tick: Tick) {
        self.clock.set_local_tick(tick);
        self.endpoint.on_attach();
    }

    pub fn detach(&mut self) {
        self.endpoint.on_detach();
    }

    /// Handles one message from the authority, returning any replies.
    pub fn receive(&mut self, message: ServerMessage, now: Instant) -> Option<ClientMessage> {
        match message {
            ServerMessage::ConfirmedState {
                actor,
                tick,
                position,
                velocity,
            } => {
                if actor == self.actor {
                    self.clock.observe_authority_tick(tick);
                    let state = ConfirmedState::new(
                        tick,
                        Vec3::from_array(position),
                        Vec3::from_array(velocity),
                    );
                    self.predicted.reconcile(state, &self.clock);
                } else {
                    self.peers.insert(actor, Vec3::from_array(position));
                }
                None
            }
            ServerMessage::CollisionVerdict { winner, loser } => {
                let result = CollisionResult { winner, loser };
                match self.endpoint.apply_verdict(result, now) {
                    Verdict::Lost(request) => Some(request),
                    Verdict::Won | Verdict::NotInvolved | Verdict::NotAttached => None,
                }
            }
            ServerMessage::ToggleBroadcast { actor, disabled } => {
                self.view.apply(actor, disabled);
                if actor == self.actor {
                    self.endpoint.on_toggle_broadcast(disabled);
                }
                None
            }
        }
    }

    /// Runs one local tick and returns the messages to send.
    pub fn update(&mut self, now: Instant) -> Vec<ClientMessage> {
        let mut outgoing = Vec::new();
        if let Some(request) = self.endpoint.poll(now) {
            outgoing.push(request);
        }

        let tick = self.clock.local_tick();
        let sample = self.next_input(tick);
        if let Some(sent) = self.predicted.predict_tick(tick, Some(sample), self.dt) {
            outgoing.push(ClientMessage::Input {
                actor: self.actor,
                sample: sent,
            });
        }

        if self.endpoint.is_visible() {
            let position = self.predicted.position();
            let velocity = self.predicted.velocity();
            let view = &self.view;
            let peers = self
                .peers
                .iter()
                .filter(|(actor, _)| view.is_visible(**actor))
                .map(|(&actor, &p)| (actor, p));
            for other in self.sensor.detect(position, peers) {
                outgoing.extend(self.endpoint.on_contact(other, velocity));
            }
        }

        self.clock.advance();
        outgoing
    }

    fn next_input(&mut self, tick: Tick) -> InputSample {
        if self.heading_ticks == 0 {
            let position = self.predicted.position();
            let flat = Vec2::new(position.x, position.z);
            let angle = self.rng.gen_range(-FRAC_PI_3..FRAC_PI_3);

            self.heading = if flat.length() > ROAM_RADIUS {
                Vec2::from_angle(angle).rotate(-flat.normalize())
            } else {
                Vec2::from_angle(self.rng.gen_range(0.0..std::f32::consts::TAU))
            };
            self.sprint = self.rng.gen_bool(0.3);
            self.heading_ticks = self.rng.gen_range(MIN_HEADING_TICKS..=MAX_HEADING_TICKS);
        }
        self.heading_ticks -= 1;

        let jump = self.rng.gen_bool(0.02);
        InputSample::from_direction(tick, self.heading, self.sprint, jump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_inputs() {
        let config = ServerConfig::default();
        let spawn = Vec3::new(0.0, 0.95, 0.0);
        let mut a = Bot::new(1, spawn, &config, 42);
        let mut b = Bot::new(1, spawn, &config, 42);

        for tick in 0..200 {
            assert_eq!(a.next_input(tick), b.next_input(tick));
        }
    }

    #[test]
    fn lost_verdict_produces_hide_request() {
        let config = ServerConfig::default();
        let mut bot = Bot::new(2, Vec3::new(0.0, 0.95, 0.0), &config, 1);
        bot.attach(0);

        let reply = bot.receive(
            ServerMessage::CollisionVerdict { winner: 1, loser: 2 },
            Instant::now(),
        );
        assert_eq!(
            reply,
            Some(ClientMessage::ToggleRequest {
                actor: 2,
                disabled: true
            })
        );
        assert!(!bot.is_visible());
    }

    #[test]
    fn contact_with_visible_peer_is_reported_once() {
        let config = ServerConfig::default();
        let mut bot = Bot::new(1, Vec3::new(0.0, 0.95, 0.0), &config, 3);
        bot.attach(0);
        let now = Instant::now();

        bot.receive(
            ServerMessage::ConfirmedState {
                actor: 2,
                tick: 0,
                position: [0.3, 0.95, 0.0],
                velocity: [0.0; 3],
            },
            now,
        );

        let first = bot.update(now);
        let reports = first
            .iter()
            .filter(|m| matches!(m, ClientMessage::CollisionReport { other: 2, .. }))
            .count();
        assert_eq!(reports, 1);

        let second = bot.update(now);
        assert!(
            !second
                .iter()
                .any(|m| matches!(m, ClientMessage::CollisionReport { .. }))
        );
    }
}
