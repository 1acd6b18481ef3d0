use std::collections::{BTreeMap, VecDeque};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use glam::Vec3;

use clash::collision::ActorId;
use clash::net::{ClientMessage, LoopbackLink, ServerMessage};
use clash::tick::{FixedTimestep, Tick};

use crate::authority::Authority;
use crate::bots::Bot;
use crate::config::ServerConfig;
use crate::events::ServerEvent;

const SPAWN_RING_RADIUS: f32 = 6.0;
const SPAWN_HEIGHT: f32 = 0.95;

/// One connected client and the two directions of its link.
struct ClientSlot {
    bot: Bot,
    uplink: LoopbackLink,
    downlink: LoopbackLink,
}

/// Drives the authority and its simulated clients on a fixed tick.
pub struct GameServer {
    config: ServerConfig,
    authority: Authority,
    clients: BTreeMap<ActorId, ClientSlot>,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(config: ServerConfig, now: Instant) -> Self {
        let mut server = Self {
            authority: Authority::new(&config),
            clients: BTreeMap::new(),
            timestep: FixedTimestep::new(config.tick_rate),
            last_tick_time: now,
            pending_events: VecDeque::new(),
            config,
        };

        for i in 0..server.config.clients {
            server.connect(i as ActorId + 1);
        }
        server
    }

    pub fn tick_duration(&self) -> Duration {
        self.timestep.tick_duration()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn connect(&mut self, actor: ActorId) -> bool {
        if self.clients.contains_key(&actor) {
            return false;
        }

        let count = self.config.clients.max(1) as f32;
        let angle = (actor as f32 - 1.0) / count * TAU;
        let spawn = Vec3::new(
            angle.cos() * SPAWN_RING_RADIUS,
            SPAWN_HEIGHT,
            angle.sin() * SPAWN_RING_RADIUS,
        );

        if !self.authority.join(actor, spawn) {
            return false;
        }

        let seed = self.config.seed.wrapping_mul(31).wrapping_add(actor as u64);
        let mut bot = Bot::new(actor, spawn, &self.config, seed);
        bot.attach(self.authority.tick());
        self.clients.insert(
            actor,
            ClientSlot {
                bot,
                uplink: LoopbackLink::new(self.config.link.clone(), seed ^ 0x5555),
                downlink: LoopbackLink::new(self.config.link.clone(), seed ^ 0xaaaa),
            },
        );
        true
    }

    pub fn disconnect(&mut self, actor: ActorId) {
        if let Some(mut slot) = self.clients.remove(&actor) {
            slot.bot.detach();
        }
        self.authority.leave(actor);
    }

    pub fn shutdown(&mut self) {
        let actors: Vec<ActorId> = self.clients.keys().copied().collect();
        for actor in actors {
            self.disconnect(actor);
        }
        self.collect_events();
    }

    pub fn tick_once(&mut self, now: Instant) {
        let delta = now.saturating_duration_since(self.last_tick_time);
        self.last_tick_time = now;
        self.timestep.accumulate(delta);

        while self.timestep.consume_tick() {
            self.tick(now);
        }
    }

    fn tick(&mut self, now: Instant) {
        for (&actor, slot) in self.clients.iter_mut() {
            for bytes in slot.uplink.receive(now) {
                match ClientMessage::decode(&bytes) {
                    Ok(message) => self.authority.handle_message(actor, message, now),
                    Err(e) => self.pending_events.push_back(ServerEvent::Error {
                        message: format!("Bad packet from actor {}: {}", actor, e),
                    }),
                }
            }
        }

        self.authority.step(now);

        for outgoing in self.authority.drain_outgoing() {
            let Some(slot) = self.clients.get_mut(&outgoing.target) else {
                continue;
            };
            match outgoing.message.encode() {
                Ok(bytes) => {
                    slot.downlink.send(bytes, outgoing.message.channel(), now);
                }
                Err(e) => self.pending_events.push_back(ServerEvent::Error {
                    message: format!("Failed to encode for actor {}: {}", outgoing.target, e),
                }),
            }
        }

        for slot in self.clients.values_mut() {
            let mut replies = Vec::new();
            for bytes in slot.downlink.receive(now) {
                match ServerMessage::decode(&bytes) {
                    Ok(message) => replies.extend(slot.bot.receive(message, now)),
                    Err(e) => {
                        log::warn!("Actor {} dropped a bad packet: {}", slot.bot.actor(), e)
                    }
                }
            }
            replies.extend(slot.bot.update(now));

            for message in replies {
                match message.encode() {
                    Ok(bytes) => {
                        slot.uplink.send(bytes, message.channel(), now);
                    }
                    Err(e) => {
                        log::warn!("Actor {} failed to encode: {}", slot.bot.actor(), e)
                    }
                }
            }
        }

        self.collect_events();
    }

    fn collect_events(&mut self) {
        self.pending_events.extend(self.authority.drain_events());
    }

    pub fn stats(&self) -> ServerStats {
        let collisions = self.authority.collision_stats();
        let mut stats = ServerStats {
            tick: self.authority.tick(),
            clients: self.clients.len(),
            collisions_resolved: collisions.resolved,
            collisions_suppressed: collisions.suppressed,
            collisions_abandoned: collisions.abandoned,
            rejected_inputs: self.authority.rejected_inputs(),
            ..Default::default()
        };

        for (&actor, slot) in &self.clients {
            let prediction = slot.bot.prediction_stats();
            stats.reconciliations += prediction.reconciliations;
            stats.extrapolated_ticks += prediction.extrapolated_ticks;
            stats.packets_dropped += slot.uplink.stats().dropped + slot.downlink.stats().dropped;
            if self.authority.is_disabled(actor) {
                stats.hidden += 1;
            }
            if let (Some(confirmed), Some(error)) = (
                self.authority.actor_position(actor),
                prediction.last_error,
            ) {
                stats.max_prediction_error = stats.max_prediction_error.max(error);
                let drift = confirmed.distance(slot.bot.position());
                stats.max_drift = stats.max_drift.max(drift);
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub tick: Tick,
    pub clients: usize,
    pub collisions_resolved: u64,
    pub collisions_suppressed: u64,
    pub collisions_abandoned: u64,
    pub rejected_inputs: u64,
    pub reconciliations: u64,
    pub extrapolated_ticks: u64,
    pub packets_dropped: u64,
    pub hidden: usize,
    pub max_prediction_error: f32,
    /// Largest distance between an owner's predicted position and the
    /// authority's current one.
    pub max_drift: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(config: ServerConfig, ticks: u32) -> GameServer {
        let start = Instant::now();
        let mut server = GameServer::new(config, start);
        let step = server.tick_duration();
        for i in 1..=ticks {
            server.tick_once(start + step * i);
        }
        server
    }

    #[test]
    fn clients_join_and_reconcile() {
        let config = ServerConfig {
            clients: 3,
            ..Default::default()
        };
        let mut server = run(config, 120);

        let stats = server.stats();
        assert_eq!(stats.clients, 3);
        assert!(stats.tick >= 119);
        assert!(stats.reconciliations > 0);
        assert_eq!(stats.rejected_inputs, 0);

        let joined = server
            .drain_events()
            .filter(|e| matches!(e, ServerEvent::ClientJoined { .. }))
            .count();
        assert_eq!(joined, 3);
    }

    #[test]
    fn same_seed_same_outcome() {
        let config = ServerConfig {
            clients: 4,
            seed: 9,
            ..Default::default()
        };
        let a = run(config.clone(), 90).stats();
        let b = run(config, 90).stats();

        assert_eq!(a.tick, b.tick);
        assert_eq!(a.collisions_resolved, b.collisions_resolved);
        assert_eq!(a.packets_dropped, b.packets_dropped);
    }

    #[test]
    fn shutdown_disconnects_everyone() {
        let mut server = run(ServerConfig::default(), 10);
        server.drain_events().count();
        server.shutdown();

        assert_eq!(server.stats().clients, 0);
        let left = server
            .drain_events()
            .filter(|e| matches!(e, ServerEvent::ClientLeft { .. }))
            .count();
        assert_eq!(left, 4);
    }
}
