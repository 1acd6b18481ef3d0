use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::key::{ActorId, CollisionKey, CollisionResult, resolve};
use super::retry::RetryQueue;

/// Receives the verdict for a collision the actor took part in.
pub trait VerdictSink {
    fn deliver(&mut self, target: ActorId, result: CollisionResult);
}

impl<F> VerdictSink for F
where
    F: FnMut(ActorId, CollisionResult),
{
    fn deliver(&mut self, target: ActorId, result: CollisionResult) {
        self(target, result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// How long to wait for a missing velocity before the single retry.
    #[serde(with = "super::millis")]
    pub retry_delay: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Self-collision.
    Ignored,
    /// The pair already has a resolution in flight.
    Suppressed,
    Resolved(CollisionResult),
    /// A velocity was missing; one retry is scheduled.
    Deferred,
    /// The retry fired and a velocity was still missing.
    Abandoned(CollisionKey),
}

#[derive(Debug, Clone, Default)]
pub struct ArbiterStats {
    pub resolved: u64,
    pub suppressed: u64,
    pub deferred: u64,
    pub abandoned: u64,
}

/// Authority-side collision arbitration. Each unordered pair resolves at most
/// once at a time; the verdict goes to both participants' handlers.
pub struct CollisionArbiter<H: VerdictSink> {
    config: ArbiterConfig,
    velocities: HashMap<ActorId, Vec3>,
    handlers: HashMap<ActorId, H>,
    active: HashSet<CollisionKey>,
    retries: RetryQueue,
    stats: ArbiterStats,
}

impl<H: VerdictSink> CollisionArbiter<H> {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            velocities: HashMap::new(),
            handlers: HashMap::new(),
            active: HashSet::new(),
            retries: RetryQueue::new(),
            stats: ArbiterStats::default(),
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// The first registration for an actor wins; later ones are refused.
    /// Handlers and last velocities live for the whole session.
    pub fn register_handler(&mut self, actor: ActorId, handler: H) -> bool {
        if self.handlers.contains_key(&actor) {
            log::warn!("Handler for actor {} already registered", actor);
            return false;
        }
        self.handlers.insert(actor, handler);
        true
    }

    pub fn has_handler(&self, actor: ActorId) -> bool {
        self.handlers.contains_key(&actor)
    }

    pub fn report_velocity(&mut self, actor: ActorId, velocity: Vec3) {
        self.velocities.insert(actor, velocity);
    }

    pub fn velocity(&self, actor: ActorId) -> Option<Vec3> {
        self.velocities.get(&actor).copied()
    }

    pub fn is_active(&self, key: CollisionKey) -> bool {
        self.active.contains(&key)
    }

    pub fn next_retry_at(&self) -> Option<Instant> {
        self.retries.next_due()
    }

    pub fn stats(&self) -> &ArbiterStats {
        &self.stats
    }

    pub fn report_collision(&mut self, a: ActorId, b: ActorId, now: Instant) -> CollisionOutcome {
        if a == b {
            log::debug!("Ignoring self-collision report from actor {}", a);
            return CollisionOutcome::Ignored;
        }

        let key = CollisionKey::new(a, b);
        if !self.active.insert(key) {
            self.stats.suppressed += 1;
            return CollisionOutcome::Suppressed;
        }

        if let Some(result) = self.try_resolve(a, b) {
            return CollisionOutcome::Resolved(result);
        }

        let due = now + self.config.retry_delay;
        self.retries.schedule(due, a, b);
        self.stats.deferred += 1;
        log::debug!(
            "Collision {}-{} deferred, velocity missing (retry in {:?})",
            a,
            b,
            self.config.retry_delay
        );
        CollisionOutcome::Deferred
    }

    /// Fires every retry due at `now`.
    pub fn poll_retries(&mut self, now: Instant) -> Vec<CollisionOutcome> {
        let mut outcomes = Vec::new();
        while let Some(retry) = self.retries.pop_due(now) {
            let key = retry.key();
            match self.try_resolve(retry.first, retry.second) {
                Some(result) => outcomes.push(CollisionOutcome::Resolved(result)),
                None => {
                    self.active.remove(&key);
                    self.stats.abandoned += 1;
                    log::debug!(
                        "Collision {}-{} abandoned, velocity still missing",
                        key.low,
                        key.high
                    );
                    outcomes.push(CollisionOutcome::Abandoned(key));
                }
            }
        }
        outcomes
    }

    fn try_resolve(&mut self, a: ActorId, b: ActorId) -> Option<CollisionResult> {
        let va = self.velocities.get(&a).copied()?;
        let vb = self.velocities.get(&b).copied()?;

        let result = resolve(a, va, b, vb);
        log::debug!(
            "Collision {}-{} resolved: winner {} ({:.2}) loser {} ({:.2})",
            a,
            b,
            result.winner,
            self.velocities[&result.winner].length(),
            result.loser,
            self.velocities[&result.loser].length()
        );

        self.dispatch(result.winner, result);
        self.dispatch(result.loser, result);
        self.active.remove(&CollisionKey::new(a, b));
        self.stats.resolved += 1;
        Some(result)
    }

    fn dispatch(&mut self, target: ActorId, result: CollisionResult) {
        match self.handlers.get_mut(&target) {
            Some(handler) => handler.deliver(target, result),
            None => log::debug!("No handler registered for actor {}", target),
        }
    }
}

impl<H: VerdictSink> Default for CollisionArbiter<H> {
    fn default() -> Self {
        Self::new(ArbiterConfig::default())
    }
}
