use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::history::{HISTORY_CAPACITY, TickHistory};
use crate::input::InputSample;
use crate::physics::PredictedBody;
use crate::tick::{Tick, TickClock};

use super::engine::MovementModel;
use super::state::{ConfirmedState, MotionState};

/// Upper bound on ticks stepped by one replay, about two minutes at 60 Hz.
pub const MAX_REPLAY_TICKS: Tick = 8192;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Weight given to the authoritative value when correcting, 0..=1.
    pub blend_factor: f32,
    pub history_capacity: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            blend_factor: 0.2,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Predicting,
    Reconciling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub confirmed_tick: Tick,
    pub adjusted_tick: Tick,
    pub replayed: u32,
    pub extrapolated: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionStats {
    pub reconciliations: u64,
    pub stale_states: u64,
    pub replayed_ticks: u64,
    pub extrapolated_ticks: u64,
    /// Distance between the predicted and confirmed position at the last
    /// reconciled tick, when a prediction for that tick was still held.
    pub last_error: Option<f32>,
}

/// Owner-side prediction and reconciliation for one actor.
pub struct PredictedActor<B> {
    body: B,
    model: MovementModel,
    config: ReconcileConfig,
    inputs: TickHistory<InputSample>,
    predicted: TickHistory<MotionState>,
    confirmed: TickHistory<ConfirmedState>,
    phase: ReconcilePhase,
    last_confirmed: Option<Tick>,
    stats: PredictionStats,
}

impl<B: PredictedBody> PredictedActor<B> {
    pub fn new(body: B, model: MovementModel, config: ReconcileConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            body,
            model,
            inputs: TickHistory::new(capacity),
            predicted: TickHistory::new(capacity),
            confirmed: TickHistory::new(capacity),
            phase: ReconcilePhase::Predicting,
            last_confirmed: None,
            stats: PredictionStats::default(),
            config,
        }
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    pub fn stats(&self) -> &PredictionStats {
        &self.stats
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.velocity()
    }

    pub fn input_at(&self, tick: Tick) -> Option<&InputSample> {
        self.inputs.get(tick)
    }

    pub fn predicted_at(&self, tick: Tick) -> Option<&MotionState> {
        self.predicted.get(tick)
    }

    pub fn confirmed_at(&self, tick: Tick) -> Option<&ConfirmedState> {
        self.confirmed.get(tick)
    }

    /// Runs one live tick. Active samples are recorded for replay and handed
    /// back so the caller can forward them to the authority; idle ticks step
    /// with a neutral input and are not recorded.
    pub fn predict_tick(
        &mut self,
        tick: Tick,
        sample: Option<InputSample>,
        dt: f32,
    ) -> Option<InputSample> {
        debug_assert_eq!(self.phase, ReconcilePhase::Predicting);

        let sample = sample
            .filter(InputSample::is_active)
            .map(|s| s.retimed(tick));

        match sample {
            Some(active) => {
                self.inputs.record(tick, active);
                self.model.step(&mut self.body, &active, dt);
            }
            None => {
                self.model.step(&mut self.body, &InputSample::new(tick), dt);
            }
        }

        self.predicted.record(tick, MotionState::of(&self.body));
        sample
    }

    /// Corrects toward an authoritative state and replays buffered inputs up
    /// to the clock's current local tick. States older than the last one
    /// applied are dropped.
    ///
    /// Ticks older than the input history are replayed with the earliest
    /// buffered sample. A replay never runs more than [`MAX_REPLAY_TICKS`]
    /// steps; a longer span starts that many ticks before the local tick.
    pub fn reconcile<C: TickClock>(
        &mut self,
        state: ConfirmedState,
        clock: &C,
    ) -> Option<ReplayReport> {
        if self.last_confirmed.is_some_and(|last| state.tick < last) {
            self.stats.stale_states += 1;
            log::debug!(
                "dropping confirmed state for tick {} (already at {:?})",
                state.tick,
                self.last_confirmed
            );
            return None;
        }

        self.phase = ReconcilePhase::Reconciling;
        self.last_confirmed = Some(state.tick);
        self.confirmed.record(state.tick, state);
        self.stats.reconciliations += 1;

        if let Some(predicted) = self.predicted.get(state.tick) {
            let error = (predicted.position - state.position).length();
            self.stats.last_error = Some(error);
            log::debug!("prediction error at tick {}: {:.4}", state.tick, error);
        }

        let adjusted_tick = match state.tick.checked_add(clock.round_trip_ticks()) {
            Some(tick) => tick,
            None => {
                log::warn!(
                    "adjusted tick overflows past tick {} (rtt {} ticks), skipping replay",
                    state.tick,
                    clock.round_trip_ticks()
                );
                Tick::MAX
            }
        };
        let t = self.config.blend_factor;
        let position = blend(self.body.position(), state.position, t);
        let velocity = blend(self.body.velocity(), state.velocity, t);
        self.body.set_position(position);
        self.body.set_velocity(velocity);
        self.body.clear_pending_forces();

        let (replayed, extrapolated) =
            self.replay(adjusted_tick, clock.local_tick(), clock.tick_delta());

        self.phase = ReconcilePhase::Predicting;

        Some(ReplayReport {
            confirmed_tick: state.tick,
            adjusted_tick,
            replayed,
            extrapolated,
        })
    }

    fn replay(&mut self, from: Tick, until: Tick, dt: f32) -> (u32, u32) {
        if from >= until {
            return (0, 0);
        }

        let start = if until - from > MAX_REPLAY_TICKS {
            log::warn!(
                "replay from tick {} exceeds {} ticks, clamping to tick {}",
                from,
                MAX_REPLAY_TICKS,
                until - MAX_REPLAY_TICKS
            );
            until - MAX_REPLAY_TICKS
        } else {
            from
        };

        let mut fallback = self
            .inputs
            .latest_at_or_before(start)
            .or_else(|| self.inputs.earliest())
            .map(|(_, sample)| *sample);

        let mut replayed = 0;
        let mut extrapolated = 0;

        for tick in start..until {
            let sample = match self.inputs.get(tick) {
                Some(sample) => {
                    fallback = Some(*sample);
                    *sample
                }
                None => {
                    extrapolated += 1;
                    fallback
                        .map(|s| s.retimed(tick))
                        .unwrap_or_else(|| InputSample::new(tick))
                }
            };

            self.model.step(&mut self.body, &sample, dt);
            self.predicted.record(tick, MotionState::of(&self.body));
            replayed += 1;
        }

        if extrapolated > 0 {
            log::warn!(
                "extrapolated {} of {} replayed ticks due to missing input history",
                extrapolated,
                replayed
            );
        }

        self.stats.replayed_ticks += replayed as u64;
        self.stats.extrapolated_ticks += extrapolated as u64;
        (replayed, extrapolated)
    }
}

fn blend(current: Vec3, target: Vec3, t: f32) -> Vec3 {
    if t >= 1.0 {
        target
    } else if t <= 0.0 {
        current
    } else {
        current.lerp(target, t)
    }
}
