use std::collections::VecDeque;

use crate::input::{InputError, InputSample};
use crate::physics::PredictedBody;
use crate::tick::Tick;

use super::engine::MovementModel;
use super::state::ConfirmedState;

const MAX_QUEUED_INPUTS: usize = 32;

/// Authority-side movement for one actor: validates inputs as they arrive and
/// applies them on the next simulation tick.
pub struct AuthoritativeMover {
    model: MovementModel,
    queue: VecDeque<InputSample>,
    last_input_tick: Option<Tick>,
    rejected: u64,
}

impl AuthoritativeMover {
    pub fn new(model: MovementModel) -> Self {
        Self {
            model,
            queue: VecDeque::with_capacity(MAX_QUEUED_INPUTS),
            last_input_tick: None,
            rejected: 0,
        }
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Queues a sample for the next tick. Out-of-range samples are rejected;
    /// duplicates and samples older than one already accepted are ignored.
    pub fn receive_input(&mut self, sample: InputSample) -> Result<bool, InputError> {
        if let Err(e) = sample.validate(self.model.config().max_axis) {
            self.rejected += 1;
            return Err(e);
        }

        if self.last_input_tick.is_some_and(|last| sample.tick <= last) {
            return Ok(false);
        }
        self.last_input_tick = Some(sample.tick);

        if self.queue.len() >= MAX_QUEUED_INPUTS {
            self.queue.pop_front();
        }
        self.queue.push_back(sample);
        Ok(true)
    }

    /// Sets the body's velocity for this tick from the oldest queued input, or
    /// from a neutral input when none arrived. A burst of inputs is spread over
    /// the following ticks, one per tick, so each sample gets its own
    /// integration step. Integration is left to the caller so a shared world
    /// is stepped once for every actor.
    ///
    /// Returns whether a queued input was applied.
    pub fn apply_tick<B: PredictedBody>(&mut self, body: &mut B, tick: Tick, dt: f32) -> bool {
        match self.queue.pop_front() {
            Some(sample) => {
                self.model.apply(body, &sample, dt);
                true
            }
            None => {
                self.model.apply(body, &InputSample::new(tick), dt);
                false
            }
        }
    }

    pub fn confirm<B: PredictedBody>(&self, tick: Tick, body: &B) -> ConfirmedState {
        ConfirmedState::capture(tick, body)
    }
}
