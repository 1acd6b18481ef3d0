use std::time::Duration;

pub type Tick = u32;

pub const DEFAULT_TICK_RATE: u32 = 60;

/// Boundary to whatever drives the simulation clock on either end.
pub trait TickClock {
    /// Tick the local simulation is currently predicting.
    fn local_tick(&self) -> Tick;

    /// Latest tick known to have been simulated by the authority.
    fn authority_tick(&self) -> Tick;

    /// Duration of one tick in seconds.
    fn tick_delta(&self) -> f32;

    fn round_trip_time(&self) -> Duration;

    /// Number of ticks covered by one round trip, rounded to the nearest tick.
    fn round_trip_ticks(&self) -> Tick {
        let dt = self.tick_delta();
        if dt <= 0.0 {
            return 0;
        }
        (self.round_trip_time().as_secs_f32() / dt).round() as Tick
    }
}

#[derive(Debug, Clone)]
pub struct ManualClock {
    local_tick: Tick,
    authority_tick: Tick,
    tick_delta: f32,
    rtt: Duration,
}

impl ManualClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            local_tick: 0,
            authority_tick: 0,
            tick_delta: 1.0 / tick_rate as f32,
            rtt: Duration::ZERO,
        }
    }

    pub fn advance(&mut self) -> Tick {
        self.local_tick = self.local_tick.wrapping_add(1);
        self.local_tick
    }

    pub fn set_local_tick(&mut self, tick: Tick) {
        self.local_tick = tick;
    }

    pub fn observe_authority_tick(&mut self, tick: Tick) {
        if tick > self.authority_tick {
            self.authority_tick = tick;
        }
    }

    pub fn set_round_trip_time(&mut self, rtt: Duration) {
        self.rtt = rtt;
    }
}

impl TickClock for ManualClock {
    fn local_tick(&self) -> Tick {
        self.local_tick
    }

    fn authority_tick(&self) -> Tick {
        self.authority_tick
    }

    fn tick_delta(&self) -> f32 {
        self.tick_delta
    }

    fn round_trip_time(&self) -> Duration {
        self.rtt
    }
}

/// Accumulates wall-clock time and releases it in whole ticks. A single
/// `accumulate` call counts for at most `MAX_CATCH_UP`.
pub struct FixedTimestep {
    tick_rate: u32,
    tick_duration: Duration,
    accumulator: Duration,
}

impl FixedTimestep {
    pub const MAX_CATCH_UP: Duration = Duration::from_millis(250);

    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            tick_duration: Duration::from_secs_f64(1.0 / tick_rate as f64),
            accumulator: Duration::ZERO,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.min(Self::MAX_CATCH_UP);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            true
        } else {
            false
        }
    }
}
