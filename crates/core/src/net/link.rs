use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::protocol::Channel;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConditions {
    /// Chance in percent (0-100) that an unreliable message is lost.
    pub loss_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl LinkConditions {
    pub fn with_latency(latency_ms: u32) -> Self {
        Self {
            min_latency_ms: latency_ms,
            max_latency_ms: latency_ms,
            ..Default::default()
        }
    }

    fn should_drop(&self, rng: &mut ChaCha8Rng) -> bool {
        if self.loss_percent <= 0.0 {
            return false;
        }
        rng.gen_bool((self.loss_percent.min(100.0) / 100.0) as f64)
    }

    fn delay(&self, rng: &mut ChaCha8Rng) -> Duration {
        let base = self.min_latency_ms;
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let spread = if range > 0 { rng.gen_range(0..=range) } else { 0 };
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis((base + spread + jitter) as u64)
    }

    /// Expected round trip over two links with these conditions.
    pub fn round_trip_estimate(&self) -> Duration {
        let one_way = (self.min_latency_ms + self.max_latency_ms) / 2 + self.jitter_ms / 2;
        Duration::from_millis(2 * one_way as u64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub bytes_sent: u64,
}

#[derive(Debug)]
struct DelayedPayload {
    release_time: Instant,
    order: u64,
    payload: Vec<u8>,
}

impl PartialEq for DelayedPayload {
    fn eq(&self, other: &Self) -> bool {
        self.release_time == other.release_time && self.order == other.order
    }
}

impl Eq for DelayedPayload {}

impl PartialOrd for DelayedPayload {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPayload {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_time
            .cmp(&self.release_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// One direction of an in-process connection. Payloads are released after a
/// simulated latency; unreliable ones may be lost, reliable ones never are and
/// keep their send order.
pub struct LoopbackLink {
    conditions: LinkConditions,
    rng: ChaCha8Rng,
    queue: BinaryHeap<DelayedPayload>,
    next_order: u64,
    last_reliable_release: Option<Instant>,
    stats: LinkStats,
}

impl LoopbackLink {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: ChaCha8Rng::seed_from_u64(seed),
            queue: BinaryHeap::new(),
            next_order: 0,
            last_reliable_release: None,
            stats: LinkStats::default(),
        }
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Returns false when the payload was lost.
    pub fn send(&mut self, payload: Vec<u8>, channel: Channel, now: Instant) -> bool {
        self.stats.sent += 1;
        self.stats.bytes_sent += payload.len() as u64;

        if !channel.is_reliable() && self.conditions.should_drop(&mut self.rng) {
            self.stats.dropped += 1;
            return false;
        }

        let mut release_time = now + self.conditions.delay(&mut self.rng);
        if channel.is_reliable() {
            if let Some(previous) = self.last_reliable_release {
                release_time = release_time.max(previous);
            }
            self.last_reliable_release = Some(release_time);
        }

        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(DelayedPayload {
            release_time,
            order,
            payload,
        });
        true
    }

    pub fn receive(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        while self.queue.peek().is_some_and(|p| p.release_time <= now) {
            if let Some(delayed) = self.queue.pop() {
                payloads.push(delayed.payload);
            }
        }
        self.stats.delivered += payloads.len() as u64;
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_after_latency() {
        let mut link = LoopbackLink::new(LinkConditions::with_latency(50), 1);
        let start = Instant::now();

        assert!(link.send(vec![1], Channel::Unreliable, start));
        assert!(link.receive(start + Duration::from_millis(49)).is_empty());

        let delivered = link.receive(start + Duration::from_millis(50));
        assert_eq!(delivered, vec![vec![1]]);
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn reliable_messages_are_never_lost_and_stay_ordered() {
        let conditions = LinkConditions {
            loss_percent: 100.0,
            min_latency_ms: 10,
            max_latency_ms: 80,
            jitter_ms: 20,
        };
        let mut link = LoopbackLink::new(conditions, 7);
        let start = Instant::now();

        for i in 0..20u8 {
            assert!(!link.send(vec![i], Channel::Unreliable, start));
            assert!(link.send(vec![i], Channel::Reliable, start));
        }

        let delivered = link.receive(start + Duration::from_secs(1));
        let expected: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i]).collect();
        assert_eq!(delivered, expected);
        assert_eq!(link.stats().dropped, 20);
    }

    #[test]
    fn partial_loss_drops_some_unreliable_messages() {
        let conditions = LinkConditions {
            loss_percent: 50.0,
            ..Default::default()
        };
        let mut link = LoopbackLink::new(conditions, 11);
        let start = Instant::now();

        for i in 0..200u8 {
            link.send(vec![i], Channel::Unreliable, start);
        }

        let delivered = link.receive(start).len() as u64;
        let dropped = link.stats().dropped;
        assert_eq!(delivered + dropped, 200);
        assert!((50..=150).contains(&dropped), "dropped {}", dropped);
    }

    #[test]
    fn round_trip_estimate() {
        let conditions = LinkConditions {
            min_latency_ms: 40,
            max_latency_ms: 60,
            ..Default::default()
        };
        assert_eq!(conditions.round_trip_estimate(), Duration::from_millis(100));
    }
}
