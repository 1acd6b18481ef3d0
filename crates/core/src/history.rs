use crate::tick::Tick;

pub const HISTORY_CAPACITY: usize = 1024;

/// Ring buffer keyed by tick. A slot only answers for the exact tick that was
/// last written to it, so lookups after wrap-around report absent.
#[derive(Debug, Clone)]
pub struct TickHistory<T> {
    slots: Vec<Option<(Tick, T)>>,
    capacity: usize,
}

impl<T> Default for TickHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl<T> TickHistory<T> {
    /// Creates a history holding `capacity` ticks, at least one.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            log::warn!("History capacity of zero requested, using one slot");
        }
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index(&self, tick: Tick) -> usize {
        (tick as usize) % self.capacity
    }

    pub fn record(&mut self, tick: Tick, value: T) {
        let index = self.index(tick);
        self.slots[index] = Some((tick, value));
    }

    pub fn get(&self, tick: Tick) -> Option<&T> {
        match &self.slots[self.index(tick)] {
            Some((stored, value)) if *stored == tick => Some(value),
            _ => None,
        }
    }

    pub fn latest_at_or_before(&self, tick: Tick) -> Option<(Tick, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|(stored, _)| *stored <= tick)
            .max_by_key(|(stored, _)| *stored)
            .map(|(stored, value)| (*stored, value))
    }

    pub fn earliest(&self) -> Option<(Tick, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .min_by_key(|(stored, _)| *stored)
            .map(|(stored, value)| (*stored, value))
    }

    pub fn latest(&self) -> Option<(Tick, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .max_by_key(|(stored, _)| *stored)
            .map(|(stored, value)| (*stored, value))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn o1_lookup() {
        let mut history = TickHistory::new(64);

        for tick in 0..100u32 {
            history.record(tick, tick * 10);
        }

        assert_eq!(history.get(50), Some(&500));
        assert!(history.get(30).is_none());
        assert_eq!(history.len(), 64);
    }

    #[test]
    fn sample_survives_until_overwritten_by_wrap() {
        let mut history = TickHistory::new(HISTORY_CAPACITY);
        history.record(7, 'a');

        for tick in 8..(7 + HISTORY_CAPACITY as Tick) {
            history.record(tick, 'b');
        }
        assert_eq!(history.get(7), Some(&'a'));

        history.record(7 + HISTORY_CAPACITY as Tick, 'c');
        assert!(history.get(7).is_none());
        assert_eq!(history.get(7 + HISTORY_CAPACITY as Tick), Some(&'c'));

        history.record(7 + 3 * HISTORY_CAPACITY as Tick, 'd');
        assert!(history.get(7 + HISTORY_CAPACITY as Tick).is_none());
    }

    #[test]
    fn nearest_earlier_sample() {
        let mut history = TickHistory::new(64);
        history.record(10, 1);
        history.record(20, 2);
        history.record(30, 3);

        assert_eq!(history.latest_at_or_before(25), Some((20, &2)));
        assert_eq!(history.latest_at_or_before(30), Some((30, &3)));
        assert!(history.latest_at_or_before(5).is_none());
        assert_eq!(history.earliest(), Some((10, &1)));
        assert_eq!(history.latest(), Some((30, &3)));
    }

    #[test]
    fn zero_capacity_holds_one_slot() {
        let mut history = TickHistory::new(0);
        assert_eq!(history.capacity(), 1);

        history.record(5, 'a');
        history.record(6, 'b');
        assert!(history.get(5).is_none());
        assert_eq!(history.get(6), Some(&'b'));
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut history = TickHistory::new(8);
        history.record(1, ());
        history.record(2, ());
        history.clear();

        assert!(history.is_empty());
        assert!(history.get(1).is_none());
    }
}
