use glam::Vec3;

pub type ActorId = u32;

/// Unordered actor pair. `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionKey {
    pub low: ActorId,
    pub high: ActorId,
}

impl CollisionKey {
    pub fn new(a: ActorId, b: ActorId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn involves(&self, actor: ActorId) -> bool {
        self.low == actor || self.high == actor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionResult {
    pub winner: ActorId,
    pub loser: ActorId,
}

impl CollisionResult {
    pub fn involves(&self, actor: ActorId) -> bool {
        self.winner == actor || self.loser == actor
    }
}

/// The faster actor wins. Equal speeds go to `b`.
pub fn resolve(a: ActorId, velocity_a: Vec3, b: ActorId, velocity_b: Vec3) -> CollisionResult {
    if velocity_a.length() > velocity_b.length() {
        CollisionResult {
            winner: a,
            loser: b,
        }
    } else {
        CollisionResult {
            winner: b,
            loser: a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        assert_eq!(CollisionKey::new(7, 2), CollisionKey::new(2, 7));
        assert_eq!(CollisionKey::new(7, 2).low, 2);
        assert!(CollisionKey::new(7, 2).involves(7));
        assert!(!CollisionKey::new(7, 2).involves(3));
    }

    #[test]
    fn faster_actor_wins() {
        let result = resolve(1, Vec3::new(5.0, 0.0, 0.0), 2, Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(result, CollisionResult { winner: 1, loser: 2 });
    }

    #[test]
    fn tie_goes_to_second_actor() {
        let result = resolve(1, Vec3::new(4.0, 0.0, 0.0), 2, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(result, CollisionResult { winner: 2, loser: 1 });

        let still = resolve(9, Vec3::ZERO, 3, Vec3::ZERO);
        assert_eq!(still.winner, 3);
    }
}
