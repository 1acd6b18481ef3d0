use std::collections::HashSet;

use glam::Vec3;

use super::key::ActorId;

/// Enter-edge contact detection against peer actors.
#[derive(Debug, Clone)]
pub struct ContactSensor {
    radius: f32,
    touching: HashSet<ActorId>,
}

impl ContactSensor {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            touching: HashSet::new(),
        }
    }

    /// Returns the peers that came into contact since the last call. A peer
    /// that stays in range is reported once; it must leave before reporting again.
    pub fn detect(
        &mut self,
        position: Vec3,
        peers: impl IntoIterator<Item = (ActorId, Vec3)>,
    ) -> Vec<ActorId> {
        let mut entered = Vec::new();
        let mut touching = HashSet::new();
        for (peer, peer_position) in peers {
            if position.distance(peer_position) > self.radius {
                continue;
            }
            touching.insert(peer);
            if !self.touching.contains(&peer) {
                entered.push(peer);
            }
        }
        self.touching = touching;
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_on_enter_only() {
        let mut sensor = ContactSensor::new(1.0);
        let me = Vec3::ZERO;

        assert!(sensor.detect(me, [(2, Vec3::new(3.0, 0.0, 0.0))]).is_empty());
        assert_eq!(sensor.detect(me, [(2, Vec3::new(0.8, 0.0, 0.0))]), vec![2]);
        assert!(sensor.detect(me, [(2, Vec3::new(0.5, 0.0, 0.0))]).is_empty());

        assert!(sensor.detect(me, [(2, Vec3::new(1.5, 0.0, 0.0))]).is_empty());
        assert_eq!(sensor.detect(me, [(2, Vec3::new(1.0, 0.0, 0.0))]), vec![2]);
    }

    #[test]
    fn tracks_peers_independently() {
        let mut sensor = ContactSensor::new(1.0);
        let near = Vec3::new(0.5, 0.0, 0.0);
        let far = Vec3::new(5.0, 0.0, 0.0);

        assert_eq!(sensor.detect(Vec3::ZERO, [(2, near), (3, far)]), vec![2]);
        assert_eq!(sensor.detect(Vec3::ZERO, [(2, near), (3, near)]), vec![3]);
    }
}
