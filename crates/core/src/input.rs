use bitflags::bitflags;
use glam::{Vec2, Vec3};
use rkyv::{Archive, Deserialize, Serialize};

use crate::tick::Tick;

/// Fixed-point scale of the movement axes: 1000 units per full deflection.
pub const AXIS_SCALE: f32 = 1000.0;
pub const MAX_AXIS: i16 = 1000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputButtons: u8 {
        const SPRINT = 1 << 0;
        const JUMP = 1 << 1;
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("axis value out of range at tick {tick}: horizontal={horizontal}, vertical={vertical}")]
    AxisOutOfRange {
        tick: Tick,
        horizontal: i16,
        vertical: i16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputSample {
    pub tick: Tick,
    pub horizontal: i16,
    pub vertical: i16,
    pub buttons: u8,
}

impl InputSample {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    /// Encodes a planar direction (x = horizontal, y = vertical). The direction
    /// is normalized first so diagonals are not faster than straight lines.
    pub fn from_direction(tick: Tick, direction: Vec2, sprint: bool, jump: bool) -> Self {
        let dir = direction.normalize_or_zero();
        let mut sample = Self {
            tick,
            horizontal: (dir.x.clamp(-1.0, 1.0) * AXIS_SCALE) as i16,
            vertical: (dir.y.clamp(-1.0, 1.0) * AXIS_SCALE) as i16,
            buttons: 0,
        };
        sample.set_button(InputButtons::SPRINT, sprint);
        sample.set_button(InputButtons::JUMP, jump);
        sample
    }

    /// Copy of this sample re-stamped for another tick, used when a missing
    /// tick is extrapolated from an earlier sample.
    pub fn retimed(&self, tick: Tick) -> Self {
        Self { tick, ..*self }
    }

    pub fn buttons(&self) -> InputButtons {
        InputButtons::from_bits_truncate(self.buttons)
    }

    #[inline]
    pub fn set_button(&mut self, button: InputButtons, value: bool) {
        let mut buttons = self.buttons();
        buttons.set(button, value);
        self.buttons = buttons.bits();
    }

    #[inline]
    pub fn sprint(&self) -> bool {
        self.buttons().contains(InputButtons::SPRINT)
    }

    #[inline]
    pub fn jump(&self) -> bool {
        self.buttons().contains(InputButtons::JUMP)
    }

    /// Movement direction on the horizontal plane (y is always zero).
    pub fn direction(&self) -> Vec3 {
        Vec3::new(
            self.horizontal as f32 / AXIS_SCALE,
            0.0,
            self.vertical as f32 / AXIS_SCALE,
        )
    }

    /// Whether the owner should record and send this sample at all.
    pub fn is_active(&self) -> bool {
        self.horizontal != 0 || self.vertical != 0 || self.jump()
    }

    pub fn validate(&self, max_axis: i16) -> Result<(), InputError> {
        if self.horizontal.unsigned_abs() > max_axis.unsigned_abs()
            || self.vertical.unsigned_abs() > max_axis.unsigned_abs()
        {
            return Err(InputError::AxisOutOfRange {
                tick: self.tick,
                horizontal: self.horizontal,
                vertical: self.vertical,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_encoding() {
        let sample = InputSample::from_direction(3, Vec2::new(1.0, 0.0), true, false);

        assert_eq!(sample.tick, 3);
        assert_eq!(sample.horizontal, 1000);
        assert_eq!(sample.vertical, 0);
        assert!(sample.sprint());
        assert!(!sample.jump());
        assert!((sample.direction() - Vec3::X).length() < 0.001);
    }

    #[test]
    fn diagonal_is_normalized() {
        let sample = InputSample::from_direction(0, Vec2::new(1.0, 1.0), false, false);
        let expected = (std::f32::consts::FRAC_1_SQRT_2 * AXIS_SCALE) as i16;
        assert_eq!(sample.horizontal, expected);
        assert_eq!(sample.vertical, expected);
    }

    #[test]
    fn idle_unless_moving_or_jumping() {
        assert!(!InputSample::new(0).is_active());
        assert!(InputSample::from_direction(0, Vec2::ZERO, false, true).is_active());
        assert!(!InputSample::from_direction(0, Vec2::ZERO, true, false).is_active());
    }

    #[test]
    fn bounds_check() {
        let mut sample = InputSample::new(9);
        sample.horizontal = 1000;
        sample.vertical = -1000;
        assert!(sample.validate(MAX_AXIS).is_ok());

        sample.vertical = -1001;
        assert_eq!(
            sample.validate(MAX_AXIS),
            Err(InputError::AxisOutOfRange {
                tick: 9,
                horizontal: 1000,
                vertical: -1001,
            })
        );

        sample.vertical = i16::MIN;
        assert!(sample.validate(MAX_AXIS).is_err());
    }

    #[test]
    fn retimed_keeps_axes() {
        let sample = InputSample::from_direction(4, Vec2::new(0.0, -1.0), false, true);
        let copy = sample.retimed(11);
        assert_eq!(copy.tick, 11);
        assert_eq!(copy.vertical, sample.vertical);
        assert!(copy.jump());
    }
}
