//! Feeder door servo driver.
//!
//! Standard 50 Hz hobby servo on an LEDC PWM channel.  Commands are target
//! angles; motion is either instantaneous (`sweep_ms == 0`, matching the
//! stock firmware) or an eased multi-step sweep advanced by `tick()` from
//! the main loop.
//!
//! A new command retargets an in-flight sweep immediately — door priority
//! and timeout transitions are never blocked by a running move.  A sweep
//! that reaches its target parks there until the next command.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channel via hw_init helpers.
//! On host/test: tracks the angle in-memory only.

use crate::drivers::hw_init;

pub struct ServoDriver {
    /// Angle currently applied to the horn (degrees, fractional during sweeps).
    current_deg: f32,
    /// Commanded end position.
    target_deg: u8,
    /// Sweep origin and start time for easing.
    sweep_from_deg: f32,
    sweep_started_ms: u32,
    sweep_ms: u32,
    moving: bool,
}

impl ServoDriver {
    /// Create the driver and drive the horn to `initial_deg` immediately.
    pub fn new(initial_deg: u8, sweep_ms: u32) -> Self {
        hw_init::servo_write_deg(initial_deg as f32);
        Self {
            current_deg: initial_deg as f32,
            target_deg: initial_deg,
            sweep_from_deg: initial_deg as f32,
            sweep_started_ms: 0,
            sweep_ms,
            moving: false,
        }
    }

    /// Command a new target angle.  Retargets any sweep in progress.
    pub fn command(&mut self, target_deg: u8, now_ms: u32) {
        if target_deg == self.target_deg && !self.moving {
            return;
        }
        self.target_deg = target_deg;

        if self.sweep_ms == 0 {
            self.current_deg = target_deg as f32;
            self.moving = false;
            hw_init::servo_write_deg(self.current_deg);
        } else {
            self.sweep_from_deg = self.current_deg;
            self.sweep_started_ms = now_ms;
            self.moving = true;
        }
    }

    /// Advance an eased sweep.  Call once per control tick; a no-op when
    /// the horn is parked.
    pub fn tick(&mut self, now_ms: u32) {
        if !self.moving {
            return;
        }

        let elapsed = now_ms.wrapping_sub(self.sweep_started_ms);
        if elapsed >= self.sweep_ms {
            self.current_deg = self.target_deg as f32;
            self.moving = false;
        } else {
            // Smoothstep ease-in/ease-out.
            let t = elapsed as f32 / self.sweep_ms as f32;
            let eased = t * t * (3.0 - 2.0 * t);
            let span = self.target_deg as f32 - self.sweep_from_deg;
            self.current_deg = self.sweep_from_deg + span * eased;
        }
        hw_init::servo_write_deg(self.current_deg);
    }

    /// Angle currently applied to the horn.
    pub fn angle_deg(&self) -> f32 {
        self.current_deg
    }

    /// Commanded end position.
    pub fn target_deg(&self) -> u8 {
        self.target_deg
    }

    /// True while an eased sweep is in flight.
    pub fn is_moving(&self) -> bool {
        self.moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_mode_snaps_to_target() {
        let mut servo = ServoDriver::new(0, 0);
        servo.command(180, 1000);
        assert!(!servo.is_moving());
        assert_eq!(servo.angle_deg(), 180.0);
    }

    #[test]
    fn eased_sweep_reaches_target() {
        let mut servo = ServoDriver::new(0, 300);
        servo.command(180, 0);
        assert!(servo.is_moving());

        servo.tick(150);
        let mid = servo.angle_deg();
        assert!(mid > 0.0 && mid < 180.0, "midpoint angle was {mid}");

        servo.tick(300);
        assert!(!servo.is_moving());
        assert_eq!(servo.angle_deg(), 180.0);
    }

    #[test]
    fn easing_is_slower_at_the_ends() {
        let mut servo = ServoDriver::new(0, 400);
        servo.command(180, 0);

        servo.tick(40); // first 10%
        let early = servo.angle_deg();
        servo.tick(200); // midpoint
        let mid = servo.angle_deg();
        servo.tick(240);
        let past_mid = servo.angle_deg();

        // 10% of time should cover less than 10% of travel at the start,
        // and more than 10% of travel through the middle.
        assert!(early < 18.0, "early angle was {early}");
        assert!(past_mid - mid > 18.0, "mid-sweep delta was {}", past_mid - mid);
    }

    #[test]
    fn retarget_mid_sweep_takes_over() {
        let mut servo = ServoDriver::new(0, 300);
        servo.command(180, 0);
        servo.tick(150);
        let mid = servo.angle_deg();

        // Close command arrives mid-open (button released / timeout).
        servo.command(0, 150);
        assert!(servo.is_moving());
        servo.tick(450);
        assert_eq!(servo.angle_deg(), 0.0);
        assert!(mid > 0.0);
    }

    #[test]
    fn parked_sweep_is_not_reentered() {
        let mut servo = ServoDriver::new(0, 300);
        servo.command(180, 0);
        servo.tick(300);
        assert!(!servo.is_moving());
        // Further ticks must not restart motion.
        servo.tick(600);
        servo.tick(900);
        assert!(!servo.is_moving());
        assert_eq!(servo.angle_deg(), 180.0);
    }
}
