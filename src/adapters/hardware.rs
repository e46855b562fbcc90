//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the servo, stepper, and LED drivers and the button GPIOs,
//! exposing them through [`InputPort`] and [`ActuatorPort`].  This is the
//! only module besides the drivers that touches actual hardware.  On
//! non-espidf targets, the underlying drivers use cfg-gated simulation
//! stubs.

use crate::app::ports::{ActuatorPort, InputPort, InputSnapshot};
use crate::drivers::hw_init;
use crate::drivers::servo::ServoDriver;
use crate::drivers::status_led::StatusLed;
use crate::drivers::stepper::StepperDriver;
use crate::pins;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    servo: ServoDriver,
    stepper: StepperDriver,
    led: StatusLed,
    /// Most recent tick timestamp, used to time-stamp servo commands.
    now_ms: u32,
}

impl HardwareAdapter {
    pub fn new(servo: ServoDriver, stepper: StepperDriver, led: StatusLed) -> Self {
        Self {
            servo,
            stepper,
            led,
            now_ms: 0,
        }
    }

    /// Current servo horn angle (for diagnostics and the boot self-test).
    pub fn door_angle_deg(&self) -> f32 {
        self.servo.angle_deg()
    }

    /// Signed auger position in full steps since boot.
    pub fn auger_position(&self) -> i64 {
        self.stepper.position()
    }
}

// ── InputPort implementation ──────────────────────────────────

impl InputPort for HardwareAdapter {
    fn read_inputs(&mut self) -> InputSnapshot {
        // Buttons are active-low behind pull-ups.
        InputSnapshot {
            door_button_pressed: !hw_init::gpio_read(pins::DOOR_BUTTON_GPIO),
            feed_button_pressed: !hw_init::gpio_read(pins::FEED_BUTTON_GPIO),
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_door_angle(&mut self, deg: u8) {
        // The driver handles instantaneous vs. eased motion.
        self.servo.command(deg, self.now_ms);
    }

    fn door_motion_tick(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
        self.servo.tick(now_ms);
    }

    fn auger_enable(&mut self) {
        self.stepper.enable();
    }

    fn auger_disable(&mut self) {
        self.stepper.disable();
    }

    fn auger_step(&mut self, forward: bool) {
        self.stepper.step(forward);
    }

    fn set_led(&mut self, lit: bool) {
        self.led.set(lit);
    }

    fn all_off(&mut self) {
        self.stepper.disable();
        self.led.set(false);
    }
}
