//! Auger stepper driver (NEMA 17 behind an L298N H-bridge pair).
//!
//! Full-step, two-coils-on sequencing over four GPIO outputs plus two
//! active-high enable lines.  One `step()` call advances the rotor by one
//! full step; pacing is the caller's job (the dispense engine issues at
//! most one step per control tick).
//!
//! The enables are dropped whenever the auger is idle — the mechanism
//! needs no holding torque at rest and the L298N runs hot when energised.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives coil and enable GPIOs via hw_init helpers.
//! On host/test: tracks phase/position in-memory only.

use crate::drivers::hw_init;
use crate::pins;

/// Full-step sequence, two coils energised per phase (AB → BC → CD → DA).
const FULL_STEP_SEQ: [[bool; 4]; 4] = [
    [true, true, false, false],
    [false, true, true, false],
    [false, false, true, true],
    [true, false, false, true],
];

pub struct StepperDriver {
    /// Index into [`FULL_STEP_SEQ`].
    phase: u8,
    enabled: bool,
    /// Signed step count since boot (forward = +1).
    position: i64,
}

impl StepperDriver {
    pub fn new() -> Self {
        Self {
            phase: 0,
            enabled: false,
            position: 0,
        }
    }

    /// Raise both L298N enables.  Must precede stepping.
    pub fn enable(&mut self) {
        hw_init::gpio_write(pins::STEPPER_ENA_GPIO, true);
        hw_init::gpio_write(pins::STEPPER_ENB_GPIO, true);
        self.enabled = true;
    }

    /// Drop both enables.  Coils de-energise; position is retained.
    pub fn disable(&mut self) {
        hw_init::gpio_write(pins::STEPPER_ENA_GPIO, false);
        hw_init::gpio_write(pins::STEPPER_ENB_GPIO, false);
        self.enabled = false;
    }

    /// Advance one full step.  No-op while the driver is disabled.
    pub fn step(&mut self, forward: bool) {
        if !self.enabled {
            return;
        }

        if forward {
            self.phase = (self.phase + 1) % 4;
            self.position += 1;
        } else {
            self.phase = (self.phase + 3) % 4;
            self.position -= 1;
        }
        self.apply_phase();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Signed full-step count since boot.
    pub fn position(&self) -> i64 {
        self.position
    }

    fn apply_phase(&self) {
        let coils = FULL_STEP_SEQ[self.phase as usize];
        hw_init::gpio_write(pins::STEPPER_IN1_GPIO, coils[0]);
        hw_init::gpio_write(pins::STEPPER_IN2_GPIO, coils[1]);
        hw_init::gpio_write(pins::STEPPER_IN3_GPIO, coils[2]);
        hw_init::gpio_write(pins::STEPPER_IN4_GPIO, coils[3]);
    }
}
