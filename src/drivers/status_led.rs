//! Door status LED driver.
//!
//! Single digital LED, lit while the feeder door is open.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LED GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    lit: bool,
}

impl StatusLed {
    pub fn new() -> Self {
        hw_init::gpio_write(pins::STATUS_LED_GPIO, false);
        Self { lit: false }
    }

    pub fn set(&mut self, lit: bool) {
        if lit != self.lit {
            hw_init::gpio_write(pins::STATUS_LED_GPIO, lit);
            self.lit = lit;
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
