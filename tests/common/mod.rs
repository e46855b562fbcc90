//! Mock hardware adapter for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO/PWM registers.  Button levels are
//! plain public fields the test flips between ticks.

use petfeeder::app::events::AppEvent;
use petfeeder::app::ports::{ActuatorPort, EventSink, InputPort, InputSnapshot};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActCall {
    DoorAngle(u8),
    AugerEnable,
    AugerDisable,
    AugerStep { forward: bool },
    Led(bool),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActCall>,

    /// Raw (pre-debounce) levels fed to the service each tick.
    pub door_button: bool,
    pub feed_button: bool,

    pub door_angle: u8,
    pub led: bool,
    pub auger_enabled: bool,
    pub steps_forward: u32,
    pub steps_backward: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            door_button: false,
            feed_button: false,
            door_angle: 0,
            led: false,
            auger_enabled: false,
            steps_forward: 0,
            steps_backward: 0,
        }
    }

    pub fn door_open(&self) -> bool {
        self.door_angle > 0
    }

    pub fn net_steps(&self) -> i64 {
        i64::from(self.steps_forward) - i64::from(self.steps_backward)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPort for MockHardware {
    fn read_inputs(&mut self) -> InputSnapshot {
        InputSnapshot {
            door_button_pressed: self.door_button,
            feed_button_pressed: self.feed_button,
        }
    }
}

impl ActuatorPort for MockHardware {
    fn set_door_angle(&mut self, deg: u8) {
        self.door_angle = deg;
        self.calls.push(ActCall::DoorAngle(deg));
    }

    fn door_motion_tick(&mut self, _now_ms: u32) {
        // Instant motion in the mock.
    }

    fn auger_enable(&mut self) {
        self.auger_enabled = true;
        self.calls.push(ActCall::AugerEnable);
    }

    fn auger_disable(&mut self) {
        self.auger_enabled = false;
        self.calls.push(ActCall::AugerDisable);
    }

    fn auger_step(&mut self, forward: bool) {
        assert!(self.auger_enabled, "auger stepped while driver disabled");
        if forward {
            self.steps_forward += 1;
        } else {
            self.steps_backward += 1;
        }
        self.calls.push(ActCall::AugerStep { forward });
    }

    fn set_led(&mut self, lit: bool) {
        self.led = lit;
        self.calls.push(ActCall::Led(lit));
    }

    fn all_off(&mut self) {
        self.auger_enabled = false;
        self.led = false;
        self.calls.push(ActCall::AllOff);
    }
}

// ── Recording event sink ──────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count_matching(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
