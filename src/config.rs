//! System configuration parameters
//!
//! All tunable parameters for the PetFeeder system.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Which RFID reader variant is wired to this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderKind {
    /// Two-wire Wiegand-26 access-control reader on the edge-interrupt lines.
    Wiegand,
    /// Serial FDX-B animal-tag reader emitting STX/ETX-framed bytes.
    FdxbFramed,
    /// Serial FDX-B reader emitting CR/LF-terminated ASCII lines.
    FdxbLine,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- RFID ---
    /// Reader variant attached to this board.
    pub reader: ReaderKind,
    /// Reset a stalled Wiegand read after this long without bit activity (ms).
    pub wiegand_idle_reset_ms: u32,

    // --- Door ---
    /// How long after the last tag sighting the door stays open (ms).
    pub tag_timeout_ms: u32,
    /// Servo angle for the open door position (degrees).
    pub servo_open_deg: u8,
    /// Servo angle for the closed door position (degrees).
    pub servo_closed_deg: u8,
    /// Duration of the eased door sweep (ms). 0 = move instantaneously.
    pub servo_sweep_ms: u32,

    // --- Buttons ---
    /// Stable-level window before a button transition is accepted (ms).
    pub debounce_ms: u32,

    // --- Auger ---
    /// Net steps dispensed per scheduled feeding.
    pub dispense_steps: u32,
    /// Forward steps per safe-rotation cycle.
    pub forward_steps: u32,
    /// Backward (jam-shearing) steps per safe-rotation cycle.
    pub backward_steps: u32,
    /// Stepper step rate (full steps per second).  The dispense engine
    /// issues at most one step per control tick, so this is bounded above
    /// by `1000 / control_loop_interval_ms`.
    pub step_rate_hz: u32,

    // --- Timing ---
    /// Main polling loop interval (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Wall-clock schedule evaluation interval (seconds).
    pub schedule_poll_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // RFID
            reader: ReaderKind::Wiegand,
            wiegand_idle_reset_ms: 2000,

            // Door
            tag_timeout_ms: 2000,
            servo_open_deg: 180,
            servo_closed_deg: 0,
            servo_sweep_ms: 0, // snap to position, like the stock firmware

            // Buttons
            debounce_ms: 50,

            // Auger
            dispense_steps: 1200, // one hopper turn
            forward_steps: 200,
            backward_steps: 50,
            step_rate_hz: 100,

            // Timing
            control_loop_interval_ms: 10, // 100 Hz poll
            schedule_poll_secs: 10,
        }
    }
}

impl SystemConfig {
    /// Net auger progress per completed forward/backward cycle.
    pub fn net_steps_per_cycle(&self) -> u32 {
        self.forward_steps.saturating_sub(self.backward_steps)
    }
}
