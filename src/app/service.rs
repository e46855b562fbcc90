//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the RFID decoder, the door arbiter, the feed
//! scheduler, and the dispense engine.  It exposes a clean,
//! hardware-agnostic API; all I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  InputPort ───▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  (buttons)      │          AppService          │
//!  RFID bytes ──▶ │ decoder · door · sched · feed │
//! ActuatorPort ◀──└──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::door::{DoorArbiter, DoorCommand, DoorState};
use crate::drivers::button::{DebouncedInput, Transition};
use crate::error::ScheduleError;
use crate::feeder::FeedEngine;
use crate::rfid::{ReaderDecoder, RfidDecoder};
use crate::scheduler::{FeedScheduler, ScheduledTask, TaskName, WallClock, MAX_TASKS};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, InputPort, SchedulerDelegate};

/// Delegate that collects fired task names for processing after the
/// scheduler borrow ends.
struct FiredNames(heapless::Vec<TaskName, MAX_TASKS>);

impl SchedulerDelegate for FiredNames {
    fn on_schedule_fired(&mut self, name: &str) {
        let _ = self.0.push(TaskName::try_from(name).unwrap_or_default());
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    decoder: ReaderDecoder,
    door: DoorArbiter,
    scheduler: FeedScheduler,
    feeder: FeedEngine,
    door_button: DebouncedInput,
    feed_button: DebouncedInput,
    tick_count: u64,
    config_dirty: bool,
    dirty_since_tick: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch hardware — call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        let decoder = ReaderDecoder::from_config(config.reader, config.wiegand_idle_reset_ms);
        let door = DoorArbiter::new(config.tag_timeout_ms);
        let feeder = FeedEngine::new(&config);
        let door_button = DebouncedInput::new(config.debounce_ms);
        let feed_button = DebouncedInput::new(config.debounce_ms);

        Self {
            config,
            decoder,
            door,
            scheduler: FeedScheduler::new(),
            feeder,
            door_button,
            feed_button,
            tick_count: 0,
            config_dirty: false,
            dirty_since_tick: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the actuators to their safe resting state and announce start.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.set_door_angle(self.config.servo_closed_deg);
        hw.set_led(false);
        hw.auger_disable();
        sink.emit(&AppEvent::Started);
        info!("AppService started (reader: {:?})", self.config.reader);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: reader → buttons → arbiter → motion.
    ///
    /// The `hw` parameter satisfies **both** [`InputPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl InputPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev_door = self.door.state();

        // 1. Drain the reader.  Every completed emission is a presence
        //    signal, parity-failed Wiegand reads included.
        if let Some(tag) = self.decoder.poll(now_ms) {
            sink.emit(&AppEvent::TagRead {
                id: tag.id.clone(),
                valid: tag.valid,
            });
            if let Some(cmd) = self.door.on_tag(now_ms) {
                self.apply_door(cmd, hw);
            }
        }

        // 2. Buttons through their debouncers.
        let inputs = hw.read_inputs();

        if let Some(t) = self.door_button.poll(inputs.door_button_pressed, now_ms) {
            let pressed = t == Transition::Pressed;
            if let Some(cmd) = self.door.on_button(pressed, now_ms) {
                self.apply_door(cmd, hw);
            }
        }

        if let Some(t) = self.feed_button.poll(inputs.feed_button_pressed, now_ms) {
            match t {
                Transition::Pressed => {
                    self.feeder.start_hold(hw);
                }
                Transition::Released => self.feeder.set_button_held(false),
            }
        }

        // 3. Tag-timeout close.
        if let Some(cmd) = self.door.tick(now_ms) {
            self.apply_door(cmd, hw);
        }

        // 4. Advance motion: eased door sweep and at most one auger step.
        hw.door_motion_tick(now_ms);
        if let Some(done) = self.feeder.tick(now_ms, hw) {
            sink.emit(&AppEvent::DispenseComplete {
                net_steps: done.net_steps,
            });
        }

        // 5. Announce arbiter movement.
        let new_door = self.door.state();
        if new_door != prev_door {
            sink.emit(&AppEvent::DoorChanged {
                from: prev_door,
                to: new_door,
            });
        }
    }

    /// Feed one raw byte from the reader UART into the decoder.
    pub fn feed_rfid_byte(&mut self, byte: u8) {
        self.decoder.feed_byte(byte);
    }

    // ── Schedule evaluation ───────────────────────────────────

    /// Match the schedule against fresh wall-clock fields.  Call once per
    /// schedule-poll interval (coarser than a minute misses matches).
    pub fn evaluate_schedule(
        &mut self,
        now: &WallClock,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let mut fired = FiredNames(heapless::Vec::new());
        self.scheduler.evaluate(now, &mut fired);

        for name in &fired.0 {
            sink.emit(&AppEvent::ScheduleFired { name: name.clone() });
            self.start_dispense(self.config.dispense_steps, hw, sink);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the gateway, a console, tests).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::Dispense { net_steps } => {
                self.start_dispense(net_steps, hw, sink);
            }
            AppCommand::ReplaceTasks(tasks) => {
                if let Err(e) = self.replace_tasks(&tasks, sink) {
                    warn!("task replace rejected: {}", e);
                }
            }
            AppCommand::UpdateConfig(new_config) => {
                self.apply_config(new_config, hw);
                self.mark_config_dirty();
                info!("Configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                self.dirty_since_tick = 0;
                self.mark_config_dirty();
                info!("Explicit config save requested (will flush on next auto-save check)");
            }
        }
    }

    /// Replace the schedule atomically.  The previous list survives any
    /// rejection untouched.
    pub fn replace_tasks(
        &mut self,
        tasks: &[ScheduledTask],
        sink: &mut impl EventSink,
    ) -> Result<usize, ScheduleError> {
        let count = self.scheduler.replace_tasks(tasks)?;
        sink.emit(&AppEvent::TasksReplaced { count });
        Ok(count)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current door arbiter state.
    pub fn door_state(&self) -> DoorState {
        self.door.state()
    }

    /// The stored schedule.
    pub fn tasks(&self) -> &[ScheduledTask] {
        self.scheduler.tasks()
    }

    /// True while a dispense job is running.
    pub fn is_dispensing(&self) -> bool {
        self.feeder.is_active()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_door(&mut self, cmd: DoorCommand, hw: &mut impl ActuatorPort) {
        match cmd {
            DoorCommand::Open => {
                hw.set_door_angle(self.config.servo_open_deg);
                hw.set_led(true);
            }
            DoorCommand::Close => {
                hw.set_door_angle(self.config.servo_closed_deg);
                hw.set_led(false);
            }
        }
    }

    fn start_dispense(
        &mut self,
        net_steps: u32,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.feeder.start_dispense(net_steps, hw) {
            sink.emit(&AppEvent::DispenseStarted {
                target_net_steps: net_steps,
            });
        } else {
            warn!("dispense refused: auger already running");
            sink.emit(&AppEvent::DispenseRefused);
        }
    }

    /// Rebuild the domain components around a new configuration.  Domain
    /// state resets to the safe baseline (door closed, auger idle).
    fn apply_config(&mut self, config: SystemConfig, hw: &mut impl ActuatorPort) {
        self.decoder = ReaderDecoder::from_config(config.reader, config.wiegand_idle_reset_ms);
        self.door = DoorArbiter::new(config.tag_timeout_ms);
        self.feeder = FeedEngine::new(&config);
        self.door_button = DebouncedInput::new(config.debounce_ms);
        self.feed_button = DebouncedInput::new(config.debounce_ms);
        hw.set_door_angle(config.servo_closed_deg);
        hw.set_led(false);
        hw.auger_disable();
        self.config = config;
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_tick = self.tick_count;
        }
    }

    /// Check if auto-save should trigger (5 seconds after last change).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl super::ports::ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        let secs_since_dirty =
            ticks_since_dirty as f32 * self.config.control_loop_interval_ms as f32 / 1000.0;
        if secs_since_dirty < 5.0 {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
