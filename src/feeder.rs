//! Auger safe-rotation dispense engine.
//!
//! Feed pellets jam augers.  Instead of one continuous rotation, the
//! engine cycles forward `FORWARD_STEPS`, then backward `BACKWARD_STEPS`
//! to shear anything wedged in the spiral, and counts only the net gain
//! toward the target:
//!
//! ```text
//! ┌──────▶ Forward (200 steps) ──▶ Backward (50 steps) ──┐
//! │                                                       │ net += 150
//! └────────────── until net ≥ target ◀────────────────────┘
//! ```
//!
//! The engine is a resumable job: `tick()` issues **at most one** motor
//! step per call, paced to the configured step rate, so the main loop
//! keeps polling buttons, the reader, and the scheduler while a dispense
//! runs.  The motor driver is enabled for the lifetime of a job and
//! disabled the moment it ends — no holding torque at rest.
//!
//! Two job kinds:
//! - a scheduled dispense runs to a fixed net-step target;
//! - a button-held job cycles indefinitely, re-examining the hold state at
//!   every cycle boundary (there is no mid-cycle cancellation — the
//!   backward shear always completes so the auger never parks wedged).

use log::info;

use crate::app::ports::ActuatorPort;
use crate::config::SystemConfig;

/// Where the engine is inside one safe-rotation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Forward { remaining: u32 },
    Backward { remaining: u32 },
}

/// Emitted by [`FeedEngine::tick`] when a job ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispenseComplete {
    /// Net steps actually delivered.
    pub net_steps: u32,
}

pub struct FeedEngine {
    phase: Phase,
    forward_steps: u32,
    backward_steps: u32,
    /// Minimum time between motor steps.
    step_period_ms: u32,
    last_step_ms: u32,

    /// Net steps accumulated by completed cycles of the current job.
    net_done: u32,
    /// Target for a scheduled dispense; ignored in hold mode.
    target_net: u32,
    /// True for a button-held job (runs while held, checked per cycle).
    hold_mode: bool,
    button_held: bool,
}

impl FeedEngine {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            phase: Phase::Idle,
            forward_steps: config.forward_steps,
            backward_steps: config.backward_steps,
            step_period_ms: 1000 / config.step_rate_hz.max(1),
            last_step_ms: 0,
            net_done: 0,
            target_net: 0,
            hold_mode: false,
            button_held: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Net steps delivered by the job in progress.
    pub fn net_done(&self) -> u32 {
        self.net_done
    }

    /// Begin a fixed-target dispense.  Returns `false` (and does nothing)
    /// if a job is already running — one mechanical actuator, one job.
    pub fn start_dispense(&mut self, target_net: u32, hw: &mut impl ActuatorPort) -> bool {
        if self.is_active() {
            return false;
        }
        info!("feeder: dispensing {} net steps", target_net);
        self.begin_job(target_net, false, hw);
        true
    }

    /// Begin a button-held job.  No-op while any job is active.
    pub fn start_hold(&mut self, hw: &mut impl ActuatorPort) -> bool {
        if self.is_active() {
            // Already dispensing: just note the hold so an interruptible
            // job keeps cycling.
            self.button_held = true;
            return false;
        }
        info!("feeder: button hold, cycling until release");
        self.begin_job(0, true, hw);
        true
    }

    /// Record the debounced feed-button level.  A held job stops at its
    /// next cycle boundary after release.
    pub fn set_button_held(&mut self, held: bool) {
        self.button_held = held;
    }

    /// Advance the job by at most one motor step.  Call once per control
    /// tick; returns a completion report on the tick the job ends.
    pub fn tick(&mut self, now_ms: u32, hw: &mut impl ActuatorPort) -> Option<DispenseComplete> {
        if self.phase == Phase::Idle {
            return None;
        }
        if now_ms.wrapping_sub(self.last_step_ms) < self.step_period_ms {
            return None;
        }
        self.last_step_ms = now_ms;

        match self.phase {
            Phase::Idle => None,

            Phase::Forward { remaining } => {
                hw.auger_step(true);
                let remaining = remaining - 1;
                self.phase = if remaining == 0 {
                    if self.backward_steps == 0 {
                        return self.finish_cycle(hw);
                    }
                    Phase::Backward {
                        remaining: self.backward_steps,
                    }
                } else {
                    Phase::Forward { remaining }
                };
                None
            }

            Phase::Backward { remaining } => {
                hw.auger_step(false);
                let remaining = remaining - 1;
                if remaining == 0 {
                    return self.finish_cycle(hw);
                }
                self.phase = Phase::Backward { remaining };
                None
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_job(&mut self, target_net: u32, hold_mode: bool, hw: &mut impl ActuatorPort) {
        self.net_done = 0;
        self.target_net = target_net;
        self.hold_mode = hold_mode;
        self.button_held = hold_mode;
        self.phase = Phase::Forward {
            remaining: self.forward_steps,
        };
        hw.auger_enable();
    }

    /// One forward/backward cycle just completed: bank the net gain and
    /// decide whether to run another.
    fn finish_cycle(&mut self, hw: &mut impl ActuatorPort) -> Option<DispenseComplete> {
        self.net_done += self.forward_steps - self.backward_steps;

        let another = if self.hold_mode {
            self.button_held
        } else {
            self.net_done < self.target_net
        };

        if another {
            self.phase = Phase::Forward {
                remaining: self.forward_steps,
            };
            return None;
        }

        self.phase = Phase::Idle;
        hw.auger_disable();
        info!("feeder: job complete, {} net steps", self.net_done);
        Some(DispenseComplete {
            net_steps: self.net_done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;

    /// Minimal recording actuator.
    struct MockAuger {
        enabled: bool,
        enables: u32,
        disables: u32,
        forward: u32,
        backward: u32,
    }

    impl MockAuger {
        fn new() -> Self {
            Self {
                enabled: false,
                enables: 0,
                disables: 0,
                forward: 0,
                backward: 0,
            }
        }
    }

    impl ActuatorPort for MockAuger {
        fn set_door_angle(&mut self, _deg: u8) {}
        fn door_motion_tick(&mut self, _now_ms: u32) {}
        fn auger_enable(&mut self) {
            self.enabled = true;
            self.enables += 1;
        }
        fn auger_disable(&mut self) {
            self.enabled = false;
            self.disables += 1;
        }
        fn auger_step(&mut self, forward: bool) {
            assert!(self.enabled, "stepped while driver disabled");
            if forward {
                self.forward += 1;
            } else {
                self.backward += 1;
            }
        }
        fn set_led(&mut self, _lit: bool) {}
        fn all_off(&mut self) {
            self.enabled = false;
        }
    }

    fn config() -> SystemConfig {
        SystemConfig {
            forward_steps: 200,
            backward_steps: 50,
            step_rate_hz: 100,
            ..SystemConfig::default()
        }
    }

    /// Run ticks at the step period until the engine goes idle.
    fn run_to_completion(
        engine: &mut FeedEngine,
        hw: &mut MockAuger,
        start_ms: u32,
    ) -> Option<DispenseComplete> {
        let mut now = start_ms;
        for _ in 0..1_000_000 {
            if let Some(done) = engine.tick(now, hw) {
                return Some(done);
            }
            if !engine.is_active() {
                return None;
            }
            now += 10;
        }
        panic!("engine never completed");
    }

    #[test]
    fn dispense_1200_runs_eight_cycles() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();

        assert!(engine.start_dispense(1200, &mut hw));
        let done = run_to_completion(&mut engine, &mut hw, 10).unwrap();

        // ceil(1200 / 150) = 8 cycles.
        assert_eq!(done.net_steps, 1200);
        assert_eq!(hw.forward, 8 * 200);
        assert_eq!(hw.backward, 8 * 50);
        assert!(!hw.enabled, "driver must be off at rest");
        assert_eq!(hw.enables, 1);
        assert_eq!(hw.disables, 1);
    }

    #[test]
    fn dispense_900_runs_six_cycles() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();

        engine.start_dispense(900, &mut hw);
        let done = run_to_completion(&mut engine, &mut hw, 10).unwrap();

        assert_eq!(done.net_steps, 900);
        assert_eq!(hw.forward, 6 * 200);
        assert_eq!(hw.backward, 6 * 50);
    }

    #[test]
    fn steps_are_paced_to_the_step_rate() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();
        engine.start_dispense(150, &mut hw);

        // Ticks inside one step period do not step.
        engine.tick(10, &mut hw);
        assert_eq!(hw.forward, 1);
        engine.tick(12, &mut hw);
        engine.tick(15, &mut hw);
        assert_eq!(hw.forward, 1);
        engine.tick(20, &mut hw);
        assert_eq!(hw.forward, 2);
    }

    #[test]
    fn one_step_per_tick_even_when_late() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();
        engine.start_dispense(150, &mut hw);

        engine.tick(10, &mut hw);
        // A long stall must not burst-step on the next tick.
        engine.tick(5000, &mut hw);
        assert_eq!(hw.forward, 2);
    }

    #[test]
    fn second_dispense_refused_while_active() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();

        assert!(engine.start_dispense(1200, &mut hw));
        assert!(!engine.start_dispense(1200, &mut hw));
        assert_eq!(hw.enables, 1);
    }

    #[test]
    fn hold_job_stops_at_cycle_boundary_after_release() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();

        assert!(engine.start_hold(&mut hw));

        // Run one full cycle plus a bit of the second.
        let mut now = 10;
        while hw.backward < 50 {
            engine.tick(now, &mut hw);
            now += 10;
        }
        for _ in 0..20 {
            engine.tick(now, &mut hw);
            now += 10;
        }
        assert!(engine.is_active());

        // Release mid-cycle: the cycle in progress completes, then stop.
        engine.set_button_held(false);
        let done = run_to_completion(&mut engine, &mut hw, now).unwrap();

        assert_eq!(done.net_steps, 2 * 150);
        assert_eq!(hw.forward, 2 * 200);
        assert_eq!(hw.backward, 2 * 50);
        assert!(!hw.enabled);
    }

    #[test]
    fn hold_keeps_cycling_while_held() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();
        engine.start_hold(&mut hw);

        let mut now = 10;
        for _ in 0..2000 {
            assert_eq!(engine.tick(now, &mut hw), None);
            now += 10;
        }
        assert!(engine.is_active());
        assert!(hw.forward >= 200 * 4, "expected several cycles");
    }

    #[test]
    fn idle_engine_ticks_do_nothing() {
        let mut engine = FeedEngine::new(&config());
        let mut hw = MockAuger::new();
        assert_eq!(engine.tick(100, &mut hw), None);
        assert_eq!(hw.forward + hw.backward, 0);
        assert_eq!(hw.enables, 0);
    }
}
