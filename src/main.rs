//! PetFeeder Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single-threaded cooperative polling
//! loop.  The only interrupt-context code in the system is the pair of
//! Wiegand edge ISRs, which bump atomic pulse counters; everything else —
//! reader decoding, debouncing, arbitration, scheduling, stepping — runs
//! on this loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    RfidUart      NvsAdapter    Esp32Time      │
//! │  (Input+Actuator)   (reader RX)   (Config+Tasks) (clock)       │
//! │  LogEventSink                                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  RFID decode · Door arbiter · Scheduler · Dispense     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use petfeeder::adapters::hardware::HardwareAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::nvs::NvsAdapter;
use petfeeder::adapters::time::Esp32TimeAdapter;
use petfeeder::adapters::uart::RfidUart;
use petfeeder::app::ports::{ActuatorPort, ConfigPort, TaskStorePort};
use petfeeder::app::service::AppService;
use petfeeder::config::{ReaderKind, SystemConfig};
use petfeeder::drivers::servo::ServoDriver;
use petfeeder::drivers::status_led::StatusLed;
use petfeeder::drivers::stepper::StepperDriver;
use petfeeder::drivers::watchdog::Watchdog;
use petfeeder::drivers::hw_init;
use petfeeder::scheduler::ScheduledTask;

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  PetFeeder v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // The Wiegand variant needs its edge ISRs; serial variants need UART.
    if config.reader == ReaderKind::Wiegand {
        if let Err(e) = hw_init::init_wiegand_isrs() {
            log::error!("Wiegand ISR install failed: {} — reader input disabled", e);
        }
    }
    let mut uart = RfidUart::new();

    // ── 4. Adapters ───────────────────────────────────────────
    let time = Esp32TimeAdapter::new();
    let mut hw = HardwareAdapter::new(
        ServoDriver::new(config.servo_closed_deg, config.servo_sweep_ms),
        StepperDriver::new(),
        StatusLed::new(),
    );
    let mut sink = LogEventSink::new();

    // ── 5. Boot self-test (hardware only) ─────────────────────
    #[cfg(target_os = "espidf")]
    boot_self_test(&mut hw, &config);

    // ── 6. App service + stored schedule ──────────────────────
    let mut app = AppService::new(config.clone());

    match nvs.load_tasks() {
        Ok(tasks) if !tasks.is_empty() => {
            if let Err(e) = app.replace_tasks(&tasks, &mut sink) {
                warn!("Stored schedule rejected ({}), seeding defaults", e);
                seed_default_schedule(&mut app, &mut nvs, &mut sink);
            }
        }
        Ok(_) => {
            info!("No stored schedule, seeding defaults");
            seed_default_schedule(&mut app, &mut nvs, &mut sink);
        }
        Err(e) => {
            warn!("Schedule load failed ({}), seeding defaults", e);
            seed_default_schedule(&mut app, &mut nvs, &mut sink);
        }
    }

    for task in app.tasks() {
        info!(
            "Schedule | {}: [{} {} {} {} {}]",
            task.name, task.minute, task.hour, task.day_of_month, task.month, task.day_of_week
        );
    }

    app.start(&mut hw, &mut sink);
    info!("System ready. Entering polling loop.");

    // ── 7. Polling loop ───────────────────────────────────────
    let schedule_poll_ms = config.schedule_poll_secs * 1000;
    let mut last_schedule_check_ms = 0u32;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(
            config.control_loop_interval_ms as u64,
        ));
        let now_ms = time.uptime_ms();

        // Drain the reader UART into the decoder (no-op for Wiegand,
        // whose bits arrive through the edge ISRs).
        uart.drain(|b| app.feed_rfid_byte(b));

        // Reader → buttons → arbiter → motion, one cycle.
        app.tick(now_ms, &mut hw, &mut sink);

        // Wall-clock schedule matching on its own, coarser cadence.
        if now_ms.wrapping_sub(last_schedule_check_ms) >= schedule_poll_ms {
            last_schedule_check_ms = now_ms;
            let clock = time.wall_clock();
            app.evaluate_schedule(&clock, &mut hw, &mut sink);
        }

        // Config auto-save (5s debounce after last change).
        app.auto_save_if_needed(&nvs);

        // Feed watchdog on every iteration.
        watchdog.feed();
    }
}

/// First-boot schedule: the two feedings every feeder ships with.
fn seed_default_schedule(
    app: &mut AppService,
    nvs: &mut NvsAdapter,
    sink: &mut LogEventSink,
) {
    let defaults: Vec<ScheduledTask> = [("Morning Feeding", 7), ("Evening Feeding", 19)]
        .iter()
        .filter_map(|(name, hour)| ScheduledTask::daily(name, *hour, 0).ok())
        .collect();

    match app.replace_tasks(&defaults, sink) {
        Ok(_) => {
            if let Err(e) = nvs.save_tasks(app.tasks()) {
                warn!("Default schedule not persisted: {}", e);
            }
        }
        Err(e) => warn!("Default schedule rejected: {}", e),
    }
}

/// Exercise the door and auger once at power-on so assembly faults show
/// up on the bench, not at the first feeding.
#[cfg(target_os = "espidf")]
fn boot_self_test(hw: &mut HardwareAdapter, config: &SystemConfig) {
    use std::{thread::sleep, time::Duration};

    info!("Self-test: servo sweep");
    hw.set_door_angle(config.servo_open_deg);
    sleep(Duration::from_millis(500));
    hw.set_door_angle(config.servo_closed_deg);
    sleep(Duration::from_millis(500));

    info!("Self-test: auger jog");
    hw.auger_enable();
    for _ in 0..20 {
        hw.auger_step(true);
        sleep(Duration::from_millis(5));
    }
    for _ in 0..20 {
        hw.auger_step(false);
        sleep(Duration::from_millis(5));
    }
    hw.auger_disable();
    info!("Self-test: done");
}
