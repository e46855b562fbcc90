//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the polling loop stalls.  The timeout is generous
//! because a full safe-rotation dispense spans many seconds of ticks, each
//! of which feeds the watchdog; only a genuinely wedged loop trips it.
//!
//! The main loop must call `feed()` on every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const WDT_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT configuration from the single main task at boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: WDT_TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                if esp_task_wdt_reconfigure(&cfg) != ESP_OK {
                    log::warn!("Watchdog: reconfigure failed (may already be configured)");
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    log::info!("Watchdog: subscribed ({}s timeout)", WDT_TIMEOUT_MS / 1000);
                } else {
                    log::warn!("Watchdog: failed to subscribe");
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op");
            Self {}
        }
    }

    /// Feed the watchdog.  Must be called at least once per timeout window.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: reset of this task's own TWDT subscription.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
