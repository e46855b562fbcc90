//! ESP32 time adapter.
//!
//! Two clocks feed the feeder:
//!
//! - **Monotonic uptime** for debouncing, tag timeouts, and step pacing —
//!   `esp_timer_get_time()` on device, `std::time::Instant` on host.
//! - **Wall-clock fields** for schedule matching — the system RTC, which
//!   an external NTP component sets after WiFi comes up.  Until then (and
//!   whenever the clock looks obviously unsynced) the adapter reports the
//!   zeroed [`WallClock`] and schedules simply fail to match.

use crate::scheduler::WallClock;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic, wraps at `u32::MAX` ≈ 49 days —
    /// every consumer compares with `wrapping_sub`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1000) as u32
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    /// Current local wall-clock fields for schedule matching.
    /// Returns the zeroed default until the system clock is synced.
    #[cfg(target_os = "espidf")]
    pub fn wall_clock(&self) -> WallClock {
        use core::ptr;
        use esp_idf_svc::sys;

        let mut tv = sys::timeval { tv_sec: 0, tv_usec: 0 };
        // SAFETY: plain libc-style call writing into a local struct.
        if unsafe { sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return WallClock::default();
        }

        // Reject obviously unsynced time (before 2020-01-01).
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return WallClock::default();
        }

        let secs = tv.tv_sec as sys::time_t;
        // SAFETY: localtime_r writes into the provided tm; zeroed init is valid.
        let mut tm: sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { sys::localtime_r(&secs, &mut tm) }.is_null() {
            return WallClock::default();
        }

        WallClock {
            minute: tm.tm_min.clamp(0, 59) as u8,
            hour: tm.tm_hour.clamp(0, 23) as u8,
            day_of_month: tm.tm_mday.clamp(1, 31) as u8,
            month: (tm.tm_mon + 1).clamp(1, 12) as u8, // tm_mon is 0-11
            day_of_week: tm.tm_wday.clamp(0, 6) as u8, // 0 = Sunday
        }
    }

    /// Host build: no RTC, always unsynced.  Tests inject their own
    /// [`WallClock`] values directly into the scheduler.
    #[cfg(not(target_os = "espidf"))]
    pub fn wall_clock(&self) -> WallClock {
        WallClock::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_monotonic() {
        let t = Esp32TimeAdapter::new();
        let a = t.uptime_ms();
        let b = t.uptime_ms();
        assert!(b >= a);
    }

    #[test]
    fn unsynced_wall_clock_is_the_zeroed_default() {
        let t = Esp32TimeAdapter::new();
        assert_eq!(t.wall_clock(), WallClock::default());
    }
}
