//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, the servo LEDC channel, and the Wiegand
//! edge interrupts using raw ESP-IDF sys calls.  Called once from `main()`
//! before the polling loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC servo channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR install failed (rc={})", rc),
        }
    }
}

// ── Peripheral bring-up ───────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the polling loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_servo_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let input_pins = [
        pins::DOOR_BUTTON_GPIO,
        pins::FEED_BUTTON_GPIO,
        pins::RFID_DATA0_GPIO,
        pins::RFID_DATA1_GPIO,
    ];

    for pin in input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: plain register configuration, pin masks are compile-time constants.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: inputs configured (buttons + Wiegand lines, pull-up)");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::STEPPER_IN1_GPIO,
        pins::STEPPER_IN2_GPIO,
        pins::STEPPER_IN3_GPIO,
        pins::STEPPER_IN4_GPIO,
        pins::STEPPER_ENA_GPIO,
        pins::STEPPER_ENB_GPIO,
        pins::STATUS_LED_GPIO,
    ];

    for pin in output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: see init_gpio_inputs.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        // Everything low at boot: motor driver unpowered, LED off.
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: outputs configured (stepper, enables, LED — all low)");
    Ok(())
}

// ── Servo LEDC channel ────────────────────────────────────────

/// 14-bit duty resolution at 50 Hz gives ~1.2 µs pulse granularity.
#[cfg(target_os = "espidf")]
const SERVO_DUTY_RES_BITS: u32 = 14;

#[cfg(target_os = "espidf")]
unsafe fn init_servo_ledc() -> Result<(), HwInitError> {
    let timer_cfg = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        duty_resolution: SERVO_DUTY_RES_BITS,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: ledc_clk_cfg_t_LEDC_AUTO_CLK,
        deconfigure: false,
    };
    // SAFETY: one-shot timer configuration before the loop starts.
    let ret = unsafe { ledc_timer_config(&timer_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let ch_cfg = ledc_channel_config_t {
        gpio_num: pins::SERVO_GPIO,
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: ledc_channel_t_LEDC_CHANNEL_0,
        intr_type: ledc_intr_type_t_LEDC_INTR_DISABLE,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: see above.
    let ret = unsafe { ledc_channel_config(&ch_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: servo LEDC ready (50 Hz, 14-bit)");
    Ok(())
}

// ── Wiegand edge interrupts ───────────────────────────────────

/// Install the GPIO ISR service and attach the two Wiegand falling-edge
/// handlers.  The handlers only bump atomic pulse counters — see
/// [`crate::rfid::wiegand`].
#[cfg(target_os = "espidf")]
pub fn init_wiegand_isrs() -> Result<(), HwInitError> {
    unsafe extern "C" fn data0_isr(_arg: *mut core::ffi::c_void) {
        crate::rfid::wiegand::isr_data0();
    }
    unsafe extern "C" fn data1_isr(_arg: *mut core::ffi::c_void) {
        crate::rfid::wiegand::isr_data1();
    }

    // SAFETY: called once at boot; handler functions are 'static and
    // touch only atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        type IsrFn = unsafe extern "C" fn(*mut core::ffi::c_void);
        for (pin, handler) in [
            (pins::RFID_DATA0_GPIO, Some(data0_isr as IsrFn)),
            (pins::RFID_DATA1_GPIO, Some(data1_isr as IsrFn)),
        ] {
            let ret = gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_NEGEDGE);
            if ret != ESP_OK {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
            let ret = gpio_isr_handler_add(pin, handler, core::ptr::null_mut());
            if ret != ESP_OK {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
        }
    }

    info!("hw_init: Wiegand falling-edge ISRs attached");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_wiegand_isrs() -> Result<(), HwInitError> {
    Ok(())
}

// ── Runtime GPIO / PWM helpers ────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: reads a configured input pin; no shared state.
    unsafe { gpio_get_level(pin) != 0 }
}

/// Host stub: inputs idle high (pull-up, buttons not pressed).
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: writes a configured output pin; no shared state.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// Drive the servo horn to `deg` (0–180, fractional allowed mid-sweep).
#[cfg(target_os = "espidf")]
pub fn servo_write_deg(deg: f32) {
    let deg = deg.clamp(0.0, 180.0);
    let span_us = (pins::SERVO_MAX_PULSE_US - pins::SERVO_MIN_PULSE_US) as f32;
    let pulse_us = pins::SERVO_MIN_PULSE_US as f32 + span_us * deg / 180.0;

    let period_us = 1_000_000.0 / pins::SERVO_PWM_FREQ_HZ as f32;
    let duty = (pulse_us / period_us * (1 << SERVO_DUTY_RES_BITS) as f32) as u32;

    // SAFETY: channel configured in init_servo_ledc; main-loop access only.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_channel_t_LEDC_CHANNEL_0, duty);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_channel_t_LEDC_CHANNEL_0);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn servo_write_deg(_deg: f32) {}
