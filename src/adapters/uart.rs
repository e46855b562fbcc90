//! RFID reader UART adapter.
//!
//! Serial-attached FDX-B reader modules push decoded tag bytes at 9600
//! baud.  The main loop drains whatever arrived since the last tick and
//! feeds it byte-by-byte into the selected decoder; draining never blocks.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: UART1 through the raw driver API, zero-timeout reads.
//! On host/test: an in-memory queue filled via [`RfidUart::inject`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::pins;

#[cfg(target_os = "espidf")]
const UART_PORT: i32 = 1; // UART1: UART0 carries the debug console.

/// Receive buffer handed to the driver (device) / queue bound (host).
const RX_BUFFER_LEN: usize = 256;

pub struct RfidUart {
    #[cfg(target_os = "espidf")]
    installed: bool,
    #[cfg(not(target_os = "espidf"))]
    queue: std::collections::VecDeque<u8>,
}

impl RfidUart {
    /// Install the UART driver for the reader port.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: one-shot driver install from the main task at boot.
        let installed = unsafe {
            let cfg = uart_config_t {
                baud_rate: pins::RFID_UART_BAUD as i32,
                data_bits: uart_word_length_t_UART_DATA_8_BITS,
                parity: uart_parity_t_UART_PARITY_DISABLE,
                stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
                flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
                ..Default::default()
            };

            uart_param_config(UART_PORT, &cfg) == ESP_OK
                && uart_set_pin(
                    UART_PORT,
                    UART_PIN_NO_CHANGE,
                    pins::RFID_UART_RX_GPIO,
                    UART_PIN_NO_CHANGE,
                    UART_PIN_NO_CHANGE,
                ) == ESP_OK
                && uart_driver_install(UART_PORT, RX_BUFFER_LEN as i32 * 2, 0, 0, core::ptr::null_mut(), 0)
                    == ESP_OK
        };

        if installed {
            log::info!("RfidUart: UART{} ready at {} baud", UART_PORT, pins::RFID_UART_BAUD);
        } else {
            log::error!("RfidUart: driver install failed, reader input disabled");
        }
        Self { installed }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        log::info!("RfidUart(sim): in-memory queue, {} baud nominal", pins::RFID_UART_BAUD);
        Self {
            queue: std::collections::VecDeque::new(),
        }
    }

    /// Drain every byte received since the last call into `f`.
    #[cfg(target_os = "espidf")]
    pub fn drain(&mut self, mut f: impl FnMut(u8)) {
        if !self.installed {
            return;
        }
        let mut buf = [0u8; RX_BUFFER_LEN];
        loop {
            // SAFETY: reads into a stack buffer with an explicit length;
            // zero timeout makes this a non-blocking FIFO drain.
            let n = unsafe {
                uart_read_bytes(
                    UART_PORT,
                    buf.as_mut_ptr().cast(),
                    buf.len() as u32,
                    0,
                )
            };
            if n <= 0 {
                return;
            }
            for &b in &buf[..n as usize] {
                f(b);
            }
        }
    }

    /// Drain every byte received since the last call into `f`.
    #[cfg(not(target_os = "espidf"))]
    pub fn drain(&mut self, mut f: impl FnMut(u8)) {
        while let Some(b) = self.queue.pop_front() {
            f(b);
        }
    }

    /// Simulation only: enqueue bytes as if the reader had sent them.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied());
    }
}

impl Default for RfidUart {
    fn default() -> Self {
        Self::new()
    }
}
