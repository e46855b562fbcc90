//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production).  A future network adapter
//! would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::rfid::wiegand::WiegandDecoder;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | feeder ready, door closed");
            }
            AppEvent::TagRead { id, valid } => {
                let mut hex = heapless::String::<64>::new();
                for b in id.iter() {
                    let _ = core::fmt::Write::write_fmt(&mut hex, format_args!("{:02X}", b));
                }
                if !*valid {
                    info!("TAG   | id={} (parity failed, presence only)", hex);
                } else if id.len() == 3 {
                    // Wiegand payload: 8-bit facility code + 16-bit card number.
                    let (facility, card) = WiegandDecoder::split_payload(id);
                    info!("TAG   | id={} facility={} card={}", hex, facility, card);
                } else {
                    info!("TAG   | id={}", hex);
                }
            }
            AppEvent::DoorChanged { from, to } => {
                info!("DOOR  | {:?} -> {:?}", from, to);
            }
            AppEvent::ScheduleFired { name } => {
                info!("SCHED | '{}' fired", name);
            }
            AppEvent::DispenseStarted { target_net_steps } => {
                info!("FEED  | dispensing {} net steps", target_net_steps);
            }
            AppEvent::DispenseRefused => {
                info!("FEED  | dispense refused (auger busy)");
            }
            AppEvent::DispenseComplete { net_steps } => {
                info!("FEED  | complete, {} net steps delivered", net_steps);
            }
            AppEvent::TasksReplaced { count } => {
                info!("SCHED | task list replaced ({} tasks)", count);
            }
        }
    }
}
