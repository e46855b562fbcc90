//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish over a future
//! network transport, etc.

use crate::door::DoorState;
use crate::rfid::TagId;
use crate::scheduler::TaskName;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// A reader emission completed (valid=false: Wiegand parity failure,
    /// still treated as presence).
    TagRead { id: TagId, valid: bool },

    /// The door arbiter moved between states.
    DoorChanged { from: DoorState, to: DoorState },

    /// A scheduled task matched the current minute.
    ScheduleFired { name: TaskName },

    /// The auger began a dispense job.
    DispenseStarted { target_net_steps: u32 },

    /// A dispense job requested while another was running was dropped.
    DispenseRefused,

    /// The auger finished a job (scheduled or button-held).
    DispenseComplete { net_steps: u32 },

    /// The schedule was replaced wholesale.
    TasksReplaced { count: usize },
}
