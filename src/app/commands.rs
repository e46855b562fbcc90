//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the task-store
//! gateway, the scheduler, a serial console) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::SystemConfig;
use crate::scheduler::ScheduledTask;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Run the auger for a net step count (manual or scheduled feeding).
    Dispense { net_steps: u32 },

    /// Replace the entire schedule atomically.  Rejected wholesale when
    /// over capacity or containing invalid fields.
    ReplaceTasks(Vec<ScheduledTask>),

    /// Hot-reload configuration.
    UpdateConfig(SystemConfig),

    /// Explicitly persist the current config on the next auto-save check.
    SaveConfig,
}
