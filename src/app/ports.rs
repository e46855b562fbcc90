//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (inputs, actuators, event sinks, storage) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.

use crate::config::SystemConfig;
use crate::scheduler::ScheduledTask;

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw (pre-debounce) input levels, sampled once per control tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    /// Door-override button electrically active.
    pub door_button_pressed: bool,
    /// Feed button electrically active.
    pub feed_button_pressed: bool,
}

/// Read-side port: the domain calls this to sample the buttons.
pub trait InputPort {
    fn read_inputs(&mut self) -> InputSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Command the door servo toward an angle (eased or instantaneous,
    /// per configuration — the adapter decides).
    fn set_door_angle(&mut self, deg: u8);

    /// Advance an in-flight eased door move.  Called once per tick.
    fn door_motion_tick(&mut self, now_ms: u32);

    /// Power the auger driver stage.
    fn auger_enable(&mut self);

    /// Unpower the auger driver stage (no holding torque at rest).
    fn auger_disable(&mut self);

    /// Advance the auger by one full step.
    fn auger_step(&mut self, forward: bool);

    /// Door status LED.
    fn set_led(&mut self, lit: bool);

    /// Kill all actuators — safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// future network transport, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// never silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.  Keys are namespaced to prevent
/// collisions between subsystems; writes are atomic (the ESP-IDF NVS API
/// guarantees this natively, the in-memory simulation trivially).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Task store port (driven adapter: domain ↔ persisted schedule)
// ───────────────────────────────────────────────────────────────

/// Load/save of the schedule as an opaque collection.
pub trait TaskStorePort {
    /// Returns the stored task list; an empty list when none was saved.
    fn load_tasks(&self) -> Result<Vec<ScheduledTask>, TaskStoreError>;

    /// Persist the task list wholesale.
    fn save_tasks(&mut self, tasks: &[ScheduledTask]) -> Result<(), TaskStoreError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from dispensing)
// ───────────────────────────────────────────────────────────────

/// Callback trait the scheduler invokes when a schedule fires.
///
/// The [`FeedScheduler`](crate::scheduler::FeedScheduler) knows nothing
/// about augers or events; the caller decides what a firing means.
pub trait SchedulerDelegate {
    /// Called once per task per matching minute, with the task's name.
    fn on_schedule_fired(&mut self, name: &str);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`TaskStorePort`] operations.
#[derive(Debug)]
pub enum TaskStoreError {
    /// Stored blob failed to deserialize.
    Corrupted,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for TaskStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "task list corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
