//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`], [`StoragePort`], and [`TaskStorePort`] for
//! the PetFeeder system.
//!
//! - Config validation: all fields are range-checked before persistence.
//!   Invalid values are rejected, never clamped.
//! - Namespace isolation: config and schedule use separate namespaces.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`;
//!   the in-memory simulation achieves this trivially.
//! - Blobs are postcard-encoded (compact, serde-compatible).

use crate::app::ports::{
    ConfigError, ConfigPort, StorageError, StoragePort, TaskStoreError, TaskStorePort,
};
use crate::config::SystemConfig;
use crate::scheduler::ScheduledTask;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "petfeeder";
const CONFIG_KEY: &str = "syscfg";
const TASKS_NAMESPACE: &str = "schedule";
const TASKS_KEY: &str = "tasks";

const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: ns_buf is NUL-padded; handle closed on every path below.
        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Read an entire blob from a namespace/key.
    fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            Ok(self
                .store
                .borrow()
                .get(&Self::composite_key(namespace, key))
                .cloned())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let mut size: usize = 0;
                // SAFETY: size-query call per the nvs_get_blob contract.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                // SAFETY: buf is exactly `size` bytes as reported above.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(buf) => Ok(Some(buf)),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    /// Write an entire blob to a namespace/key.
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                // SAFETY: data pointer/length pair is valid for the call.
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }
}

// ── Config validation ─────────────────────────────────────────

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(10..=1000).contains(&cfg.debounce_ms) {
        return Err(ConfigError::ValidationFailed("debounce_ms must be 10–1000"));
    }
    if !(500..=60_000).contains(&cfg.tag_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "tag_timeout_ms must be 500–60000",
        ));
    }
    if cfg.servo_open_deg > 180 || cfg.servo_closed_deg > 180 {
        return Err(ConfigError::ValidationFailed("servo angles must be 0–180"));
    }
    if cfg.servo_open_deg == cfg.servo_closed_deg {
        return Err(ConfigError::ValidationFailed(
            "servo_open_deg must differ from servo_closed_deg",
        ));
    }
    if cfg.servo_sweep_ms > 5000 {
        return Err(ConfigError::ValidationFailed(
            "servo_sweep_ms must be 0–5000",
        ));
    }
    if cfg.forward_steps == 0 || cfg.forward_steps > 10_000 {
        return Err(ConfigError::ValidationFailed(
            "forward_steps must be 1–10000",
        ));
    }
    if cfg.backward_steps >= cfg.forward_steps {
        return Err(ConfigError::ValidationFailed(
            "backward_steps must be < forward_steps",
        ));
    }
    if cfg.dispense_steps == 0 || cfg.dispense_steps > 100_000 {
        return Err(ConfigError::ValidationFailed(
            "dispense_steps must be 1–100000",
        ));
    }
    if !(1..=100).contains(&cfg.control_loop_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_loop_interval_ms must be 1–100",
        ));
    }
    if cfg.step_rate_hz == 0 || cfg.step_rate_hz > 1000 / cfg.control_loop_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "step_rate_hz must fit the control loop (one step per tick)",
        ));
    }
    if !(1..=59).contains(&cfg.schedule_poll_secs) {
        return Err(ConfigError::ValidationFailed(
            "schedule_poll_secs must be 1–59 (coarser misses minutes)",
        ));
    }
    if !(500..=60_000).contains(&cfg.wiegand_idle_reset_ms) {
        return Err(ConfigError::ValidationFailed(
            "wiegand_idle_reset_ms must be 500–60000",
        ));
    }
    Ok(())
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match self.read_blob(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(Some(bytes)) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
            Err(_) => {
                warn!("NvsAdapter: config read error, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

// ── StoragePort ───────────────────────────────────────────────

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.read_blob(namespace, key)? {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                // SAFETY: erase of a NUL-padded key; missing keys are fine.
                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        matches!(self.read_blob(namespace, key), Ok(Some(_)))
    }
}

// ── TaskStorePort ─────────────────────────────────────────────

impl TaskStorePort for NvsAdapter {
    fn load_tasks(&self) -> Result<Vec<ScheduledTask>, TaskStoreError> {
        match self.read_blob(TASKS_NAMESPACE, TASKS_KEY) {
            Ok(Some(bytes)) => {
                let tasks: Vec<ScheduledTask> =
                    postcard::from_bytes(&bytes).map_err(|_| TaskStoreError::Corrupted)?;
                info!("NvsAdapter: loaded {} stored tasks", tasks.len());
                Ok(tasks)
            }
            Ok(None) => Ok(Vec::new()),
            Err(_) => Err(TaskStoreError::IoError),
        }
    }

    fn save_tasks(&mut self, tasks: &[ScheduledTask]) -> Result<(), TaskStoreError> {
        let bytes = postcard::to_allocvec(tasks).map_err(|_| TaskStoreError::IoError)?;
        self.write_blob(TASKS_NAMESPACE, TASKS_KEY, &bytes)
            .map_err(|_| TaskStoreError::IoError)?;
        info!("NvsAdapter: saved {} tasks", tasks.len());
        Ok(())
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        // Last-resort fallback: run without persistence this session.
        Self::new().unwrap_or(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ScheduledTask;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&SystemConfig::default()).is_ok());
    }

    #[test]
    fn rejects_backward_at_or_above_forward() {
        let cfg = SystemConfig {
            forward_steps: 50,
            backward_steps: 50,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_equal_servo_positions() {
        let cfg = SystemConfig {
            servo_open_deg: 90,
            servo_closed_deg: 90,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_step_rate_beyond_loop() {
        let cfg = SystemConfig {
            control_loop_interval_ms: 10,
            step_rate_hz: 200,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_schedule_poll_over_a_minute() {
        let cfg = SystemConfig {
            schedule_poll_secs: 90,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn invalid_config_never_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let bad = SystemConfig {
            debounce_ms: 5,
            ..Default::default()
        };
        assert!(nvs.save(&bad).is_err());
        // A later load still yields defaults, not the bad values.
        assert_eq!(nvs.load().unwrap().debounce_ms, 50);
    }

    #[test]
    fn config_round_trip() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.tag_timeout_ms = 3500;
        nvs.save(&cfg).unwrap();

        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.tag_timeout_ms, 3500);
    }

    #[test]
    fn storage_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        let data = b"hello NVS";
        nvs.write("test_ns", "greeting", data).unwrap();
        assert!(nvs.exists("test_ns", "greeting"));

        let mut buf = [0u8; 64];
        let len = nvs.read("test_ns", "greeting", &mut buf).unwrap();
        assert_eq!(&buf[..len], data);

        nvs.delete("test_ns", "greeting").unwrap();
        assert!(!nvs.exists("test_ns", "greeting"));
    }

    #[test]
    fn storage_read_missing_key() {
        let nvs = NvsAdapter::new().unwrap();
        let mut buf = [0u8; 64];
        assert!(matches!(
            nvs.read("ns", "nope", &mut buf),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn task_store_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        assert!(nvs.load_tasks().unwrap().is_empty());

        let tasks = vec![
            ScheduledTask::daily("Morning Feeding", 7, 0).unwrap(),
            ScheduledTask::daily("Evening Feeding", 19, 0).unwrap(),
        ];
        nvs.save_tasks(&tasks).unwrap();

        let loaded = nvs.load_tasks().unwrap();
        assert_eq!(loaded, tasks);
    }
}
