//! Task-store gateway.
//!
//! Translates between the schedule and the JSON array the external admin
//! surface speaks:
//!
//! ```json
//! [{"name":"Morning Feeding","minute":0,"hour":7,
//!   "dayOfMonth":-1,"month":-1,"dayOfWeek":-1}]
//! ```
//!
//! `GET /get-tasks` serves [`get_tasks_json`]'s output verbatim;
//! `POST /save-tasks` bodies go through [`save_tasks_json`], which replaces
//! the whole list atomically — a rejected update (parse error, over
//! capacity, out-of-range field) leaves the previous schedule untouched.
//! Persistence failure is reported but does not undo the in-memory update.
//!
//! The HTTP server itself lives outside this crate; this module is the
//! transport-agnostic body handling.

use log::warn;

use crate::app::ports::{EventSink, TaskStorePort};
use crate::app::service::AppService;
use crate::error::ScheduleError;
use crate::scheduler::ScheduledTask;

/// Why a `save-tasks` body was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Body was not a JSON array of task objects.
    BadJson,
    /// The parsed list failed schedule validation.
    Schedule(ScheduleError),
}

/// Outcome of a `save-tasks` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTasksResponse {
    /// List replaced and persisted.
    UpdatedAndSaved { count: usize },
    /// List replaced in memory, but persisting it failed.
    UpdatedNotPersisted { count: usize },
    /// Update rejected; previous list retained.
    Rejected(ApiError),
}

impl SaveTasksResponse {
    /// Whether the in-memory schedule was updated.
    pub fn updated(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    /// Response body text for the transport layer.
    pub fn message(&self) -> &'static str {
        match self {
            Self::UpdatedAndSaved { .. } => "Tasks updated and saved successfully",
            Self::UpdatedNotPersisted { .. } => {
                "Tasks updated but failed to save to persistent storage"
            }
            Self::Rejected(ApiError::BadJson) => "Failed to parse JSON",
            Self::Rejected(ApiError::Schedule(ScheduleError::TooManyTasks)) => "Too many tasks",
            Self::Rejected(ApiError::Schedule(_)) => "Invalid task",
        }
    }
}

/// Render the current schedule as the admin-surface JSON array.
pub fn get_tasks_json(service: &AppService) -> String {
    serde_json::to_string(service.tasks()).unwrap_or_else(|e| {
        warn!("task list serialization failed: {}", e);
        "[]".to_string()
    })
}

/// Apply a `save-tasks` body: parse, replace atomically, persist.
pub fn save_tasks_json(
    service: &mut AppService,
    body: &str,
    store: &mut impl TaskStorePort,
    sink: &mut impl EventSink,
) -> SaveTasksResponse {
    let tasks: Vec<ScheduledTask> = match serde_json::from_str(body) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!("save-tasks: bad JSON body: {}", e);
            return SaveTasksResponse::Rejected(ApiError::BadJson);
        }
    };

    let count = match service.replace_tasks(&tasks, sink) {
        Ok(count) => count,
        Err(e) => {
            warn!("save-tasks: rejected: {}", e);
            return SaveTasksResponse::Rejected(ApiError::Schedule(e));
        }
    };

    match store.save_tasks(service.tasks()) {
        Ok(()) => SaveTasksResponse::UpdatedAndSaved { count },
        Err(e) => {
            warn!("save-tasks: persistence failed: {}", e);
            SaveTasksResponse::UpdatedNotPersisted { count }
        }
    }
}
