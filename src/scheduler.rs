//! Cron-style feeding scheduler.
//!
//! Holds the fixed-capacity task list and matches it against wall-clock
//! fields once per evaluation interval.  When a task fires, the scheduler
//! notifies a [`SchedulerDelegate`] rather than touching the auger itself —
//! the caller decides what a firing means.  This keeps the matcher
//! independently testable.
//!
//! ## Firing discipline
//!
//! Each task carries a `fired_this_minute` flag.  All flags clear when the
//! observed minute changes; a task fires at most once per matching minute,
//! on the first evaluation after the rollover — not necessarily at second
//! zero.  An evaluation cadence coarser than one minute can therefore miss
//! matches entirely; keep the poll interval well under 60 s.
//!
//! Before NTP sync the clock source reports a zeroed timestamp (00:00,
//! Jan 1, Sunday).  That is a legitimate input here: real schedules simply
//! fail to match it.

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::SchedulerDelegate;
use crate::error::ScheduleError;

/// Maximum number of stored tasks.
pub const MAX_TASKS: usize = 9;

/// Maximum task-name length.
pub const TASK_NAME_CAP: usize = 48;

/// Schedule field value meaning "matches any".
pub const WILDCARD: i8 = -1;

pub type TaskName = heapless::String<TASK_NAME_CAP>;

// ---------------------------------------------------------------------------
// Wall-clock fields
// ---------------------------------------------------------------------------

/// Local-time fields the scheduler matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    /// 0–59
    pub minute: u8,
    /// 0–23
    pub hour: u8,
    /// 1–31
    pub day_of_month: u8,
    /// 1–12
    pub month: u8,
    /// 0–6, 0 = Sunday
    pub day_of_week: u8,
}

impl Default for WallClock {
    /// The value the clock adapter reports before time sync.
    fn default() -> Self {
        Self {
            minute: 0,
            hour: 0,
            day_of_month: 1,
            month: 1,
            day_of_week: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One schedule entry.  Fields are either [`WILDCARD`] or an in-range value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub minute: i8,
    pub hour: i8,
    #[serde(rename = "dayOfMonth")]
    pub day_of_month: i8,
    pub month: i8,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: i8,
    /// Cleared on every minute rollover.
    #[serde(skip)]
    fired_this_minute: bool,
}

impl ScheduledTask {
    /// Build and validate a task.  Pass [`WILDCARD`] for "any".
    pub fn new(
        name: &str,
        minute: i8,
        hour: i8,
        day_of_month: i8,
        month: i8,
        day_of_week: i8,
    ) -> Result<Self, ScheduleError> {
        let task = Self {
            name: TaskName::try_from(name).map_err(|()| ScheduleError::BadName)?,
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
            fired_this_minute: false,
        };
        task.validate()?;
        Ok(task)
    }

    /// Daily task at `hour:minute`.
    pub fn daily(name: &str, hour: i8, minute: i8) -> Result<Self, ScheduleError> {
        Self::new(name, minute, hour, WILDCARD, WILDCARD, WILDCARD)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.name.is_empty() {
            return Err(ScheduleError::BadName);
        }
        let in_range = |v: i8, lo: i8, hi: i8| v == WILDCARD || (lo..=hi).contains(&v);
        if in_range(self.minute, 0, 59)
            && in_range(self.hour, 0, 23)
            && in_range(self.day_of_month, 1, 31)
            && in_range(self.month, 1, 12)
            && in_range(self.day_of_week, 0, 6)
        {
            Ok(())
        } else {
            Err(ScheduleError::FieldOutOfRange)
        }
    }

    /// True when every field is the wildcard or equals the current value.
    pub fn matches(&self, now: &WallClock) -> bool {
        let field = |task: i8, current: u8| task == WILDCARD || task == current as i8;
        field(self.minute, now.minute)
            && field(self.hour, now.hour)
            && field(self.day_of_month, now.day_of_month)
            && field(self.month, now.month)
            && field(self.day_of_week, now.day_of_week)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct FeedScheduler {
    tasks: heapless::Vec<ScheduledTask, MAX_TASKS>,
    /// Minute value seen on the previous evaluation; -1 before the first.
    last_observed_minute: i16,
}

impl FeedScheduler {
    pub fn new() -> Self {
        Self {
            tasks: heapless::Vec::new(),
            last_observed_minute: -1,
        }
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Replace the entire task list atomically.
    ///
    /// Every incoming task is validated and the count checked against
    /// capacity *before* anything is stored; on any error the previous
    /// list is untouched.
    pub fn replace_tasks(&mut self, new_tasks: &[ScheduledTask]) -> Result<usize, ScheduleError> {
        if new_tasks.len() > MAX_TASKS {
            return Err(ScheduleError::TooManyTasks);
        }
        for task in new_tasks {
            task.validate()?;
        }

        self.tasks.clear();
        for task in new_tasks {
            let mut task = task.clone();
            task.fired_this_minute = false;
            // Capacity was checked above; push cannot fail.
            let _ = self.tasks.push(task);
        }
        info!("scheduler: task list replaced ({} tasks)", self.tasks.len());
        Ok(self.tasks.len())
    }

    /// Match the task list against the current wall clock.
    ///
    /// Call once per schedule-poll interval.  Fires each matching task at
    /// most once per matching minute via the delegate.
    pub fn evaluate(&mut self, now: &WallClock, delegate: &mut dyn SchedulerDelegate) {
        if i16::from(now.minute) != self.last_observed_minute {
            for task in &mut self.tasks {
                task.fired_this_minute = false;
            }
            self.last_observed_minute = i16::from(now.minute);
        }

        for task in &mut self.tasks {
            if task.matches(now) && !task.fired_this_minute {
                task.fired_this_minute = true;
                info!(
                    "scheduler: '{}' fired at {:02}:{:02}",
                    task.name, now.hour, now.minute
                );
                delegate.on_schedule_fired(&task.name);
            }
        }
    }
}

impl Default for FeedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Test delegate that records fired task names.
    struct RecordingDelegate {
        fires: Vec<String>,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self { fires: Vec::new() }
        }
    }

    impl SchedulerDelegate for RecordingDelegate {
        fn on_schedule_fired(&mut self, name: &str) {
            self.fires.push(name.to_string());
        }
    }

    fn at(hour: u8, minute: u8) -> WallClock {
        WallClock {
            minute,
            hour,
            day_of_month: 15,
            month: 6,
            day_of_week: 3,
        }
    }

    fn all_wildcards(name: &str) -> ScheduledTask {
        ScheduledTask {
            name: TaskName::try_from(name).unwrap(),
            minute: WILDCARD,
            hour: WILDCARD,
            day_of_month: WILDCARD,
            month: WILDCARD,
            day_of_week: WILDCARD,
            fired_this_minute: false,
        }
    }

    #[test]
    fn all_wildcard_task_matches_any_time() {
        let task = all_wildcards("always");
        assert!(task.matches(&at(0, 0)));
        assert!(task.matches(&at(23, 59)));
        assert!(task.matches(&WallClock::default()));
    }

    #[test]
    fn fixed_field_must_match() {
        let task = ScheduledTask::daily("morning", 7, 0).unwrap();
        assert!(task.matches(&at(7, 0)));
        assert!(!task.matches(&at(7, 1)));
        assert!(!task.matches(&at(8, 0)));
    }

    #[test]
    fn fires_once_per_matching_minute() {
        let mut sched = FeedScheduler::new();
        sched
            .replace_tasks(&[ScheduledTask::daily("morning", 7, 0).unwrap()])
            .unwrap();
        let mut delegate = RecordingDelegate::new();

        // Several evaluations inside the same minute — one fire.
        for _ in 0..6 {
            sched.evaluate(&at(7, 0), &mut delegate);
        }
        assert_eq!(delegate.fires, vec!["morning"]);
    }

    #[test]
    fn refires_after_minute_rollover() {
        let mut sched = FeedScheduler::new();
        sched.replace_tasks(&[all_wildcards("always")]).unwrap();
        let mut delegate = RecordingDelegate::new();

        sched.evaluate(&at(7, 0), &mut delegate);
        sched.evaluate(&at(7, 0), &mut delegate);
        sched.evaluate(&at(7, 1), &mut delegate); // rollover clears the flag
        sched.evaluate(&at(7, 1), &mut delegate);

        assert_eq!(delegate.fires.len(), 2);
    }

    #[test]
    fn non_matching_minute_does_not_fire() {
        let mut sched = FeedScheduler::new();
        sched
            .replace_tasks(&[ScheduledTask::daily("evening", 19, 0).unwrap()])
            .unwrap();
        let mut delegate = RecordingDelegate::new();

        sched.evaluate(&at(18, 59), &mut delegate);
        sched.evaluate(&at(19, 1), &mut delegate);
        assert!(delegate.fires.is_empty());

        sched.evaluate(&at(19, 0), &mut delegate);
        assert_eq!(delegate.fires, vec!["evening"]);
    }

    #[test]
    fn unsynced_clock_is_tolerated() {
        let mut sched = FeedScheduler::new();
        sched
            .replace_tasks(&[ScheduledTask::daily("morning", 7, 0).unwrap()])
            .unwrap();
        let mut delegate = RecordingDelegate::new();

        for _ in 0..10 {
            sched.evaluate(&WallClock::default(), &mut delegate);
        }
        assert!(delegate.fires.is_empty());
    }

    #[test]
    fn midnight_task_fires_on_zeroed_clock_too() {
        // A 00:00 Sunday Jan-1 schedule genuinely matches the unsynced
        // default — rarely what the user wants, but exactly what the
        // matcher is specified to do.
        let mut sched = FeedScheduler::new();
        let mut task = all_wildcards("midnight");
        task.minute = 0;
        task.hour = 0;
        sched.replace_tasks(&[task]).unwrap();
        let mut delegate = RecordingDelegate::new();

        sched.evaluate(&WallClock::default(), &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
    }

    #[test]
    fn replace_rejects_overflow_and_keeps_old_list() {
        let mut sched = FeedScheduler::new();
        sched
            .replace_tasks(&[ScheduledTask::daily("keep-me", 7, 0).unwrap()])
            .unwrap();

        let too_many: Vec<ScheduledTask> = (0..MAX_TASKS + 1)
            .map(|i| ScheduledTask::daily(&format!("t{i}"), 8, 0).unwrap())
            .collect();
        assert_eq!(
            sched.replace_tasks(&too_many),
            Err(ScheduleError::TooManyTasks)
        );

        assert_eq!(sched.len(), 1);
        assert_eq!(sched.tasks()[0].name.as_str(), "keep-me");
    }

    #[test]
    fn replace_rejects_out_of_range_fields_atomically() {
        let mut sched = FeedScheduler::new();
        sched
            .replace_tasks(&[ScheduledTask::daily("keep-me", 7, 0).unwrap()])
            .unwrap();

        let mut bad = all_wildcards("bad");
        bad.minute = 60;
        let batch = [all_wildcards("ok"), bad];
        assert_eq!(
            sched.replace_tasks(&batch),
            Err(ScheduleError::FieldOutOfRange)
        );
        assert_eq!(sched.tasks()[0].name.as_str(), "keep-me");
    }

    #[test]
    fn capacity_boundary_accepts_max_tasks() {
        let mut sched = FeedScheduler::new();
        let exactly_max: Vec<ScheduledTask> = (0..MAX_TASKS)
            .map(|i| ScheduledTask::daily(&format!("t{i}"), 8, 0).unwrap())
            .collect();
        assert_eq!(sched.replace_tasks(&exactly_max), Ok(MAX_TASKS));
    }

    #[test]
    fn replace_resets_fired_flags() {
        let mut sched = FeedScheduler::new();
        sched.replace_tasks(&[all_wildcards("a")]).unwrap();
        let mut delegate = RecordingDelegate::new();
        sched.evaluate(&at(7, 0), &mut delegate);
        assert_eq!(delegate.fires.len(), 1);

        // Re-submitting the list within the same minute arms it again.
        let tasks: Vec<ScheduledTask> = sched.tasks().to_vec();
        sched.replace_tasks(&tasks).unwrap();
        sched.evaluate(&at(7, 0), &mut delegate);
        assert_eq!(delegate.fires.len(), 2);
    }
}
