use std::str::FromStr;

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFrequency {
    Once,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Cron,
}

impl ScheduleFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleFrequency::Once => "once",
            ScheduleFrequency::Hourly => "hourly",
            ScheduleFrequency::Daily => "daily",
            ScheduleFrequency::Weekly => "weekly",
            ScheduleFrequency::Monthly => "monthly",
            ScheduleFrequency::Cron => "cron",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "once" => Some(ScheduleFrequency::Once),
            "hourly" => Some(ScheduleFrequency::Hourly),
            "daily" => Some(ScheduleFrequency::Daily),
            "weekly" => Some(ScheduleFrequency::Weekly),
            "monthly" => Some(ScheduleFrequency::Monthly),
            "cron" => Some(ScheduleFrequency::Cron),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Disabled,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Paused => "paused",
            ScheduleStatus::Disabled => "disabled",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ScheduleStatus::Active),
            "paused" => Some(ScheduleStatus::Paused),
            "disabled" => Some(ScheduleStatus::Disabled),
            _ => None,
        }
    }
}

/// A recurring or one-shot trigger that starts new executions of a scenario.
/// `next_run_at` is meaningful only while the schedule is Active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scenario_id: String,
    /// Target paw filter; empty means all online agents.
    #[serde(default)]
    pub agent_paw: String,
    pub frequency: ScheduleFrequency,
    #[serde(default)]
    pub cron_expr: String,
    pub safe_mode: bool,
    pub status: ScheduleStatus,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run_id: String,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Next time this schedule should fire, computed from `from`.
    ///
    /// Calendar frequencies use calendar-aware arithmetic (a monthly schedule
    /// lands on the same day-of-month, clamped for short months). A one-shot
    /// schedule that has already run never fires again. Cron uses a standard
    /// 5-field expression; an empty or unparseable expression makes the
    /// schedule inert rather than erroring. Paused and disabled schedules
    /// never produce a next run.
    pub fn calculate_next_run(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.status != ScheduleStatus::Active {
            return None;
        }

        match self.frequency {
            ScheduleFrequency::Hourly => Some(from + Duration::hours(1)),
            ScheduleFrequency::Daily => from.checked_add_days(Days::new(1)),
            ScheduleFrequency::Weekly => from.checked_add_days(Days::new(7)),
            ScheduleFrequency::Monthly => from.checked_add_months(Months::new(1)),
            ScheduleFrequency::Once => {
                if self.last_run_at.is_some() {
                    None
                } else if let Some(next) = self.next_run_at {
                    Some(next)
                } else {
                    Some(from)
                }
            }
            ScheduleFrequency::Cron => next_cron_run(&self.cron_expr, from),
        }
    }

    /// Boundary-inclusive readiness check: an exact-match tick fires.
    pub fn is_ready_to_run(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Active
            && self.next_run_at.map(|next| next <= now).unwrap_or(false)
    }
}

/// Earliest match of a 5-field cron expression strictly after `from`.
/// Returns `None` for empty or malformed expressions.
pub fn next_cron_run(expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = cron::Schedule::from_str(&normalize_cron_expr(expr)?).ok()?;
    schedule.after(&from).next()
}

/// Validity check used when a cron schedule is created or updated.
pub fn is_valid_cron_expr(expr: &str) -> bool {
    normalize_cron_expr(expr)
        .map(|e| cron::Schedule::from_str(&e).is_ok())
        .unwrap_or(false)
}

/// The parser wants a seconds field; standard 5-field expressions get a
/// literal `0` second prepended so they fire on the minute.
fn normalize_cron_expr(expr: &str) -> Option<String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.split_whitespace().count() == 5 {
        Some(format!("0 {}", trimmed))
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRunStatus {
    Completed,
    Failed,
}

impl ScheduleRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleRunStatus::Completed => "completed",
            ScheduleRunStatus::Failed => "failed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(ScheduleRunStatus::Completed),
            "failed" => Some(ScheduleRunStatus::Failed),
            _ => None,
        }
    }
}

/// Audit record of one trigger of a schedule. A failed trigger keeps an
/// empty execution id and carries the error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRun {
    pub id: String,
    pub schedule_id: String,
    pub execution_id: String,
    pub status: ScheduleRunStatus,
    #[serde(default)]
    pub error: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScheduleRun {
    pub fn completed(schedule_id: &str, execution_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schedule_id: schedule_id.to_string(),
            execution_id: execution_id.to_string(),
            status: ScheduleRunStatus::Completed,
            error: String::new(),
            started_at,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(schedule_id: &str, error: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schedule_id: schedule_id.to_string(),
            execution_id: String::new(),
            status: ScheduleRunStatus::Failed,
            error: error.to_string(),
            started_at,
            completed_at: Some(Utc::now()),
        }
    }
}
