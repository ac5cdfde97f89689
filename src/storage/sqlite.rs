//! Durable store on sqlite. One connection behind an async mutex; list
//! columns (agent paws, score) are stored as JSON text, timestamps as
//! RFC 3339 text so lexicographic comparison matches time order.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;

use crate::core::entity::{
    Execution, ExecutionResult, ExecutionStatus, ResultStatus, Schedule, ScheduleFrequency,
    ScheduleRun, ScheduleRunStatus, ScheduleStatus,
};
use crate::core::error::Result;

use super::{ExecutionStore, ScheduleStore};

pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path)?;
        init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }
}

fn init_schema(db: &Connection) -> rusqlite::Result<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            scenario_id TEXT NOT NULL,
            agent_paws TEXT NOT NULL,
            status TEXT NOT NULL,
            safe_mode INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            score TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS execution_results (
            id TEXT PRIMARY KEY,
            execution_id TEXT NOT NULL,
            technique_id TEXT NOT NULL,
            agent_paw TEXT NOT NULL,
            status TEXT NOT NULL,
            output TEXT NOT NULL DEFAULT '',
            exit_code INTEGER,
            detected INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_execution
         ON execution_results (execution_id)",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS schedules (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            scenario_id TEXT NOT NULL,
            agent_paw TEXT NOT NULL DEFAULT '',
            frequency TEXT NOT NULL,
            cron_expr TEXT NOT NULL DEFAULT '',
            safe_mode INTEGER NOT NULL,
            status TEXT NOT NULL,
            next_run_at TEXT,
            last_run_at TEXT,
            last_run_id TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS schedule_runs (
            id TEXT PRIMARY KEY,
            schedule_id TEXT NOT NULL,
            execution_id TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            error TEXT NOT NULL DEFAULT '',
            started_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_runs_schedule
         ON schedule_runs (schedule_id)",
        [],
    )?;

    Ok(())
}

fn conv_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err))
}

fn bad_value(value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        format!("unrecognized value: {value}").into(),
    )
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn opt_ts(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(ts)
}

fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conv_err)
}

fn parse_opt_ts(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

fn execution_from_row(row: &Row<'_>) -> rusqlite::Result<Execution> {
    let paws: String = row.get(2)?;
    let status: String = row.get(3)?;
    let started_at: String = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;
    let score: Option<String> = row.get(7)?;
    Ok(Execution {
        id: row.get(0)?,
        scenario_id: row.get(1)?,
        agent_paws: serde_json::from_str(&paws).map_err(conv_err)?,
        status: ExecutionStatus::from_status(&status).ok_or_else(|| bad_value(&status))?,
        safe_mode: row.get(4)?,
        started_at: parse_ts(&started_at)?,
        completed_at: parse_opt_ts(completed_at)?,
        score: score
            .as_deref()
            .map(|s| serde_json::from_str(s).map_err(conv_err))
            .transpose()?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionResult> {
    let status: String = row.get(4)?;
    let started_at: String = row.get(8)?;
    let completed_at: Option<String> = row.get(9)?;
    Ok(ExecutionResult {
        id: row.get(0)?,
        execution_id: row.get(1)?,
        technique_id: row.get(2)?,
        agent_paw: row.get(3)?,
        status: ResultStatus::from_status(&status).ok_or_else(|| bad_value(&status))?,
        output: row.get(5)?,
        exit_code: row.get(6)?,
        detected: row.get(7)?,
        started_at: parse_ts(&started_at)?,
        completed_at: parse_opt_ts(completed_at)?,
    })
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    let frequency: String = row.get(5)?;
    let status: String = row.get(8)?;
    let next_run_at: Option<String> = row.get(9)?;
    let last_run_at: Option<String> = row.get(10)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;
    Ok(Schedule {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        scenario_id: row.get(3)?,
        agent_paw: row.get(4)?,
        frequency: ScheduleFrequency::from_status(&frequency)
            .ok_or_else(|| bad_value(&frequency))?,
        cron_expr: row.get(6)?,
        safe_mode: row.get(7)?,
        status: ScheduleStatus::from_status(&status).ok_or_else(|| bad_value(&status))?,
        next_run_at: parse_opt_ts(next_run_at)?,
        last_run_at: parse_opt_ts(last_run_at)?,
        last_run_id: row.get(11)?,
        created_by: row.get(12)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRun> {
    let status: String = row.get(3)?;
    let started_at: String = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;
    Ok(ScheduleRun {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        execution_id: row.get(2)?,
        status: ScheduleRunStatus::from_status(&status).ok_or_else(|| bad_value(&status))?,
        error: row.get(4)?,
        started_at: parse_ts(&started_at)?,
        completed_at: parse_opt_ts(completed_at)?,
    })
}

const EXECUTION_COLUMNS: &str =
    "id, scenario_id, agent_paws, status, safe_mode, started_at, completed_at, score";
const RESULT_COLUMNS: &str = "id, execution_id, technique_id, agent_paw, status, output, \
     exit_code, detected, started_at, completed_at";
const SCHEDULE_COLUMNS: &str = "id, name, description, scenario_id, agent_paw, frequency, \
     cron_expr, safe_mode, status, next_run_at, last_run_at, last_run_id, created_by, \
     created_at, updated_at";
const RUN_COLUMNS: &str =
    "id, schedule_id, execution_id, status, error, started_at, completed_at";

#[async_trait]
impl ExecutionStore for SqliteStore {
    async fn create_execution(&self, execution: &Execution) -> Result<()> {
        let paws = serde_json::to_string(&execution.agent_paws)
            .map_err(|e| crate::core::error::Error::Store(e.to_string()))?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO executions (id, scenario_id, agent_paws, status, safe_mode, \
             started_at, completed_at, score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                execution.id,
                execution.scenario_id,
                paws,
                execution.status.as_str(),
                execution.safe_mode,
                ts(execution.started_at),
                opt_ts(execution.completed_at),
                score_json(execution)?,
            ],
        )?;
        Ok(())
    }

    async fn update_execution(&self, execution: &Execution) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE executions SET status = ?2, completed_at = ?3, score = ?4 WHERE id = ?1",
            params![
                execution.id,
                execution.status.as_str(),
                opt_ts(execution.completed_at),
                score_json(execution)?,
            ],
        )?;
        Ok(())
    }

    async fn find_execution_by_id(&self, id: &str) -> Result<Option<Execution>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], execution_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    async fn find_recent_executions(&self, limit: usize) -> Result<Vec<Execution>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions ORDER BY started_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], execution_from_row)?;
        let mut executions = Vec::new();
        for row in rows {
            executions.push(row?);
        }
        Ok(executions)
    }

    async fn create_result(&self, result: &ExecutionResult) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO execution_results (id, execution_id, technique_id, agent_paw, \
             status, output, exit_code, detected, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                result.id,
                result.execution_id,
                result.technique_id,
                result.agent_paw,
                result.status.as_str(),
                result.output,
                result.exit_code,
                result.detected,
                ts(result.started_at),
                opt_ts(result.completed_at),
            ],
        )?;
        Ok(())
    }

    async fn update_result(&self, result: &ExecutionResult) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE execution_results SET status = ?2, output = ?3, exit_code = ?4, \
             detected = ?5, completed_at = ?6 WHERE id = ?1",
            params![
                result.id,
                result.status.as_str(),
                result.output,
                result.exit_code,
                result.detected,
                opt_ts(result.completed_at),
            ],
        )?;
        Ok(())
    }

    async fn find_result_by_id(&self, id: &str) -> Result<Option<ExecutionResult>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {RESULT_COLUMNS} FROM execution_results WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], result_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    async fn find_results_by_execution(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionResult>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {RESULT_COLUMNS} FROM execution_results WHERE execution_id = ?1 \
             ORDER BY started_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![execution_id], result_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

fn score_json(execution: &Execution) -> Result<Option<String>> {
    execution
        .score
        .map(|s| serde_json::to_string(&s))
        .transpose()
        .map_err(|e| crate::core::error::Error::Store(e.to_string()))
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn create(&self, schedule: &Schedule) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO schedules (id, name, description, scenario_id, agent_paw, \
             frequency, cron_expr, safe_mode, status, next_run_at, last_run_at, \
             last_run_id, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                schedule.id,
                schedule.name,
                schedule.description,
                schedule.scenario_id,
                schedule.agent_paw,
                schedule.frequency.as_str(),
                schedule.cron_expr,
                schedule.safe_mode,
                schedule.status.as_str(),
                opt_ts(schedule.next_run_at),
                opt_ts(schedule.last_run_at),
                schedule.last_run_id,
                schedule.created_by,
                ts(schedule.created_at),
                ts(schedule.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn update(&self, schedule: &Schedule) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE schedules SET name = ?2, description = ?3, scenario_id = ?4, \
             agent_paw = ?5, frequency = ?6, cron_expr = ?7, safe_mode = ?8, status = ?9, \
             next_run_at = ?10, last_run_at = ?11, last_run_id = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                schedule.id,
                schedule.name,
                schedule.description,
                schedule.scenario_id,
                schedule.agent_paw,
                schedule.frequency.as_str(),
                schedule.cron_expr,
                schedule.safe_mode,
                schedule.status.as_str(),
                opt_ts(schedule.next_run_at),
                opt_ts(schedule.last_run_at),
                schedule.last_run_id,
                ts(schedule.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute("DELETE FROM schedules WHERE id = ?1", params![id])?;
        db.execute(
            "DELETE FROM schedule_runs WHERE schedule_id = ?1",
            params![id],
        )?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], schedule_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    async fn find_all(&self) -> Result<Vec<Schedule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map([], schedule_from_row)?;
        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?);
        }
        Ok(schedules)
    }

    async fn find_by_scenario_id(&self, scenario_id: &str) -> Result<Vec<Schedule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE scenario_id = ?1 \
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![scenario_id], schedule_from_row)?;
        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?);
        }
        Ok(schedules)
    }

    async fn find_active_schedules_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules \
             WHERE status = 'active' AND next_run_at IS NOT NULL AND next_run_at <= ?1"
        ))?;
        let rows = stmt.query_map(params![ts(now)], schedule_from_row)?;
        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?);
        }
        Ok(schedules)
    }

    async fn create_run(&self, run: &ScheduleRun) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO schedule_runs (id, schedule_id, execution_id, status, error, \
             started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.id,
                run.schedule_id,
                run.execution_id,
                run.status.as_str(),
                run.error,
                ts(run.started_at),
                opt_ts(run.completed_at),
            ],
        )?;
        Ok(())
    }

    async fn find_runs_by_schedule_id(
        &self,
        schedule_id: &str,
        limit: usize,
    ) -> Result<Vec<ScheduleRun>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM schedule_runs WHERE schedule_id = ?1 \
             ORDER BY started_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![schedule_id, limit as i64], run_from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }
}
