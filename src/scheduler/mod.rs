//! Scheduled orders
//!
//! Tasks live in `scheduled_tasks.csv`. The runner polls the file, executes
//! every task whose time has come, and rewrites the file with what is left.

use crate::client::TradingApi;
use crate::error::{BotError, Result};
use crate::orders::{build_request, execute};
use crate::types::{OrderRequest, OrderType, PostOrderResponse};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// The only accepted schedule format
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Header of `scheduled_tasks.csv`
pub const TASK_HEADER: [&str; 7] = [
    "scheduled_datetime",
    "token_id",
    "order_type",
    "amount",
    "price",
    "size",
    "expire_seconds",
];

/// Parse `YYYY-MM-DD HH:MM`
pub fn parse_schedule_time(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), SCHEDULE_FORMAT).map_err(|_| {
        BotError::InvalidInput(format!(
            "Invalid date '{}', expected YYYY-MM-DD HH:MM",
            input.trim()
        ))
    })
}

mod schedule_format {
    use super::SCHEDULE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(SCHEDULE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), SCHEDULE_FORMAT)
            .map_err(|e| serde::de::Error::custom(format!("bad scheduled_datetime '{}': {}", raw, e)))
    }
}

/// Order types in the task file are matched ignoring case
mod order_type_format {
    use crate::types::OrderType;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OrderType, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse::<OrderType>().map_err(D::Error::custom)
    }
}

/// An order waiting for its time, in local wall-clock time.
///
/// Fields the order type does not use are empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(with = "schedule_format")]
    pub scheduled_datetime: NaiveDateTime,
    pub token_id: String,
    #[serde(deserialize_with = "order_type_format::deserialize")]
    pub order_type: OrderType,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub expire_seconds: String,
}

impl ScheduledTask {
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.scheduled_datetime
    }

    /// The order to place when the task fires at `now`
    pub fn order_request(&self, now: DateTime<Utc>, expiration_buffer_secs: u64) -> Result<OrderRequest> {
        build_request(
            &self.token_id,
            self.order_type,
            &self.amount,
            &self.price,
            &self.size,
            &self.expire_seconds,
            now,
            expiration_buffer_secs,
        )
    }

    /// One overview line
    pub fn summary(&self) -> String {
        let detail = match self.order_type {
            OrderType::FOK => format!("Amount: {} USD", self.amount),
            _ => format!("Price: {} | Size: {}", self.price, self.size),
        };
        format!(
            "{} | Token: {} | Type: {} | {}",
            self.scheduled_datetime.format(SCHEDULE_FORMAT),
            self.token_id,
            self.order_type,
            detail
        )
    }
}

/// Overview lines, earliest task first
pub fn overview(tasks: &[ScheduledTask]) -> Vec<String> {
    let mut sorted: Vec<&ScheduledTask> = tasks.iter().collect();
    sorted.sort_by_key(|t| t.scheduled_datetime);
    sorted.into_iter().map(ScheduledTask::summary).collect()
}

/// The task file
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a task, writing the header first if the file is new
    pub fn append(&self, task: &ScheduledTask) -> Result<()> {
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(task)?;
        writer.flush()?;

        info!(token_id = %task.token_id, at = %task.scheduled_datetime, "Scheduled task saved");
        Ok(())
    }

    /// All tasks in file order. A missing file means no tasks.
    pub fn load(&self) -> Result<Vec<ScheduledTask>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let mut tasks = Vec::new();
        for row in reader.deserialize() {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Replace the file contents with `tasks`
    pub fn save(&self, tasks: &[ScheduledTask]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        writer.write_record(TASK_HEADER)?;
        for task in tasks {
            writer.serialize(task)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Result of executing one due task
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: ScheduledTask,
    /// The exchange's answer, or the error text
    pub result: std::result::Result<PostOrderResponse, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PollReport {
    pub executed: Vec<TaskOutcome>,
    pub remaining: usize,
}

/// Polls the task file and fires due tasks
pub struct TaskRunner<'a> {
    api: &'a dyn TradingApi,
    store: TaskStore,
    poll_interval: Duration,
    expiration_buffer_secs: u64,
}

impl<'a> TaskRunner<'a> {
    pub fn new(
        api: &'a dyn TradingApi,
        store: TaskStore,
        poll_interval: Duration,
        expiration_buffer_secs: u64,
    ) -> Self {
        Self {
            api,
            store,
            poll_interval,
            expiration_buffer_secs,
        }
    }

    /// One cycle: execute due tasks in file order, drop them whether or not
    /// they succeeded, and rewrite the file with the rest
    pub async fn poll_once(&self, now: NaiveDateTime) -> Result<PollReport> {
        let tasks = self.store.load()?;
        let (due, pending): (Vec<_>, Vec<_>) = tasks.into_iter().partition(|t| t.is_due(now));

        let mut executed = Vec::with_capacity(due.len());
        for task in due {
            let result = match task.order_request(Utc::now(), self.expiration_buffer_secs) {
                Ok(request) => execute(self.api, &request).await,
                Err(e) => Err(e),
            }
            .map_err(|e| {
                warn!(token_id = %task.token_id, "Scheduled task failed: {}", e);
                e.to_string()
            });
            executed.push(TaskOutcome { task, result });
        }

        self.store.save(&pending)?;
        info!(
            executed = executed.len(),
            remaining = pending.len(),
            "Scheduler cycle done"
        );

        Ok(PollReport {
            executed,
            remaining: pending.len(),
        })
    }

    /// Poll until the file is empty or Ctrl+C is pressed.
    ///
    /// A Ctrl+C that arrives while orders are being posted lets the cycle
    /// finish and save the file before stopping. Tokio keeps its SIGINT
    /// handler installed after this returns, so the menu is left through
    /// its Exit option from then on.
    pub async fn run(&self) -> Result<()> {
        let tasks = self.store.load()?;
        if tasks.is_empty() {
            println!("No scheduled tasks in {}", self.store.path().display());
            return Ok(());
        }

        println!("Scheduled tasks:");
        for line in overview(&tasks) {
            println!("  {}", line);
        }
        println!("Waiting for scheduled times. Press Ctrl+C to stop.");

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            let mut interrupted = false;
            let report = {
                let cycle = self.poll_once(Local::now().naive_local());
                tokio::pin!(cycle);
                tokio::select! {
                    report = &mut cycle => report?,
                    _ = &mut interrupt => {
                        interrupted = true;
                        println!("\nStopping after the current cycle...");
                        cycle.await?
                    }
                }
            };

            for outcome in &report.executed {
                print_outcome(outcome);
            }
            if report.remaining == 0 {
                println!("All scheduled tasks have been executed.");
                return Ok(());
            }
            if interrupted {
                stopped(report.remaining);
                return Ok(());
            }

            tokio::select! {
                _ = &mut interrupt => {
                    stopped(report.remaining);
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

fn stopped(remaining: usize) {
    warn!("Scheduler interrupted");
    println!("\nStopped. {} task(s) left in the file.", remaining);
}

fn print_outcome(outcome: &TaskOutcome) {
    match &outcome.result {
        Ok(response) if response.success => println!(
            "Executed {} -> order {} ({})",
            outcome.task.summary(),
            response.order_id,
            response.status
        ),
        Ok(response) => println!(
            "Rejected {} -> {}",
            outcome.task.summary(),
            response.error_msg
        ),
        Err(e) => println!("Failed {} -> {}", outcome.task.summary(), e),
    }
}
