use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of everything a session did against the service.
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    base_url: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    base_url: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str, base_url: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            base_url: base_url.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            base_url: &self.base_url,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self) -> Result<()> {
        self.log("session_start", serde_json::json!({}))
    }

    pub fn user_create(&mut self, username: &str) -> Result<()> {
        self.log("user_create", serde_json::json!({ "username": username }))
    }

    pub fn user_open(&mut self, username: &str) -> Result<()> {
        self.log("user_open", serde_json::json!({ "username": username }))
    }

    pub fn user_delete(&mut self, username: &str) -> Result<()> {
        self.log("user_delete", serde_json::json!({ "username": username }))
    }

    pub fn tasks_load(&mut self, count: usize) -> Result<()> {
        self.log("tasks_load", serde_json::json!({ "count": count }))
    }

    pub fn task_add(&mut self, label: &str) -> Result<()> {
        self.log("task_add", serde_json::json!({ "label": label }))
    }

    pub fn task_delete(&mut self, id: u64) -> Result<()> {
        self.log("task_delete", serde_json::json!({ "id": id }))
    }

    pub fn clear_all(&mut self, count: usize) -> Result<()> {
        self.log("clear_all", serde_json::json!({ "count": count }))
    }

    /// Log a failed operation. Failures are only ever logged, never
    /// surfaced past the prompt.
    pub fn op_error(&mut self, op: &str, message: &str) -> Result<()> {
        self.log(
            "op_error",
            serde_json::json!({ "op": op, "message": message }),
        )
    }
}
