use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::{
    SQL_INSERT_INTERACTION, SQL_RECENT_INTERACTIONS, SQL_RESTART_SESSION,
    SQL_RESTART_SESSION_NORMALIZED,
};
use crate::storage::{Record, SqlParam, Storage, StorageError};

/// In-process stand-in for the interaction store that understands the queries in `db`.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
}

#[derive(Default)]
struct Tables {
    interactions: Vec<[Option<String>; 4]>,
    kiosk_names: HashMap<String, String>,
    sessions: Vec<Session>,
}

struct Session {
    id: String,
    restart_clicks: Option<i64>,
    closed: bool,
}

impl MemoryStorage {
    pub fn add_kiosk(&self, kiosk_id: &str, friendly_name: &str) {
        self.tables
            .lock()
            .expect("tables")
            .kiosk_names
            .insert(kiosk_id.to_string(), friendly_name.to_string());
    }

    pub fn add_session(&self, id: &str, restart_clicks: Option<i64>, closed: bool) {
        self.tables.lock().expect("tables").sessions.push(Session {
            id: id.to_string(),
            restart_clicks,
            closed,
        });
    }

    /// Adds a row the way another writer of the shared table might, nulls included.
    pub fn add_raw_interaction(&self, row: [Option<&str>; 4]) {
        self.tables
            .lock()
            .expect("tables")
            .interactions
            .push(row.map(|value| value.map(str::to_string)));
    }

    pub fn interactions(&self) -> Vec<[Option<String>; 4]> {
        self.tables.lock().expect("tables").interactions.clone()
    }

    /// Number of statements issued so far, ping included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn restart(&self, matches: impl Fn(&str) -> bool) -> Vec<Record> {
        let mut tables = self.tables.lock().expect("tables");
        tables
            .sessions
            .iter_mut()
            .filter(|session| !session.closed && matches(&session.id))
            .map(|session| {
                let clicks = session.restart_clicks.unwrap_or(0) + 1;
                session.restart_clicks = Some(clicks);
                record(json!({ "restart_clicks": clicks }))
            })
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match sql {
            "SELECT 1" => Ok(vec![record(json!({ "?column?": 1 }))]),
            SQL_RECENT_INTERACTIONS => {
                let [SqlParam::Int(limit)] = params else {
                    panic!("listing expects a single limit parameter");
                };
                let tables = self.tables.lock().expect("tables");
                let mut rows = tables.interactions.clone();
                // DESC NULLS LAST: None sorts below Some, so reversing keeps nulls at the end.
                rows.sort_by(|a, b| b[2].cmp(&a[2]));
                Ok(rows
                    .into_iter()
                    .take(*limit as usize)
                    .map(|[screen, action, timestamp, kiosk_id]| {
                        let friendly_name = kiosk_id
                            .as_ref()
                            .and_then(|kiosk_id| tables.kiosk_names.get(kiosk_id).cloned());
                        record(json!({
                            "screen": screen,
                            "action": action,
                            "timestamp": timestamp,
                            "kiosk_id": kiosk_id,
                            "friendly_name": friendly_name,
                        }))
                    })
                    .collect())
            }
            SQL_RESTART_SESSION => {
                let id = normalized(&text_param(params, 0));
                Ok(self.restart(|stored| normalized(stored) == id))
            }
            SQL_RESTART_SESSION_NORMALIZED => {
                let id = text_param(params, 0);
                Ok(self.restart(|stored| normalized(stored) == id))
            }
            other => panic!("unexpected query: {other}"),
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(sql, SQL_INSERT_INTERACTION, "unexpected statement");
        let row = [0, 1, 2, 3].map(|idx| Some(text_param(params, idx)));
        self.tables.lock().expect("tables").interactions.push(row);
        Ok(1)
    }
}

/// Storage whose connection is gone; every statement fails.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn query(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<Record>, StorageError> {
        Err(StorageError::Closed)
    }

    async fn execute(&self, _sql: &str, _params: &[SqlParam]) -> Result<u64, StorageError> {
        Err(StorageError::Closed)
    }
}

fn text_param(params: &[SqlParam], idx: usize) -> String {
    match params.get(idx) {
        Some(SqlParam::Text(value)) => value.clone(),
        other => panic!("expected text parameter at {idx}, got {other:?}"),
    }
}

fn normalized(session_id: &str) -> String {
    session_id.replace('-', "").to_uppercase()
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
