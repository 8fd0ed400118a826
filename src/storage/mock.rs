//! In-memory repository for unit and integration tests.
//!
//! Records every call so tests can assert on side effects, and can inject
//! failures to drive the maintenance path.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, StorageError};
use crate::session::{Session, SessionStatus};

use super::{BmiRecord, UssdRepository};

/// Configuration for mock repository behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockConfig {
    /// Fail record inserts.
    pub fail_save: bool,
    /// Fail history reads.
    pub fail_history: bool,
    /// Fail metadata upserts.
    pub fail_upsert: bool,
}

/// In-memory repository standing in for Postgres.
#[derive(Debug, Clone, Default)]
pub struct MockRepository {
    config: MockConfig,
    records: Arc<Mutex<Vec<BmiRecord>>>,
    statuses: Arc<Mutex<Vec<(String, SessionStatus)>>>,
}

impl MockRepository {
    /// Create a mock that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom failure behavior.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Everything saved so far.
    pub fn saved_records(&self) -> Vec<BmiRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Forget all saved records (to stage an empty-history read).
    pub fn clear_records(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Session statuses written, in call order.
    pub fn statuses(&self) -> Vec<(String, SessionStatus)> {
        self.statuses.lock().unwrap().clone()
    }

    fn fail(what: &str) -> crate::error::UssdError {
        StorageError::Mock(format!("injected {what} failure")).into()
    }
}

#[async_trait]
impl UssdRepository for MockRepository {
    async fn save_record(&self, record: &BmiRecord) -> Result<()> {
        if self.config.fail_save {
            return Err(Self::fail("save"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent_records(&self, phone: &str, limit: i64) -> Result<Vec<BmiRecord>> {
        if self.config.fail_history {
            return Err(Self::fail("history"));
        }
        let mut records: Vec<BmiRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.phone_number == phone)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn upsert_session(&self, session: &Session, status: SessionStatus) -> Result<()> {
        if self.config.fail_upsert {
            return Err(Self::fail("upsert"));
        }
        self.statuses
            .lock()
            .unwrap()
            .push((session.key.clone(), status));
        Ok(())
    }

    async fn mark_status(&self, session_key: &str, status: SessionStatus) -> Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((session_key.to_string(), status));
        Ok(())
    }
}
