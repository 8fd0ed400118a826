//! Persistence for BMI records and session metadata.
//!
//! The repository is a trait so the menu engine can run against Postgres in
//! production and against [`mock::MockRepository`] in tests.

pub mod mock;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::Result;
use crate::session::{Session, SessionStatus};

/// One persisted BMI measurement. Append-only, never updated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BmiRecord {
    /// Gateway session key the measurement was taken in.
    pub session_key: String,
    /// Caller phone number.
    pub phone_number: String,
    /// Age in years.
    pub age: i32,
    /// Height in centimeters.
    pub height_cm: Decimal,
    /// Weight in kilograms.
    pub weight_kg: Decimal,
    /// Computed index, one fraction digit.
    pub bmi: Decimal,
    /// Category name as stored (see [`crate::bmi::BmiCategory`]).
    pub category: String,
    /// When the measurement completed.
    pub recorded_at: OffsetDateTime,
}

/// Durable storage used by the menu engine.
#[async_trait]
pub trait UssdRepository: Send + Sync {
    /// Append one BMI record.
    async fn save_record(&self, record: &BmiRecord) -> Result<()>;

    /// Latest records for a phone number, newest first.
    async fn recent_records(&self, phone: &str, limit: i64) -> Result<Vec<BmiRecord>>;

    /// Mirror session metadata for observability.
    async fn upsert_session(&self, session: &Session, status: SessionStatus) -> Result<()>;

    /// Flag a session's final status without touching anything else.
    async fn mark_status(&self, session_key: &str, status: SessionStatus) -> Result<()>;
}
