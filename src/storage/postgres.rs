//! Postgres-backed repository.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionStatus};

use super::{BmiRecord, UssdRepository};

/// Repository over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgUssdRepository {
    pool: PgPool,
}

impl PgUssdRepository {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with at most `max_connections` connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("connected to postgres");
        Ok(Self { pool })
    }

    /// Access the underlying pool (for shutdown).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the two tables if they do not exist. No migration tooling:
    /// the schema is fixed.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ussd_sessions (
                session_key  TEXT PRIMARY KEY,
                phone_number TEXT NOT NULL,
                state        TEXT NOT NULL,
                language     TEXT,
                status       TEXT NOT NULL,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bmi_records (
                id           BIGSERIAL PRIMARY KEY,
                session_key  TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                age          INTEGER NOT NULL,
                height_cm    NUMERIC(6,2) NOT NULL,
                weight_kg    NUMERIC(6,2) NOT NULL,
                bmi          NUMERIC(5,1) NOT NULL,
                category     TEXT NOT NULL,
                recorded_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bmi_records_phone \
             ON bmi_records (phone_number, recorded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UssdRepository for PgUssdRepository {
    async fn save_record(&self, record: &BmiRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bmi_records
                (session_key, phone_number, age, height_cm, weight_kg, bmi, category, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.session_key)
        .bind(&record.phone_number)
        .bind(record.age)
        .bind(record.height_cm)
        .bind(record.weight_kg)
        .bind(record.bmi)
        .bind(&record.category)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_records(&self, phone: &str, limit: i64) -> Result<Vec<BmiRecord>> {
        let records = sqlx::query_as::<_, BmiRecord>(
            r#"
            SELECT session_key, phone_number, age, height_cm, weight_kg, bmi, category, recorded_at
            FROM bmi_records
            WHERE phone_number = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(phone)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn upsert_session(&self, session: &Session, status: SessionStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ussd_sessions
                (session_key, phone_number, state, language, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            ON CONFLICT (session_key) DO UPDATE SET
                state = EXCLUDED.state,
                language = EXCLUDED.language,
                status = EXCLUDED.status,
                updated_at = now()
            "#,
        )
        .bind(&session.key)
        .bind(&session.phone)
        .bind(session.state.to_string())
        .bind(session.language.map(|lang| lang.to_string()))
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_status(&self, session_key: &str, status: SessionStatus) -> Result<()> {
        sqlx::query(
            "UPDATE ussd_sessions SET status = $2, updated_at = now() WHERE session_key = $1",
        )
        .bind(session_key)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
