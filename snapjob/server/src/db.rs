use anyhow::Result;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Executor,
};
use uuid::Uuid;

pub mod schema;

use schema::{Assignment, ClaimToken, Job, JobStatus, Upload};

#[derive(Clone)]
pub struct DBConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl DBConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

#[derive(Clone)]
pub struct DB {
    pub pool: PgPool,
}

impl DB {
    pub async fn new(config: DBConfig) -> Result<Self> {
        let connection_string = config.connection_string();
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;
        Ok(Self { pool })
    }

    pub async fn new_from_environment() -> Result<Self> {
        let db_config = {
            let host = std::env::var("DB_HOST")?;
            let port = std::env::var("DB_PORT")?.parse()?;
            let user = std::env::var("DB_USER")?;
            let password = std::env::var("DB_PASSWORD")?;
            let dbname = std::env::var("DB_NAME")?;
            anyhow::Ok(DBConfig {
                host,
                port,
                user,
                password,
                dbname,
            })
        }?;
        Self::new(db_config).await
    }
}

pub async fn create_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create ENUM types
    pool.execute(sqlx::query(
        r#"
        DO $$ BEGIN
            IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'job_status') THEN
                CREATE TYPE job_status AS ENUM (
                    'open',
                    'accepted',
                    'in_progress',
                    'in_review',
                    'completed',
                    'cancelled'
                );
            END IF;
            IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'content_type') THEN
                CREATE TYPE content_type AS ENUM ('photos', 'videos', 'both');
            END IF;
            IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'price_tier') THEN
                CREATE TYPE price_tier AS ENUM ('basic', 'standard', 'premium');
            END IF;
        END $$;
    "#,
    ))
    .await?;

    // Create Jobs table
    pool.execute(sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            requester_id UUID NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            location TEXT NOT NULL,
            event_time TIMESTAMPTZ NOT NULL,
            content_type content_type NOT NULL,
            price_tier price_tier NOT NULL,
            notes TEXT,
            status job_status NOT NULL,
            submitted_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL
        )
    "#,
    ))
    .await?;

    // Create Assignments table. The primary key on job_id is the final
    // backstop against concurrent claims.
    pool.execute(sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            job_id UUID PRIMARY KEY REFERENCES jobs (id),
            helper_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
    "#,
    ))
    .await?;

    // Create ClaimTokens table
    pool.execute(sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claim_tokens (
            id UUID PRIMARY KEY,
            job_id UUID NOT NULL REFERENCES jobs (id),
            token TEXT NOT NULL UNIQUE,
            short_code TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            consumed BOOLEAN NOT NULL DEFAULT FALSE,
            consumed_by UUID,
            consumed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL
        )
    "#,
    ))
    .await?;

    // Create Uploads table
    pool.execute(sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS uploads (
            id UUID PRIMARY KEY,
            job_id UUID NOT NULL REFERENCES jobs (id),
            uploader_id UUID NOT NULL,
            blob_key TEXT NOT NULL UNIQUE,
            file_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
    "#,
    ))
    .await?;

    // Create indexes
    pool.execute(sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE INDEX IF NOT EXISTS idx_jobs_requester ON jobs (requester_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
            CREATE INDEX IF NOT EXISTS idx_assignments_helper ON assignments (helper_id);
            CREATE INDEX IF NOT EXISTS idx_claim_tokens_job ON claim_tokens (job_id);
            CREATE INDEX IF NOT EXISTS idx_claim_tokens_short_code ON claim_tokens (short_code);
            CREATE INDEX IF NOT EXISTS idx_uploads_job ON uploads (job_id);
        END $$;
    "#,
    ))
    .await?;

    Ok(())
}

// Database management struct
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    // Job-specific methods
    pub async fn create_job(&self, job: &Job) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, requester_id, title, description, location,
                event_time, content_type, price_tier, notes,
                status, submitted_at, completed_at, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
            )
        "#,
        )
        .bind(job.id)
        .bind(job.requester_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.event_time)
        .bind(job.content_type)
        .bind(job.price_tier)
        .bind(&job.notes)
        .bind(job.status)
        .bind(job.submitted_at)
        .bind(job.completed_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                id, requester_id, title, description, location,
                event_time, content_type, price_tier, notes,
                status, submitted_at, completed_at, created_at
            FROM jobs
            WHERE id = $1
        "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_jobs_by_requester(&self, requester_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                id, requester_id, title, description, location,
                event_time, content_type, price_tier, notes,
                status, submitted_at, completed_at, created_at
            FROM jobs
            WHERE requester_id = $1
            ORDER BY created_at DESC
        "#,
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_jobs_by_helper(&self, helper_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                j.id, j.requester_id, j.title, j.description, j.location,
                j.event_time, j.content_type, j.price_tier, j.notes,
                j.status, j.submitted_at, j.completed_at, j.created_at
            FROM jobs j
            JOIN assignments a ON a.job_id = j.id
            WHERE a.helper_id = $1
            ORDER BY j.created_at DESC
        "#,
        )
        .bind(helper_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Conditional status move: commits only if the row still carries the
    /// status the caller saw. Zero rows back means a concurrent writer won.
    pub async fn transition_job(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE jobs
            SET
                status = $3,
                submitted_at = CASE WHEN $3 = 'in_review'::job_status THEN now() ELSE submitted_at END,
                completed_at = CASE WHEN $3 = 'completed'::job_status THEN now() ELSE completed_at END
            WHERE id = $1 AND status = $2
            RETURNING
                id, requester_id, title, description, location,
                event_time, content_type, price_tier, notes,
                status, submitted_at, completed_at, created_at
        "#,
        )
        .bind(job_id)
        .bind(expected)
        .bind(next)
        .fetch_optional(&self.pool)
        .await
    }

    // Assignment-specific methods
    pub async fn get_assignment(&self, job_id: Uuid) -> Result<Option<Assignment>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT job_id, helper_id, created_at
            FROM assignments
            WHERE job_id = $1
        "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Creates the job's sole assignment and advances it to accepted, as one
    /// transaction. Returns Ok(None) when the job is no longer open; a unique
    /// violation on the assignments primary key propagates to the caller.
    pub async fn create_assignment(
        &self,
        job_id: Uuid,
        helper_id: Uuid,
    ) -> Result<Option<Assignment>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Insert before the status move so a losing racer surfaces the
        // primary-key violation rather than a generic zero-row update.
        let assignment = sqlx::query_as(
            r#"
            INSERT INTO assignments (job_id, helper_id, created_at)
            VALUES ($1, $2, now())
            RETURNING job_id, helper_id, created_at
        "#,
        )
        .bind(job_id)
        .bind(helper_id)
        .fetch_one(&mut *tx)
        .await?;

        let moved = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2
            WHERE id = $1 AND status = $3
        "#,
        )
        .bind(job_id)
        .bind(JobStatus::Accepted)
        .bind(JobStatus::Open)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if moved == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(assignment))
    }

    // ClaimToken-specific methods
    pub async fn insert_token(&self, token: &ClaimToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO claim_tokens (
                id, job_id, token, short_code, expires_at,
                consumed, consumed_by, consumed_at, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9
            )
        "#,
        )
        .bind(token.id)
        .bind(token.job_id)
        .bind(&token.token)
        .bind(&token.short_code)
        .bind(token.expires_at)
        .bind(token.consumed)
        .bind(token.consumed_by)
        .bind(token.consumed_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolves either the full token string or the short code; the newest
    /// match wins when a regenerated code collides with a stale one.
    pub async fn find_token(&self, identifier: &str) -> Result<Option<ClaimToken>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                id, job_id, token, short_code, expires_at,
                consumed, consumed_by, consumed_at, created_at
            FROM claim_tokens
            WHERE token = $1 OR short_code = $1
            ORDER BY created_at DESC
            LIMIT 1
        "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
    }

    /// The authoritative consume: one atomic statement re-checking every
    /// precondition. Returns the bound job id, or None if any check failed
    /// (already consumed, expired, job assigned, or job no longer open).
    pub async fn consume_token(
        &self,
        token_id: Uuid,
        claimant: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE claim_tokens
            SET consumed = TRUE, consumed_by = $2, consumed_at = now()
            WHERE id = $1
              AND NOT consumed
              AND expires_at > now()
              AND NOT EXISTS (
                  SELECT 1 FROM assignments a WHERE a.job_id = claim_tokens.job_id
              )
              AND EXISTS (
                  SELECT 1 FROM jobs j WHERE j.id = claim_tokens.job_id AND j.status = $3
              )
            RETURNING job_id
        "#,
        )
        .bind(token_id)
        .bind(claimant)
        .bind(JobStatus::Open)
        .fetch_optional(&self.pool)
        .await
    }

    // Upload-specific methods
    pub async fn insert_upload(&self, upload: &Upload) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO uploads (
                id, job_id, uploader_id, blob_key, file_name, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6
            )
        "#,
        )
        .bind(upload.id)
        .bind(upload.job_id)
        .bind(upload.uploader_id)
        .bind(&upload.blob_key)
        .bind(&upload.file_name)
        .bind(upload.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_upload(&self, upload_id: Uuid) -> Result<Option<Upload>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, job_id, uploader_id, blob_key, file_name, created_at
            FROM uploads
            WHERE id = $1
        "#,
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_upload_by_key(&self, blob_key: &str) -> Result<Option<Upload>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, job_id, uploader_id, blob_key, file_name, created_at
            FROM uploads
            WHERE blob_key = $1
        "#,
        )
        .bind(blob_key)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_upload(&self, upload_id: Uuid) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(upload_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    pub async fn count_uploads(&self, job_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM uploads WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
    }
}
