use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

// Custom types mapping to PostgreSQL ENUMs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Accepted,
    InProgress,
    InReview,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "content_type", rename_all = "snake_case")]
pub enum ContentType {
    Photos,
    Videos,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "price_tier", rename_all = "snake_case")]
pub enum PriceTier {
    Basic,
    Standard,
    Premium,
}

impl From<JobStatus> for snapjob::JobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Open => snapjob::JobStatus::Open,
            JobStatus::Accepted => snapjob::JobStatus::Accepted,
            JobStatus::InProgress => snapjob::JobStatus::InProgress,
            JobStatus::InReview => snapjob::JobStatus::InReview,
            JobStatus::Completed => snapjob::JobStatus::Completed,
            JobStatus::Cancelled => snapjob::JobStatus::Cancelled,
        }
    }
}

impl From<snapjob::JobStatus> for JobStatus {
    fn from(status: snapjob::JobStatus) -> Self {
        match status {
            snapjob::JobStatus::Open => JobStatus::Open,
            snapjob::JobStatus::Accepted => JobStatus::Accepted,
            snapjob::JobStatus::InProgress => JobStatus::InProgress,
            snapjob::JobStatus::InReview => JobStatus::InReview,
            snapjob::JobStatus::Completed => JobStatus::Completed,
            snapjob::JobStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

impl From<ContentType> for snapjob_api::types::ContentType {
    fn from(ct: ContentType) -> Self {
        match ct {
            ContentType::Photos => snapjob_api::types::ContentType::Photos,
            ContentType::Videos => snapjob_api::types::ContentType::Videos,
            ContentType::Both => snapjob_api::types::ContentType::Both,
        }
    }
}

impl From<snapjob_api::types::ContentType> for ContentType {
    fn from(ct: snapjob_api::types::ContentType) -> Self {
        match ct {
            snapjob_api::types::ContentType::Photos => ContentType::Photos,
            snapjob_api::types::ContentType::Videos => ContentType::Videos,
            snapjob_api::types::ContentType::Both => ContentType::Both,
        }
    }
}

impl From<PriceTier> for snapjob_api::types::PriceTier {
    fn from(tier: PriceTier) -> Self {
        match tier {
            PriceTier::Basic => snapjob_api::types::PriceTier::Basic,
            PriceTier::Standard => snapjob_api::types::PriceTier::Standard,
            PriceTier::Premium => snapjob_api::types::PriceTier::Premium,
        }
    }
}

impl From<snapjob_api::types::PriceTier> for PriceTier {
    fn from(tier: snapjob_api::types::PriceTier) -> Self {
        match tier {
            snapjob_api::types::PriceTier::Basic => PriceTier::Basic,
            snapjob_api::types::PriceTier::Standard => PriceTier::Standard,
            snapjob_api::types::PriceTier::Premium => PriceTier::Premium,
        }
    }
}

// Job table representation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_time: DateTime<Utc>,
    pub content_type: ContentType,
    pub price_tier: PriceTier,
    pub notes: Option<String>,
    pub status: JobStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Assignment table representation. The primary key on job_id is the
// invariant of record: a second row for the same job cannot exist.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub job_id: Uuid,
    pub helper_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ClaimToken table representation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClaimToken {
    pub id: Uuid,
    pub job_id: Uuid,
    pub token: String,
    pub short_code: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_by: Option<Uuid>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Upload table representation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub job_id: Uuid,
    pub uploader_id: Uuid,
    pub blob_key: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}
