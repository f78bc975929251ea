use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapjob::{JobStatus, Role};
use uuid::Uuid;

/// The verified caller, as established by the upstream identity provider.
/// The gateway translates the bearer token into this shape before the
/// request reaches us; nothing here is self-asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub subject: Uuid,
    pub granted_roles: Vec<Role>,
    pub active_role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Photos,
    Videos,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Basic,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_time: DateTime<Utc>,
    pub content_type: ContentType,
    pub price_tier: PriceTier,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub helper_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_time: DateTime<Utc>,
    pub content_type: ContentType,
    pub price_tier: PriceTier,
    pub notes: Option<String>,
    pub status: JobStatus,
    pub upload_count: u64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub event_time: DateTime<Utc>,
    pub price_tier: PriceTier,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub short_code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCheck {
    pub valid: bool,
    pub job_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub job_id: Uuid,
    pub helper_id: Uuid,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadView {
    pub id: Uuid,
    pub job_id: Uuid,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// A created upload together with the time-limited capability URL the
/// client pushes the bytes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadGrant {
    pub upload: UploadView,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadGrant {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
