use crate::blob::{BlobGrant, BlobPresigner, BlobStore};
use crate::db::{schema, Database};
use crate::error::ServiceError;
use chrono::Utc;
use snapjob::{policy, Action, CoreError, FieldError, Identity, JobSnapshot, JobStatus, Relationship, Role};
use snapjob_api::types::JobDraft;
use tracing::info;
use uuid::Uuid;

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 5000;
const LOCATION_MAX: usize = 300;
const NOTES_MAX: usize = 2000;

fn validate_draft(draft: &JobDraft) -> Result<(), CoreError> {
    let mut errors = Vec::new();
    if draft.title.trim().is_empty() {
        errors.push(FieldError::new("title", "must not be empty"));
    } else if draft.title.len() > TITLE_MAX {
        errors.push(FieldError::new("title", "too long"));
    }
    if draft.description.trim().is_empty() {
        errors.push(FieldError::new("description", "must not be empty"));
    } else if draft.description.len() > DESCRIPTION_MAX {
        errors.push(FieldError::new("description", "too long"));
    }
    if draft.location.trim().is_empty() {
        errors.push(FieldError::new("location", "must not be empty"));
    } else if draft.location.len() > LOCATION_MAX {
        errors.push(FieldError::new("location", "too long"));
    }
    if draft.notes.as_ref().is_some_and(|n| n.len() > NOTES_MAX) {
        errors.push(FieldError::new("notes", "too long"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(errors))
    }
}

/// How the caller relates to the job, given their active role. An owner
/// acting in the helper role (or the other way round) relates as a stranger
/// for policy purposes.
fn relationship(
    identity: &Identity,
    job: &schema::Job,
    assignment: Option<&schema::Assignment>,
) -> Relationship {
    if job.requester_id == identity.subject() {
        return Relationship::Owner;
    }
    if assignment.is_some_and(|a| a.helper_id == identity.subject()) {
        return Relationship::AssignedHelper;
    }
    Relationship::Unrelated
}

/// Everything a policy decision needs about one job, loaded in one place.
pub struct JobContext {
    pub job: schema::Job,
    pub assignment: Option<schema::Assignment>,
    pub upload_count: i64,
}

impl JobContext {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.job.status.into(),
            upload_count: self.upload_count as usize,
        }
    }
}

#[derive(Clone)]
pub struct LifecycleService {
    db: Database,
    blobs: BlobPresigner,
}

impl LifecycleService {
    pub fn new(db: Database, blobs: BlobPresigner) -> Self {
        Self { db, blobs }
    }

    async fn load(&self, job_id: Uuid) -> Result<JobContext, ServiceError> {
        let job = self
            .db
            .get_job(job_id)
            .await?
            .ok_or(CoreError::NotFound("job"))?;
        let assignment = self.db.get_assignment(job_id).await?;
        let upload_count = self.db.count_uploads(job_id).await?;
        Ok(JobContext {
            job,
            assignment,
            upload_count,
        })
    }

    fn check(&self, identity: &Identity, ctx: &JobContext, action: Action) -> Result<(), ServiceError> {
        let rel = relationship(identity, &ctx.job, ctx.assignment.as_ref());
        policy::decide(identity.active_role(), rel, ctx.snapshot(), action)?;
        Ok(())
    }

    pub async fn create(
        &self,
        identity: &Identity,
        draft: JobDraft,
    ) -> Result<schema::Job, ServiceError> {
        if identity.active_role() != Role::Requester {
            return Err(CoreError::Authorization(
                "only requesters may post jobs".to_string(),
            )
            .into());
        }
        validate_draft(&draft)?;

        let job = schema::Job {
            id: Uuid::new_v4(),
            requester_id: identity.subject(),
            title: draft.title,
            description: draft.description,
            location: draft.location,
            event_time: draft.event_time,
            content_type: draft.content_type.into(),
            price_tier: draft.price_tier.into(),
            notes: draft.notes,
            status: schema::JobStatus::Open,
            submitted_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.db.create_job(&job).await?;
        info!("job {} created by requester {}", job.id, job.requester_id);
        Ok(job)
    }

    pub async fn get(&self, identity: &Identity, job_id: Uuid) -> Result<JobContext, ServiceError> {
        let ctx = self.load(job_id).await?;
        self.check(identity, &ctx, Action::ReadJob)?;
        Ok(ctx)
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<schema::Job>, ServiceError> {
        let jobs = match identity.active_role() {
            Role::Requester => self.db.list_jobs_by_requester(identity.subject()).await?,
            Role::Helper => self.db.list_jobs_by_helper(identity.subject()).await?,
        };
        Ok(jobs)
    }

    /// The issuance gate lives with the caller, not the token authority:
    /// only the owner may mint, and never once the job is closed.
    pub async fn authorize_token_issue(
        &self,
        identity: &Identity,
        job_id: Uuid,
    ) -> Result<(), ServiceError> {
        let ctx = self.load(job_id).await?;
        if identity.active_role() != Role::Requester
            || ctx.job.requester_id != identity.subject()
        {
            return Err(CoreError::Authorization(
                "only the job owner may issue claim tokens".to_string(),
            )
            .into());
        }
        let status: JobStatus = ctx.job.status.into();
        if status.is_terminal() {
            return Err(CoreError::StateConflict("job is closed".to_string()).into());
        }
        Ok(())
    }

    pub async fn submit(
        &self,
        identity: &Identity,
        job_id: Uuid,
    ) -> Result<JobContext, ServiceError> {
        let mut ctx = self.load(job_id).await?;
        self.check(identity, &ctx, Action::SubmitForReview)?;

        let current: JobStatus = ctx.job.status.into();
        JobStatus::validate_transition(current, JobStatus::InReview)?;

        // Commit only if the status the policy saw is still in place.
        ctx.job = self
            .db
            .transition_job(job_id, ctx.job.status, schema::JobStatus::InReview)
            .await?
            .ok_or_else(|| {
                CoreError::StateConflict("job state changed, submit again".to_string())
            })?;
        info!("job {} submitted for review", job_id);
        Ok(ctx)
    }

    pub async fn approve(
        &self,
        identity: &Identity,
        job_id: Uuid,
    ) -> Result<JobContext, ServiceError> {
        let mut ctx = self.load(job_id).await?;
        self.check(identity, &ctx, Action::Approve)?;

        let current: JobStatus = ctx.job.status.into();
        JobStatus::validate_transition(current, JobStatus::Completed)?;

        ctx.job = self
            .db
            .transition_job(job_id, ctx.job.status, schema::JobStatus::Completed)
            .await?
            .ok_or_else(|| {
                CoreError::StateConflict("job state changed, approve again".to_string())
            })?;
        info!("job {} approved", job_id);
        Ok(ctx)
    }

    pub async fn cancel(
        &self,
        identity: &Identity,
        job_id: Uuid,
    ) -> Result<JobContext, ServiceError> {
        let mut ctx = self.load(job_id).await?;
        self.check(identity, &ctx, Action::Cancel)?;

        let current: JobStatus = ctx.job.status.into();
        JobStatus::validate_transition(current, JobStatus::Cancelled)?;

        ctx.job = self
            .db
            .transition_job(job_id, ctx.job.status, schema::JobStatus::Cancelled)
            .await?
            .ok_or_else(|| {
                CoreError::StateConflict("job state changed, cancel again".to_string())
            })?;
        info!("job {} cancelled", job_id);
        Ok(ctx)
    }

    pub async fn create_upload(
        &self,
        identity: &Identity,
        job_id: Uuid,
        file_name: String,
    ) -> Result<(schema::Upload, BlobGrant), ServiceError> {
        if file_name.trim().is_empty() {
            return Err(CoreError::Validation(vec![FieldError::new(
                "file_name",
                "must not be empty",
            )])
            .into());
        }

        let ctx = self.load(job_id).await?;
        self.check(identity, &ctx, Action::CreateUpload)?;

        let upload_id = Uuid::new_v4();
        let upload = schema::Upload {
            id: upload_id,
            job_id,
            uploader_id: identity.subject(),
            blob_key: format!("jobs/{}/{}", job_id, upload_id),
            file_name,
            created_at: Utc::now(),
        };
        self.db.insert_upload(&upload).await?;

        // First upload moves the job into active capture. A concurrent
        // writer may have advanced it already; zero rows is fine here.
        if ctx.job.status == schema::JobStatus::Accepted {
            JobStatus::validate_transition(JobStatus::Accepted, JobStatus::InProgress)?;
            let _ = self
                .db
                .transition_job(job_id, schema::JobStatus::Accepted, schema::JobStatus::InProgress)
                .await?;
        }

        let grant = self.blobs.upload_url(&upload.blob_key)?;
        info!("upload {} created on job {}", upload.id, job_id);
        Ok((upload, grant))
    }

    pub async fn delete_upload(
        &self,
        identity: &Identity,
        job_id: Uuid,
        upload_id: Uuid,
    ) -> Result<(), ServiceError> {
        let ctx = self.load(job_id).await?;
        let upload = self
            .db
            .get_upload(upload_id)
            .await?
            .filter(|u| u.job_id == job_id)
            .ok_or(CoreError::NotFound("upload"))?;

        let action = match identity.active_role() {
            Role::Requester => Action::DeleteAnyUpload,
            Role::Helper => Action::DeleteOwnUpload,
        };
        if action == Action::DeleteOwnUpload && upload.uploader_id != identity.subject() {
            return Err(CoreError::Authorization(
                "delete upload is not permitted for this caller".to_string(),
            )
            .into());
        }
        self.check(identity, &ctx, action)?;

        self.db.delete_upload(upload_id).await?;
        info!("upload {} deleted from job {}", upload_id, job_id);
        Ok(())
    }

    pub async fn download_url(
        &self,
        identity: &Identity,
        blob_key: &str,
    ) -> Result<BlobGrant, ServiceError> {
        let upload = self
            .db
            .get_upload_by_key(blob_key)
            .await?
            .ok_or(CoreError::NotFound("upload"))?;
        let ctx = self.load(upload.job_id).await?;
        self.check(identity, &ctx, Action::DownloadUpload)?;
        Ok(self.blobs.download_url(blob_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use snapjob_api::types::{ContentType, PriceTier};

    fn draft() -> JobDraft {
        JobDraft {
            title: "Rooftop launch party".to_string(),
            description: "Two hours of candid coverage".to_string(),
            location: "12 Harbour Way".to_string(),
            event_time: Utc.with_ymd_and_hms(2025, 6, 12, 18, 0, 0).unwrap(),
            content_type: ContentType::Photos,
            price_tier: PriceTier::Standard,
            notes: None,
        }
    }

    #[test]
    fn drafts_must_carry_the_required_fields() {
        let mut bad = draft();
        bad.title = "  ".to_string();
        bad.location = String::new();
        let err = validate_draft(&bad).unwrap_err();
        match err {
            CoreError::Validation(fields) => {
                let named: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(named, vec!["title", "location"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let mut bad = draft();
        bad.title = "x".repeat(TITLE_MAX + 1);
        bad.notes = Some("y".repeat(NOTES_MAX + 1));
        let err = validate_draft(&bad).unwrap_err();
        match err {
            CoreError::Validation(fields) => assert_eq!(fields.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn relationship_follows_the_stored_references() {
        let requester = Uuid::new_v4();
        let helper = Uuid::new_v4();
        let job = schema::Job {
            id: Uuid::new_v4(),
            requester_id: requester,
            title: "t".to_string(),
            description: "d".to_string(),
            location: "l".to_string(),
            event_time: Utc::now(),
            content_type: schema::ContentType::Photos,
            price_tier: schema::PriceTier::Basic,
            notes: None,
            status: schema::JobStatus::Accepted,
            submitted_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        let assignment = schema::Assignment {
            job_id: job.id,
            helper_id: helper,
            created_at: Utc::now(),
        };

        let owner = Identity::new(requester, vec![Role::Requester], Role::Requester).unwrap();
        let worker = Identity::new(helper, vec![Role::Helper], Role::Helper).unwrap();
        let stranger = Identity::new(Uuid::new_v4(), vec![Role::Helper], Role::Helper).unwrap();

        assert_eq!(
            relationship(&owner, &job, Some(&assignment)),
            Relationship::Owner
        );
        assert_eq!(
            relationship(&worker, &job, Some(&assignment)),
            Relationship::AssignedHelper
        );
        assert_eq!(
            relationship(&stranger, &job, Some(&assignment)),
            Relationship::Unrelated
        );
        assert_eq!(relationship(&worker, &job, None), Relationship::Unrelated);
    }
}
