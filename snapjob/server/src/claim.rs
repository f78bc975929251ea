use crate::db::{schema, Database};
use crate::tokens::TokenAuthority;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("token is invalid or can no longer be used")]
    InvalidToken,
    #[error("token was issued for a different job")]
    TokenJobMismatch,
    #[error("job is no longer available")]
    JobNotAvailable,
    #[error("job already assigned")]
    AlreadyAssigned,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// The concurrency-critical path: turns a valid token into the job's sole
/// assignment. Any number of helpers may race here; the assignments primary
/// key is the invariant of record, independent of the token layer.
#[derive(Clone)]
pub struct AssignmentCoordinator {
    db: Database,
    tokens: TokenAuthority,
}

impl AssignmentCoordinator {
    pub fn new(db: Database, tokens: TokenAuthority) -> Self {
        Self { db, tokens }
    }

    pub async fn claim(
        &self,
        job_id: Uuid,
        identifier: &str,
        helper_id: Uuid,
    ) -> Result<schema::Assignment, ClaimError> {
        let bound_job = self
            .tokens
            .consume(identifier, helper_id)
            .await?
            .ok_or(ClaimError::InvalidToken)?;

        // A token minted for job A replayed against job B's claim endpoint.
        if bound_job != job_id {
            return Err(ClaimError::TokenJobMismatch);
        }

        let job = self
            .db
            .get_job(job_id)
            .await?
            .ok_or(ClaimError::JobNotAvailable)?;
        if job.status != schema::JobStatus::Open {
            return Err(ClaimError::JobNotAvailable);
        }

        match self.db.create_assignment(job_id, helper_id).await {
            Ok(Some(assignment)) => {
                info!("job {} claimed by helper {}", job_id, helper_id);
                Ok(assignment)
            }
            // The job stopped being open between consume and commit.
            Ok(None) => Err(ClaimError::JobNotAvailable),
            Err(err) if is_unique_violation(&err) => Err(ClaimError::AlreadyAssigned),
            Err(err) => Err(ClaimError::Storage(err)),
        }
    }
}
