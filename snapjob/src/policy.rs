use crate::identity::Role;
use crate::status::JobStatus;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ReadJob,
    SubmitForReview,
    Approve,
    Cancel,
    CreateUpload,
    DeleteOwnUpload,
    DeleteAnyUpload,
    DownloadUpload,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ReadJob => write!(f, "read job"),
            Action::SubmitForReview => write!(f, "submit for review"),
            Action::Approve => write!(f, "approve"),
            Action::Cancel => write!(f, "cancel"),
            Action::CreateUpload => write!(f, "create upload"),
            Action::DeleteOwnUpload => write!(f, "delete upload"),
            Action::DeleteAnyUpload => write!(f, "delete upload"),
            Action::DownloadUpload => write!(f, "download upload"),
        }
    }
}

/// How the caller relates to the job under decision. Computed by the caller
/// from a fetched job/assignment snapshot; the engine itself never touches
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Owner,
    AssignedHelper,
    Unrelated,
}

/// The slice of mutable job state a decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub upload_count: usize,
}

// The message deliberately stays generic: authorization failures must not
// leak job state to callers who may not read it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} is not permitted for this caller")]
pub struct PolicyDenied {
    pub action: Action,
}

/// Decides one cell of the access table. Pure over the given snapshot.
pub fn decide(
    role: Role,
    relationship: Relationship,
    snapshot: JobSnapshot,
    action: Action,
) -> Result<(), PolicyDenied> {
    use JobStatus::*;

    let allowed = match (role, relationship) {
        (Role::Requester, Relationship::Owner) => match action {
            Action::ReadJob => true,
            Action::Approve => snapshot.status == InReview,
            Action::Cancel => matches!(snapshot.status, Open | Accepted | InProgress),
            Action::DeleteAnyUpload => snapshot.status == InReview,
            Action::DownloadUpload => true,
            Action::SubmitForReview | Action::CreateUpload | Action::DeleteOwnUpload => false,
        },
        (Role::Helper, Relationship::AssignedHelper) => match action {
            Action::ReadJob => true,
            Action::SubmitForReview => {
                matches!(snapshot.status, Accepted | InProgress) && snapshot.upload_count > 0
            }
            Action::CreateUpload => matches!(snapshot.status, Accepted | InProgress),
            Action::DeleteOwnUpload => snapshot.status != Completed,
            Action::DownloadUpload => matches!(snapshot.status, InProgress | InReview),
            Action::Approve | Action::Cancel | Action::DeleteAnyUpload => false,
        },
        // A role acting outside its relationship to the job gets nothing,
        // and neither does a stranger.
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(PolicyDenied { action })
    }
}
