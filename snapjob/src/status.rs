use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Accepted,
    InProgress,
    InReview,
    Completed,
    Cancelled,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Open => write!(f, "open"),
            JobStatus::Accepted => write!(f, "accepted"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::InReview => write!(f, "in_review"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move job from {from} to {to}")]
pub struct TransitionDenied {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Open,
        JobStatus::Accepted,
        JobStatus::InProgress,
        JobStatus::InReview,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    /// The outgoing edges of the lifecycle graph. Terminal statuses have none.
    pub fn allowed_transitions(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Open => &[JobStatus::Accepted, JobStatus::Cancelled],
            JobStatus::Accepted => &[JobStatus::InProgress, JobStatus::Cancelled],
            JobStatus::InProgress => &[JobStatus::InReview, JobStatus::Cancelled],
            JobStatus::InReview => &[JobStatus::Completed],
            JobStatus::Completed => &[],
            JobStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Every status write in the system must pass through here first.
    pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), TransitionDenied> {
        if from.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(TransitionDenied { from, to })
        }
    }
}

#[cfg(any(test, feature = "test"))]
pub mod test_utils {
    use super::*;
    use proptest::prelude::*;

    impl Arbitrary for JobStatus {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop::sample::select(JobStatus::ALL.to_vec()).boxed()
        }
    }
}
