//! End-to-end lifecycle tests against a live Postgres. Run them with a
//! database reachable through the usual DB_* environment variables:
//!
//!   cargo test -p snapjob-server -- --ignored

use chrono::{Duration, Utc};
use snapjob::{Identity, Role};
use snapjob_api::types::{ContentType, JobDraft, PriceTier};
use snapjob_server::{
    blob::BlobPresigner,
    claim::{AssignmentCoordinator, ClaimError},
    db::{self, schema, Database, DB},
    lifecycle::LifecycleService,
    tokens::TokenAuthority,
};
use url::Url;
use uuid::Uuid;

struct TestEnv {
    db: Database,
    tokens: TokenAuthority,
    coordinator: AssignmentCoordinator,
    lifecycle: LifecycleService,
}

async fn test_env() -> anyhow::Result<TestEnv> {
    let conn = DB::new_from_environment().await?;
    db::create_schema(&conn.pool).await?;
    let database = Database::new(conn.pool);
    let tokens = TokenAuthority::new(database.clone(), "test-token-secret".to_string());
    let coordinator = AssignmentCoordinator::new(database.clone(), tokens.clone());
    let blobs = BlobPresigner::new(
        Url::parse("http://localhost:9000/blobs")?,
        "test-blob-secret".to_string(),
    );
    let lifecycle = LifecycleService::new(database.clone(), blobs);
    Ok(TestEnv {
        db: database,
        tokens,
        coordinator,
        lifecycle,
    })
}

fn requester() -> Identity {
    Identity::new(Uuid::new_v4(), vec![Role::Requester], Role::Requester).unwrap()
}

fn helper() -> Identity {
    Identity::new(Uuid::new_v4(), vec![Role::Helper], Role::Helper).unwrap()
}

fn draft() -> JobDraft {
    JobDraft {
        title: "Garden wedding, golden hour".to_string(),
        description: "Ninety minutes of candids around the ceremony".to_string(),
        location: "Alder Park pavilion".to_string(),
        event_time: Utc::now() + Duration::days(7),
        content_type: ContentType::Both,
        price_tier: PriceTier::Premium,
        notes: Some("Gate code 4417".to_string()),
    }
}

/// Walks a fresh job through claim: token round trip, inspection, and the
/// accepted status with a single assignment at the end.
#[tokio::test]
#[ignore = "requires postgres instance"]
async fn scenario_open_job_is_claimed_once() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    assert_eq!(job.status, schema::JobStatus::Open);

    let token = env.tokens.issue(job.id).await?;
    let report = env.tokens.inspect(&token.token).await?;
    assert!(report.valid);
    assert_eq!(report.job_id, Some(job.id));

    let assignment = env
        .coordinator
        .claim(job.id, &token.token, worker.subject())
        .await?;
    assert_eq!(assignment.helper_id, worker.subject());

    let job = env.db.get_job(job.id).await?.unwrap();
    assert_eq!(job.status, schema::JobStatus::Accepted);
    assert!(env.db.get_assignment(job.id).await?.is_some());

    // The consumed token is now inert on both read paths.
    let stale = env.tokens.inspect(&token.token).await?;
    assert!(!stale.valid);
    assert_eq!(stale.reason, Some("already used"));
    assert!(env
        .tokens
        .consume(&token.token, worker.subject())
        .await?
        .is_none());
    Ok(())
}

/// Upload then submit: the first upload advances the job into active
/// capture, submit parks it in review with a timestamp.
#[tokio::test]
#[ignore = "requires postgres instance"]
async fn scenario_upload_then_submit() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let token = env.tokens.issue(job.id).await?;
    env.coordinator
        .claim(job.id, &token.token, worker.subject())
        .await?;

    // Submitting without an upload is refused.
    assert!(env.lifecycle.submit(&worker, job.id).await.is_err());

    let (upload, grant) = env
        .lifecycle
        .create_upload(&worker, job.id, "ceremony-001.jpg".to_string())
        .await?;
    assert_eq!(upload.uploader_id, worker.subject());
    assert!(grant.url.as_str().contains(&upload.blob_key));

    let job_row = env.db.get_job(job.id).await?.unwrap();
    assert_eq!(job_row.status, schema::JobStatus::InProgress);

    let ctx = env.lifecycle.submit(&worker, job.id).await?;
    assert_eq!(ctx.job.status, schema::JobStatus::InReview);
    assert!(ctx.job.submitted_at.is_some());
    Ok(())
}

/// Approval closes the job for good: the terminal status rejects every
/// later submit, approve, and claim.
#[tokio::test]
#[ignore = "requires postgres instance"]
async fn scenario_approval_is_terminal() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let token = env.tokens.issue(job.id).await?;
    env.coordinator
        .claim(job.id, &token.token, worker.subject())
        .await?;
    env.lifecycle
        .create_upload(&worker, job.id, "reel.mp4".to_string())
        .await?;
    env.lifecycle.submit(&worker, job.id).await?;

    let ctx = env.lifecycle.approve(&owner, job.id).await?;
    assert_eq!(ctx.job.status, schema::JobStatus::Completed);
    assert!(ctx.job.completed_at.is_some());

    assert!(env.lifecycle.submit(&worker, job.id).await.is_err());
    assert!(env.lifecycle.approve(&owner, job.id).await.is_err());

    // The authority itself does not gate issuance, but any token minted
    // against the closed job is unusable.
    let late_token = env.tokens.issue(job.id).await?;
    let err = env
        .coordinator
        .claim(job.id, &late_token.token, helper().subject())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClaimError::InvalidToken | ClaimError::JobNotAvailable | ClaimError::AlreadyAssigned
    ));
    Ok(())
}

/// Two helpers race with distinct valid tokens. Exactly one assignment may
/// ever exist; the loser sees a typed claim failure, never a duplicate.
#[tokio::test]
#[ignore = "requires postgres instance"]
async fn scenario_concurrent_claims_yield_one_assignment() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let first = helper();
    let second = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let token_a = env.tokens.issue(job.id).await?;
    let token_b = env.tokens.issue(job.id).await?;

    let (res_a, res_b) = tokio::join!(
        env.coordinator.claim(job.id, &token_a.token, first.subject()),
        env.coordinator.claim(job.id, &token_b.token, second.subject()),
    );

    let successes = [res_a.is_ok(), res_b.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1, "exactly one claim may win");

    for res in [res_a, res_b] {
        if let Err(err) = res {
            assert!(matches!(
                err,
                ClaimError::AlreadyAssigned
                    | ClaimError::InvalidToken
                    | ClaimError::JobNotAvailable
            ));
        }
    }

    let assignment = env.db.get_assignment(job.id).await?.unwrap();
    let job_row = env.db.get_job(job.id).await?.unwrap();
    assert_eq!(job_row.status, schema::JobStatus::Accepted);
    assert!(
        assignment.helper_id == first.subject() || assignment.helper_id == second.subject()
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires postgres instance"]
async fn expired_tokens_are_inert() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;

    let expired = schema::ClaimToken {
        id: Uuid::new_v4(),
        job_id: job.id,
        token: format!("expired-{}", Uuid::new_v4()),
        short_code: "000001".to_string(),
        expires_at: Utc::now() - Duration::minutes(1),
        consumed: false,
        consumed_by: None,
        consumed_at: None,
        created_at: Utc::now() - Duration::minutes(16),
    };
    env.db.insert_token(&expired).await?;

    let report = env.tokens.inspect(&expired.token).await?;
    assert!(!report.valid);
    assert_eq!(report.reason, Some("expired"));

    assert!(env
        .tokens
        .consume(&expired.token, worker.subject())
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires postgres instance"]
async fn token_for_one_job_cannot_claim_another() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job_a = env.lifecycle.create(&owner, draft()).await?;
    let job_b = env.lifecycle.create(&owner, draft()).await?;
    let token = env.tokens.issue(job_a.id).await?;

    let err = env
        .coordinator
        .claim(job_b.id, &token.token, worker.subject())
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimError::TokenJobMismatch));

    // The mismatch burned the token under the race-tolerant strategy; job A
    // itself is untouched and still open.
    let job_a_row = env.db.get_job(job_a.id).await?.unwrap();
    assert_eq!(job_a_row.status, schema::JobStatus::Open);
    assert!(env.db.get_assignment(job_a.id).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires postgres instance"]
async fn concurrent_approvals_apply_once() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let token = env.tokens.issue(job.id).await?;
    env.coordinator
        .claim(job.id, &token.token, worker.subject())
        .await?;
    env.lifecycle
        .create_upload(&worker, job.id, "pack.zip".to_string())
        .await?;
    env.lifecycle.submit(&worker, job.id).await?;

    let (res_a, res_b) = tokio::join!(
        env.lifecycle.approve(&owner, job.id),
        env.lifecycle.approve(&owner, job.id),
    );
    let successes = [res_a.is_ok(), res_b.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1, "only one approval may commit");

    let job_row = env.db.get_job(job.id).await?.unwrap();
    assert_eq!(job_row.status, schema::JobStatus::Completed);
    Ok(())
}

#[tokio::test]
#[ignore = "requires postgres instance"]
async fn cancelled_jobs_stop_issuing_tokens() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let ctx = env.lifecycle.cancel(&owner, job.id).await?;
    assert_eq!(ctx.job.status, schema::JobStatus::Cancelled);

    assert!(env
        .lifecycle
        .authorize_token_issue(&owner, job.id)
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
#[ignore = "requires postgres instance"]
async fn access_is_scoped_to_the_participants() -> anyhow::Result<()> {
    let env = test_env().await?;
    let owner = requester();
    let worker = helper();
    let stranger = helper();

    let job = env.lifecycle.create(&owner, draft()).await?;
    let token = env.tokens.issue(job.id).await?;
    env.coordinator
        .claim(job.id, &token.token, worker.subject())
        .await?;

    assert!(env.lifecycle.get(&owner, job.id).await.is_ok());
    assert!(env.lifecycle.get(&worker, job.id).await.is_ok());
    assert!(env.lifecycle.get(&stranger, job.id).await.is_err());

    // Only the assigned helper may add captures.
    assert!(env
        .lifecycle
        .create_upload(&stranger, job.id, "sneak.jpg".to_string())
        .await
        .is_err());
    assert!(env
        .lifecycle
        .create_upload(&owner, job.id, "mine.jpg".to_string())
        .await
        .is_err());

    let (upload, _) = env
        .lifecycle
        .create_upload(&worker, job.id, "ok.jpg".to_string())
        .await?;

    // Download: owner always, helper during capture/review, stranger never.
    assert!(env
        .lifecycle
        .download_url(&owner, &upload.blob_key)
        .await
        .is_ok());
    assert!(env
        .lifecycle
        .download_url(&worker, &upload.blob_key)
        .await
        .is_ok());
    assert!(env
        .lifecycle
        .download_url(&stranger, &upload.blob_key)
        .await
        .is_err());

    // The helper may remove their own capture while work is underway.
    env.lifecycle
        .delete_upload(&worker, job.id, upload.id)
        .await?;
    assert!(env.db.get_upload(upload.id).await?.is_none());
    Ok(())
}
