use crate::db::{schema::ClaimToken, Database};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Fixed expiry window for every issued token.
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// What a read-only token lookup reports. Advisory: the authoritative
/// decision is always the atomic consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReport {
    pub valid: bool,
    pub job_id: Option<Uuid>,
    pub reason: Option<&'static str>,
}

impl TokenReport {
    fn invalid(reason: &'static str) -> Self {
        Self {
            valid: false,
            job_id: None,
            reason: Some(reason),
        }
    }

    fn valid(job_id: Uuid) -> Self {
        Self {
            valid: true,
            job_id: Some(job_id),
            reason: None,
        }
    }
}

pub(crate) fn token_digest(secret: &str, job_id: Uuid, nonce_hex: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(job_id.as_bytes());
    hasher.update(nonce_hex.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mints the full token string (128 random bits plus a digest keyed to the
/// job) and the short numeric code for manual entry.
pub(crate) fn mint_token(secret: &str, job_id: Uuid) -> (String, String) {
    let mut nonce = [0u8; 16];
    OsRng.fill_bytes(&mut nonce);
    let nonce_hex = hex::encode(nonce);
    let token = format!("{}.{}", nonce_hex, token_digest(secret, job_id, &nonce_hex));
    let short_code = format!("{:06}", OsRng.next_u32() % 1_000_000);
    (token, short_code)
}

/// Checks the keyed digest of a full token against a job. Short codes carry
/// no digest; their binding lives in the stored row.
pub(crate) fn token_matches_job(secret: &str, identifier: &str, job_id: Uuid) -> bool {
    match identifier.split_once('.') {
        Some((nonce_hex, digest)) => token_digest(secret, job_id, nonce_hex) == digest,
        None => true,
    }
}

#[derive(Clone)]
pub struct TokenAuthority {
    db: Database,
    secret: String,
}

impl TokenAuthority {
    pub fn new(db: Database, secret: String) -> Self {
        Self { db, secret }
    }

    /// Issues a fresh token bound to the job. Does not look at job status;
    /// the caller holds the terminal-state gate.
    pub async fn issue(&self, job_id: Uuid) -> Result<ClaimToken, sqlx::Error> {
        let (token, short_code) = mint_token(&self.secret, job_id);
        let now = Utc::now();
        let row = ClaimToken {
            id: Uuid::new_v4(),
            job_id,
            token,
            short_code,
            expires_at: now + Duration::minutes(TOKEN_TTL_MINUTES),
            consumed: false,
            consumed_by: None,
            consumed_at: None,
            created_at: now,
        };
        self.db.insert_token(&row).await?;
        Ok(row)
    }

    /// Read-only pre-flight check. The first failing rule names the reason;
    /// nothing is mutated. The answer can go stale immediately.
    pub async fn inspect(&self, identifier: &str) -> Result<TokenReport, sqlx::Error> {
        let Some(row) = self.db.find_token(identifier).await? else {
            return Ok(TokenReport::invalid("not found"));
        };
        if row.expires_at <= Utc::now() {
            return Ok(TokenReport::invalid("expired"));
        }
        if row.consumed {
            return Ok(TokenReport::invalid("already used"));
        }
        if self.db.get_assignment(row.job_id).await?.is_some() {
            return Ok(TokenReport::invalid("job already assigned"));
        }
        match self.db.get_job(row.job_id).await? {
            None => Ok(TokenReport::invalid("not found")),
            Some(job) if job.status != crate::db::schema::JobStatus::Open => {
                Ok(TokenReport::invalid("job is not open"))
            }
            Some(job) => Ok(TokenReport::valid(job.id)),
        }
    }

    /// Marks the token consumed and returns its bound job id, or None when
    /// any precondition fails. The checks and the mutation are one atomic
    /// statement; no reason is distinguished on this path.
    pub async fn consume(
        &self,
        identifier: &str,
        claimant: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let Some(row) = self.db.find_token(identifier).await? else {
            return Ok(None);
        };
        // A full token whose digest does not verify against its stored job
        // is treated as unknown.
        if !token_matches_job(&self.secret, identifier, row.job_id) {
            return Ok(None);
        }
        self.db.consume_token(row.id, claimant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_has_nonce_and_keyed_digest() {
        let job_id = Uuid::new_v4();
        let (token, short_code) = mint_token("s3cret", job_id);

        let (nonce_hex, digest) = token.split_once('.').unwrap();
        assert_eq!(nonce_hex.len(), 32); // 128 bits
        assert_eq!(digest.len(), 64);
        assert_eq!(short_code.len(), 6);
        assert!(short_code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn token_verifies_only_against_its_own_job() {
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();
        let (token, _) = mint_token("s3cret", job_a);

        assert!(token_matches_job("s3cret", &token, job_a));
        assert!(!token_matches_job("s3cret", &token, job_b));
    }

    #[test]
    fn digest_depends_on_the_server_secret() {
        let job_id = Uuid::new_v4();
        let (token, _) = mint_token("s3cret", job_id);
        assert!(!token_matches_job("other-secret", &token, job_id));
    }

    #[test]
    fn short_codes_skip_digest_verification() {
        assert!(token_matches_job("s3cret", "042137", Uuid::new_v4()));
    }

    #[test]
    fn successive_mints_differ() {
        let job_id = Uuid::new_v4();
        let (a, _) = mint_token("s3cret", job_id);
        let (b, _) = mint_token("s3cret", job_id);
        assert_ne!(a, b);
    }
}
