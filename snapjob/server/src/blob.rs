use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use url::Url;

pub const UPLOAD_GRANT_MINUTES: i64 = 15;
pub const DOWNLOAD_GRANT_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct BlobGrant {
    pub url: Url,
    pub expires_at: DateTime<Utc>,
}

/// The external blob store, seen from the core as an issuer of time-limited
/// capability URLs.
pub trait BlobStore {
    fn upload_url(&self, key: &str) -> Result<BlobGrant, url::ParseError>;
    fn download_url(&self, key: &str) -> Result<BlobGrant, url::ParseError>;
}

/// Signs capability URLs locally against a shared secret, the way
/// object-store SDKs presign requests. The store verifies the signature on
/// its side; no round trip is needed to grant access.
#[derive(Clone)]
pub struct BlobPresigner {
    base: Url,
    secret: String,
}

impl BlobPresigner {
    pub fn new(base: Url, secret: String) -> Self {
        Self { base, secret }
    }

    fn sign(&self, verb: &str, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(verb.as_bytes());
        hasher.update(key.as_bytes());
        hasher.update(expires.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    fn grant(&self, verb: &str, key: &str, ttl_minutes: i64) -> Result<BlobGrant, url::ParseError> {
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        let expires = expires_at.timestamp();
        let sig = self.sign(verb, key, expires);
        let url = Url::parse(&format!(
            "{}/{}?verb={}&expires={}&sig={}",
            self.base.as_str().trim_end_matches('/'),
            key,
            verb,
            expires,
            sig
        ))?;
        Ok(BlobGrant { url, expires_at })
    }
}

impl BlobStore for BlobPresigner {
    fn upload_url(&self, key: &str) -> Result<BlobGrant, url::ParseError> {
        self.grant("put", key, UPLOAD_GRANT_MINUTES)
    }

    fn download_url(&self, key: &str) -> Result<BlobGrant, url::ParseError> {
        self.grant("get", key, DOWNLOAD_GRANT_MINUTES)
    }
}
