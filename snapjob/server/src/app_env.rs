use crate::blob::BlobPresigner;
use crate::claim::AssignmentCoordinator;
use crate::db::{DBConfig, Database, DB};
use crate::lifecycle::LifecycleService;
use crate::tokens::TokenAuthority;
use anyhow::Result;
use url::Url;

/// Secrets and endpoints resolved once at process start. None of these have
/// compiled-in fallbacks; missing values abort startup.
pub struct AppSecrets {
    pub token_secret: String,
    pub blob_secret: String,
    pub blob_base_url: Url,
}

pub struct AppEnv {
    pub db: Database,
    pub tokens: TokenAuthority,
    pub coordinator: AssignmentCoordinator,
    pub lifecycle: LifecycleService,
}

impl AppEnv {
    pub async fn new(db_config: DBConfig, secrets: AppSecrets) -> Result<Self> {
        let db = {
            let db = DB::new(db_config).await?;
            Database::new(db.pool)
        };
        let tokens = TokenAuthority::new(db.clone(), secrets.token_secret);
        let coordinator = AssignmentCoordinator::new(db.clone(), tokens.clone());
        let blobs = BlobPresigner::new(secrets.blob_base_url, secrets.blob_secret);
        let lifecycle = LifecycleService::new(db.clone(), blobs);
        Ok(Self {
            db,
            tokens,
            coordinator,
            lifecycle,
        })
    }
}
