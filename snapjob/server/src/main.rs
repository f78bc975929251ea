use clap::Parser;
use jsonrpsee::{
    core::async_trait,
    server::Server,
    types::{ErrorObject, ErrorObjectOwned},
};
use snapjob::Identity;
use snapjob_api::{
    rpc::MarketApiServer,
    types::{
        Caller, ClaimReceipt, DownloadGrant, IssuedToken, JobDraft, JobSummary, JobView,
        TokenCheck, UploadGrant, UploadView,
    },
};
use snapjob_server::{
    app_config::init_console_subscriber,
    app_env::{AppEnv, AppSecrets},
    db::schema,
    error::{codes, ServiceError},
    lifecycle::JobContext,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, info};
use uuid::Uuid;

mod config {
    use clap::Parser;
    use serde::Serialize;
    use snapjob_server::app_config;

    #[derive(Parser, Serialize)]
    #[command(author, version, about, long_about = None)]
    pub struct AppConfig {
        #[clap(flatten)]
        pub base_config: app_config::AppBaseConfig,

        #[arg(long, env = "JSON_RPC_PORT", default_value = "3030")]
        pub json_rpc_port: u16,

        /// Secret keying claim-token digests. No default: startup fails if absent.
        #[arg(long, env = "TOKEN_SECRET")]
        #[serde(skip_serializing)]
        pub token_secret: String,

        /// Secret signing blob capability urls. No default: startup fails if absent.
        #[arg(long, env = "BLOB_SECRET")]
        #[serde(skip_serializing)]
        pub blob_secret: String,

        /// Base url of the external blob store
        #[arg(long, env = "BLOB_BASE_URL", default_value = "http://localhost:9000/blobs")]
        pub blob_base_url: String,
    }
}

use config::AppConfig;

fn identity(caller: &Caller) -> Result<Identity, ErrorObjectOwned> {
    Identity::new(
        caller.subject,
        caller.granted_roles.clone(),
        caller.active_role,
    )
    .map_err(|err| ErrorObject::owned(codes::UNAUTHENTICATED, err.to_string(), None::<()>))
}

fn job_view(ctx: JobContext) -> JobView {
    JobView {
        id: ctx.job.id,
        requester_id: ctx.job.requester_id,
        helper_id: ctx.assignment.map(|a| a.helper_id),
        title: ctx.job.title,
        description: ctx.job.description,
        location: ctx.job.location,
        event_time: ctx.job.event_time,
        content_type: ctx.job.content_type.into(),
        price_tier: ctx.job.price_tier.into(),
        notes: ctx.job.notes,
        status: ctx.job.status.into(),
        upload_count: ctx.upload_count as u64,
        submitted_at: ctx.job.submitted_at,
        completed_at: ctx.job.completed_at,
        created_at: ctx.job.created_at,
    }
}

fn job_summary(job: schema::Job) -> JobSummary {
    JobSummary {
        id: job.id,
        title: job.title,
        location: job.location,
        event_time: job.event_time,
        price_tier: job.price_tier.into(),
        status: job.status.into(),
        created_at: job.created_at,
    }
}

fn upload_view(upload: schema::Upload) -> UploadView {
    UploadView {
        id: upload.id,
        job_id: upload.job_id,
        uploader_id: upload.uploader_id,
        file_name: upload.file_name,
        created_at: upload.created_at,
    }
}

struct MarketApiImpl {
    app_env: Arc<AppEnv>,
}

#[async_trait]
impl MarketApiServer for MarketApiImpl {
    async fn create_job(
        &self,
        caller: Caller,
        draft: JobDraft,
    ) -> Result<JobView, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let job = self.app_env.lifecycle.create(&identity, draft).await?;
        Ok(job_view(JobContext {
            job,
            assignment: None,
            upload_count: 0,
        }))
    }

    async fn get_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let ctx = self.app_env.lifecycle.get(&identity, job_id).await?;
        Ok(job_view(ctx))
    }

    async fn list_jobs(&self, caller: Caller) -> Result<Vec<JobSummary>, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let jobs = self.app_env.lifecycle.list(&identity).await?;
        Ok(jobs.into_iter().map(job_summary).collect())
    }

    async fn issue_claim_token(
        &self,
        caller: Caller,
        job_id: Uuid,
    ) -> Result<IssuedToken, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        self.app_env
            .lifecycle
            .authorize_token_issue(&identity, job_id)
            .await?;
        let token = self
            .app_env
            .tokens
            .issue(job_id)
            .await
            .map_err(ServiceError::Storage)?;
        debug!("claim token issued for job {}", job_id);
        Ok(IssuedToken {
            token: token.token,
            short_code: token.short_code,
            expires_at: token.expires_at,
        })
    }

    async fn check_token(&self, token: String) -> Result<TokenCheck, ErrorObjectOwned> {
        let report = self
            .app_env
            .tokens
            .inspect(&token)
            .await
            .map_err(ServiceError::Storage)?;
        Ok(TokenCheck {
            valid: report.valid,
            job_id: report.job_id,
            reason: report.reason.map(|r| r.to_string()),
        })
    }

    async fn join_job(
        &self,
        caller: Caller,
        job_id: Uuid,
        token: String,
    ) -> Result<ClaimReceipt, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        if identity.active_role() != snapjob::Role::Helper {
            return Err(ErrorObject::owned(
                codes::DENIED,
                "only helpers may claim jobs",
                None::<()>,
            ));
        }
        let assignment = self
            .app_env
            .coordinator
            .claim(job_id, &token, identity.subject())
            .await?;
        Ok(ClaimReceipt {
            job_id: assignment.job_id,
            helper_id: assignment.helper_id,
            claimed_at: assignment.created_at,
        })
    }

    async fn submit_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let ctx = self.app_env.lifecycle.submit(&identity, job_id).await?;
        Ok(job_view(ctx))
    }

    async fn approve_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let ctx = self.app_env.lifecycle.approve(&identity, job_id).await?;
        Ok(job_view(ctx))
    }

    async fn cancel_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let ctx = self.app_env.lifecycle.cancel(&identity, job_id).await?;
        Ok(job_view(ctx))
    }

    async fn create_upload(
        &self,
        caller: Caller,
        job_id: Uuid,
        file_name: String,
    ) -> Result<UploadGrant, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let (upload, grant) = self
            .app_env
            .lifecycle
            .create_upload(&identity, job_id, file_name)
            .await?;
        Ok(UploadGrant {
            upload: upload_view(upload),
            upload_url: grant.url.to_string(),
            expires_at: grant.expires_at,
        })
    }

    async fn delete_upload(
        &self,
        caller: Caller,
        job_id: Uuid,
        upload_id: Uuid,
    ) -> Result<(), ErrorObjectOwned> {
        let identity = identity(&caller)?;
        self.app_env
            .lifecycle
            .delete_upload(&identity, job_id, upload_id)
            .await?;
        Ok(())
    }

    async fn download_url(
        &self,
        caller: Caller,
        blob_key: String,
    ) -> Result<DownloadGrant, ErrorObjectOwned> {
        let identity = identity(&caller)?;
        let grant = self
            .app_env
            .lifecycle
            .download_url(&identity, &blob_key)
            .await?;
        Ok(DownloadGrant {
            url: grant.url.to_string(),
            expires_at: grant.expires_at,
        })
    }

    async fn health_check(&self) -> Result<(), ErrorObjectOwned> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_console_subscriber();
    let cli = AppConfig::parse();
    debug!("{}", serde_json::to_string_pretty(&cli)?);

    // Define the server address
    let addr = {
        let host = "0.0.0.0";
        let addr = format!("{}:{}", host, cli.json_rpc_port);
        addr.parse::<SocketAddr>()
    }?;

    let app_env = {
        let secrets = AppSecrets {
            token_secret: cli.token_secret.clone(),
            blob_secret: cli.blob_secret.clone(),
            blob_base_url: url::Url::parse(&cli.blob_base_url)?,
        };
        let e = AppEnv::new(cli.base_config.db_config(), secrets).await?;
        Arc::new(e)
    };

    // Create the JSON-RPC server
    let server = Server::builder().build(addr).await?;

    let server_addr: SocketAddr = server.local_addr()?;
    info!("JSON-RPC server started at {}", server_addr);

    let api = MarketApiImpl { app_env };

    // Start the server with our API implementation
    let handle = server.start(api.into_rpc());

    // Keep the server running until Ctrl+C is pressed
    tokio::signal::ctrl_c().await?;

    handle.stop()?;
    info!("JSON-RPC server stopped");

    Ok(())
}
