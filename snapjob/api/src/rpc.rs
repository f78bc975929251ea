use super::types::{
    Caller, ClaimReceipt, DownloadGrant, IssuedToken, JobDraft, JobSummary, JobView, TokenCheck,
    UploadGrant,
};
use jsonrpsee::{proc_macros::rpc, types::ErrorObjectOwned};
use uuid::Uuid;

#[rpc(server, client)]
pub trait MarketApi {
    #[method(name = "createJob")]
    async fn create_job(&self, caller: Caller, draft: JobDraft)
        -> Result<JobView, ErrorObjectOwned>;

    #[method(name = "getJob")]
    async fn get_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned>;

    #[method(name = "listJobs")]
    async fn list_jobs(&self, caller: Caller) -> Result<Vec<JobSummary>, ErrorObjectOwned>;

    #[method(name = "issueClaimToken")]
    async fn issue_claim_token(
        &self,
        caller: Caller,
        job_id: Uuid,
    ) -> Result<IssuedToken, ErrorObjectOwned>;

    #[method(name = "checkToken")]
    async fn check_token(&self, token: String) -> Result<TokenCheck, ErrorObjectOwned>;

    #[method(name = "joinJob")]
    async fn join_job(
        &self,
        caller: Caller,
        job_id: Uuid,
        token: String,
    ) -> Result<ClaimReceipt, ErrorObjectOwned>;

    #[method(name = "submitJob")]
    async fn submit_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned>;

    #[method(name = "approveJob")]
    async fn approve_job(&self, caller: Caller, job_id: Uuid)
        -> Result<JobView, ErrorObjectOwned>;

    #[method(name = "cancelJob")]
    async fn cancel_job(&self, caller: Caller, job_id: Uuid) -> Result<JobView, ErrorObjectOwned>;

    #[method(name = "createUpload")]
    async fn create_upload(
        &self,
        caller: Caller,
        job_id: Uuid,
        file_name: String,
    ) -> Result<UploadGrant, ErrorObjectOwned>;

    #[method(name = "deleteUpload")]
    async fn delete_upload(
        &self,
        caller: Caller,
        job_id: Uuid,
        upload_id: Uuid,
    ) -> Result<(), ErrorObjectOwned>;

    #[method(name = "downloadUrl")]
    async fn download_url(
        &self,
        caller: Caller,
        blob_key: String,
    ) -> Result<DownloadGrant, ErrorObjectOwned>;

    #[method(name = "healthCheck")]
    async fn health_check(&self) -> Result<(), ErrorObjectOwned>;
}
