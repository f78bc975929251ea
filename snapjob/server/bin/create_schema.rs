use anyhow::Result;
use snapjob_server::{app_config, db};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    app_config::init_console_subscriber();
    let conn = db::DB::new_from_environment().await?;
    match db::create_schema(&conn.pool).await {
        Ok(_) => {
            info!("Database schema setup completed successfully.");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Error setting up database schema: {}", e);
            Err(e.into())
        }
    }
}
