use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use tenantguard_api::app::{self, AppServices};
use tenantguard_infra::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantguard_observability::init();

    let config = Config::from_env().context("invalid configuration")?;

    let services = match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(config.auth.query_timeout)
                .connect(url)
                .await
                .context("failed to connect to postgres")?;
            AppServices::postgres(&config.auth, pool)
                .await
                .context("failed to prepare postgres schema")?
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store and an empty identity directory");
            AppServices::in_memory(&config.auth).0
        }
    };

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
