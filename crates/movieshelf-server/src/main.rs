use anyhow::Context;
use movieshelf_storage::{snapshot, Catalog, DocumentStore, InMemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod metrics;

use api::AppState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let catalog = Catalog::new(store);
    catalog
        .ping()
        .await
        .context("movie store did not answer the startup ping")?;
    info!("movie store reachable");

    let cors = api::cors_layer(config.site_url.as_deref()).context("SITEURL is not a valid origin")?;
    let app = api::router(AppState { catalog }, cors, config.request_timeout);

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    info!(addr = %config.http_addr, tls = config.tls.is_some(), "http listening");
    match &config.tls {
        Some(tls) => {
            let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .context("loading TLS certificate and key")?;
            axum_server::bind_rustls(config.http_addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            axum_server::bind(config.http_addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }
    info!("server stopped");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if let Some(uri) = &config.mongo_uri {
        #[cfg(feature = "mongo")]
        {
            let store = movieshelf_storage::MongoStore::connect(
                uri,
                &config.mongo_db,
                &config.mongo_collection,
            )
            .await?;
            info!(db = %config.mongo_db, collection = %config.mongo_collection, "using mongodb");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "mongo"))]
        {
            let _ = uri;
            anyhow::bail!("MONGOURI is set but this build does not include the `mongo` feature");
        }
    }
    if let Some(path) = &config.data_file {
        let store = snapshot::load_store(path)
            .with_context(|| format!("loading DATA_FILE {}", path.display()))?;
        return Ok(Arc::new(store));
    }
    tracing::warn!("neither MONGOURI nor DATA_FILE is set; serving an empty catalog");
    Ok(Arc::new(InMemoryStore::new()))
}

async fn shutdown_on_ctrl_c(handle: axum_server::Handle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
