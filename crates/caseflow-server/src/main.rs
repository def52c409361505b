use std::sync::Arc;

use anyhow::Context;
use caseflow_core::Backoffice;
use caseflow_mail::SmtpClient;
use caseflow_server::{build_router, AppState, Config};
use caseflow_store::{FileStore, KvStore, MemoryStore};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let store: Arc<dyn KvStore> = match &config.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using file store");
            Arc::new(
                FileStore::open(dir)
                    .await
                    .with_context(|| format!("opening store at {}", dir.display()))?,
            )
        }
        None => {
            info!("no data dir configured; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer = config.smtp_host.as_ref().map(|host| {
        let mut client =
            SmtpClient::new(host.clone(), config.smtp_port).with_hello(config.smtp_hello.clone());
        if let Some(credentials) = config.smtp_credentials() {
            client = client.with_credentials(credentials);
        }
        client
    });

    let state = Arc::new(AppState {
        backoffice: Backoffice::new(store, config.template_dir.clone()),
        mailer,
        mail_from: config.smtp_from.clone(),
        import_dir: config.import_dir.clone(),
        mail_template_dir: config.mail_template_dir.clone(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "caseflow-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
