use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use libris::config::Settings;
use libris::error::Result;
use libris::server::{self, AppState};
use libris::store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::load()?;
    let store = FileStore::new(&settings.storage.document);
    let state = Arc::new(AppState::new(Box::new(store)));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    info!(addr = %settings.server.bind, document = %settings.storage.document, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
