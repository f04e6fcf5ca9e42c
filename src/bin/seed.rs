//! One-shot seeding of the library document from the configured book list
//! page. Existing users survive a reseed; all books are replaced.

use std::time::Duration;

use rand::thread_rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use libris::config::Settings;
use libris::error::Result;
use libris::seed;
use libris::store::FileStore;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::load()?;
    info!(url = %settings.seed.url, "fetching book list");
    let html = seed::fetch_page(
        &settings.seed.url,
        Duration::from_secs(settings.seed.timeout_secs),
    )?;
    let titles = seed::extract_titles(&html, settings.seed.count)?;

    let store = FileStore::new(&settings.storage.document);
    let library = seed::seed_library(&store, &titles, &settings.storage.schema, &mut thread_rng())?;
    info!(
        document = %settings.storage.document,
        books = library.books().len(),
        users = library.users().len(),
        "seeding complete"
    );
    Ok(())
}
