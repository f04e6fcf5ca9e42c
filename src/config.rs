//! Application settings, layered from defaults, an optional `libris.toml`
//! next to the working directory, and `LIBRIS_*` environment overrides
//! (double underscore separates sections, e.g. `LIBRIS_SERVER__BIND`).

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP server binds to.
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Path of the XML document.
    pub document: String,
    /// XSD file name written into the document's schema reference when the
    /// seed script creates it from scratch.
    pub schema: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    /// Page the seed binary scrapes for book titles.
    pub url: String,
    /// Number of titles the scrape must yield.
    pub count: usize,
    /// Fetch timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub seed: SeedSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("server.bind", "127.0.0.1:5000")?
            .set_default("storage.document", "books.xml")?
            .set_default("storage.schema", "books.xsd")?
            .set_default(
                "seed.url",
                "https://reedsy.com/discovery/blog/best-books-to-read-in-a-lifetime",
            )?
            .set_default("seed.count", 20_i64)?
            .set_default("seed.timeout_secs", 10_i64)?
            .add_source(File::new("libris", FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("LIBRIS").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
