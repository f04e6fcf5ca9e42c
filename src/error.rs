use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibrisError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Selection error: {0}")]
    Selection(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Parse error: {message}")]
    Parse { message: String, position: Option<u64> },
    #[error("Transform error: {0}")]
    Transform(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Scrape error: {0}")]
    Scrape(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, LibrisError>;

// Helper conversions
impl From<std::io::Error> for LibrisError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<config::ConfigError> for LibrisError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::fmt::Error> for LibrisError {
    fn from(e: std::fmt::Error) -> Self {
        Self::Transform(e.to_string())
    }
}
