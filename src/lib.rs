//! Libris – a small personal-library web application backed by one XML file.
//!
//! The document is a [`model::Library`]: an ordered run of books followed by
//! an ordered run of users. Requests load the document, query or mutate it in
//! memory, optionally persist it, and render the outcome as HTML. The
//! structurally interesting piece is the query/recommendation engine in
//! [`query`]; routing and page rendering are thin layers around it.
//!
//! ## Modules
//! * [`model`] – `Library`, `Book`, `User` and the `ReadingLevel` enum; every
//!   entity carries a stable generated id.
//! * [`store`] – The `DocumentStore` interface with the XML-backed
//!   `FileStore` (atomic write-then-rename saves) and an in-memory double.
//! * [`ingest`] – Validated `add_book` / `add_user` mutations, the only
//!   write path into a library.
//! * [`query`] – Typed `BookFilter` predicates plus title lookup, the sorted
//!   theme catalogue, theme filtering and the two-tier recommendation.
//! * [`render`] – Whole-document HTML export parameterized by a reading
//!   level.
//! * [`seed`] – Scraping a public book list into a fresh document while
//!   preserving existing users (see the `seed` binary).
//! * [`server`] – The axum router; mutations run serialized behind a single
//!   writer lock.
//! * [`config`] – Layered settings (defaults, `libris.toml`, `LIBRIS_*`
//!   environment).
//! * [`error`] – The `LibrisError` taxonomy and crate-wide `Result`.
//!
//! ## Quick Start
//! ```
//! use libris::ingest;
//! use libris::model::Library;
//! use libris::query;
//!
//! let mut library = Library::new();
//! ingest::add_book(
//!     &mut library,
//!     "Dune",
//!     &["SciFi".into(), "Adventure".into()],
//!     &["Intermediate".into()],
//! )
//! .unwrap();
//! ingest::add_user(&mut library, "Ada", "Lovelace", "Intermediate", "SciFi").unwrap();
//! let recommendation = query::recommend(&library, 0).unwrap();
//! assert_eq!(recommendation.by_level_and_theme().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod query;
pub mod render;
pub mod seed;
pub mod server;
pub mod store;
