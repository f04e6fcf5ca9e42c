//! Seeding the document from a public "best books" list.
//!
//! One fetch, one extraction pass, one rewrite of the document: existing
//! books are discarded, users are preserved, and every scraped title gets a
//! random pair of themes and one to three random reading levels, so two runs
//! over the same page differ in everything but the titles.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use scraper::{Html, Selector};
use tracing::info;

use crate::error::{LibrisError, Result};
use crate::model::{Book, Library, ReadingLevel};
use crate::store::DocumentStore;

/// The fixed theme pool books are seeded from.
pub const THEME_OPTIONS: [&str; 6] = [
    "Science Fiction",
    "Mystery",
    "Fantasy",
    "Romance",
    "Historical",
    "Thriller",
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Fetches the list page. The site rejects default library user agents, so a
/// browser string is sent.
pub fn fetch_page(url: &str, timeout: Duration) -> Result<String> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| LibrisError::Scrape(format!("fetching '{url}': {e}")))?;
    response
        .into_string()
        .map_err(|e| LibrisError::Scrape(format!("reading body of '{url}': {e}")))
}

/// Extracts the on-screen book titles from the page: the `<h2>` inside each
/// `div.book-blot`, trimmed and deduplicated in order, capped at `want`.
/// Fails when the page yields fewer than `want` titles.
pub fn extract_titles(html: &str, want: usize) -> Result<Vec<String>> {
    let selector = Selector::parse("div.book-blot h2")
        .map_err(|e| LibrisError::Scrape(format!("bad selector: {e}")))?;
    let document = Html::parse_document(html);
    let mut titles: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        let text = element.text().collect::<String>().trim().to_owned();
        if !text.is_empty() && !titles.contains(&text) {
            titles.push(text);
        }
        if titles.len() >= want {
            break;
        }
    }
    if titles.len() < want {
        return Err(LibrisError::Scrape(format!(
            "only found {} book titles; expected {want}",
            titles.len()
        )));
    }
    Ok(titles)
}

/// Rebuilds the book section of the document from the given titles.
///
/// The existing document is loaded when present (users survive the reseed);
/// otherwise a fresh one is created carrying the schema reference. All books
/// are removed and one book per title is inserted with two distinct random
/// themes and one to three distinct random levels.
pub fn seed_library<R: Rng>(
    store: &dyn DocumentStore,
    titles: &[String],
    schema: &str,
    rng: &mut R,
) -> Result<Library> {
    let mut library = match store.load() {
        Ok(library) => library,
        Err(LibrisError::NotFound(_)) => Library::with_schema_hint(schema),
        Err(e) => return Err(e),
    };
    let preserved_users = library.users().len();
    library.clear_books();

    for title in titles {
        let themes: Vec<String> = THEME_OPTIONS
            .choose_multiple(rng, 2)
            .map(|t| (*t).to_owned())
            .collect();
        let count = rng.gen_range(1..=3);
        let levels: Vec<ReadingLevel> = ReadingLevel::ALL
            .choose_multiple(rng, count)
            .copied()
            .collect();
        library.push_book(Book::new(title.clone(), themes, levels));
    }

    store.save(&library)?;
    info!(
        books = titles.len(),
        users = preserved_users,
        "document reseeded"
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use crate::store::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixture_page(count: usize) -> String {
        let mut html = String::from("<html><body>");
        for i in 1..=count {
            html.push_str(&format!(
                "<div class=\"book-blot\"><h2>{i}. Book number {i}</h2><p>blurb</p></div>"
            ));
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn extracts_titles_in_page_order() {
        let titles = extract_titles(&fixture_page(25), 20).unwrap();
        assert_eq!(titles.len(), 20);
        assert_eq!(titles[0], "1. Book number 1");
        assert_eq!(titles[19], "20. Book number 20");
    }

    #[test]
    fn deduplicates_repeated_headings() {
        let html = "<div class=\"book-blot\"><h2>Same</h2></div>\
                    <div class=\"book-blot\"><h2>Same</h2></div>\
                    <div class=\"book-blot\"><h2>Other</h2></div>";
        let titles = extract_titles(html, 2).unwrap();
        assert_eq!(titles, vec!["Same".to_owned(), "Other".to_owned()]);
    }

    #[test]
    fn too_few_titles_is_a_scrape_error() {
        let err = extract_titles(&fixture_page(5), 20).unwrap_err();
        assert!(matches!(err, LibrisError::Scrape(_)));
    }

    #[test]
    fn reseeding_replaces_books_and_preserves_users() {
        let mut existing = Library::with_schema_hint("books.xsd");
        existing.push_book(Book::new(
            "Old".into(),
            vec!["Mystery".into(), "Thriller".into()],
            vec![ReadingLevel::Beginner],
        ));
        existing.push_user(User::new(
            "Ada".into(),
            "Lovelace".into(),
            ReadingLevel::Advanced,
            "Science Fiction".into(),
        ));
        let store = MemoryStore::with_library(existing);

        let titles: Vec<String> = (1..=3).map(|i| format!("Title {i}")).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let library = seed_library(&store, &titles, "books.xsd", &mut rng).unwrap();

        assert_eq!(library.books().len(), 3);
        assert!(library.books().iter().all(|b| b.title().starts_with("Title")));
        assert_eq!(library.users().len(), 1);
        // Every seeded book honors the canonical constraints.
        for book in library.books() {
            assert_eq!(book.themes().len(), 2);
            assert_ne!(book.themes()[0], book.themes()[1]);
            assert!((1..=3).contains(&book.levels().len()));
        }
        // The reseed was persisted, not just returned.
        assert_eq!(store.load().unwrap(), library);
    }

    #[test]
    fn seeding_without_a_document_starts_fresh_with_schema() {
        let store = MemoryStore::new();
        let titles = vec!["Solo".to_owned()];
        let mut rng = StdRng::seed_from_u64(1);
        let library = seed_library(&store, &titles, "books.xsd", &mut rng).unwrap();
        assert_eq!(library.schema_hint(), Some("books.xsd"));
        assert_eq!(library.books().len(), 1);
        assert!(library.users().is_empty());
    }
}
