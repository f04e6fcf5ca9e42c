//! The query/recommendation engine evaluated against the in-memory document.
//!
//! Every lookup goes through [`BookFilter`], a first-class predicate composed
//! from typed comparisons. No query text is ever assembled from user input,
//! so there is no expression for a crafted theme value to alter.

use std::collections::BTreeSet;

use crate::error::{LibrisError, Result};
use crate::model::{Book, Library, ReadingLevel, User};

// ------------- BookFilter -------------

/// A typed filter predicate over books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookFilter {
    /// Exact match on the title field.
    TitleIs(String),
    /// The book's theme set contains the given value (exact string match).
    HasTheme(String),
    /// The book's reading-level set contains the given level.
    HasLevel(ReadingLevel),
    /// Conjunction; the empty conjunction matches every book.
    All(Vec<BookFilter>),
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            BookFilter::TitleIs(title) => book.title() == title,
            BookFilter::HasTheme(theme) => book.has_theme(theme),
            BookFilter::HasLevel(level) => book.has_level(*level),
            BookFilter::All(filters) => filters.iter().all(|f| f.matches(book)),
        }
    }
}

/// Evaluates a filter against every book in document order.
pub fn select<'a>(library: &'a Library, filter: &BookFilter) -> Vec<&'a Book> {
    library.books().iter().filter(|b| filter.matches(b)).collect()
}

// ------------- Named operations -------------

/// Exact-match lookup by title; the first match wins when titles collide.
pub fn find_book_by_title<'a>(library: &'a Library, title: &str) -> Option<&'a Book> {
    select(library, &BookFilter::TitleIs(title.to_owned()))
        .into_iter()
        .next()
}

/// Every theme value across every book, deduplicated and sorted
/// lexicographically. Used to populate the theme filter selector.
pub fn list_themes(library: &Library) -> Vec<String> {
    library
        .books()
        .iter()
        .flat_map(|b| b.themes().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// All books whose theme set contains the given value. An unknown theme
/// yields an empty sequence, not an error.
pub fn filter_books_by_theme<'a>(library: &'a Library, theme: &str) -> Vec<&'a Book> {
    select(library, &BookFilter::HasTheme(theme.to_owned()))
}

// ------------- Recommendation -------------

/// The two-tier recommendation for one user: "same level" is the broad set,
/// "same level and same taste" the refined subset, shown side by side so the
/// reader can compare.
#[derive(Debug)]
pub struct Recommendation<'a> {
    user: &'a User,
    by_level: Vec<&'a Book>,
    by_level_and_theme: Vec<&'a Book>,
}

impl<'a> Recommendation<'a> {
    pub fn user(&self) -> &'a User {
        self.user
    }
    /// Every book whose reading-level set contains the user's level.
    pub fn by_level(&self) -> &[&'a Book] {
        &self.by_level
    }
    /// The subset of `by_level` that also carries the user's preferred theme.
    pub fn by_level_and_theme(&self) -> &[&'a Book] {
        &self.by_level_and_theme
    }
}

/// Resolves a user by positional index and computes both recommendation
/// tiers. Pure; the document is never mutated.
pub fn recommend(library: &Library, user_index: usize) -> Result<Recommendation<'_>> {
    let user = library.user_by_index(user_index).ok_or_else(|| {
        LibrisError::Selection(format!(
            "user index {user_index} is out of range (0..{})",
            library.users().len()
        ))
    })?;
    let by_level = select(library, &BookFilter::HasLevel(user.reading_level()));
    let by_level_and_theme = select(
        library,
        &BookFilter::All(vec![
            BookFilter::HasLevel(user.reading_level()),
            BookFilter::HasTheme(user.preferred_theme().to_owned()),
        ]),
    );
    Ok(Recommendation {
        user,
        by_level,
        by_level_and_theme,
    })
}
