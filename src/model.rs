//! The in-memory document model: a [`Library`] owning its books and users.
//!
//! Entities are created only through the `ingest` module and carry stable
//! generated identities, since positional indexes are not safe keys across
//! edits. The ordering invariant of the persisted document (all books before
//! all users) is structural here: books and users live in separate ordered
//! sequences and the store always serializes books first.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::LibrisError;

// ------------- ReadingLevel -------------

/// The closed set of difficulty tags carried by books and users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ReadingLevel {
    pub const ALL: [ReadingLevel; 3] = [
        ReadingLevel::Beginner,
        ReadingLevel::Intermediate,
        ReadingLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingLevel::Beginner => "Beginner",
            ReadingLevel::Intermediate => "Intermediate",
            ReadingLevel::Advanced => "Advanced",
        }
    }
}

impl FromStr for ReadingLevel {
    type Err = LibrisError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(ReadingLevel::Beginner),
            "Intermediate" => Ok(ReadingLevel::Intermediate),
            "Advanced" => Ok(ReadingLevel::Advanced),
            other => Err(LibrisError::Validation(format!(
                "'{other}' is not a reading level"
            ))),
        }
    }
}

impl fmt::Display for ReadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------- Book -------------

/// A catalogued book. The title acts as the lookup key, but uniqueness is
/// not enforced; the generated id is the stable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    id: Uuid,
    title: String,
    themes: Vec<String>,
    levels: Vec<ReadingLevel>,
}

impl Book {
    pub fn new(title: String, themes: Vec<String>, levels: Vec<ReadingLevel>) -> Self {
        Self::with_id(Uuid::new_v4(), title, themes, levels)
    }
    /// Used when restoring a persisted document that already carries ids.
    pub fn with_id(
        id: Uuid,
        title: String,
        themes: Vec<String>,
        levels: Vec<ReadingLevel>,
    ) -> Self {
        Self {
            id,
            title,
            themes,
            levels,
        }
    }
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn themes(&self) -> &[String] {
        &self.themes
    }
    pub fn levels(&self) -> &[ReadingLevel] {
        &self.levels
    }
    pub fn has_theme(&self, theme: &str) -> bool {
        self.themes.iter().any(|t| t == theme)
    }
    pub fn has_level(&self, level: ReadingLevel) -> bool {
        self.levels.contains(&level)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.themes.join(", "))
    }
}

// ------------- User -------------

/// A reader of the library, with a single reading level and one preferred
/// theme driving recommendations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: Uuid,
    name: String,
    surname: String,
    reading_level: ReadingLevel,
    preferred_theme: String,
}

impl User {
    pub fn new(
        name: String,
        surname: String,
        reading_level: ReadingLevel,
        preferred_theme: String,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), name, surname, reading_level, preferred_theme)
    }
    pub fn with_id(
        id: Uuid,
        name: String,
        surname: String,
        reading_level: ReadingLevel,
        preferred_theme: String,
    ) -> Self {
        Self {
            id,
            name,
            surname,
            reading_level,
            preferred_theme,
        }
    }
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn surname(&self) -> &str {
        &self.surname
    }
    pub fn reading_level(&self) -> ReadingLevel {
        self.reading_level
    }
    pub fn preferred_theme(&self) -> &str {
        &self.preferred_theme
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.surname)
    }
}

// ------------- Library -------------

/// The root container, exclusively owning its books and users.
///
/// The persisted form keeps every `<book>` before every `<user>`; here the
/// invariant cannot be violated since the sequences are separate fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    schema_hint: Option<String>,
    books: Vec<Book>,
    users: Vec<User>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }
    /// An empty library annotated with an XSD reference, as written by the
    /// seed script when creating the document from scratch.
    pub fn with_schema_hint(schema: impl Into<String>) -> Self {
        Self {
            schema_hint: Some(schema.into()),
            books: Vec::new(),
            users: Vec::new(),
        }
    }
    pub fn schema_hint(&self) -> Option<&str> {
        self.schema_hint.as_deref()
    }
    pub fn books(&self) -> &[Book] {
        &self.books
    }
    pub fn users(&self) -> &[User] {
        &self.users
    }
    /// Inserts a book positionally before every user, which in this model is
    /// an append to the book sequence.
    pub fn push_book(&mut self, book: Book) -> &Book {
        self.books.push(book);
        // the push above guarantees a last element
        self.books.last().unwrap()
    }
    /// Users only ever append at the end of the document.
    pub fn push_user(&mut self, user: User) -> &User {
        self.users.push(user);
        self.users.last().unwrap()
    }
    /// Removes every book while leaving all users in place. Used by the seed
    /// script before re-inserting the scraped titles.
    pub fn clear_books(&mut self) {
        self.books.clear();
    }
    pub fn user_by_index(&self, index: usize) -> Option<&User> {
        self.users.get(index)
    }
    pub fn is_empty(&self) -> bool {
        self.books.is_empty() && self.users.is_empty()
    }
}
