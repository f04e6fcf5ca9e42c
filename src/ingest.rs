//! Validated mutations of the document: the only write path into a
//! [`Library`]. A failed validation leaves the library untouched; there is
//! no partial insert.

use std::str::FromStr;

use crate::error::{LibrisError, Result};
use crate::model::{Book, Library, ReadingLevel, User};

/// Exactly two themes per book in the canonical schema.
pub const THEMES_PER_BOOK: usize = 2;
/// At most three reading levels per book, one per enum member.
pub const MAX_LEVELS_PER_BOOK: usize = 3;

/// Validates and appends a new book, positioned before every user.
///
/// Rejected inputs: a blank title; anything other than exactly two distinct
/// themes; fewer than one or more than three reading levels; a level outside
/// the fixed enum; the same level given twice.
pub fn add_book<'a>(
    library: &'a mut Library,
    title: &str,
    themes: &[String],
    levels: &[String],
) -> Result<&'a Book> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LibrisError::Validation("title is required".into()));
    }

    if themes.len() != THEMES_PER_BOOK {
        return Err(LibrisError::Validation(format!(
            "exactly {THEMES_PER_BOOK} themes must be selected"
        )));
    }
    let themes: Vec<String> = themes.iter().map(|t| t.trim().to_owned()).collect();
    if themes.iter().any(String::is_empty) {
        return Err(LibrisError::Validation("themes must not be blank".into()));
    }
    if themes[0] == themes[1] {
        return Err(LibrisError::Validation(
            "the two themes must be different".into(),
        ));
    }

    if levels.is_empty() || levels.len() > MAX_LEVELS_PER_BOOK {
        return Err(LibrisError::Validation(format!(
            "between 1 and {MAX_LEVELS_PER_BOOK} reading levels must be selected"
        )));
    }
    let mut parsed = Vec::with_capacity(levels.len());
    for level in levels {
        let level = ReadingLevel::from_str(level.trim())?;
        if parsed.contains(&level) {
            return Err(LibrisError::Validation(format!(
                "reading level {level} given more than once"
            )));
        }
        parsed.push(level);
    }

    Ok(library.push_book(Book::new(title.to_owned(), themes, parsed)))
}

/// Validates and appends a new user at the end of the document.
///
/// Every field is required; the reading level must be a member of the fixed
/// enum.
pub fn add_user<'a>(
    library: &'a mut Library,
    name: &str,
    surname: &str,
    reading_level: &str,
    preferred_theme: &str,
) -> Result<&'a User> {
    let name = name.trim();
    let surname = surname.trim();
    let reading_level = reading_level.trim();
    let preferred_theme = preferred_theme.trim();
    if name.is_empty() || surname.is_empty() || reading_level.is_empty() || preferred_theme.is_empty()
    {
        return Err(LibrisError::Validation(
            "all fields are required for adding a user".into(),
        ));
    }
    let level = ReadingLevel::from_str(reading_level)?;
    Ok(library.push_user(User::new(
        name.to_owned(),
        surname.to_owned(),
        level,
        preferred_theme.to_owned(),
    )))
}
