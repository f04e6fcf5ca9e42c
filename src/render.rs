//! Whole-document HTML export, optionally parameterized by a reading level.
//!
//! This replaces the original style-sheet transform with a first-class
//! renderer: the document tree goes in, a standalone HTML page comes out.
//! When a level is supplied (the selected user's), books carrying it are
//! flagged in the output.

use std::fmt::Write;

use crate::error::Result;
use crate::model::{Library, ReadingLevel};

/// Escapes text for interpolation into HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the whole document as a standalone HTML page. Books matching the
/// given reading level carry a `match` marker.
pub fn render(library: &Library, user_level: Option<ReadingLevel>) -> Result<String> {
    let mut html = String::new();
    write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Library</title>\n\
         <style>.match {{ background: #e6ffe6; }}</style>\n</head>\n<body>\n<h1>Library</h1>\n"
    )?;
    if let Some(level) = user_level {
        write!(
            html,
            "<p>Highlighting books for reading level <strong>{}</strong>.</p>\n",
            escape(level.as_str())
        )?;
    }

    write!(
        html,
        "<h2>Books</h2>\n<table>\n<tr><th>Title</th><th>Themes</th><th>Reading levels</th></tr>\n"
    )?;
    for book in library.books() {
        let matched = user_level.is_some_and(|level| book.has_level(level));
        let class = if matched { " class=\"match\"" } else { "" };
        let themes = book
            .themes()
            .iter()
            .map(|t| escape(t))
            .collect::<Vec<_>>()
            .join(", ");
        let levels = book
            .levels()
            .iter()
            .map(|l| l.as_str().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            html,
            "<tr{class}><td>{}</td><td>{themes}</td><td>{levels}</td></tr>\n",
            escape(book.title())
        )?;
    }
    write!(html, "</table>\n")?;

    write!(html, "<h2>Users</h2>\n<ul>\n")?;
    for user in library.users() {
        write!(
            html,
            "<li>{} {} — {}, prefers {}</li>\n",
            escape(user.name()),
            escape(user.surname()),
            user.reading_level(),
            escape(user.preferred_theme())
        )?;
    }
    write!(html, "</ul>\n</body>\n</html>\n")?;
    Ok(html)
}
