//! The document store: loading and saving the library as one XML file.
//!
//! The persisted shape is the canonical schema,
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <library xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
//!          xsi:noNamespaceSchemaLocation="books.xsd">
//!   <book id="...">
//!     <title>Dune</title>
//!     <themes><theme>SciFi</theme><theme>Adventure</theme></themes>
//!     <readingLevels><level>Intermediate</level></readingLevels>
//!   </book>
//!   <user id="...">
//!     <name>Ada</name><surname>Lovelace</surname>
//!     <readingLevel>Intermediate</readingLevel>
//!     <preferredTheme>SciFi</preferredTheme>
//!   </user>
//! </library>
//! ```
//!
//! Documents written by other tools may omit the `id` attributes, in which
//! case fresh identities are generated on load. Saving always writes the
//! whole tree to a sibling temp file and renames it over the target, so a
//! failure mid-write never leaves a truncated document behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;
use uuid::Uuid;

use crate::error::{LibrisError, Result};
use crate::model::{Book, Library, ReadingLevel, User};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The injected storage interface. The in-memory model is passed explicitly
/// through every operation; no implementation holds hidden global state.
pub trait DocumentStore: Send + Sync {
    /// Deserializes the current document into the in-memory model.
    fn load(&self) -> Result<Library>;
    /// Serializes the full tree back, fully overwriting the previous state.
    fn save(&self, library: &Library) -> Result<()>;
}

// ------------- FileStore -------------

/// File-backed store reading and writing the canonical XML document.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> Result<Library> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LibrisError::NotFound(format!(
                    "document '{}' does not exist (run the seed binary first)",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let library = read_library(&text)?;
        debug!(
            path = %self.path.display(),
            books = library.books().len(),
            users = library.users().len(),
            "document loaded"
        );
        Ok(library)
    }

    fn save(&self, library: &Library) -> Result<()> {
        let text = write_library(library)?;
        // Write-then-rename keeps the previous document intact if anything
        // fails before the rename.
        let tmp = self.path.with_extension("xml.tmp");
        fs::write(&tmp, text.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "document saved");
        Ok(())
    }
}

// ------------- MemoryStore -------------

/// Keeps the document in memory. Used by tests and ephemeral runs, mirroring
/// a file store whose file does not exist until the first save.
#[derive(Default)]
pub struct MemoryStore {
    library: Mutex<Option<Library>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_library(library: Library) -> Self {
        Self {
            library: Mutex::new(Some(library)),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Library> {
        self.library
            .lock()
            .map_err(|e| LibrisError::Lock(e.to_string()))?
            .clone()
            .ok_or_else(|| LibrisError::NotFound("no document has been stored".into()))
    }

    fn save(&self, library: &Library) -> Result<()> {
        *self
            .library
            .lock()
            .map_err(|e| LibrisError::Lock(e.to_string()))? = Some(library.clone());
        Ok(())
    }
}

// ------------- XML reading -------------

fn parse_error(reader: &Reader<&[u8]>, message: impl Into<String>) -> LibrisError {
    LibrisError::Parse {
        message: message.into(),
        position: Some(reader.buffer_position()),
    }
}

#[derive(Default)]
struct PartialBook {
    id: Option<Uuid>,
    title: Option<String>,
    themes: Vec<String>,
    levels: Vec<ReadingLevel>,
}

#[derive(Default)]
struct PartialUser {
    id: Option<Uuid>,
    name: Option<String>,
    surname: Option<String>,
    reading_level: Option<ReadingLevel>,
    preferred_theme: Option<String>,
}

/// Parses the canonical XML document into a [`Library`].
pub fn read_library(text: &str) -> Result<Library> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut library = Library::new();
    let mut book: Option<PartialBook> = None;
    let mut user: Option<PartialUser> = None;
    // The element whose text content we are currently inside of.
    let mut leaf: Option<Vec<u8>> = None;
    let mut seen_root = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| parse_error(&reader, e.to_string()))?
        {
            Event::Start(e) => match e.name().as_ref() {
                b"library" => {
                    seen_root = true;
                    if let Some(schema) = attribute(&reader, &e, b"xsi:noNamespaceSchemaLocation")?
                    {
                        library = Library::with_schema_hint(schema);
                    }
                }
                b"book" => {
                    let mut partial = PartialBook::default();
                    partial.id = entity_id(&reader, &e)?;
                    book = Some(partial);
                }
                b"user" => {
                    let mut partial = PartialUser::default();
                    partial.id = entity_id(&reader, &e)?;
                    user = Some(partial);
                }
                b"themes" | b"readingLevels" => {}
                name => leaf = Some(name.to_vec()),
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| parse_error(&reader, e.to_string()))?
                    .into_owned();
                match (leaf.as_deref(), book.as_mut(), user.as_mut()) {
                    (Some(b"title"), Some(b), _) => b.title = Some(text),
                    (Some(b"theme"), Some(b), _) => b.themes.push(text),
                    (Some(b"level"), Some(b), _) => {
                        b.levels.push(parse_level(&reader, &text)?);
                    }
                    (Some(b"name"), _, Some(u)) => u.name = Some(text),
                    (Some(b"surname"), _, Some(u)) => u.surname = Some(text),
                    (Some(b"readingLevel"), _, Some(u)) => {
                        u.reading_level = Some(parse_level(&reader, &text)?);
                    }
                    (Some(b"preferredTheme"), _, Some(u)) => u.preferred_theme = Some(text),
                    // Unknown leaves (e.g. the positional level1/level2/level3
                    // variant) are not part of the canonical schema.
                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"book" => {
                    let partial = book
                        .take()
                        .ok_or_else(|| parse_error(&reader, "unexpected </book>"))?;
                    let title = partial
                        .title
                        .ok_or_else(|| parse_error(&reader, "<book> without <title>"))?;
                    library.push_book(Book::with_id(
                        partial.id.unwrap_or_else(Uuid::new_v4),
                        title,
                        partial.themes,
                        partial.levels,
                    ));
                }
                b"user" => {
                    let partial = user
                        .take()
                        .ok_or_else(|| parse_error(&reader, "unexpected </user>"))?;
                    let name = partial
                        .name
                        .ok_or_else(|| parse_error(&reader, "<user> without <name>"))?;
                    let surname = partial
                        .surname
                        .ok_or_else(|| parse_error(&reader, "<user> without <surname>"))?;
                    let reading_level = partial
                        .reading_level
                        .ok_or_else(|| parse_error(&reader, "<user> without <readingLevel>"))?;
                    let preferred_theme = partial
                        .preferred_theme
                        .ok_or_else(|| parse_error(&reader, "<user> without <preferredTheme>"))?;
                    library.push_user(User::with_id(
                        partial.id.unwrap_or_else(Uuid::new_v4),
                        name,
                        surname,
                        reading_level,
                        preferred_theme,
                    ));
                }
                _ => leaf = None,
            },
            Event::Empty(e) => {
                // A self-closing <library/> is a valid empty document.
                if e.name().as_ref() == b"library" {
                    seen_root = true;
                    if let Some(schema) =
                        attribute(&reader, &e, b"xsi:noNamespaceSchemaLocation")?
                    {
                        library = Library::with_schema_hint(schema);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(LibrisError::Parse {
            message: "document has no <library> root".into(),
            position: None,
        });
    }
    Ok(library)
}

fn parse_level(reader: &Reader<&[u8]>, text: &str) -> Result<ReadingLevel> {
    ReadingLevel::from_str(text).map_err(|e| parse_error(reader, e.to_string()))
}

fn attribute(
    reader: &Reader<&[u8]>,
    element: &BytesStart,
    key: &[u8],
) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| parse_error(reader, e.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| parse_error(reader, e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn entity_id(reader: &Reader<&[u8]>, element: &BytesStart) -> Result<Option<Uuid>> {
    match attribute(reader, element, b"id")? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| parse_error(reader, format!("bad id attribute: {e}"))),
        None => Ok(None),
    }
}

// ------------- XML writing -------------

fn write_err(e: impl std::fmt::Display) -> LibrisError {
    LibrisError::Persistence(e.to_string())
}

/// Serializes a [`Library`] into the canonical XML document text.
pub fn write_library(library: &Library) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;

    let mut root = BytesStart::new("library");
    if let Some(schema) = library.schema_hint() {
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("xsi:noNamespaceSchemaLocation", schema));
    }
    writer.write_event(Event::Start(root)).map_err(write_err)?;

    for book in library.books() {
        let mut start = BytesStart::new("book");
        start.push_attribute(("id", book.id().to_string().as_str()));
        writer.write_event(Event::Start(start)).map_err(write_err)?;

        write_text_element(&mut writer, "title", book.title())?;

        writer
            .write_event(Event::Start(BytesStart::new("themes")))
            .map_err(write_err)?;
        for theme in book.themes() {
            write_text_element(&mut writer, "theme", theme)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("themes")))
            .map_err(write_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("readingLevels")))
            .map_err(write_err)?;
        for level in book.levels() {
            write_text_element(&mut writer, "level", level.as_str())?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("readingLevels")))
            .map_err(write_err)?;

        writer
            .write_event(Event::End(BytesEnd::new("book")))
            .map_err(write_err)?;
    }

    for user in library.users() {
        let mut start = BytesStart::new("user");
        start.push_attribute(("id", user.id().to_string().as_str()));
        writer.write_event(Event::Start(start)).map_err(write_err)?;
        write_text_element(&mut writer, "name", user.name())?;
        write_text_element(&mut writer, "surname", user.surname())?;
        write_text_element(&mut writer, "readingLevel", user.reading_level().as_str())?;
        write_text_element(&mut writer, "preferredTheme", user.preferred_theme())?;
        writer
            .write_event(Event::End(BytesEnd::new("user")))
            .map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("library")))
        .map_err(write_err)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| LibrisError::Persistence(e.to_string()))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Library {
        let mut library = Library::with_schema_hint("books.xsd");
        library.push_book(Book::new(
            "Dune".into(),
            vec!["SciFi".into(), "Adventure".into()],
            vec![ReadingLevel::Intermediate],
        ));
        library.push_user(User::new(
            "Ada".into(),
            "Lovelace".into(),
            ReadingLevel::Intermediate,
            "SciFi".into(),
        ));
        library
    }

    #[test]
    fn written_text_round_trips() {
        let library = sample();
        let text = write_library(&library).unwrap();
        let restored = read_library(&text).unwrap();
        assert_eq!(restored, library);
    }

    #[test]
    fn schema_hint_survives_round_trip() {
        let text = write_library(&sample()).unwrap();
        assert!(text.contains("xsi:noNamespaceSchemaLocation=\"books.xsd\""));
        assert_eq!(
            read_library(&text).unwrap().schema_hint(),
            Some("books.xsd")
        );
    }

    #[test]
    fn ids_are_generated_when_absent() {
        let text = "<?xml version=\"1.0\"?>\n<library>\
            <book><title>1984</title>\
            <themes><theme>Dystopia</theme></themes>\
            <readingLevels><level>Advanced</level></readingLevels></book>\
            </library>";
        let library = read_library(text).unwrap();
        assert_eq!(library.books().len(), 1);
        assert_eq!(library.books()[0].title(), "1984");
    }

    #[test]
    fn special_characters_are_escaped() {
        let mut library = Library::new();
        library.push_book(Book::new(
            "Alice & Bob <3".into(),
            vec!["Q&A".into(), "Mystery".into()],
            vec![ReadingLevel::Beginner],
        ));
        let text = write_library(&library).unwrap();
        let restored = read_library(&text).unwrap();
        assert_eq!(restored.books()[0].title(), "Alice & Bob <3");
        assert_eq!(restored.books()[0].themes()[0], "Q&A");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = read_library("<library><book></library>").unwrap_err();
        assert!(matches!(err, LibrisError::Parse { .. }));
    }

    #[test]
    fn missing_root_is_a_parse_error() {
        let err = read_library("<books/>").unwrap_err();
        assert!(matches!(err, LibrisError::Parse { .. }));
    }

    #[test]
    fn bad_reading_level_is_a_parse_error() {
        let text = "<library><user><name>A</name><surname>B</surname>\
            <readingLevel>Expert</readingLevel>\
            <preferredTheme>Mystery</preferredTheme></user></library>";
        let err = read_library(text).unwrap_err();
        assert!(matches!(err, LibrisError::Parse { .. }));
    }

    #[test]
    fn memory_store_reports_not_found_until_first_save() {
        let store = MemoryStore::new();
        assert!(matches!(store.load(), Err(LibrisError::NotFound(_))));
        let library = sample();
        store.save(&library).unwrap();
        assert_eq!(store.load().unwrap(), library);
    }
}
