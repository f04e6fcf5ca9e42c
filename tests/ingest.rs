use libris::error::LibrisError;
use libris::ingest;
use libris::model::{Library, ReadingLevel};
use libris::query;

fn themes(a: &str, b: &str) -> Vec<String> {
    vec![a.to_owned(), b.to_owned()]
}

fn levels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_owned()).collect()
}

fn library_with_user() -> Library {
    let mut library = Library::new();
    ingest::add_user(&mut library, "Ada", "Lovelace", "Intermediate", "SciFi").unwrap();
    library
}

#[test]
fn valid_book_is_findable_with_exact_themes_and_levels() {
    let mut library = library_with_user();
    ingest::add_book(
        &mut library,
        "Dune",
        &themes("SciFi", "Adventure"),
        &levels(&["Intermediate", "Advanced"]),
    )
    .unwrap();

    let book = query::find_book_by_title(&library, "Dune").expect("book");
    assert_eq!(book.themes(), ["SciFi".to_owned(), "Adventure".to_owned()]);
    assert_eq!(
        book.levels(),
        [ReadingLevel::Intermediate, ReadingLevel::Advanced]
    );
    // Positioned before every pre-existing user.
    assert_eq!(library.books().len(), 1);
    assert_eq!(library.users().len(), 1);
}

#[test]
fn blank_title_is_rejected_without_partial_insert() {
    let mut library = library_with_user();
    let before = library.clone();
    let err = ingest::add_book(
        &mut library,
        "   ",
        &themes("SciFi", "Adventure"),
        &levels(&["Beginner"]),
    )
    .unwrap_err();
    assert!(matches!(err, LibrisError::Validation(_)));
    assert_eq!(library, before);
}

#[test]
fn wrong_theme_count_is_rejected_without_partial_insert() {
    let mut library = library_with_user();
    let before = library.clone();
    for bad in [
        vec![],
        vec!["SciFi".to_owned()],
        vec![
            "SciFi".to_owned(),
            "Mystery".to_owned(),
            "Fantasy".to_owned(),
        ],
    ] {
        let err =
            ingest::add_book(&mut library, "Dune", &bad, &levels(&["Beginner"])).unwrap_err();
        assert!(matches!(err, LibrisError::Validation(_)), "themes {bad:?}");
        assert_eq!(library, before);
    }
}

#[test]
fn duplicate_themes_are_rejected() {
    let mut library = Library::new();
    let err = ingest::add_book(
        &mut library,
        "Dune",
        &themes("SciFi", "SciFi"),
        &levels(&["Beginner"]),
    )
    .unwrap_err();
    assert!(matches!(err, LibrisError::Validation(_)));
    assert!(library.is_empty());
}

#[test]
fn level_outside_the_enum_is_rejected() {
    let mut library = Library::new();
    let err = ingest::add_book(
        &mut library,
        "Dune",
        &themes("SciFi", "Adventure"),
        &levels(&["Expert"]),
    )
    .unwrap_err();
    assert!(matches!(err, LibrisError::Validation(_)));
    assert!(library.is_empty());
}

#[test]
fn missing_or_duplicate_levels_are_rejected() {
    let mut library = Library::new();
    let err = ingest::add_book(&mut library, "Dune", &themes("SciFi", "Adventure"), &[])
        .unwrap_err();
    assert!(matches!(err, LibrisError::Validation(_)));

    let err = ingest::add_book(
        &mut library,
        "Dune",
        &themes("SciFi", "Adventure"),
        &levels(&["Beginner", "Beginner"]),
    )
    .unwrap_err();
    assert!(matches!(err, LibrisError::Validation(_)));
    assert!(library.is_empty());
}

#[test]
fn duplicate_titles_are_allowed() {
    let mut library = Library::new();
    for _ in 0..2 {
        ingest::add_book(
            &mut library,
            "Dune",
            &themes("SciFi", "Adventure"),
            &levels(&["Beginner"]),
        )
        .unwrap();
    }
    assert_eq!(library.books().len(), 2);
    // Stable ids still tell the copies apart.
    assert_ne!(library.books()[0].id(), library.books()[1].id());
}

#[test]
fn blank_user_fields_are_rejected() {
    let mut library = Library::new();
    for (name, surname, level, theme) in [
        ("", "Lovelace", "Beginner", "SciFi"),
        ("Ada", " ", "Beginner", "SciFi"),
        ("Ada", "Lovelace", "", "SciFi"),
        ("Ada", "Lovelace", "Beginner", ""),
    ] {
        let err = ingest::add_user(&mut library, name, surname, level, theme).unwrap_err();
        assert!(matches!(err, LibrisError::Validation(_)));
    }
    assert!(library.is_empty());
}

#[test]
fn users_append_in_order() {
    let mut library = Library::new();
    ingest::add_user(&mut library, "Ada", "Lovelace", "Advanced", "SciFi").unwrap();
    ingest::add_user(&mut library, "Mary", "Shelley", "Beginner", "Horror").unwrap();
    assert_eq!(library.users()[0].name(), "Ada");
    assert_eq!(library.users()[1].name(), "Mary");
}
