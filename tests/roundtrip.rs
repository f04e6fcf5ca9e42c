use libris::error::LibrisError;
use libris::ingest;
use libris::model::Library;
use libris::store::{DocumentStore, FileStore};

fn sample_library() -> Library {
    let mut library = Library::with_schema_hint("books.xsd");
    ingest::add_book(
        &mut library,
        "Dune",
        &["SciFi".to_owned(), "Adventure".to_owned()],
        &["Intermediate".to_owned()],
    )
    .unwrap();
    ingest::add_book(
        &mut library,
        "Emma",
        &["Romance".to_owned(), "Historical".to_owned()],
        &["Beginner".to_owned(), "Advanced".to_owned()],
    )
    .unwrap();
    ingest::add_user(&mut library, "Ada", "Lovelace", "Intermediate", "SciFi").unwrap();
    ingest::add_user(&mut library, "Mary", "Shelley", "Beginner", "Romance").unwrap();
    library
}

#[test]
fn missing_document_is_a_not_found_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("books.xml"));
    assert!(matches!(store.load(), Err(LibrisError::NotFound(_))));
}

#[test]
fn save_then_load_preserves_structure_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("books.xml"));
    let library = sample_library();

    store.save(&library).unwrap();
    let restored = store.load().unwrap();
    assert_eq!(restored, library);

    // And again through a second cycle: save(load(save(L))) == L.
    store.save(&restored).unwrap();
    assert_eq!(store.load().unwrap(), library);
}

#[test]
fn save_overwrites_the_previous_document_completely() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("books.xml"));
    store.save(&sample_library()).unwrap();

    let mut smaller = Library::new();
    ingest::add_user(&mut smaller, "Solo", "Reader", "Beginner", "Mystery").unwrap();
    store.save(&smaller).unwrap();

    let restored = store.load().unwrap();
    assert!(restored.books().is_empty());
    assert_eq!(restored.users().len(), 1);
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.xml");
    let store = FileStore::new(&path);
    store.save(&sample_library()).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, ["books.xml"]);
}

#[test]
fn malformed_document_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.xml");
    std::fs::write(&path, "<library><book><title>Broken</library>").unwrap();
    let store = FileStore::new(&path);
    assert!(matches!(store.load(), Err(LibrisError::Parse { .. })));
}

#[test]
fn documents_without_ids_load_and_gain_stable_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.xml");
    std::fs::write(
        &path,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<library>\n\
         <book><title>1984</title>\
         <themes><theme>Dystopia</theme><theme>Political</theme></themes>\
         <readingLevels><level>Advanced</level></readingLevels></book>\n\
         <user><name>Ada</name><surname>Lovelace</surname>\
         <readingLevel>Advanced</readingLevel>\
         <preferredTheme>Dystopia</preferredTheme></user>\n\
         </library>",
    )
    .unwrap();
    let store = FileStore::new(&path);
    let library = store.load().unwrap();
    assert_eq!(library.books().len(), 1);
    assert_eq!(library.users().len(), 1);

    // Ids were generated and survive the next round trip.
    let id = library.books()[0].id();
    store.save(&library).unwrap();
    assert_eq!(store.load().unwrap().books()[0].id(), id);
}
