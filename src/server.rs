//! The HTTP surface: an axum router over the shared application state.
//!
//! Every mutation runs as one load-mutate-save sequence under the single
//! writer lock in [`AppState::update`], on a blocking thread since the store
//! is synchronous. Recoverable failures (validation, selection, missing
//! entities) are flashed back to the originating form via a redirect;
//! everything else maps onto an error response.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, RawForm, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{LibrisError, Result};
use crate::ingest;
use crate::model::{Book, Library, ReadingLevel};
use crate::query;
use crate::render;
use crate::store::DocumentStore;

// ------------- AppState -------------

/// Shared state: the injected document store plus the writer lock that
/// serializes every load-mutate-save sequence.
pub struct AppState {
    store: Box<dyn DocumentStore>,
    write_lock: Mutex<()>,
}

impl AppState {
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// A point-in-time copy of the document for read-only requests.
    pub fn snapshot(&self) -> Result<Library> {
        self.store.load()
    }

    /// Runs one whole load-mutate-save sequence under the writer lock, so
    /// two concurrent mutations can never silently drop each other's write.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut Library) -> Result<T>) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| LibrisError::Lock(e.to_string()))?;
        let mut library = self.store.load()?;
        let out = mutate(&mut library)?;
        self.store.save(&library)?;
        Ok(out)
    }
}

/// Runs a mutation on a blocking thread; the store is synchronous today.
async fn run_update<T>(
    state: Arc<AppState>,
    mutate: impl FnOnce(&mut Library) -> Result<T> + Send + 'static,
) -> Result<T>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || state.update(mutate))
        .await
        .map_err(|e| {
            warn!(error = %e, "join error");
            LibrisError::Persistence(format!("join error: {e}"))
        })?
}

// ------------- Router -------------

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add_book", get(add_book_form).post(add_book_submit))
        .route("/add_user", get(add_user_form).post(add_user_submit))
        .route("/recommend", get(recommend_page).post(recommend_page_post))
        .route("/book/:title", get(book_details))
        .route(
            "/books_by_theme",
            get(books_by_theme_form).post(books_by_theme_submit),
        )
        .route("/transform", get(transform_form).post(transform_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ------------- Error mapping -------------

impl IntoResponse for LibrisError {
    fn into_response(self) -> Response {
        let status = match &self {
            LibrisError::Validation(_) | LibrisError::Selection(_) => StatusCode::BAD_REQUEST,
            LibrisError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %self, code = %status.as_u16(), "request failed");
        let body = page(
            "Error",
            &format!(
                "<p class=\"flash error\">{}</p>",
                render::escape(&self.to_string())
            ),
        );
        (status, Html(body)).into_response()
    }
}

// ------------- Flash messages -------------

#[derive(Deserialize, Default)]
struct FlashParams {
    error: Option<String>,
    notice: Option<String>,
}

impl FlashParams {
    fn to_html(&self) -> String {
        let mut html = String::new();
        if let Some(error) = &self.error {
            html.push_str(&format!(
                "<p class=\"flash error\">{}</p>\n",
                render::escape(error)
            ));
        }
        if let Some(notice) = &self.notice {
            html.push_str(&format!(
                "<p class=\"flash notice\">{}</p>\n",
                render::escape(notice)
            ));
        }
        html
    }
}

/// Redirects back with a flash message in the query string.
fn flash_redirect(path: &str, kind: &str, message: &str) -> Redirect {
    let query = serde_urlencoded::to_string([(kind, message)]).unwrap_or_default();
    Redirect::to(&format!("{path}?{query}"))
}

/// Turns the recoverable error classes into a flash redirect; everything
/// else propagates to the error responder.
fn recover(target: &str, error: LibrisError) -> Result<Redirect> {
    match &error {
        LibrisError::Validation(_) | LibrisError::Selection(_) | LibrisError::NotFound(_) => {
            Ok(flash_redirect(target, "error", &error.to_string()))
        }
        _ => Err(error),
    }
}

// ------------- Form bodies -------------

/// The add-book form posts multi-valued `theme` and `levels` fields, which
/// the plain `Form` extractor cannot represent; the raw pairs are decoded
/// instead.
fn form_fields(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_bytes(bytes)
        .map_err(|e| LibrisError::Validation(format!("malformed form body: {e}")))
}

fn first_field<'a>(fields: &'a [(String, String)], key: &str) -> &'a str {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

fn all_fields(fields: &[(String, String)], key: &str) -> Vec<String> {
    fields
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

// ------------- Page scaffolding -------------

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>\n.flash.error {{ color: #a00; }}\n.flash.notice {{ color: #070; }}\n</style>\n\
         </head>\n<body>\n<nav><a href=\"/\">Books</a> | <a href=\"/add_book\">Add book</a> | \
         <a href=\"/add_user\">Add user</a> | <a href=\"/recommend\">Recommend</a> | \
         <a href=\"/books_by_theme\">By theme</a> | <a href=\"/transform\">Export</a></nav>\n\
         {}\n</body>\n</html>\n",
        render::escape(title),
        body
    )
}

fn book_link(title: &str) -> String {
    format!(
        "<a href=\"/book/{}\">{}</a>",
        utf8_percent_encode(title, NON_ALPHANUMERIC),
        render::escape(title)
    )
}

fn book_list_items(books: &[&Book]) -> String {
    if books.is_empty() {
        return "<li><em>none</em></li>\n".into();
    }
    books
        .iter()
        .map(|b| {
            format!(
                "<li>{} — themes: {}; levels: {}</li>\n",
                book_link(b.title()),
                render::escape(&b.themes().join(", ")),
                b.levels()
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
        .collect()
}

fn level_options(selected: Option<ReadingLevel>) -> String {
    ReadingLevel::ALL
        .iter()
        .map(|level| {
            let marker = if selected == Some(*level) {
                " selected"
            } else {
                ""
            };
            format!("<option value=\"{level}\"{marker}>{level}</option>")
        })
        .collect()
}

fn user_options(library: &Library, selected: usize) -> String {
    library
        .users()
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let marker = if i == selected { " selected" } else { "" };
            format!(
                "<option value=\"{i}\"{marker}>{} {}</option>",
                render::escape(user.name()),
                render::escape(user.surname())
            )
        })
        .collect()
}

// ------------- Handlers -------------

async fn index(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<FlashParams>,
) -> Result<Html<String>> {
    let library = state.snapshot()?;
    let body = format!(
        "{}<h1>Books</h1>\n<ul>\n{}</ul>\n<p>{} books, {} users.</p>",
        flash.to_html(),
        book_list_items(&library.books().iter().collect::<Vec<_>>()),
        library.books().len(),
        library.users().len()
    );
    Ok(Html(page("Library", &body)))
}

async fn add_book_form(Query(flash): Query<FlashParams>) -> Html<String> {
    let theme_boxes: String = crate::seed::THEME_OPTIONS
        .iter()
        .map(|theme| {
            format!(
                "<label><input type=\"checkbox\" name=\"theme\" value=\"{theme}\"> {theme}</label><br>\n"
            )
        })
        .collect();
    let level_boxes: String = ReadingLevel::ALL
        .iter()
        .map(|level| {
            format!(
                "<label><input type=\"checkbox\" name=\"levels\" value=\"{level}\"> {level}</label><br>\n"
            )
        })
        .collect();
    let body = format!(
        "{}<h1>Add a book</h1>\n<form method=\"post\" action=\"/add_book\">\n\
         <p><label>Title <input name=\"title\"></label></p>\n\
         <fieldset><legend>Themes (pick exactly two)</legend>\n{theme_boxes}</fieldset>\n\
         <fieldset><legend>Reading levels (pick one to three)</legend>\n{level_boxes}</fieldset>\n\
         <p><button type=\"submit\">Add book</button></p>\n</form>",
        flash.to_html()
    );
    Html(page("Add a book", &body))
}

async fn add_book_submit(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Redirect> {
    let fields = form_fields(&body)?;
    let title = first_field(&fields, "title").to_owned();
    let themes = all_fields(&fields, "theme");
    let levels = all_fields(&fields, "levels");

    let result = run_update(state, move |library| {
        ingest::add_book(library, &title, &themes, &levels)?;
        Ok(())
    })
    .await;

    match result {
        Ok(()) => {
            info!("book added");
            Ok(flash_redirect("/", "notice", "Book added successfully!"))
        }
        Err(e) => recover("/add_book", e),
    }
}

async fn add_user_form(Query(flash): Query<FlashParams>) -> Html<String> {
    let body = format!(
        "{}<h1>Add a user</h1>\n<form method=\"post\" action=\"/add_user\">\n\
         <p><label>Name <input name=\"name\"></label></p>\n\
         <p><label>Surname <input name=\"surname\"></label></p>\n\
         <p><label>Reading level <select name=\"readingLevel\">{}</select></label></p>\n\
         <p><label>Preferred theme <input name=\"preferredTheme\"></label></p>\n\
         <p><button type=\"submit\">Add user</button></p>\n</form>",
        flash.to_html(),
        level_options(None)
    );
    Html(page("Add a user", &body))
}

async fn add_user_submit(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Redirect> {
    let fields = form_fields(&body)?;
    let name = first_field(&fields, "name").to_owned();
    let surname = first_field(&fields, "surname").to_owned();
    let reading_level = first_field(&fields, "readingLevel").to_owned();
    let preferred_theme = first_field(&fields, "preferredTheme").to_owned();

    let result = run_update(state, move |library| {
        ingest::add_user(library, &name, &surname, &reading_level, &preferred_theme)?;
        Ok(())
    })
    .await;

    match result {
        Ok(()) => {
            info!("user added");
            Ok(flash_redirect("/", "notice", "User added successfully!"))
        }
        Err(e) => recover("/add_user", e),
    }
}

async fn recommend_page(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<FlashParams>,
) -> Result<Response> {
    // GET defaults to the first user.
    recommend_for(state, flash, 0).await
}

async fn recommend_page_post(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Response> {
    let fields = form_fields(&body)?;
    let Ok(selected) = first_field(&fields, "user_index").parse::<usize>() else {
        return Ok(
            flash_redirect("/recommend", "error", "Invalid user selection.").into_response(),
        );
    };
    recommend_for(state, FlashParams::default(), selected).await
}

async fn recommend_for(
    state: Arc<AppState>,
    flash: FlashParams,
    selected: usize,
) -> Result<Response> {
    let library = state.snapshot()?;
    if library.users().is_empty() {
        return Ok(
            flash_redirect("/", "error", "No users available for recommendations.")
                .into_response(),
        );
    }
    let recommendation = match query::recommend(&library, selected) {
        Ok(r) => r,
        Err(e) => return recover("/recommend", e).map(IntoResponse::into_response),
    };
    let user = recommendation.user();
    let body = format!(
        "{}<h1>Recommendations</h1>\n\
         <form method=\"post\" action=\"/recommend\">\n\
         <label>Reader <select name=\"user_index\">{}</select></label>\n\
         <button type=\"submit\">Recommend</button>\n</form>\n\
         <p>{} {} reads at <strong>{}</strong> level and prefers <strong>{}</strong>.</p>\n\
         <h2>Matching reading level</h2>\n<ul>\n{}</ul>\n\
         <h2>Matching level and theme</h2>\n<ul>\n{}</ul>",
        flash.to_html(),
        user_options(&library, selected),
        render::escape(user.name()),
        render::escape(user.surname()),
        user.reading_level(),
        render::escape(user.preferred_theme()),
        book_list_items(recommendation.by_level()),
        book_list_items(recommendation.by_level_and_theme())
    );
    Ok(Html(page("Recommendations", &body)).into_response())
}

async fn book_details(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> Result<Response> {
    let library = state.snapshot()?;
    let Some(book) = query::find_book_by_title(&library, &title) else {
        return Ok(flash_redirect("/", "error", "Book not found.").into_response());
    };
    let body = format!(
        "<h1>{}</h1>\n<p>Themes: {}</p>\n<p>Reading levels: {}</p>",
        render::escape(book.title()),
        render::escape(&book.themes().join(", ")),
        book.levels()
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(Html(page(book.title(), &body)).into_response())
}

async fn books_by_theme_form(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<FlashParams>,
) -> Result<Html<String>> {
    let library = state.snapshot()?;
    Ok(Html(page(
        "Books by theme",
        &theme_filter_body(&library, &flash, None),
    )))
}

async fn books_by_theme_submit(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Response> {
    let fields = form_fields(&body)?;
    let theme = first_field(&fields, "theme").to_owned();
    if theme.is_empty() {
        return Ok(
            flash_redirect("/books_by_theme", "error", "Please select a theme.").into_response(),
        );
    }
    let library = state.snapshot()?;
    let body = theme_filter_body(&library, &FlashParams::default(), Some(&theme));
    Ok(Html(page("Books by theme", &body)).into_response())
}

fn theme_filter_body(library: &Library, flash: &FlashParams, selected: Option<&str>) -> String {
    let options: String = query::list_themes(library)
        .iter()
        .map(|theme| {
            let marker = if selected == Some(theme.as_str()) {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{0}\"{marker}>{0}</option>",
                render::escape(theme)
            )
        })
        .collect();
    let results = match selected {
        Some(theme) => {
            // The selected value is only ever used as a typed comparison,
            // never spliced into a query expression.
            let books = query::filter_books_by_theme(library, theme);
            format!(
                "<h2>Books with theme \"{}\"</h2>\n<ul>\n{}</ul>\n",
                render::escape(theme),
                book_list_items(&books)
            )
        }
        None => String::new(),
    };
    format!(
        "{}<h1>Books by theme</h1>\n<form method=\"post\" action=\"/books_by_theme\">\n\
         <label>Theme <select name=\"theme\">{options}</select></label>\n\
         <button type=\"submit\">Filter</button>\n</form>\n{results}",
        flash.to_html()
    )
}

async fn transform_form(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<FlashParams>,
) -> Result<Response> {
    let library = state.snapshot()?;
    if library.users().is_empty() {
        return Ok(flash_redirect("/", "error", "No users defined yet.").into_response());
    }
    let body = format!(
        "{}<h1>Export</h1>\n<form method=\"post\" action=\"/transform\">\n\
         <label>Reader <select name=\"user_index\">{}</select></label>\n\
         <button type=\"submit\">Export</button>\n</form>",
        flash.to_html(),
        user_options(&library, 0)
    );
    Ok(Html(page("Export", &body)).into_response())
}

async fn transform_submit(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Response> {
    let fields = form_fields(&body)?;
    let library = state.snapshot()?;
    let Ok(index) = first_field(&fields, "user_index").parse::<usize>() else {
        return Ok(
            flash_redirect("/transform", "error", "Invalid user selection.").into_response(),
        );
    };
    let Some(user) = library.user_by_index(index) else {
        return Ok(
            flash_redirect("/transform", "error", "Invalid user selection.").into_response(),
        );
    };
    let html = render::render(&library, Some(user.reading_level()))?;
    Ok(Html(html).into_response())
}
