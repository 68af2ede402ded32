//! Test utilities for the query pipeline suite

#![allow(dead_code)]

use sift::{
    Deadline, DocumentReference, FieldDefinition, GeoPoint, InMemoryBackend, IndexSchema,
    LoadingOptions, MapperLoading, Result, SearchConfig, SearchScope, SessionHandle,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Entity type used by loading tests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Book {
    pub id: String,
    pub title: String,
}

/// Create a backend with a `numbers` index holding `count` documents
///
/// Document `i` has id `i`, `value = i`, `label = "n0000i"` and a text body
/// that says whether the number is even or odd. Documents are indexed in
/// reverse order so that index order differs from value order.
pub fn numbers_backend(count: usize) -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .create_index(
            IndexSchema::builder("numbers")
                .field("value", FieldDefinition::integer().sortable())
                .field("label", FieldDefinition::keyword().sortable())
                .field("body", FieldDefinition::text())
                .build()
                .unwrap(),
        )
        .unwrap();

    let work = backend.work_executor("numbers").unwrap();
    for i in (0..count).rev() {
        work.add(&i.to_string(), |doc| {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            doc.add("value", i as i64)
                .add("label", format!("n{:05}", i))
                .add("body", format!("number {} is {}", i, parity));
        })
        .unwrap();
    }
    work.flush();
    backend
}

/// Scope over the `numbers` index
pub fn numbers_scope(count: usize) -> SearchScope {
    SearchScope::new(numbers_backend(count), &["numbers"]).unwrap()
}

/// Scope over the `numbers` index with an explicit configuration
pub fn numbers_scope_with(count: usize, config: SearchConfig) -> SearchScope {
    SearchScope::with_config(numbers_backend(count), &["numbers"], config).unwrap()
}

/// Create a backend with a small `books` index and an `articles` index
pub fn library_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .create_index(
            IndexSchema::builder("books")
                .field("title", FieldDefinition::text())
                .field("summary", FieldDefinition::text())
                .field("isbn", FieldDefinition::keyword().not_projectable())
                .field("pages", FieldDefinition::integer().sortable())
                .field("rating", FieldDefinition::double().sortable())
                .field("genre", FieldDefinition::keyword().sortable())
                .field("available", FieldDefinition::boolean())
                .field("location", FieldDefinition::geo_point().sortable())
                .field("author.name", FieldDefinition::text())
                .field("author.born", FieldDefinition::integer())
                .build()
                .unwrap(),
        )
        .unwrap();
    backend
        .create_index(
            IndexSchema::builder("articles")
                .field("title", FieldDefinition::text())
                .field("pages", FieldDefinition::integer().sortable())
                .build()
                .unwrap(),
        )
        .unwrap();

    let books = backend.work_executor("books").unwrap();
    books
        .add("1", |doc| {
            doc.add("title", "The Left Hand of Darkness")
                .add("summary", "An envoy visits a winter planet")
                .add("isbn", "978-0441478125")
                .add("pages", 304)
                .add("rating", 4.1)
                .add("genre", "scifi")
                .add("available", true)
                .add("location", paris())
                .add("author.name", "Ursula K. Le Guin")
                .add("author.born", 1929);
        })
        .unwrap();
    books
        .add("2", |doc| {
            doc.add("title", "A Wizard of Earthsea")
                .add("summary", "A young wizard learns the price of power")
                .add("isbn", "978-0547773742")
                .add("pages", 183)
                .add("rating", 4.0)
                .add("genre", "fantasy")
                .add("available", true)
                .add("location", london())
                .add("author.name", "Ursula K. Le Guin")
                .add("author.born", 1929);
        })
        .unwrap();
    books
        .add("3", |doc| {
            doc.add("title", "Dune")
                .add("summary", "A desert planet and its spice")
                .add("isbn", "978-0441172719")
                .add("pages", 412)
                .add("rating", 4.3)
                .add("genre", "scifi")
                .add("available", false)
                .add("location", GeoPoint::new(40.7128, -74.0060))
                .add("author.name", "Frank Herbert")
                .add("author.born", 1920);
        })
        .unwrap();
    books
        .add("4", |doc| {
            doc.add("title", "The Hobbit")
                .add("summary", "A hobbit joins a company of dwarves")
                .add("pages", 310)
                .add("rating", 4.3)
                .add("genre", "fantasy")
                .add("available", true)
                .add("author.name", "J. R. R. Tolkien")
                .add("author.born", 1892);
        })
        .unwrap();
    books
        .add("5", |doc| {
            doc.add("title", "Foundation")
                .add("summary", "The fall of a galactic empire")
                .add("pages", 255)
                .add("genre", "scifi")
                .add("available", true)
                .add("location", GeoPoint::new(34.0522, -118.2437));
        })
        .unwrap();
    books.flush();

    let articles = backend.work_executor("articles").unwrap();
    articles
        .add("a1", |doc| {
            doc.add("title", "Reading Le Guin today").add("pages", 12);
        })
        .unwrap();
    articles
        .add("a2", |doc| {
            doc.add("title", "Why Dune endures").add("pages", 8);
        })
        .unwrap();
    articles.flush();
    backend
}

/// Scope over the `books` index
pub fn books_scope() -> SearchScope {
    SearchScope::new(library_backend(), &["books"]).unwrap()
}

/// Scope over the `books` index with an explicit configuration
pub fn books_scope_with(config: SearchConfig) -> SearchScope {
    SearchScope::with_config(library_backend(), &["books"], config).unwrap()
}

/// Scope over both `books` and `articles`
pub fn library_scope() -> SearchScope {
    SearchScope::new(library_backend(), &["books", "articles"]).unwrap()
}

/// Paris, France
pub fn paris() -> GeoPoint {
    GeoPoint::new(48.8566, 2.3522)
}

/// London, United Kingdom
pub fn london() -> GeoPoint {
    GeoPoint::new(51.5074, -0.1278)
}

/// Scope over `count` documents with long text bodies, slow enough to scan
/// that short timeouts reliably expire
pub fn large_text_scope(count: usize) -> SearchScope {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .create_index(
            IndexSchema::builder("articles")
                .field("body", FieldDefinition::text())
                .field("rank", FieldDefinition::integer().sortable())
                .build()
                .unwrap(),
        )
        .unwrap();

    let words = [
        "search", "index", "query", "scroll", "hit", "score", "document", "field", "term",
        "token", "window", "chunk", "total", "count", "timeout", "entity",
    ];
    let work = backend.work_executor("articles").unwrap();
    for i in 0..count {
        let body = (0..200)
            .map(|j| words[(i * 7 + j * 3) % words.len()])
            .collect::<Vec<_>>()
            .join(" ");
        work.add(&i.to_string(), |doc| {
            doc.add("body", body).add("rank", i as i64);
        })
        .unwrap();
    }
    work.flush();
    SearchScope::new(backend, &["articles"]).unwrap()
}

/// Ids of a list of document references, in order
pub fn ids(references: &[DocumentReference]) -> Vec<String> {
    references.iter().map(|r| r.id().to_string()).collect()
}

/// Values `from..to` as strings
pub fn id_range(from: usize, to: usize) -> Vec<String> {
    (from..to).map(|i| i.to_string()).collect()
}

/// Loader returning a `Book` for every id except those in `missing`
pub fn book_loader(
    missing: &'static [&'static str],
    calls: Arc<AtomicUsize>,
) -> impl Fn(&[String], &LoadingOptions, Option<&Deadline>) -> Result<HashMap<String, Book>>
       + Send
       + Sync
       + 'static {
    move |refs: &[String], _options: &LoadingOptions, _deadline: Option<&Deadline>| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(refs
            .iter()
            .filter(|id| !missing.contains(&id.as_str()))
            .map(|id| {
                (
                    id.clone(),
                    Book {
                        id: id.clone(),
                        title: format!("Book #{}", id),
                    },
                )
            })
            .collect())
    }
}

/// Loading builder turning references into ids and ids into `Book`s
pub fn book_loading(
    session: &SessionHandle,
    missing: &'static [&'static str],
    calls: Arc<AtomicUsize>,
) -> MapperLoading<String, Book> {
    MapperLoading::new(
        session.clone(),
        |reference: &DocumentReference| reference.id().to_string(),
        book_loader(missing, calls),
    )
}
