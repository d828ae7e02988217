#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common fixtures for integration tests.
//!
//! Every test gets its own in-memory [`SqliteHost`] seeded with a small
//! library: books, authors and the "book-author" relationship between them.
//! Queries run through the real engine against real tables.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use relata_kernel::HostServices;
use relata_kernel::host::{LanguageService, Monolingual};
use relata_test_utils::{SqliteHost, book_author, test_relationship};
use tracing_subscriber::EnvFilter;

pub const DUNE: i64 = 42;
pub const EMMA: i64 = 43;

pub const HERBERT: i64 = 100;
pub const AUSTEN: i64 = 101;
pub const ANDERSON: i64 = 102;
/// Author in the trash; hidden by the default status filter.
pub const TRASHED: i64 = 103;

/// Id of the inactive "book-editor" relationship.
pub const BOOK_EDITOR: i64 = 2;

static TRACING: Once = Once::new();

/// Route engine logs to the test writer. Set RUST_LOG to see them.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Seeded store.
///
/// Dune has three live authors and one trashed author; Emma has one
/// author. The inactive "book-editor" relationship links Dune to Austen.
pub fn library() -> Arc<SqliteHost> {
    init_tracing();
    let host = SqliteHost::new().unwrap();

    host.insert_relationship(&book_author()).unwrap();
    host.insert_relationship(
        &test_relationship(BOOK_EDITOR, "book-editor", "book", "author")
            .inactive()
            .build(),
    )
    .unwrap();

    host.insert_post(DUNE, "book", "publish", "Dune").unwrap();
    host.insert_post(EMMA, "book", "publish", "Emma").unwrap();
    host.insert_post(HERBERT, "author", "publish", "Frank Herbert")
        .unwrap();
    host.insert_post(AUSTEN, "author", "draft", "Jane Austen").unwrap();
    host.insert_post(ANDERSON, "author", "publish", "Brian Anderson")
        .unwrap();
    host.insert_post(TRASHED, "author", "trash", "Nobody").unwrap();

    host.insert_postmeta(HERBERT, "born", "1920").unwrap();
    host.insert_postmeta(AUSTEN, "born", "1775").unwrap();
    host.insert_postmeta(ANDERSON, "born", "1949").unwrap();
    host.insert_postmeta(HERBERT, "genre", "scifi").unwrap();
    host.insert_postmeta(ANDERSON, "genre", "scifi").unwrap();
    host.insert_postmeta(AUSTEN, "genre", "romance").unwrap();

    host.insert_association(1, DUNE, HERBERT, None).unwrap();
    host.insert_association(1, DUNE, AUSTEN, None).unwrap();
    host.insert_association(1, DUNE, ANDERSON, None).unwrap();
    host.insert_association(1, DUNE, TRASHED, None).unwrap();
    host.insert_association(1, EMMA, AUSTEN, None).unwrap();
    host.insert_association(BOOK_EDITOR, DUNE, AUSTEN, None)
        .unwrap();

    Arc::new(host)
}

/// Services of `host` on a monolingual site.
pub fn services(host: &Arc<SqliteHost>) -> HostServices {
    host.services(Arc::new(Monolingual::default()))
}

/// Services of `host` with a custom language service.
pub fn services_with(
    host: &Arc<SqliteHost>,
    languages: impl LanguageService + 'static,
) -> HostServices {
    host.services(Arc::new(languages))
}
