use crate::migrate::migration::Migration;

pub const NAME: &str = "004-likes";

/// One like per guest token per article.
pub fn migration() -> Migration {
    Migration::new(NAME).statement(
        "CREATE TABLE IF NOT EXISTS likes (
            id INTEGER PRIMARY KEY,
            article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            guest_token TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (article_id, guest_token)
        )",
    )
}
