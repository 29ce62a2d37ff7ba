use crate::migrate::migration::Migration;

pub const NAME: &str = "003-comments";

/// Guest comments: commenters are identified by a display name plus the
/// browser-held guest token, not an account.
pub fn migration() -> Migration {
    Migration::new(NAME)
        .statement(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY,
                article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                author_name TEXT NOT NULL,
                guest_token TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .statement(
            "CREATE INDEX IF NOT EXISTS idx_comments_article
                ON comments(article_id, created_at)",
        )
}
