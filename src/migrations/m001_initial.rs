use crate::migrate::migration::Migration;

pub const NAME: &str = "001-initial";

pub fn migration() -> Migration {
    Migration::new(NAME)
        .statement(
            "CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                slug TEXT UNIQUE NOT NULL,
                title_fr TEXT NOT NULL,
                title_en TEXT NOT NULL,
                summary_fr TEXT,
                summary_en TEXT,
                body_fr TEXT NOT NULL,
                body_en TEXT NOT NULL,
                cover_image TEXT,
                published INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .statement(
            "CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name_fr TEXT UNIQUE NOT NULL,
                name_en TEXT UNIQUE NOT NULL
            )",
        )
        .statement(
            "CREATE TABLE IF NOT EXISTS article_tags (
                article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (article_id, tag_id)
            )",
        )
        .statement(
            "CREATE INDEX IF NOT EXISTS idx_articles_published
                ON articles(published, created_at)",
        )
}
