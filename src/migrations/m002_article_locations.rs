use crate::migrate::migration::Migration;

pub const NAME: &str = "002-article-locations";

/// Map coordinates for articles. Deployed databases may already carry one or
/// both columns, so duplicates are tolerated.
pub fn migration() -> Migration {
    Migration::new(NAME)
        .statement_tolerating_existing("ALTER TABLE articles ADD COLUMN lat REAL")
        .statement_tolerating_existing("ALTER TABLE articles ADD COLUMN lng REAL")
}
