use crate::migrate::migration::Migration;

pub const NAME: &str = "006-seed-tags";

/// Default tag set. `INSERT OR IGNORE` keys on the unique names, so
/// re-application cannot duplicate the seeds.
pub fn migration() -> Migration {
    Migration::new(NAME).statement(
        "INSERT OR IGNORE INTO tags (name_fr, name_en) VALUES
            ('développement', 'development'),
            ('voyages', 'travel'),
            ('musique', 'music'),
            ('photographie', 'photography')",
    )
}
