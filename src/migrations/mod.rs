//! The blog database's migration history, one module per unit.

use crate::migrate::migration::Migration;

mod m001_initial;
mod m002_article_locations;
mod m003_comments;
mod m004_likes;
mod m005_admin_accounts;
mod m006_seed_tags;

/// Every known migration unit, oldest first.
pub fn registry() -> Vec<Migration> {
    vec![
        m001_initial::migration(),
        m002_article_locations::migration(),
        m003_comments::migration(),
        m004_likes::migration(),
        m005_admin_accounts::migration(),
        m006_seed_tags::migration(),
    ]
}
