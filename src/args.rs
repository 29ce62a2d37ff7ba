use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
name = "BlogMigrator",
version = env ! ("CARGO_PKG_VERSION"),
about = "Brings the blog database schema to the latest version, applying each pending migration exactly once before the server starts.",
setting = AppSettings::ColoredHelp,
)]
pub struct Args {
    /// Activate verbose mode
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Activate quiet mode
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Report applied and pending migrations without applying anything
    #[structopt(short = "s", long = "status")]
    pub status: bool,

    /// Override the database file configured in config.toml
    #[structopt(long = "database")]
    pub database: Option<String>,
}
