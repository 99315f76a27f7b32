use std::path::PathBuf;

use clap::Parser;
use deepdict_config::{Config, ProfileStore};
use tracing_subscriber::EnvFilter;

pub mod controller;
pub mod events;
pub mod io;
pub mod state;
pub mod status;
pub mod ui;

#[cfg(test)]
mod tests;

use self::controller::AppController;
use self::events::{Command, handle_command};
use self::state::Console;

#[derive(Parser)]
#[command(name = "deepdict", about = "AI-generated dictionary entries for language learners")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Profile file holding settings and recent lookups
    #[arg(long, global = true, default_value = "profiles/main.json")]
    profile: PathBuf,
    /// SQLite database, overrides the profile
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

impl Cli {
    /// Profile settings with command-line and environment overrides
    fn effective_config(&self, profile: &ProfileStore) -> Config {
        let mut config = profile.config().clone();
        config.apply_env();
        if let Some(database) = &self.database {
            config.storage.database_path = database.clone();
        }
        config
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let profile = ProfileStore::open(&cli.profile)?;
    tracing::debug!("Using profile {}", profile.path().display());
    let config = cli.effective_config(&profile);
    let app = AppController::new(&config)?;
    let mut console = Console::new(profile, app.store());

    let result = match cli.command.unwrap_or(Command::Repl) {
        Command::Repl => ui::ui_loop(&app, &mut console),
        command => handle_command(&mut console, command).map(|()| {
            app.run_until_idle(&mut console, |line| println!("{line}"));
        }),
    };

    app.shutdown();
    result
}
