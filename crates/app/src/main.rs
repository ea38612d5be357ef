use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use services::{Clock, QuestServices};

mod commands;
mod db;

#[derive(Parser)]
#[command(name = "pointer-quest", about = "Track Pointer Quest lesson progress")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL or path
    #[arg(long, global = true, env = "POINTER_QUEST_DB_URL", default_value = db::DEFAULT_DB_URL)]
    db: String,

    /// Use a throwaway in-memory store instead of the database
    #[arg(long, global = true)]
    memory: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or update the learner profile
    Profile(commands::ProfileArgs),
    /// Record a lesson attempt
    Complete(commands::CompleteArgs),
    /// Show progress for one lesson or all attempted lessons
    Progress(commands::ProgressArgs),
    /// Set or clear notes on a lesson
    Notes(commands::NotesArgs),
    /// Forget progress on one lesson
    ResetLesson(commands::LessonArg),
    /// Show totals, streaks and topic breakdown
    Stats(commands::StatsArgs),
    /// List achievements and progress toward them
    Achievements,
    /// Manage study sessions
    Session(commands::SessionArgs),
    /// Write all data as JSON
    Export(commands::ExportArgs),
    /// Load data from a JSON export
    Import(commands::ImportArgs),
    /// Manage stored backups
    Backup(commands::BackupArgs),
    /// Delete all progress after taking a backup
    Reset(commands::ResetArgs),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_services(cli: &Cli) -> Result<QuestServices> {
    let clock = Clock::default_clock();
    if cli.memory {
        debug!("using in-memory store");
        return Ok(QuestServices::in_memory(clock));
    }

    let db_url = db::normalize_sqlite_url(&cli.db);
    db::prepare_sqlite_file(&db_url)?;
    debug!(%db_url, "opening database");
    QuestServices::new_sqlite(&db_url, clock)
        .await
        .with_context(|| format!("failed to open database {db_url}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let services = open_services(&cli).await?;
    let out = commands::Output::new(cli.json);

    match cli.command {
        Commands::Profile(args) => commands::profile(&services, &out, args).await,
        Commands::Complete(args) => commands::complete(&services, &out, args).await,
        Commands::Progress(args) => commands::progress(&services, &out, args).await,
        Commands::Notes(args) => commands::notes(&services, &out, args).await,
        Commands::ResetLesson(args) => commands::reset_lesson(&services, &out, args).await,
        Commands::Stats(args) => commands::stats(&services, &out, args).await,
        Commands::Achievements => commands::achievements(&services, &out).await,
        Commands::Session(args) => commands::session(&services, &out, args).await,
        Commands::Export(args) => commands::export(&services, args).await,
        Commands::Import(args) => commands::import(&services, &out, args).await,
        Commands::Backup(args) => commands::backup(&services, &out, args).await,
        Commands::Reset(args) => commands::reset(&services, &out, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pointer-quest",
            "complete",
            "12",
            "--score",
            "90",
            "--memory",
            "--json",
        ])
        .unwrap();
        assert!(cli.memory);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Complete(_)));
    }

    #[test]
    fn lesson_numbers_are_range_checked() {
        assert!(Cli::try_parse_from(["pointer-quest", "progress", "121"]).is_err());
        assert!(Cli::try_parse_from(["pointer-quest", "progress", "120"]).is_ok());
    }
}
