use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sheeptrack", version, about = "SheepTrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in or register
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Check in on a goal
    Check {
        #[command(subcommand)]
        action: commands::check::CheckAction,
    },
    /// Print every sheep and its hearts as JSON
    Status,
    /// Show the daily check-in streak
    Streak,
    /// Keep decay timers running until Ctrl-C
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SHEEPTRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Check { action } => commands::check::run(action),
        Commands::Status => commands::status::run(),
        Commands::Streak => commands::streak::run(),
        Commands::Run { duration_secs } => commands::run::run(duration_secs),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
