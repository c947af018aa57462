//! `arena` binary: HTTP server and operator commands.

use arena::cli::{
    CliError, cmd_create_admin, cmd_generate_sessions, cmd_init, cmd_serve, cmd_status,
};
use arena::config::{ServeArgs, ServerConfig};
use arena_core::primitives::MAX_GENERATE_WEEKS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Campus sport-facility booking service", version)]
struct Cli {
    /// Path to the database file
    #[arg(long, global = true, env = "ARENA_DB", default_value = "arena.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, env = "ARENA_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print record counts
    Status,
    /// Generate upcoming sessions for every active schedule
    GenerateSessions {
        #[arg(
            long,
            default_value_t = 2,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new()
                .range(1..=MAX_GENERATE_WEEKS as u64)
        )]
        weeks: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("arena=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Init { force } => {
            cmd_init(&cli.db, force)?;
            println!("Initialized database at {}", cli.db.display());
        }
        Commands::Serve(args) => {
            let config = ServerConfig::from_args(args, cli.db)?;
            cmd_serve(config).await?;
        }
        Commands::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => {
            let id = cmd_create_admin(&cli.db, &email, &first_name, &last_name, &password)?;
            println!("Created admin {email} ({id})");
        }
        Commands::Status => {
            let counts = cmd_status(&cli.db)?;
            println!("Database: {}", cli.db.display());
            println!("  users:         {}", counts.users);
            println!("  facilities:    {}", counts.facilities);
            println!("  bookings:      {}", counts.bookings);
            println!("  reviews:       {}", counts.reviews);
            println!("  trainers:      {}", counts.trainers);
            println!("  schedules:     {}", counts.schedules);
            println!("  sessions:      {}", counts.sessions);
            println!("  registrations: {}", counts.registrations);
            println!("  penalties:     {}", counts.penalties);
        }
        Commands::GenerateSessions { weeks } => {
            let created = cmd_generate_sessions(&cli.db, weeks)?;
            println!("Generated {created} session(s)");
        }
    }
    Ok(())
}
