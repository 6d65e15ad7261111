use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod inspector;
mod pipeline;
mod writer;

use commands::config::ConfigCommand;
use config::LaragenConfig;

#[derive(Parser)]
#[command(name = "laragen")]
#[command(about = "Generate Laravel models, controllers, resources, observers and policies from a database schema")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to current directory)
    #[arg(short = 'P', long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from the database schema
    Generate(commands::generate::GenerateArgs),

    /// Database operations (connection test, introspection, analysis)
    Db(commands::db::DbCommand),

    /// Configuration management (show, validate, init)
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List backups left by generate --backup
    Backups {
        /// Show the backup file paths
        #[arg(long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_path = match cli.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    // init must work even when an existing laragen.toml is broken
    if let Commands::Config {
        command: ConfigCommand::Init {
            force,
            url,
            namespace,
        },
    } = cli.command
    {
        init_logging(cli.verbose, "info");
        return commands::config::init(&project_path, force, url, namespace);
    }

    let config = LaragenConfig::load(&project_path)?;
    init_logging(cli.verbose, config.output.log_filter());

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, &project_path, &config).await,
        Commands::Db(db_cmd) => db_cmd.execute(&config).await,
        Commands::Config { command } => commands::config::execute(command, &project_path, &config),
        Commands::Backups { detailed } => commands::backups::run(&project_path, detailed),
    }
}

fn init_logging(verbose: bool, default_filter: &str) {
    let filter = if verbose { "debug" } else { default_filter };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
