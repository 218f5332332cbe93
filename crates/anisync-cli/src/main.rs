use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::{config, daemon, errors, map, recent, sync};

#[derive(Parser)]
#[command(name = "anisync")]
#[command(about = "Sync Plex watch state to your MyAnimeList list")]
#[command(long_about = "anisync reads watched episodes from a Plex anime library, resolves each season to a MyAnimeList entry through the AniDB cross-reference, and updates your MAL list to match.")]
#[command(version)]
struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass now
    #[command(long_about = "Run a single sync pass: refresh the cross-reference snapshot if it is older than a week, resolve unmapped seasons, and push every season that is behind to MyAnimeList.")]
    Sync,

    /// Run a daily sync pass until interrupted
    #[command(long_about = "Run in the foreground and start a sync pass every day at the configured local time. Stops on Ctrl-C once the current pass has finished.")]
    Daemon {
        /// Local time of the daily pass (HH:MM), overrides scheduler.sync_time
        #[arg(long)]
        sync_time: Option<String>,

        /// Skip the pass that normally runs at startup when scheduler.run_on_startup is set
        #[arg(long)]
        no_startup_sync: bool,
    },

    /// Show seasons that could not be mapped to a MyAnimeList entry
    #[command(long_about = "Print the error ledger: every show season without a MAL id, with a MAL search link to help find the right entry. Fix an entry with `anisync map`.")]
    Errors,

    /// Map a show season to a MyAnimeList id by hand
    #[command(long_about = "Store a manual mapping from a TVDB show id and season to a MyAnimeList anime id. Matching ledger entries are removed.")]
    Map {
        /// TVDB id of the show
        library_id: String,

        /// Season number (1 or higher)
        season: u32,

        /// MyAnimeList anime id
        tracking_id: String,
    },

    /// Show the most recent MyAnimeList updates
    Recent,

    /// Manage configuration
    #[command(long_about = "Create or display the configuration file and stored credentials.")]
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Interactively create the configuration and credentials
    Init,

    /// Show the current configuration
    Show {
        /// Show secrets unmasked
        #[arg(long)]
        full: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let output = output::Output::new(cli.output, cli.quiet);

    // The daemon logs to a rolling file as well, so it sets up its own subscriber
    if !matches!(cli.command, Commands::Daemon { .. }) {
        logging::init_logging(cli.verbose, cli.quiet)
            .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    }

    match cli.command {
        Commands::Sync => sync::run_sync(&output).await,
        Commands::Daemon {
            sync_time,
            no_startup_sync,
        } => daemon::run_daemon(sync_time, no_startup_sync, cli.verbose, cli.quiet, &output).await,
        Commands::Errors => errors::run_errors(&output),
        Commands::Map {
            library_id,
            season,
            tracking_id,
        } => map::run_map(&library_id, season, &tracking_id, &output),
        Commands::Recent => recent::run_recent(&output),
        Commands::Config { cmd } => config::run_config(cmd, &output),
    }
}
