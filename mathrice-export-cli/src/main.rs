mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{DEFAULT_LAB, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEZONE};

#[derive(Parser)]
#[command(name = "mathrice-export")]
#[command(about = "Export laboratory Google calendars to ICS and JSON feeds")]
#[command(version)]
struct Cli {
    /// Defaults to `export` when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Service-account JSON key file
    #[arg(
        short,
        long,
        global = true,
        default_value = "client_secret_service_account.json"
    )]
    key_file: PathBuf,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,
}

#[derive(Args)]
struct ExportArgs {
    /// Laboratory name used in UIDs and PRODID
    #[arg(short, long, default_value = DEFAULT_LAB)]
    lab: String,

    /// Time zone in which event times are interpreted
    #[arg(short, long, default_value = DEFAULT_TIMEZONE)]
    timezone: String,

    /// Output root, holding `ics/` and `json/`
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Attempts per provider call on transient failures
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Abort on the first failing calendar, without retries
    #[arg(long)]
    fail_fast: bool,
}

impl Default for ExportArgs {
    fn default() -> Self {
        Self {
            lab: DEFAULT_LAB.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            retries: 3,
            fail_fast: false,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export every visible calendar to ICS and JSON files
    Export(ExportArgs),

    /// List the calendars visible to the service account
    Calendars,

    /// Create a calendar owned by the service account
    CreateCalendar {
        /// Calendar title
        summary: String,

        #[arg(short, long, default_value = DEFAULT_TIMEZONE)]
        timezone: String,
    },

    /// Insert an event read from a JSON file
    CreateEvent {
        calendar_id: String,

        /// Event body in provider JSON format
        file: PathBuf,
    },

    /// Delete an event
    DeleteEvent {
        calendar_id: String,
        event_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "mathrice_export_cli={},mathrice_export_core={}",
                    log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let key_file = cli.key_file;
    let timeout = cli.timeout;

    match cli.command.unwrap_or_else(|| Commands::Export(ExportArgs::default())) {
        Commands::Export(args) => {
            commands::export_command(commands::ExportParams {
                key_file,
                lab: args.lab,
                timezone: args.timezone,
                output_dir: args.output_dir,
                retries: args.retries,
                timeout,
                fail_fast: args.fail_fast,
            })
            .await
        }

        Commands::Calendars => commands::calendars_command(key_file, timeout).await,

        Commands::CreateCalendar { summary, timezone } => {
            commands::create_calendar_command(key_file, timeout, summary, timezone).await
        }

        Commands::CreateEvent { calendar_id, file } => {
            commands::create_event_command(key_file, timeout, calendar_id, file).await
        }

        Commands::DeleteEvent {
            calendar_id,
            event_id,
        } => commands::delete_event_command(key_file, timeout, calendar_id, event_id).await,
    }
}
