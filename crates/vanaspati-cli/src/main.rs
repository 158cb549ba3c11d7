//! vanaspati: command-line front end for the plant diagnosis service.
//!
//! Keeps the session in a credential file between invocations, so
//! `vanaspati login` once and the other commands reuse the token until the
//! server rejects it.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vanaspati_client::{ClientConfig, FileCredentialStore, VanaspatiClient};
use vanaspati_core::PlantStatus;

#[derive(Parser)]
#[command(name = "vanaspati")]
#[command(author, version, about = "Plant disease diagnosis client")]
#[command(propagate_version = true)]
struct Cli {
    /// API base URL (overrides config file and VANASPATI_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Credential file (default: <config dir>/vanaspati/credentials.json)
    #[arg(long, global = true, env = "VANASPATI_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username (or email) and password
    Login {
        /// Username or email
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "VANASPATI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account (does not log in)
    Signup {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// At least 8 characters, one uppercase letter and one number
        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(short, long)]
        confirm: String,
    },

    /// Forget the stored session
    Logout,

    /// Validate the stored session and show who is logged in
    Whoami,

    /// Diagnosis history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Tracked plants
    #[command(subcommand)]
    Garden(GardenCommand),
}

#[derive(Subcommand)]
pub(crate) enum HistoryCommand {
    /// List saved diagnoses, newest first
    List {
        #[arg(long, default_value_t = vanaspati_core::defaults::HISTORY_PAGE_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = vanaspati_core::defaults::PAGE_OFFSET)]
        offset: u32,
    },

    /// Save a diagnosis result
    Save(SaveDiagnosisArgs),

    /// Delete one diagnosis
    Delete { id: String },

    /// Delete all diagnoses
    Clear,
}

#[derive(Args)]
pub(crate) struct SaveDiagnosisArgs {
    /// Image file name the prediction was made on
    #[arg(short, long)]
    pub image: String,

    /// Predicted class, e.g. Tomato___Late_blight
    #[arg(short = 'k', long = "class")]
    pub class_name: String,

    #[arg(short, long)]
    pub confidence: f64,

    #[arg(short, long)]
    pub notes: Option<String>,

    /// Mark as part of a batch upload
    #[arg(long)]
    pub batch: bool,
}

#[derive(Subcommand)]
pub(crate) enum GardenCommand {
    /// List tracked plants
    List {
        /// Only plants in this status
        #[arg(short, long)]
        status: Option<PlantStatus>,
    },

    /// Start tracking a plant
    Save {
        #[arg(short, long)]
        plant: String,

        #[arg(short, long)]
        disease: String,

        #[arg(short, long)]
        confidence: f64,

        #[arg(short, long)]
        notes: Option<String>,

        #[arg(short, long, default_value_t = PlantStatus::Monitoring)]
        status: PlantStatus,
    },

    /// Track the plant from a saved diagnosis
    Promote {
        /// Diagnosis id from `history list`
        diagnosis_id: String,
    },

    /// Change notes and/or status (omitted fields are kept)
    Update {
        id: String,

        /// New notes; pass "" to clear
        #[arg(short, long)]
        notes: Option<String>,

        #[arg(short, long)]
        status: Option<PlantStatus>,
    },

    /// Stop tracking a plant
    Delete { id: String },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output stays parseable.
///
/// Environment:
///   LOG_FORMAT - "json" or "text" (default: "text")
///   RUST_LOG   - standard env filter (default: "vanaspati=warn,vanaspati_client=warn")
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vanaspati=warn,vanaspati_client=warn,vanaspati_core=warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::load_unvalidated().context("failed to load client config")?;
    let client = build_client(config, cli.api_url, cli.credentials)?;
    let out = commands::Output::new(cli.json);

    match cli.command {
        Commands::Login { username, password } => {
            commands::login(&client, &out, &username, &password).await
        }
        Commands::Signup {
            username,
            email,
            password,
            confirm,
        } => commands::signup(&client, &out, &username, &email, &password, &confirm).await,
        Commands::Logout => commands::logout(&client, &out),
        Commands::Whoami => commands::whoami(&client, &out).await,
        Commands::History(cmd) => commands::history(&client, &out, cmd).await,
        Commands::Garden(cmd) => commands::garden(&client, &out, cmd).await,
    }
}

/// Apply `--api-url` over file and environment settings, validate, and open
/// the credential file.
fn build_client(
    mut config: ClientConfig,
    api_url: Option<String>,
    credentials: Option<PathBuf>,
) -> anyhow::Result<VanaspatiClient> {
    if let Some(url) = api_url {
        config.base_url = url;
    }
    config.validate().context("invalid client config")?;

    let credentials_path = credentials.unwrap_or_else(FileCredentialStore::default_path);
    let store = FileCredentialStore::open(&credentials_path).with_context(|| {
        format!(
            "failed to open credential file {}",
            credentials_path.display()
        )
    })?;

    Ok(VanaspatiClient::new(config, Arc::new(store))?)
}
