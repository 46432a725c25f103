mod app;
mod render;

use std::path::PathBuf;

use app::Console;
use certwatch_shared::{telemetry, AppConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "certwatch")]
#[command(about = "Console for Certwatch search settings and flagged domains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the Certwatch API
    #[arg(long, env = "CERTWATCH_API_URL")]
    api_url: Option<String>,

    /// Directory where the session token is kept
    #[arg(long, env = "CERTWATCH_TOKEN_DIR")]
    token_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CERTWATCH_PASSWORD")]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CERTWATCH_PASSWORD")]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Show the current session
    Whoami,
    /// Manage search settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Inspect flagged domains
    Flagged {
        #[command(subcommand)]
        command: FlaggedCommand,
    },
    /// Overview of every search setting (admins only)
    Admin,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// List your search settings
    List,
    /// Show one search setting and its flagged domains
    Show { id: i64 },
    /// Create a search setting
    Create {
        #[arg(long)]
        domain_base: String,
        #[arg(long)]
        tld: String,
        /// Extra settings as a JSON object
        #[arg(long)]
        additional_settings: Option<String>,
        /// Logo image to upload
        #[arg(long)]
        logo: Option<PathBuf>,
    },
    /// Delete a search setting
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum FlaggedCommand {
    /// Show a flagged domain with its images
    Show { id: i64 },
    /// Download the stored images of a flagged domain
    Images {
        id: i64,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(dir) = cli.token_dir {
        config.session.token_dir = dir.to_string_lossy().to_string();
    }
    config.validate()?;
    telemetry::init_telemetry(&config.logging);

    let console = Console::new(&config)?;

    match cli.command {
        Commands::Login { username, password } => console.login(&username, &password).await?,
        Commands::Signup { username, password } => console.signup(&username, &password).await?,
        Commands::Logout => console.logout(),
        Commands::Whoami => console.whoami(),
        Commands::Settings { command } => match command {
            SettingsCommand::List => console.list_settings().await?,
            SettingsCommand::Show { id } => console.show_setting(id).await?,
            SettingsCommand::Create {
                domain_base,
                tld,
                additional_settings,
                logo,
            } => {
                console
                    .create_setting(domain_base, tld, additional_settings, logo)
                    .await?
            }
            SettingsCommand::Delete { id } => console.delete_setting(id).await?,
        },
        Commands::Flagged { command } => match command {
            FlaggedCommand::Show { id } => console.show_flagged(id).await?,
            FlaggedCommand::Images { id, out } => console.save_flagged_images(id, &out).await?,
        },
        Commands::Admin => console.admin_overview().await?,
    }

    Ok(())
}
