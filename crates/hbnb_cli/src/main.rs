//! Operator CLI for provisioning an HBnB store.
//!
//! Settings come from the environment (and `.env` when present), the same
//! way a server process would read them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hbnb_core::service::{Credentials, UserDraft};
use hbnb_core::{
    open_repository, BcryptHasher, Country, RepoError, Repository, Settings, TypedRepository,
    UserService,
};
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hbnb", version, about = "Provision and inspect an HBnB data store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configured store and apply migrations
    InitDb,
    /// Load countries from a JSON array of `{ "code", "name" }` objects
    ImportCountries {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Read from HBNB_ADMIN_PASSWORD when omitted
        #[arg(long, env = "HBNB_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Check a credential pair and print an access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HBNB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print record counts per kind
    Stats,
    /// Print the core library version
    Version,
}

#[derive(Deserialize)]
struct CountryRow {
    code: String,
    name: String,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    match Cli::parse().command {
        Commands::Version => {
            println!("hbnb_core version={}", hbnb_core::core_version());
            Ok(())
        }
        command => run(command),
    }
}

fn run(command: Commands) -> Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    if let Err(err) = hbnb_core::init_logging(&settings.log_level, settings.log_dir.as_deref()) {
        bail!("failed to initialize logging: {err}");
    }
    let repo = open_repository(&settings).context("failed to open repository")?;

    match command {
        Commands::InitDb => {
            println!("store ready env={}", settings.env);
        }
        Commands::ImportCountries { file } => import_countries(&repo, &file)?,
        Commands::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => {
            let service = user_service(&settings, repo)?;
            let profile = service.create_admin(UserDraft {
                email,
                first_name,
                last_name,
                password,
            })?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Login { email, password } => {
            let service = user_service(&settings, repo)?;
            let token = service.login(&Credentials { email, password })?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        Commands::Stats => {
            for kind in hbnb_core::Kind::ALL {
                println!("{kind}={}", repo.get_all(kind)?.len());
            }
        }
        Commands::Version => {}
    }
    Ok(())
}

fn user_service(
    settings: &Settings,
    repo: Arc<dyn Repository>,
) -> Result<UserService<Arc<dyn Repository>>> {
    let tokens = settings
        .token_issuer()
        .context("invalid token settings")?;
    Ok(UserService::new(
        repo,
        Arc::new(BcryptHasher::default()),
        Arc::new(tokens),
    ))
}

fn import_countries(repo: &Arc<dyn Repository>, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    let rows: Vec<CountryRow> = serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not a JSON country list", file.display()))?;

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for row in rows {
        match repo.insert(Country::new(row.code, row.name)) {
            Ok(_) => imported += 1,
            Err(RepoError::Conflict(_)) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }
    info!("event=import_countries module=cli status=ok imported={imported} skipped={skipped}");
    println!("imported={imported} skipped={skipped}");
    Ok(())
}
