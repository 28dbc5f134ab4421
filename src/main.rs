//! ibridges - iRODS environment and credential tool
//!
//! Entry point for the CLI binary.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use ibridges_session::config::Config;
use ibridges_session::environment;
use ibridges_session::session::authenticate::PASSWORD_PROMPT;
use ibridges_session::session::CredentialStore;
use ibridges_session::utils::format_user_error;

/// Command-line arguments for ibridges
#[derive(Parser, Debug)]
#[command(name = "ibridges")]
#[command(version, about = "iRODS environment and credential tool", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "IBRIDGES_CONFIG")]
    pub config: Option<PathBuf>,

    /// iRODS environment document
    #[arg(short, long, env = "IRODS_ENVIRONMENT_FILE", global = true)]
    pub env: Option<PathBuf>,

    /// Auth file (.irodsA) location
    #[arg(long, env = "IRODS_AUTHENTICATION_FILE", global = true)]
    pub auth_file: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the iRODS environment
    Env {
        #[command(subcommand)]
        action: EnvCommand,
    },
    /// Manage the cached credential
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },
}

/// `env` subcommands
#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Load, validate and print the environment
    Show,
}

/// `auth` subcommands
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Report whether a usable cached credential exists
    Status,
    /// Read a password from stdin and cache it in obfuscated form
    Store,
    /// Remove the cached credential
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?.with_overrides(
        args.env.clone(),
        args.auth_file.clone(),
        args.log_format.clone(),
    );
    config.validate()?;

    init_logging(&args, &config)?;

    debug!(
        "ibridges v{} (built {}, commit {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_DATE"),
        env!("GIT_HASH")
    );
    debug!("Config: {:?}", config);

    if let Err(e) = run(&args.command, &config) {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => match dirs::config_dir() {
            Some(dir) => dir.join("ibridges").join("config.toml"),
            None => return Ok(Config::default_config()),
        },
    };

    if args.config.is_none() && !path.exists() {
        return Ok(Config::default_config());
    }

    Config::load(&path)
}

fn run(command: &Command, config: &Config) -> Result<()> {
    match command {
        Command::Env {
            action: EnvCommand::Show,
        } => show_environment(config),
        Command::Auth { action } => {
            let store = credential_store(config);
            match action {
                AuthCommand::Status => auth_status(&store),
                AuthCommand::Store => auth_store(&store),
                AuthCommand::Clear => auth_clear(&store),
            }
        }
    }
}

fn credential_store(config: &Config) -> CredentialStore {
    match &config.irods.auth_file {
        Some(path) => CredentialStore::new(path),
        None => CredentialStore::at_default_location(Some(config.irods.environment_file.as_path())),
    }
}

fn show_environment(config: &Config) -> Result<()> {
    let loaded = environment::load(None, Some(config.irods.environment_file.as_path()))
        .context("Failed to load iRODS environment")?;
    let env = &loaded.environment;
    let field = |value: Option<&str>| value.unwrap_or("-").to_string();

    println!("Environment file: {}", config.irods.environment_file.display());
    println!("  host:              {}", field(env.irods_host.as_deref()));
    println!(
        "  port:              {}",
        env.irods_port.map_or_else(|| "-".to_string(), |p| p.to_string())
    );
    println!("  zone:              {}", field(env.irods_zone_name.as_deref()));
    println!("  user:              {}", field(env.irods_user_name.as_deref()));

    let home = match (&config.irods.irods_home, &env.irods_home) {
        (Some(home), _) => format!("{} (config override)", home),
        (None, Some(home)) => home.clone(),
        (None, None) => match env.derived_home() {
            Some(home) => format!("{} (derived)", home),
            None => "-".to_string(),
        },
    };
    println!("  home:              {}", home);
    println!(
        "  default resource:  {}",
        field(env.irods_default_resource.as_deref())
    );
    println!(
        "  auth scheme:       {}",
        field(env.irods_authentication_scheme.as_deref())
    );
    println!(
        "  negotiation:       {}",
        field(env.irods_client_server_policy.as_deref())
    );
    println!("  other keys:        {}", env.extra.len());

    Ok(())
}

fn auth_status(store: &CredentialStore) -> Result<()> {
    println!("Auth file: {}", store.path().display());
    match store.read() {
        Ok(Some(_)) => println!("  status: present, decodes"),
        Ok(None) => println!("  status: absent"),
        Err(e) => println!("  status: present but unusable ({})", e),
    }
    Ok(())
}

fn auth_store(store: &CredentialStore) -> Result<()> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("{}", PASSWORD_PROMPT);
        std::io::stderr().flush().ok();
    }

    let mut line = Zeroizing::new(String::new());
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\n', '\r']);
    if password.is_empty() {
        anyhow::bail!("No password given on stdin");
    }

    store
        .write(password)
        .context("Failed to write cached credential")?;
    println!("Cached credential written to {}", store.path().display());
    Ok(())
}

fn auth_clear(store: &CredentialStore) -> Result<()> {
    if store.clear().context("Failed to remove cached credential")? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No cached credential at {}", store.path().display());
    }
    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ibridges={level},ibridges_session={level},warn",
            level = log_level
        ))
    });

    let log_file = args
        .log_file
        .clone()
        .or_else(|| config.logging.log_dir.as_ref().map(|dir| dir.join("ibridges.log")));
    let file = log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()
        .context("Failed to create log file")?
        .map(Mutex::new);

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(file.map(|f| fmt::layer().json().with_writer(f).with_ansi(false)))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .with(file.map(|f| fmt::layer().compact().with_writer(f).with_ansi(false)))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .with(file.map(|f| fmt::layer().with_writer(f).with_ansi(false)))
                .init();
        }
    }

    if let Some(path) = log_file {
        info!("Logging to file: {}", path.display());
    }

    Ok(())
}
