//! Door access authorization and audit CLI
//!
//! Administers doors and credentials, evaluates presentations, and queries
//! the attempt history over a configured store.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use doorkeeper::{
    SecurityService,
    config::{AppConfig, LogFormat, StorageBackend, load_config},
    model::{CredentialId, CredentialTypeId, DoorId, EmployeeId, NewCredential},
    open_store,
};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Door access authorization and audit engine
#[derive(Parser, Debug)]
#[command(name = "doorkeeper")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "DOORKEEPER_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DOORKEEPER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Snapshot file to use instead of the configured store
    #[arg(long, env = "DOORKEEPER_STORE")]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a door
    AddDoor {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        location: String,
    },

    /// Register a credential type
    AddType {
        #[arg(long)]
        name: String,
        /// Credentials of this type are issued to one employee
        #[arg(long)]
        employee_specific: bool,
        /// Credentials of this type open a single door
        #[arg(long)]
        door_specific: bool,
    },

    /// Register an employee
    AddEmployee {
        #[arg(long)]
        name: String,
    },

    /// Register a credential
    AddCredential {
        #[arg(long = "type")]
        credential_type: u64,
        #[arg(long)]
        code: String,
        #[arg(long)]
        employee: Option<u64>,
    },

    /// Add a credential type to a door's requirements
    RequireType {
        #[arg(long)]
        door: u64,
        #[arg(long = "type")]
        credential_type: u64,
    },

    /// Authorize credentials for a door
    Grant {
        #[arg(long)]
        door: u64,
        #[arg(long = "credential", required = true)]
        credentials: Vec<u64>,
    },

    /// Revoke a credential (and its owner's other credentials) from a door
    Revoke {
        #[arg(long)]
        door: u64,
        #[arg(long)]
        credential: u64,
    },

    /// Present credentials at a door and log the outcome
    Authorize {
        #[arg(long)]
        door: u64,
        #[arg(long = "credential")]
        credentials: Vec<u64>,
        /// Attempt time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Log an attempt without evaluating it
    Log {
        #[arg(long)]
        door: u64,
        #[arg(long = "credential")]
        credentials: Vec<u64>,
        #[arg(long, value_enum)]
        outcome: Outcome,
        /// Attempt time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List attempts strictly between two timestamps
    Activity {
        #[arg(long)]
        from: DateTime<Utc>,
        #[arg(long)]
        to: DateTime<Utc>,
        /// Only attempts at this door
        #[arg(long)]
        door: Option<u64>,
    },

    /// List failures not resolved by a success within the window
    Suspicious {
        #[arg(long)]
        from: DateTime<Utc>,
        #[arg(long)]
        to: DateTime<Utc>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Outcome {
    Success,
    Failure,
}

fn init_logging(config: &AppConfig, cli_level: Option<&str>) {
    let level = cli_level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn credential_ids(raw: &[u64]) -> Vec<CredentialId> {
    raw.iter().copied().map(CredentialId::new).collect()
}

fn run(service: &SecurityService, config: &AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::AddDoor { name, location } => print_json(&service.add_door(&name, &location)?),
        Command::AddType {
            name,
            employee_specific,
            door_specific,
        } => print_json(&service.add_credential_type(&name, employee_specific, door_specific)?),
        Command::AddEmployee { name } => print_json(&service.add_employee(&name)?),
        Command::AddCredential {
            credential_type,
            code,
            employee,
        } => {
            let mut credential = NewCredential::new(CredentialTypeId::new(credential_type), code);
            if let Some(employee) = employee {
                credential = credential.owned_by(EmployeeId::new(employee));
            }
            print_json(&service.add_credential(credential)?)
        }
        Command::RequireType {
            door,
            credential_type,
        } => {
            let added = service
                .policy()
                .require_credential_type(DoorId::new(door), CredentialTypeId::new(credential_type))?;
            print_json(&serde_json::json!({ "door": door, "added": added }))
        }
        Command::Grant { door, credentials } => {
            let added = service
                .policy()
                .grant_access(DoorId::new(door), &credential_ids(&credentials))?;
            print_json(&serde_json::json!({ "door": door, "granted": added }))
        }
        Command::Revoke { door, credential } => {
            let removed = service
                .policy()
                .revoke_access(DoorId::new(door), CredentialId::new(credential))?;
            print_json(&serde_json::json!({ "door": door, "revoked": removed }))
        }
        Command::Authorize {
            door,
            credentials,
            at,
        } => {
            let outcome = service.attempt_access(
                DoorId::new(door),
                &credential_ids(&credentials),
                at.unwrap_or_else(Utc::now),
            )?;
            print_json(&outcome)
        }
        Command::Log {
            door,
            credentials,
            outcome,
            at,
        } => {
            let attempt = service.logger().log_attempt(
                DoorId::new(door),
                &credential_ids(&credentials),
                matches!(outcome, Outcome::Success),
                at.unwrap_or_else(Utc::now),
            )?;
            print_json(&serde_json::json!({ "attempt": attempt }))
        }
        Command::Activity { from, to, door } => {
            let attempts = match door {
                Some(door) => service
                    .logger()
                    .door_activity(from, to, DoorId::new(door))?,
                None => service.logger().activity(from, to)?,
            };
            print_json(&attempts)
        }
        Command::Suspicious { from, to } => print_json(&service.find_suspicious(from, to)?),
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = load_config(args.config.as_deref()).context("loading configuration")?;
    if let Some(path) = args.store {
        config.storage.backend = StorageBackend::File;
        config.storage.path = path;
    }

    // Initialize logging
    init_logging(&config, args.log_level.as_deref());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        "Starting doorkeeper"
    );

    let store = open_store(&config.storage)
        .inspect_err(|e| error!(error = %e, "Failed to open store"))?;
    let service = SecurityService::from_config(store, &config)?;

    run(&service, &config, args.command).inspect_err(|e| error!(error = %e, "Command failed"))
}
