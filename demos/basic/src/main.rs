//! Confkit Demo
//!
//! Each subcommand runs one workflow against a configuration file in the
//! current directory (or `--file`).
//!
//! # Usage
//!
//! ```bash
//! # first run writes config.json and exits, second run reads it
//! cargo run --package confkit-demo -- load-or-exit
//! cargo run --package confkit-demo -- load-or-exit
//!
//! # environment variables override the file
//! APP_PORT=8080 DB_HOST=db.internal cargo run --package confkit-demo -- with-env
//!
//! # no file at all
//! APP_NAME=ephemeral cargo run --package confkit-demo -- env-only
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confkit::logging::{self, LoggingBuilder, LoggingConfig};
use confkit::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{Level, info};

// ============================================================================
// Configuration record
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, EnvOverlay)]
struct Database {
    #[env("DB_HOST")]
    host: String,
    #[env("DB_PORT")]
    port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, EnvOverlay)]
struct Tls {
    #[env("TLS_CERT")]
    cert: String,
    #[env("TLS_KEY")]
    key: String,
}

impl Default for Tls {
    fn default() -> Self {
        Self {
            cert: "cert.pem".to_string(),
            key: "key.pem".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, EnvOverlay)]
#[serde(rename = "config")]
struct Config {
    #[env("APP_SECRET")]
    secret: String,
    #[env("APP_NAME")]
    name: String,
    #[env("APP_PORT")]
    port: u16,
    #[env("APP_DEBUG")]
    debug: bool,
    database: Database,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls: Option<Tls>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret: String::new(),
            name: "Default name".to_string(),
            port: 3000,
            debug: false,
            database: Database {
                host: "localhost".to_string(),
                port: 5432,
            },
            tls: None,
        }
    }
}

// ============================================================================
// Command line
// ============================================================================

#[derive(Parser)]
#[command(name = "confkit-demo", about = "Walk through the confkit workflows")]
struct Cli {
    /// Configuration file; defaults to the codec's file name.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Logging options file (any supported format), created if missing.
    #[arg(long, global = true)]
    log_config: Option<PathBuf>,

    /// Log file operations at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load compact JSON, creating the file with defaults.
    Simple,
    /// Load indented JSON.
    Indented,
    /// Load YAML.
    Yaml,
    /// Load indented XML.
    Xml,
    /// Load, change the name, and save.
    Save {
        #[arg(default_value = "Updated name")]
        name: String,
    },
    /// Delete the configuration file.
    Delete,
    /// Load, then apply environment overrides.
    WithEnv,
    /// Apply environment overrides to the defaults, without any file.
    EnvOnly,
    /// Load with environment overrides; exit after creating the file.
    LoadOrExit {
        /// Exit code used after the file is created.
        #[arg(long, default_value_t = 0)]
        code: i32,
    },
}

fn init_logging(cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.log_config {
        let mut config = LoggingConfig::default();
        Store::open(path)?
            .load(&mut config)
            .with_context(|| format!("loading logging options from {}", path.display()))?;
        logging::init_from_config(&config);
    } else {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        LoggingBuilder::new().with_level(level).init();
    }
    Ok(())
}

fn kit<C: Codec>(codec: C, file: Option<&PathBuf>) -> ConfKit<C> {
    let kit = ConfKit::with_codec(codec);
    match file {
        Some(path) => kit.file(path),
        None => kit,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let file = cli.file.as_ref();
    let mut config = Config::default();

    match cli.command {
        Command::Simple => {
            kit(JsonCodec::new(), file).load(&mut config)?;
        }
        Command::Indented => {
            kit(JsonCodec::new().with_indent(), file).load(&mut config)?;
        }
        Command::Yaml => {
            kit(YamlCodec, file).load(&mut config)?;
        }
        Command::Xml => {
            kit(XmlCodec::new().with_indent(), file).load(&mut config)?;
        }
        Command::Save { name } => {
            let kit = kit(JsonCodec::new().with_indent(), file);
            kit.load(&mut config)?;
            config.name = name;
            kit.save(&config)?;
            info!(path = %kit.store().path().display(), "configuration saved");
        }
        Command::Delete => {
            let kit = kit(JsonCodec::new(), file);
            kit.delete()
                .with_context(|| format!("deleting {}", kit.store().path().display()))?;
            info!(path = %kit.store().path().display(), "configuration deleted");
            return Ok(());
        }
        Command::WithEnv => {
            kit(JsonCodec::new().with_indent(), file).load_with_env(&mut config)?;
        }
        Command::EnvOnly => {
            load_from_env(&mut config)?;
        }
        Command::LoadOrExit { code } => {
            kit(JsonCodec::new().with_indent(), file)
                .exit_code(code)
                .load_or_exit_with_env(&mut config)?;
        }
    }

    println!("{config:#?}");
    Ok(())
}
