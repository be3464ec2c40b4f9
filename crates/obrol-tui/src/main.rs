//! Obrol TUI entry point.
//!
//! # Usage
//!
//! ```bash
//! obrol-tui --url wss://chat.example.com/ws --token SECRET \
//!     --user-id u42 --role worker --api-base https://api.example.com
//! ```
//!
//! All flags can also come from `OBROL_*` environment variables.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use obrol_directory::Role;
use obrol_tui::{Runtime, RuntimeConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Marketplace role for CLI parsing.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    /// Directory shows recent counterparts only.
    Worker,
    /// Directory shows the full worker roster.
    Farmer,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Worker => Role::Worker,
            RoleArg::Farmer => Role::Farmer,
        }
    }
}

/// Obrol terminal chat client
#[derive(Parser, Debug)]
#[command(name = "obrol-tui")]
#[command(about = "Terminal UI for the Obrol marketplace chat")]
#[command(version)]
struct Args {
    /// WebSocket endpoint URL
    #[arg(long, env = "OBROL_URL")]
    url: String,

    /// Authentication token
    #[arg(long, env = "OBROL_TOKEN")]
    token: String,

    /// Local user id
    #[arg(long, env = "OBROL_USER_ID")]
    user_id: String,

    /// Marketplace role
    #[arg(long, env = "OBROL_ROLE", value_enum)]
    role: RoleArg,

    /// REST API base URL for roster lookups
    #[arg(long, env = "OBROL_API_BASE")]
    api_base: String,

    /// Path of the recent-contacts file
    #[arg(long, env = "OBROL_STORE_PATH", default_value = "obrol-recents.json")]
    store_path: PathBuf,

    /// Log file (stderr would corrupt the terminal UI)
    #[arg(long, env = "OBROL_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = std::sync::Arc::new(std::fs::File::create(path)?);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(file).with_ansi(false))
            .with(filter)
            .init();
    }

    let runtime = Runtime::new(RuntimeConfig {
        url: args.url,
        token: args.token,
        user_id: args.user_id,
        role: args.role.into(),
        api_base: args.api_base,
        store_path: args.store_path,
    })?;

    Ok(runtime.run().await?)
}
