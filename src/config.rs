use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub base_url: String,
    pub env: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Local emulator for blob storage")]
pub struct Args {
    /// Host to bind to (overrides BLOB_LOCAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BLOB_LOCAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding blob content and the metadata index (overrides BLOB_LOCAL_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Base of every public URL (overrides BLOB_LOCAL_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Runtime mode; `dev` turns on verbose logging (overrides BLOB_LOCAL_ENV)
    #[arg(long)]
    pub env: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("BLOB_LOCAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("BLOB_LOCAL_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing BLOB_LOCAL_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3001,
            Err(err) => return Err(err).context("reading BLOB_LOCAL_PORT"),
        };
        let env_data_dir = env::var_os("BLOB_LOCAL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("blob_fs"));
        let env_base_url = env::var("BLOB_LOCAL_BASE_URL").ok();
        let env_mode = env::var("BLOB_LOCAL_ENV").unwrap_or_else(|_| "dev".into());

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let base_url = args
            .base_url
            .or(env_base_url)
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port,
            data_dir: args.data_dir.unwrap_or(env_data_dir),
            base_url,
            env: args.env.unwrap_or(env_mode),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }

    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join("content")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
