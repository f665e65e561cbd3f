use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;

/// Production API base URI
pub const PRODUCTION_BASE_URI: &str = "https://ws.api.video";

/// Sandbox API base URI
pub const SANDBOX_BASE_URI: &str = "https://sandbox.api.video";

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("api.video SDK (rust; v:", env!("CARGO_PKG_VERSION"), ")");

/// `Accept` sent with every request
pub const ACCEPT: &str = "application/json, */*;q=0.8";

/// Target environment of a client
#[derive(Clone, Debug, PartialEq)]
pub enum Environment {
    Production,
    Sandbox,
    Custom(String),
}

impl Environment {
    pub fn base_uri(&self) -> &str {
        match self {
            Environment::Production => PRODUCTION_BASE_URI,
            Environment::Sandbox => SANDBOX_BASE_URI,
            Environment::Custom(uri) => uri,
        }
    }
}

/// Settings of one client instance, fixed once the client is built
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_uri: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, environment: Environment) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_uri: environment.base_uri().to_string(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ApiError> {
        let base = self.base_uri.trim();
        if base.is_empty() {
            return Err(ApiError::ConfigError("base URI must not be empty".to_string()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ApiError::ConfigError(format!(
                "base URI must start with http:// or https://: {}",
                base
            )));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(ApiError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_uri: PRODUCTION_BASE_URI.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// api.video transport - command line driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// API key exchanged for access tokens
    #[arg(short = 'k', long, env = "API_VIDEO_KEY")]
    pub api_key: Option<String>,

    /// Base URI of the API (overrides --sandbox)
    #[arg(short = 'b', long, env = "API_VIDEO_BASE_URI")]
    pub base_uri: Option<String>,

    /// Use the sandbox environment
    #[arg(long, env = "API_VIDEO_SANDBOX")]
    pub sandbox: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "300")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Send a request to an API path
    Call {
        path: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Upload a file as a single multipart field
    Upload {
        path: String,
        file: String,

        /// Multipart field name
        #[arg(long, default_value = "file")]
        field: String,
    },

    /// Upload a file with additional form fields
    UploadMultipart {
        path: String,
        file: String,

        /// Form field as key=value (repeatable, order preserved)
        #[arg(short = 'F', long = "field")]
        fields: Vec<String>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub client: ClientConfig,
    pub log_level: String,
    pub command: Command,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Self::from_args(CliArgs::parse()))
    }

    pub fn from_args(args: CliArgs) -> Self {
        let environment = match args.base_uri {
            Some(uri) => Environment::Custom(uri),
            None if args.sandbox => Environment::Sandbox,
            None => Environment::Production,
        };

        Config {
            client: ClientConfig {
                api_key: args.api_key.filter(|k| !k.is_empty()),
                base_uri: environment.base_uri().to_string(),
                connect_timeout: Duration::from_secs(args.connect_timeout),
                request_timeout: Duration::from_secs(args.http_timeout),
                user_agent: USER_AGENT.to_string(),
            },
            log_level: args.log_level,
            command: args.command,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.client.validate().context("Invalid client configuration")?;
        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Split a `key=value` argument; the value may itself contain `=`
pub fn parse_key_value(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .with_context(|| format!("expected key=value, got: {}", s))?;
    if key.is_empty() {
        anyhow::bail!("empty key in: {}", s);
    }
    Ok((key.to_string(), value.to_string()))
}
