use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::Method;

use apivideo_transport::config::{self, Command, Config};
use apivideo_transport::{ApiHttpClient, FileSource, RequestOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(base_uri = %config.client.base_uri, "Configuration loaded");
    if config.client.api_key.is_none() {
        tracing::warn!("No API key configured; requests without an explicit Authorization header will fail");
    }

    let client = ApiHttpClient::new(config.client.clone()).context("Failed to create HTTP client")?;

    let response = match config.command {
        Command::Call {
            path,
            method,
            query,
            data,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {}", method))?;
            let mut options = RequestOptions::new().method(method);
            for pair in &query {
                let (key, value) = config::parse_key_value(pair)?;
                options = options.query(key, value);
            }
            if let Some(data) = data {
                let body: serde_json::Value =
                    serde_json::from_str(&data).context("--data is not valid JSON")?;
                options = options.json(body);
            }
            client.call(&path, options).await?
        }
        Command::Upload { path, file, field } => {
            let source = FileSource::Path(config::expand_tilde(&file));
            // the field name doubles as the file name of the part
            client.submit(&path, source, &field, HeaderMap::new()).await?
        }
        Command::UploadMultipart { path, file, fields } => {
            let fields = fields
                .iter()
                .map(|f| config::parse_key_value(f))
                .collect::<Result<Vec<_>>>()?;
            client
                .submit_multipart(&path, config::expand_tilde(&file), fields, HeaderMap::new())
                .await?
        }
    };

    let status = response.status();
    let successful = ApiHttpClient::is_successful(&response);
    let body = response.text().await.context("Failed to read response body")?;

    eprintln!("HTTP {}", status);
    println!("{}", body);

    if !successful {
        anyhow::bail!("Request finished with status {}", status);
    }

    Ok(())
}
