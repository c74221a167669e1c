use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration failures. All of these are fatal: the process
/// prints the diagnostic and exits before entering the loop.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file '{path}' not found (copy config.json.example and set your API key)")]
    Missing { path: PathBuf },

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}' is malformed or missing a required field: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("deepseek.api_key is not set; put your real API key in the config file")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("failed to read system prompt file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("system prompt file '{path}' is empty")]
    Empty { path: PathBuf },
}

/// Failures of a single completion request. Recoverable: the loop prints
/// the message and keeps accepting input, history untouched.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication failed (HTTP 401); check deepseek.api_key in the config file")]
    Auth,

    #[error("rate limit exceeded (HTTP 429); wait a moment and try again")]
    RateLimit,

    #[error("API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(
        "request timed out after {timeout_secs}s while calling '{api_url}'; \
         increase deepseek.timeout_secs or check model responsiveness"
    )]
    Timeout { api_url: String, timeout_secs: u64 },

    #[error(
        "connection refused by API at '{api_url}'; \
         check deepseek.base_url and that the endpoint is reachable"
    )]
    ConnectionRefused { api_url: String },

    #[error("failed to reach API at '{api_url}': {source}")]
    Network {
        api_url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API response was malformed: {0}")]
    Malformed(String),
}
