pub mod config;
pub mod errors;
pub mod history;
pub mod logging;
pub mod message;
pub mod prompt;
pub mod providers;
pub mod repl;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use config::Config;
use prompt::PromptStore;
use repl::run_repl;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config_file = config::config_path();
    let cfg = Config::load(&config_file)?;
    info!(path = %config_file.display(), model = %cfg.deepseek.model, "configuration loaded");

    let prompt = PromptStore::load(&cfg.app.system_prompt_file)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.deepseek.timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;

    run_repl(&client, &cfg, prompt).await
}
