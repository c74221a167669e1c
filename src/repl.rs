use anyhow::{Context, Result};
use reqwest::Client;
use std::io::{self, Write};
use tracing::info;

use crate::config::Config;
use crate::errors::ApiError;
use crate::history::{ConversationHistory, HistoryStats};
use crate::message::Message;
use crate::prompt::PromptStore;
use crate::providers::deepseek::{self, Completion};

const PROMPT_PREVIEW_LEN: usize = 100;

/// Built-in commands, matched case-sensitively against the exact input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    History,
    Reload,
    Quit,
}

pub fn parse_command(input: &str) -> Option<Command> {
    match input {
        "help" => Some(Command::Help),
        "clear" => Some(Command::Clear),
        "history" => Some(Command::History),
        "reload" => Some(Command::Reload),
        "quit" | "exit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

pub async fn run_repl(client: &Client, cfg: &Config, mut prompt: PromptStore) -> Result<()> {
    let mut history = ConversationHistory::new(cfg.app.max_history);

    print_banner(cfg, prompt.text());

    loop {
        print!("you> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(Command::Quit) => break,
            Some(Command::Help) => print_help(),
            Some(Command::Clear) => {
                history.clear();
                println!("conversation history cleared\n");
            }
            Some(Command::History) => {
                println!("{}", render_stats(&history.stats()));
            }
            Some(Command::Reload) => match prompt.reload() {
                Ok(()) => println!("system prompt reloaded from '{}'\n", prompt.path().display()),
                Err(err) => println!("reload failed, previous prompt kept: {err}\n"),
            },
            None => match chat_turn(client, cfg, prompt.text(), &mut history, line).await {
                Ok(completion) => {
                    println!("assistant> {}", completion.text.trim());
                    println!("{}\n", render_info_line(&completion));
                }
                Err(err) => println!("error: {err}\n"),
            },
        }
    }

    println!("bye");
    Ok(())
}

/// One user turn. The user message is only committed to history together
/// with the assistant reply, so a failed request leaves history exactly
/// as it was.
async fn chat_turn(
    client: &Client,
    cfg: &Config,
    system_prompt: &str,
    history: &mut ConversationHistory,
    user_input: &str,
) -> Result<Completion, ApiError> {
    let mut request_messages = history.snapshot().to_vec();
    request_messages.push(Message::user(user_input));

    let completion =
        deepseek::complete(client, &cfg.deepseek, system_prompt, &request_messages).await?;
    info!(
        latency_ms = completion.latency.as_millis() as u64,
        "turn completed"
    );

    history.append(Message::user(user_input));
    history.append(Message::assistant(completion.text.clone()));
    Ok(completion)
}

fn prompt_preview(text: &str) -> String {
    if text.chars().count() > PROMPT_PREVIEW_LEN {
        let head: String = text.chars().take(PROMPT_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn print_banner(cfg: &Config, prompt_text: &str) {
    println!("dschat - DeepSeek terminal chat");
    println!("model: {}", cfg.deepseek.model);
    println!("temperature: {}", cfg.deepseek.temperature);
    println!("max tokens: {}", cfg.deepseek.max_tokens);
    println!("system prompt: {}", prompt_preview(prompt_text));
    println!("type a message, or one of: help, clear, history, reload, quit\n");
}

fn print_help() {
    println!("commands:");
    println!("  help     show this help");
    println!("  clear    clear conversation history");
    println!("  history  show conversation statistics");
    println!("  reload   re-read the system prompt file");
    println!("  quit     exit (also: exit, q)\n");
}

fn render_stats(stats: &HistoryStats) -> String {
    format!(
        "messages: {} total ({} user, {} assistant, {} system), cap {}\n",
        stats.total, stats.user, stats.assistant, stats.system, stats.max_history
    )
}

fn render_info_line(completion: &Completion) -> String {
    let secs = completion.latency.as_secs_f64();
    match completion.usage {
        Some(usage) => format!(
            "[{secs:.2}s | prompt {} | completion {} | total {} tokens]",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        ),
        None => format!("[{secs:.2}s]"),
    }
}
