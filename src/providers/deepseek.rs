use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::DeepSeekConfig;
use crate::errors::ApiError;
use crate::message::Message;
use crate::providers::http_errors::classify_request_error;

const ERROR_BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Error payload shape returned by the API on non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// One completed request: the assistant's reply plus usage metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
    pub latency: Duration,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Assembles the wire message list: the system prompt (when non-empty)
/// followed by the history snapshot in order.
fn assemble_messages<'a>(system_prompt: &'a Message, history: &'a [Message]) -> Vec<&'a Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !system_prompt.content.trim().is_empty() {
        messages.push(system_prompt);
    }
    messages.extend(history.iter());
    messages
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Auth,
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit,
        _ => {
            // Prefer the API's own error message over the raw body.
            let detail = serde_json::from_str::<ApiErrorBody>(body)
                .map(|parsed| parsed.error.message)
                .unwrap_or_else(|_| {
                    body.chars().take(ERROR_BODY_EXCERPT_LEN).collect()
                });
            ApiError::Status {
                status,
                body: detail,
            }
        }
    }
}

fn extract_completion(
    parsed: ChatCompletionResponse,
    latency: Duration,
) -> Result<Completion, ApiError> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Malformed("response contained no choices".to_string()))?;
    Ok(Completion {
        text: choice.message.content,
        usage: parsed.usage,
        latency,
    })
}

/// Performs one blocking (from the loop's point of view) chat completion
/// request. No retries: any failure is reported to the caller as-is.
pub async fn complete(
    client: &Client,
    cfg: &DeepSeekConfig,
    system_prompt: &str,
    history: &[Message],
) -> Result<Completion, ApiError> {
    let api_url = completions_url(&cfg.base_url);
    let system_message = Message::system(system_prompt);
    let body = ChatCompletionRequest {
        model: &cfg.model,
        messages: assemble_messages(&system_message, history),
        max_tokens: cfg.max_tokens,
        temperature: cfg.temperature,
        stream: false,
    };
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        message_count = body.messages.len(),
        "sending chat completion request"
    );

    let started = Instant::now();
    let response = client
        .post(&api_url)
        .bearer_auth(&cfg.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(api_url = %api_url, model = %cfg.model, error = %err, "request failed");
            classify_request_error(err, &api_url, cfg.timeout_secs)
        })?;

    let status = response.status();
    if !status.is_success() {
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            model = %cfg.model,
            status = %status,
            response_body_len = response_body.len(),
            "API returned non-success status"
        );
        return Err(status_error(status, &response_body));
    }

    let parsed: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|err| ApiError::Malformed(err.to_string()))?;
    let latency = started.elapsed();
    debug!(
        model = %cfg.model,
        latency_ms = latency.as_millis() as u64,
        "received chat completion response"
    );
    extract_completion(parsed, latency)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::{
        ChatCompletionResponse, Completion, Usage, assemble_messages, complete, completions_url,
        extract_completion, status_error,
    };
    use crate::config::DeepSeekConfig;
    use crate::errors::ApiError;
    use crate::message::Message;

    fn test_cfg(base_url: String) -> DeepSeekConfig {
        DeepSeekConfig {
            api_key: "sk-test".to_string(),
            base_url,
            model: "deepseek-chat".to_string(),
            max_tokens: 100,
            temperature: 0.7,
            timeout_secs: 2,
        }
    }

    /// Serves exactly one canned HTTP response on a local port.
    fn one_shot_server(status_line: &str, body: &str) -> (std::net::SocketAddr, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept should succeed");
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            stream
                .write_all(response.as_bytes())
                .expect("write should succeed");
        });
        (addr, handle)
    }

    #[test]
    fn completions_url_trims_trailing_slash() {
        assert_eq!(
            completions_url("https://api.deepseek.com/v1/"),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn assemble_prepends_system_prompt() {
        let system = Message::system("be brief");
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let messages = assemble_messages(&system, &history);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role.as_str(), "system");
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].content, "hello");
    }

    #[test]
    fn assemble_skips_blank_system_prompt() {
        let system = Message::system("   ");
        let history = vec![Message::user("hi")];
        let messages = assemble_messages(&system, &history);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role.as_str(), "user");
    }

    #[test]
    fn status_error_maps_auth_and_rate_limit() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, "{}"),
            ApiError::Auth
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "{}"),
            ApiError::RateLimit
        ));
    }

    #[test]
    fn status_error_extracts_api_message() {
        let err = status_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"temperature out of range","type":"invalid_request_error"}}"#,
        );
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(body, "temperature out of range");
            }
            other => panic!("unexpected classification: {other}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_body_excerpt() {
        let err = status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "gateway blew up");
        match err {
            ApiError::Status { body, .. } => assert_eq!(body, "gateway blew up"),
            other => panic!("unexpected classification: {other}"),
        }
    }

    #[test]
    fn extract_completion_reads_text_and_usage() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": "hello there"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            }"#,
        )
        .expect("response should parse");

        let completion: Completion =
            extract_completion(parsed, Duration::from_millis(5)).expect("should extract");
        assert_eq!(completion.text, "hello there");
        assert_eq!(
            completion.usage,
            Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 4,
                total_tokens: 16,
            })
        );
    }

    #[test]
    fn extract_completion_rejects_empty_choices() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [], "usage": null}"#)
                .expect("response should parse");
        let err = extract_completion(parsed, Duration::ZERO).expect_err("should be malformed");
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn complete_returns_reply_from_successful_response() {
        let (addr, server) = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"pong"}}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#,
        );
        let cfg = test_cfg(format!("http://{addr}"));
        let client = reqwest::Client::new();

        let completion = complete(&client, &cfg, "be brief", &[Message::user("ping")])
            .await
            .expect("completion should succeed");

        assert_eq!(completion.text, "pong");
        assert_eq!(completion.usage.expect("usage present").total_tokens, 4);
        server.join().expect("server thread should join");
    }

    #[tokio::test]
    async fn complete_maps_unauthorized_to_auth_error() {
        let (addr, server) = one_shot_server(
            "HTTP/1.1 401 Unauthorized",
            r#"{"error":{"message":"invalid api key","type":"authentication_error"}}"#,
        );
        let cfg = test_cfg(format!("http://{addr}"));
        let client = reqwest::Client::new();

        let err = complete(&client, &cfg, "", &[Message::user("ping")])
            .await
            .expect_err("completion should fail");

        assert!(matches!(err, ApiError::Auth), "unexpected error: {err}");
        server.join().expect("server thread should join");
    }

    #[tokio::test]
    async fn complete_rejects_undecodable_success_body() {
        let (addr, server) = one_shot_server("HTTP/1.1 200 OK", "not json at all");
        let cfg = test_cfg(format!("http://{addr}"));
        let client = reqwest::Client::new();

        let err = complete(&client, &cfg, "", &[Message::user("ping")])
            .await
            .expect_err("completion should fail");

        assert!(
            matches!(err, ApiError::Malformed(_)),
            "unexpected error: {err}"
        );
        server.join().expect("server thread should join");
    }
}
