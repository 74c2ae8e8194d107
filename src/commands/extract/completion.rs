use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ModelSettings;

#[derive(Debug, Error)]
pub(super) enum CompletionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl CompletionError {
    pub(super) fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Config(_) | Self::Parse(_) => false,
        }
    }
}

pub(super) trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

pub(super) struct OpenAiCompletion {
    http_client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl OpenAiCompletion {
    pub(super) fn new(settings: &ModelSettings) -> Result<Self, CompletionError> {
        let http_client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| CompletionError::Config(error.to_string()))?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            model_id: settings.model_id.clone(),
        })
    }
}

impl CompletionClient for OpenAiCompletion {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model_id,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, body));
        }
        let content = completion_content(&body)?;

        debug!(
            model = %self.model_id,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        Ok(content)
    }
}

fn transport_error(error: reqwest::Error) -> CompletionError {
    if error.is_timeout() {
        CompletionError::Timeout(error.to_string())
    } else {
        CompletionError::Network(error.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> CompletionError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CompletionError::RateLimited(body)
    } else {
        CompletionError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

// First choice wins; a null content is an empty completion.
fn completion_content(body: &str) -> Result<String, CompletionError> {
    let chat_response: ChatResponse =
        serde_json::from_str(body).map_err(|error| CompletionError::Parse(error.to_string()))?;

    chat_response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| CompletionError::Parse("response contained no choices".to_string()))
}

pub(super) struct RetryingCompletion<C> {
    inner: C,
    max_retries: u32,
    backoff: Duration,
}

impl<C: CompletionClient> RetryingCompletion<C> {
    pub(super) fn new(inner: C, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }
}

impl<C: CompletionClient> CompletionClient for RetryingCompletion<C> {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(prompt) {
                Ok(content) => return Ok(content),
                Err(error) if error.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        error = %error,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        "transient completion failure; retrying"
                    );
                    thread::sleep(delay);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::Mutex;

    use super::*;

    struct FlakyCompletion {
        failures: Mutex<Vec<CompletionError>>,
        calls: Mutex<u32>,
    }

    impl FlakyCompletion {
        fn new(failures: Vec<CompletionError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("calls lock")
        }
    }

    impl CompletionClient for &FlakyCompletion {
        fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            *self.calls.lock().expect("calls lock") += 1;
            let mut failures = self.failures.lock().expect("failures lock");
            if failures.is_empty() {
                Ok("[]".to_string())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    #[test]
    fn transient_classification() {
        assert!(CompletionError::Network("reset".into()).is_transient());
        assert!(CompletionError::Timeout("slow".into()).is_transient());
        assert!(CompletionError::RateLimited("429".into()).is_transient());
        assert!(
            CompletionError::Api {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !CompletionError::Api {
                status: 401,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!CompletionError::Parse("bad".into()).is_transient());
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let flaky = FlakyCompletion::new(vec![
            CompletionError::RateLimited("slow down".into()),
            CompletionError::Network("reset".into()),
        ]);
        let client = RetryingCompletion::new(&flaky, 2, Duration::ZERO);

        assert_eq!(client.complete("prompt").expect("should recover"), "[]");
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let flaky = FlakyCompletion::new(vec![
            CompletionError::Network("a".into()),
            CompletionError::Network("b".into()),
            CompletionError::Network("c".into()),
        ]);
        let client = RetryingCompletion::new(&flaky, 1, Duration::ZERO);

        assert!(matches!(
            client.complete("prompt"),
            Err(CompletionError::Network(_))
        ));
        assert_eq!(flaky.calls(), 2);
    }

    #[test]
    fn does_not_retry_permanent_errors() {
        let flaky = FlakyCompletion::new(vec![CompletionError::Api {
            status: 401,
            body: "bad key".into(),
        }]);
        let client = RetryingCompletion::new(&flaky, 3, Duration::ZERO);

        assert!(client.complete("prompt").is_err());
        assert_eq!(flaky.calls(), 1);
    }

    #[test]
    fn rate_limit_status_is_its_own_error() {
        let error = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(error, CompletionError::RateLimited(ref body) if body == "slow down"));
        assert!(error.is_transient());
    }

    #[test]
    fn other_failing_statuses_keep_code_and_body() {
        let unavailable = status_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded".to_string());
        assert!(matches!(
            unavailable,
            CompletionError::Api { status: 503, ref body } if body == "overloaded"
        ));
        assert!(unavailable.is_transient());

        let unauthorized = status_error(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(unauthorized, CompletionError::Api { status: 401, .. }));
        assert!(!unauthorized.is_transient());
    }

    #[test]
    fn reads_first_choice_content() {
        let body = r#"{"choices":[{"message":{"content":"[]"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(completion_content(body).expect("content"), "[]");
    }

    #[test]
    fn null_content_is_an_empty_completion() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(completion_content(body).expect("content"), "");
    }

    #[test]
    fn missing_choices_or_bad_json_is_a_parse_error() {
        assert!(matches!(
            completion_content(r#"{"choices":[]}"#),
            Err(CompletionError::Parse(_))
        ));
        assert!(matches!(
            completion_content("<html>gateway</html>"),
            Err(CompletionError::Parse(_))
        ));
    }

    #[test]
    fn slow_server_is_reported_as_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let address = listener.local_addr().expect("listener address");
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buffer = [0u8; 1024];
                let _ = stream.read(&mut buffer);
                std::thread::sleep(Duration::from_millis(1500));
            }
        });

        let settings = ModelSettings {
            api_key: "test-key".to_string(),
            base_url: format!("http://{address}/v1"),
            model_id: "test-model".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 0,
            retry_backoff: Duration::ZERO,
        };
        let client = OpenAiCompletion::new(&settings).expect("client should build");

        let result = client.complete("prompt");
        assert!(matches!(result, Err(CompletionError::Timeout(_))), "{result:?}");
        server.join().expect("server thread");
    }
}
