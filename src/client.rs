use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::accumulating_stream::AccumulatingStream;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::event_stream::process_event_stream;
use crate::observability::{
    CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, STREAM_BYTES,
};
use crate::types::{ConverseStreamEvent, ConverseStreamRequest};

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Coarse connect-and-read timeout for every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// A boxed stream of Converse Stream events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ConverseStreamEvent>> + Send>>;

/// Anything that can answer a Converse Stream request.
#[async_trait]
pub trait ConverseProvider: Send + Sync {
    /// Send the request and return the event stream.
    ///
    /// Errors returned here happened before any event arrived; errors inside
    /// the stream happened after.
    async fn converse_stream(&self, request: &ConverseStreamRequest) -> Result<EventStream>;
}

/// Anything that can run a single non-streaming model invocation.
#[async_trait]
pub trait InvokeModel: Send + Sync {
    /// Invoke `model_id` with a model-specific JSON body.
    async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value>;
}

/// Client for the Bedrock runtime API.
#[derive(Clone)]
pub struct BedrockRuntime {
    token: String,
    client: ReqwestClient,
    base_url: Url,
    region: String,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for BedrockRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BedrockRuntime")
            .field("base_url", &self.base_url.as_str())
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl BedrockRuntime {
    /// Create a new client for `region`.
    ///
    /// The token can be provided directly or read from the
    /// AWS_BEARER_TOKEN_BEDROCK environment variable.
    pub fn new(region: impl Into<String>, token: Option<String>) -> Result<Self> {
        Self::with_options(token, Some(region.into()), None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        token: Option<String>,
        region: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let token = match token {
            Some(token) => token,
            None => env::var(TOKEN_ENV_VAR).map_err(|_| {
                Error::authentication(format!(
                    "bearer token not provided and {TOKEN_ENV_VAR} environment variable not set"
                ))
            })?,
        };

        let region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        let base_url = match base_url {
            Some(base_url) => base_url,
            None => format!("https://bedrock-runtime.{region}.amazonaws.com/"),
        };
        let base_url = Url::parse(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            token,
            client,
            base_url,
            region,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes requests and stream events.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The configured region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::authentication("bearer token contains invalid characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn model_url(&self, model_id: &str, operation: &str) -> Result<Url> {
        let model_id: String = url::form_urlencoded::byte_serialize(model_id.as_bytes()).collect();
        Ok(self.base_url.join(&format!("model/{model_id}/{operation}"))?)
    }

    async fn post(&self, url: Url, headers: HeaderMap, body: &impl serde::Serialize) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            });
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = result.inspect_err(|_| CLIENT_REQUEST_ERRORS.click())?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(error = %err, "provider rejected request");
            return Err(err);
        }
        Ok(response)
    }

    /// Process an error response and convert it to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|val| val.to_str().ok())
                .map(String::from)
        };
        let error_type = header("x-amzn-ErrorType");
        let request_id = header("x-amzn-RequestId");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        provider_error(status_code, error_type.as_deref(), request_id, &body)
    }

    /// Send a Converse Stream request.
    pub async fn converse_stream(&self, request: &ConverseStreamRequest) -> Result<EventStream> {
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }
        tracing::debug!(
            model_id = %request.model_id,
            messages = request.messages.len(),
            "sending converse-stream request"
        );

        let url = self.model_url(&request.model_id, "converse-stream")?;
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
        );
        let response = self.post(url, headers, request).await?;

        let bytes = response.bytes_stream().inspect(|chunk| {
            if let Ok(chunk) = chunk {
                STREAM_BYTES.count(chunk.len() as u64);
            }
        });
        let events = process_event_stream(bytes);

        match &self.logger {
            Some(logger) => {
                let event_logger = Arc::clone(logger);
                let events = events.inspect(move |event| {
                    if let Ok(event) = event {
                        event_logger.log_stream_event(event);
                    }
                });
                let (stream, rx) = AccumulatingStream::new(events);
                let logger = Arc::clone(logger);
                tokio::spawn(async move {
                    if let Ok(Ok(state)) = rx.await {
                        logger.log_stream_state(&state);
                    }
                });
                Ok(Box::pin(stream))
            }
            None => Ok(Box::pin(events)),
        }
    }

    /// Invoke a model with a JSON body and return its JSON response.
    pub async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value> {
        tracing::debug!(model_id, "invoking model");
        let url = self.model_url(model_id, "invoke")?;
        let headers = self.default_headers()?;
        let response = self.post(url, headers, &body).await?;
        response.json::<Value>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait]
impl ConverseProvider for BedrockRuntime {
    async fn converse_stream(&self, request: &ConverseStreamRequest) -> Result<EventStream> {
        BedrockRuntime::converse_stream(self, request).await
    }
}

#[async_trait]
impl InvokeModel for BedrockRuntime {
    async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value> {
        BedrockRuntime::invoke_model(self, model_id, body).await
    }
}

/// Classify an HTTP error response from the provider.
///
/// The code comes from the `x-amzn-ErrorType` header (up to the first `:`),
/// then the body's `__type` (after any `#` namespace), then the status code.
pub fn provider_error(
    status_code: u16,
    error_type: Option<&str>,
    request_id: Option<String>,
    body: &str,
) -> Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(rename = "__type")]
        error_type: Option<String>,
        #[serde(alias = "Message")]
        message: Option<String>,
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = error_type
        .and_then(|t| t.split(':').next())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|p| p.error_type.as_deref())
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        })
        .unwrap_or_else(|| fallback_code(status_code).to_string());
    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status_code}")
            } else {
                body.to_string()
            }
        });
    Error::provider(code, message, Some(status_code), request_id)
}

fn fallback_code(status_code: u16) -> &'static str {
    match status_code {
        400 => "ValidationException",
        401 | 403 => "AccessDeniedException",
        404 => "ResourceNotFoundException",
        408 => "ModelTimeoutException",
        424 => "ModelErrorException",
        429 => "ThrottlingException",
        503 => "ServiceUnavailableException",
        500..=599 => "InternalServerException",
        _ => "UnknownError",
    }
}
