//! Chat completion client for the enrichment step.
//!
//! [`CompletionClient`] is the seam the enrichment code talks to: one request
//! in, the first choice's text out. [`HttpCompletionClient`] implements it
//! against any OpenAI-compatible `/chat/completions` endpoint (Perplexity by
//! default). Every failure here is a transport/API failure and is returned as
//! an error; interpreting the returned text is the caller's job.

mod protocol;

use std::time::{Duration, Instant};

use compenrich_shared::{CompenrichError, Result};
use reqwest::{Client, header};
use tracing::{debug, instrument};
use url::Url;

pub use protocol::{ChatMessage, CompletionRequest, Role};

use protocol::CompletionResponse;

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("compenrich/", env!("CARGO_PKG_VERSION"));

/// Hosts allowed to use plain HTTP (mock servers, local gateways).
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Longest error body we keep from a failed response.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// CompletionClient
// ---------------------------------------------------------------------------

/// Sends a single chat completion request and returns the reply text.
pub trait CompletionClient {
    /// Exactly one request per call. No retries.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpCompletionClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API base URL, e.g. `https://api.perplexity.ai`.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// `reqwest`-backed client for OpenAI-compatible chat completions.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    endpoint: Url,
    http: Client,
}

impl HttpCompletionClient {
    /// Build a client once per run. The credential is baked into the default
    /// headers and never logged.
    pub fn new(opts: &ClientOptions) -> Result<Self> {
        let base = validate_base_url(&opts.base_url)?;
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|e| CompenrichError::config(format!("invalid completion endpoint: {e}")))?;

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", opts.api_key))
            .map_err(|_| CompenrichError::config("API key contains invalid header characters"))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| CompenrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoint, http })
    }

    /// The resolved `/chat/completions` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl CompletionClient for HttpCompletionClient {
    #[instrument(skip_all, fields(model = %request.model, endpoint = %self.endpoint))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| CompenrichError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompenrichError::Api {
                status: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let envelope: CompletionResponse = response.json().await.map_err(|e| {
            CompenrichError::Completion(format!("unreadable response envelope: {e}"))
        })?;

        let content = envelope.into_first_content().ok_or_else(|| {
            CompenrichError::Completion("response has no choices[0].message.content".into())
        })?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_bytes = content.len(),
            "completion received"
        );

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the base URL; non-local hosts must use HTTPS.
fn validate_base_url(base: &str) -> Result<Url> {
    let url = Url::parse(base)
        .map_err(|e| CompenrichError::config(format!("invalid base URL '{base}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| CompenrichError::config(format!("base URL has no host: {base}")))?;

    let is_local = LOCALHOST_DOMAINS
        .iter()
        .any(|allowed| host.eq_ignore_ascii_case(allowed));

    if !is_local && url.scheme() != "https" {
        return Err(CompenrichError::config(format!(
            "base URL must use https for non-localhost hosts; got '{}://'",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Cut a string to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
