//! Commentary providers.
//!
//! A [`CommentaryProvider`] turns one entry into a commentary fragment. Two
//! implementations exist:
//!
//! - [`LocalProvider`]: the deterministic engine in [`crate::commentary`].
//!   Never fails.
//! - [`RemoteProvider`]: a language-generation HTTP API (OpenAI Responses
//!   wire format). One blocking request per entry, bounded by the configured
//!   timeout, no retries.
//!
//! The orchestrator never talks to either directly. It holds a
//! [`FallbackProvider`], chosen once from the configuration, which tries the
//! remote provider when one is available and falls back to the local engine on
//! any error. A remote failure therefore never reaches the caller; it is
//! reported back as a warning next to the fragment.

use crate::commentary;
use crate::config::{Mode, RemoteConfig, SiteConfig};
use crate::types::{Entry, Origin};
use serde_json::{Value, json};
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("remote provider is not configured (OPENAI_API_KEY is not set)")]
    NotConfigured,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("cannot read response body: {0}")]
    Io(#[from] std::io::Error),
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("empty response text")]
    Empty,
}

/// System instruction sent with every remote request.
const SYSTEM_PROMPT: &str = include_str!("../static/prompt.md");

/// Longest error body kept in a [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Largest reply body read from the remote endpoint.
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// The entry fields a provider sees.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryContext<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub body: &'a str,
    /// Link target for the fragment's reference link, if any
    pub comment_href: Option<&'a str>,
}

impl<'a> CommentaryContext<'a> {
    pub fn for_entry(entry: &'a Entry) -> Self {
        Self {
            title: &entry.title,
            date: entry.date.as_str(),
            body: &entry.body,
            comment_href: None,
        }
    }

    pub fn with_href(mut self, href: Option<&'a str>) -> Self {
        self.comment_href = href;
        self
    }

    /// User message for the remote provider.
    pub fn user_text(&self) -> String {
        format!(
            "TITLE: {}\nDATE: {}\nPOST_MD:\n{}\n",
            self.title, self.date, self.body
        )
    }
}

/// Produces a commentary fragment for one entry.
pub trait CommentaryProvider {
    fn fragment(&self, ctx: &CommentaryContext<'_>) -> Result<String, ProviderError>;
}

/// The local, deterministic commentary engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn compose(&self, ctx: &CommentaryContext<'_>) -> String {
        commentary::compose(ctx.title, ctx.date, ctx.body, ctx.comment_href)
    }
}

impl CommentaryProvider for LocalProvider {
    fn fragment(&self, ctx: &CommentaryContext<'_>) -> Result<String, ProviderError> {
        Ok(self.compose(ctx))
    }
}

/// Remote generation over the Responses API.
pub struct RemoteProvider {
    client: reqwest::blocking::Client,
    url: String,
    authorization: String,
    model: String,
    max_output_tokens: u32,
}

impl RemoteProvider {
    /// Build a provider from configuration.
    ///
    /// Fails with [`ProviderError::NotConfigured`] when no credential is set,
    /// so callers can tell "not configured" apart from a broken request.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::NotConfigured)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/responses", config.endpoint.trim_end_matches('/')),
            authorization: format!("Bearer {api_key}"),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn payload(&self, user_text: &str) -> Value {
        json!({
            "model": self.model,
            "input": [
                {
                    "role": "system",
                    "content": [{ "type": "input_text", "text": SYSTEM_PROMPT }],
                },
                {
                    "role": "user",
                    "content": [{ "type": "input_text", "text": user_text }],
                },
            ],
            "max_output_tokens": self.max_output_tokens,
        })
    }
}

impl CommentaryProvider for RemoteProvider {
    fn fragment(&self, ctx: &CommentaryContext<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .header("authorization", &self.authorization)
            .json(&self.payload(&ctx.user_text()))
            .send()?;

        let status = response.status();
        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_BYTES)
        {
            return Err(ProviderError::TooLarge {
                limit: MAX_RESPONSE_BYTES,
            });
        }
        let body = read_capped(response, MAX_RESPONSE_BYTES)?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body)
                    .chars()
                    .take(MAX_ERROR_BODY)
                    .collect(),
            });
        }

        let value: Value = serde_json::from_slice(&body)?;
        extract_output_text(&value).ok_or(ProviderError::Empty)
    }
}

/// Read at most `limit` bytes from `reader`.
///
/// A body longer than `limit` is an error rather than a truncated read, so a
/// chunked reply without a length header is bounded too.
pub fn read_capped<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>, ProviderError> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(ProviderError::TooLarge { limit });
    }
    Ok(body)
}

/// Pull the reply text out of a Responses API body.
///
/// Prefers the top-level `output_text`; otherwise joins every
/// `output[].content[].text` string with newlines. Blank results are `None`.
pub fn extract_output_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("output_text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    let chunks: Vec<&str> = value
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|content| content.get("text").and_then(Value::as_str))
        .collect();

    let joined = chunks.join("\n");
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}

/// A generated fragment and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub fragment: String,
    pub origin: Origin,
    /// Why the remote provider was bypassed for this entry
    pub warning: Option<String>,
}

/// The commentary strategy used by a build: an optional remote provider in
/// front of the local engine.
pub struct FallbackProvider {
    remote: Option<Box<dyn CommentaryProvider>>,
    local: LocalProvider,
    unavailable: Option<ProviderError>,
}

impl FallbackProvider {
    /// Local engine only.
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: LocalProvider,
            unavailable: None,
        }
    }

    /// Try `remote` first for every entry.
    pub fn with_remote(remote: Box<dyn CommentaryProvider>) -> Self {
        Self {
            remote: Some(remote),
            ..Self::local_only()
        }
    }

    /// Choose the strategy for `config`.
    ///
    /// `stub` mode never touches the network. `real` mode uses the remote
    /// provider when it can be constructed; otherwise every entry goes to
    /// the local engine and [`Self::unavailable`] explains why.
    pub fn from_config(config: &SiteConfig) -> Self {
        match config.commentary.mode {
            Mode::Stub => Self::local_only(),
            Mode::Real => match RemoteProvider::from_config(&config.remote) {
                Ok(remote) => Self::with_remote(Box::new(remote)),
                Err(err) => Self {
                    unavailable: Some(err),
                    ..Self::local_only()
                },
            },
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Reason `real` mode could not set up the remote provider.
    pub fn unavailable(&self) -> Option<&ProviderError> {
        self.unavailable.as_ref()
    }

    /// Generate commentary for one entry. Never fails.
    pub fn generate(&self, ctx: &CommentaryContext<'_>) -> Generated {
        let mut warning = None;
        if let Some(remote) = &self.remote {
            match remote.fragment(ctx) {
                Ok(fragment) => {
                    return Generated {
                        fragment,
                        origin: Origin::Remote,
                        warning: None,
                    };
                }
                Err(err) => {
                    warning = Some(format!(
                        "{}: remote commentary failed ({err}), used local engine",
                        ctx.date
                    ));
                }
            }
        }

        Generated {
            fragment: self.local.compose(ctx),
            origin: Origin::Local,
            warning,
        }
    }
}
