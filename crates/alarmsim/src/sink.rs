//! Destinations for alarm event batches.
//!
//! The simulator only knows about the [`EventSink`] trait. [`HttpSink`]
//! posts to the real ingestion endpoint; [`JsonLinesSink`] writes batches to
//! stdout (or any writer) for dry runs.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::AlarmEvent;

/// Longest response body kept in an [`Error::EndpointStatus`].
const MAX_ERROR_BODY: usize = 512;

/// Something that accepts batches of alarm events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name of this sink (for logging).
    fn name(&self) -> &'static str;

    /// Deliver one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be delivered. The caller
    /// decides whether to continue.
    async fn send(&self, batch: &[AlarmEvent]) -> Result<()>;
}

/// Posts event batches to the ingestion endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: Url,
    auth_header: HeaderName,
    key: HeaderValue,
}

impl HttpSink {
    /// Create a sink posting to `url` with `key` in the `auth_header` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or key is not a valid HTTP
    /// header, or the HTTP client cannot be built.
    pub fn new(url: Url, auth_header: &str, key: &str, timeout: Duration) -> Result<Self> {
        let auth_header = HeaderName::from_bytes(auth_header.as_bytes()).map_err(|_| {
            Error::validation(format!(
                "endpoint.auth_header '{auth_header}' is not a valid HTTP header name"
            ))
        })?;

        let mut key = HeaderValue::from_str(key)
            .map_err(|_| Error::validation("endpoint.key contains characters not allowed in a header"))?;
        key.set_sensitive(true);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            auth_header,
            key,
        })
    }

    /// Create a sink from the endpoint section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL or key is missing or invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.require_endpoint()?;
        Self::new(url, &config.endpoint.auth_header, key, config.timeout())
    }

    /// The endpoint this sink posts to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, batch: &[AlarmEvent]) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .header(self.auth_header.clone(), self.key.clone())
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), events = batch.len(), "batch accepted");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(Error::EndpointStatus {
            status: status.as_u16(),
            body,
        })
    }
}

/// Writes each batch as one line of JSON. Used for dry runs.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous writer panicked while holding the lock.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::internal("sink writer lock poisoned"))
    }
}

impl JsonLinesSink<std::io::Stdout> {
    /// A sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn send(&self, batch: &[AlarmEvent]) -> Result<()> {
        let line = serde_json::to_string(batch)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::internal("sink writer lock poisoned"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
