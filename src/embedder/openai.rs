//! Client for OpenAI-compatible `/embeddings` endpoints.
//!
//! Works against OpenAI itself and against self-hosted sentence-transformer
//! servers that expose the same request/response shape.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::Embedder;

/// Blocking embeddings client.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a new embeddings client.
    ///
    /// `api_key` may be empty for self-hosted servers that do not check it.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
        max_retries: usize,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "embedding base URL must be an http(s) URL"
        );
        let mut headers = reqwest::header::HeaderMap::new();
        if !api_key.trim().is_empty() {
            let auth = format!("Bearer {}", api_key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid embedding API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
            max_retries: max_retries.max(1),
            batch_size: batch_size.max(1),
        })
    }

    /// Sends one batch (at most `batch_size` inputs) and returns its vectors.
    ///
    /// Transient failures (429, 5xx, timeouts, refused connections) are retried
    /// up to `max_retries` attempts in total.
    pub fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        anyhow::ensure!(
            inputs.len() <= self.batch_size,
            "batch of {} exceeds configured max {}",
            inputs.len(),
            self.batch_size
        );

        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let mut attempt = 1;
        loop {
            match self.post_once(&body)? {
                Attempt::Done(vectors) => return Ok(vectors),
                Attempt::Transient(err) if attempt < self.max_retries => {
                    tracing::warn!(error = %err, attempt, "retrying embedding request");
                    thread::sleep(retry_backoff(attempt));
                    attempt += 1;
                }
                Attempt::Transient(err) => {
                    return Err(err.context(format!("gave up after {attempt} attempts")))
                }
            }
        }
    }

    fn post_once(&self, body: &EmbeddingRequest<'_>) -> Result<Attempt> {
        let resp = match self.client.post(&self.endpoint).json(body).send() {
            Ok(resp) => resp,
            Err(err) if is_retryable_error(&err) => return Ok(Attempt::Transient(err.into())),
            Err(err) => return Err(err).context("embedding request failed"),
        };
        let status = resp.status();
        if status.is_success() {
            let parsed: EmbeddingResponse =
                resp.json().context("failed to parse embedding response")?;
            return parsed.into_embeddings(body.input.len()).map(Attempt::Done);
        }
        let detail = resp.text().unwrap_or_default();
        let err = anyhow!("embedding endpoint answered {status}: {detail}");
        if should_retry(status) {
            Ok(Attempt::Transient(err))
        } else {
            Err(err)
        }
    }
}

/// Outcome of one round trip that did not fail permanently.
enum Attempt {
    Done(Vec<Vec<f32>>),
    Transient(anyhow::Error),
}

impl Embedder for OpenAiEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    fn into_embeddings(mut self, expected_len: usize) -> Result<Vec<Vec<f32>>> {
        anyhow::ensure!(
            self.data.len() == expected_len,
            "embedding endpoint returned {} vectors for {} inputs",
            self.data.len(),
            expected_len
        );
        self.data.sort_by_key(|entry| entry.index);
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
