//! Response degradation contract shared by every feature module.
//!
//! Loads never fail past the feature boundary except for authentication:
//! transport problems and non-OK statuses become [`Fetched::Failed`], empty or
//! malformed bodies become [`Fetched::Empty`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Generic, retry-suggesting message for failed loads.
pub const RETRY_MESSAGE: &str = "Impossibile caricare i dati. Riprova più tardi.";

/// Outcome of a load, as the UI needs to render it.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    /// Nothing to show: empty body, unparseable body or empty collection.
    Empty,
    /// Transport or status failure; carries the inline message.
    Failed(String),
}

impl<T> Fetched<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Fetched::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Fetched::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Fetched::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Fetched::Failed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Data(value) => Fetched::Data(f(value)),
            Fetched::Empty => Fetched::Empty,
            Fetched::Failed(message) => Fetched::Failed(message),
        }
    }
}

impl<T> Fetched<Vec<T>> {
    /// An empty collection renders like no data at all.
    pub fn non_empty(self) -> Self {
        match self {
            Fetched::Data(items) if items.is_empty() => Fetched::Empty,
            other => other,
        }
    }

    /// Items to render; empty for `Empty` and `Failed`.
    pub fn items(self) -> Vec<T> {
        self.into_data().unwrap_or_default()
    }
}

/// Result of a guarded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// Caller lacked the privilege; nothing was changed or sent.
    Ignored,
}

impl Mutation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Mutation::Applied)
    }
}

/// Parse a body; blank or malformed text yields `None`.
pub fn decode_body<T: DeserializeOwned>(text: &str) -> Option<T> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "unparseable response body");
            None
        }
    }
}

/// Turn the outcome of an authenticated call into a renderable state.
pub async fn degrade<T: DeserializeOwned>(outcome: ClientResult<reqwest::Response>) -> ClientResult<Fetched<T>> {
    let response = match outcome {
        Ok(response) => response,
        Err(err @ ClientError::Authentication(_)) => return Err(err),
        Err(err) => {
            tracing::warn!(error = %err, "request failed");
            return Ok(Fetched::Failed(RETRY_MESSAGE.to_string()));
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), url = %response.url(), "backend returned an error status");
        return Ok(Fetched::Failed(RETRY_MESSAGE.to_string()));
    }

    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read response body");
            return Ok(Fetched::Failed(RETRY_MESSAGE.to_string()));
        }
    };

    Ok(match decode_body(&text) {
        Some(value) => Fetched::Data(value),
        None => Fetched::Empty,
    })
}

/// Error body fields checked by [`expect_success`], in order.
pub const ERROR_FIELDS: [&str; 2] = ["error", "message"];

/// Error body fields for workflow runs, which report through `message`.
pub const RUN_ERROR_FIELDS: [&str; 2] = ["message", "error"];

/// For mutations: require a success status and return the (possibly null)
/// body. Error bodies contribute their `error` field, else `message`.
pub async fn expect_success(outcome: ClientResult<reqwest::Response>) -> ClientResult<Value> {
    expect_success_reporting(outcome, &ERROR_FIELDS).await
}

/// [`expect_success`] with the error body fields to surface, first match wins.
pub async fn expect_success_reporting(
    outcome: ClientResult<reqwest::Response>,
    error_fields: &[&str],
) -> ClientResult<Value> {
    let response = outcome?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: Value = decode_body(&text).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(body);
    }

    let message = error_fields
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Errore del server ({})", status.as_u16()));

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
