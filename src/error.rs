use std::fmt;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Hard failures talking to an upstream provider. None of these are retried.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{endpoint} returned an unreadable payload: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum GasSummaryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Why a single transaction was left out of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingGasUsed,
    MissingGasPrice,
    InvalidQuantity,
    Overflow,
    MissingTimestamp,
    InvalidTimestamp,
    NoPrice,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingGasUsed => "no gasUsed or gas field",
            SkipReason::MissingGasPrice => "no effectiveGasPrice or gasPrice field",
            SkipReason::InvalidQuantity => "unparseable gas quantity",
            SkipReason::Overflow => "gas cost overflows 256 bits",
            SkipReason::MissingTimestamp => "no block timestamp",
            SkipReason::InvalidTimestamp => "unparseable block timestamp",
            SkipReason::NoPrice => "no price for window and no earlier price to fall back on",
        };
        f.write_str(text)
    }
}

/// Sends a prepared request and decodes a successful JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    endpoint: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamError> {
    // Endpoint URLs carry the API key, so reqwest errors must not render them.
    let response = request
        .send()
        .await
        .map_err(|source| UpstreamError::Transport {
            endpoint,
            source: source.without_url(),
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| UpstreamError::Transport {
            endpoint,
            source: source.without_url(),
        })?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            endpoint,
            status,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}
