use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{send_json, UpstreamError};
use crate::models::{NumericField, PriceQuote};

/// Width of the historical window queried for each transaction.
pub const PRICE_WINDOW_MS: i64 = 3_600_000;
pub const PRICE_INTERVAL: &str = "1h";

const ENDPOINT: &str = "historical prices";

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price points for `[start, end)`, in provider order. Empty when the
    /// provider has no data for the window; `None` marks an unreadable point.
    async fn price_points(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Option<f64>>, UpstreamError>;
}

#[derive(Clone)]
pub struct AlchemyPriceClient {
    http: reqwest::Client,
    endpoint: Url,
    symbol: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRequest<'a> {
    symbol: &'a str,
    start_time: String,
    end_time: String,
    interval: &'a str,
}

#[derive(Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

impl PriceResponse {
    fn into_points(self) -> Vec<Option<f64>> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .map(|mut point| {
                let value = point.get_mut("value")?.take();
                serde_json::from_value::<NumericField>(value)
                    .ok()?
                    .to_f64()
            })
            .collect()
    }
}

impl AlchemyPriceClient {
    pub fn new(http: reqwest::Client, endpoint: Url, symbol: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl PriceSource for AlchemyPriceClient {
    async fn price_points(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Option<f64>>, UpstreamError> {
        let body = PriceRequest {
            symbol: &self.symbol,
            start_time: iso8601(start),
            end_time: iso8601(end),
            interval: PRICE_INTERVAL,
        };
        let request = self.http.post(self.endpoint.clone()).json(&body);
        let response: PriceResponse = send_json(ENDPOINT, request).await?;
        Ok(response.into_points())
    }
}

fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolves the USD price of the native currency for the hour starting at `at`.
///
/// `Ok(None)` means the provider had no data for the window; transport and
/// provider failures are returned as errors. Only the first point is read, and
/// an unreadable first point is a decode failure.
pub async fn resolve_price(
    source: &dyn PriceSource,
    at: DateTime<Utc>,
) -> Result<Option<PriceQuote>, UpstreamError> {
    let window_start = at;
    let Some(window_end) = at.checked_add_signed(Duration::milliseconds(PRICE_WINDOW_MS)) else {
        return Ok(None);
    };

    let points = source.price_points(window_start, window_end).await?;
    match points.first() {
        None => Ok(None),
        Some(Some(value)) => Ok(Some(PriceQuote {
            window_start,
            window_end,
            value: *value,
        })),
        Some(None) => Err(UpstreamError::Decode {
            endpoint: ENDPOINT,
            reason: "first price point has no numeric value".to_string(),
        }),
    }
}
