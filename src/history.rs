use async_trait::async_trait;
use futures_util::{stream, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{send_json, UpstreamError};
use crate::models::{HistoryPage, TransactionRecord};

/// Largest page the history provider will serve.
pub const MAX_PAGE_SIZE: usize = 50;

const ENDPOINT: &str = "transaction history";

#[async_trait]
pub trait TransactionHistorySource: Send + Sync {
    /// Fetches one page of at most [`MAX_PAGE_SIZE`] records, starting after `after`.
    async fn fetch_page(
        &self,
        address: &str,
        after: Option<&str>,
    ) -> Result<HistoryPage, UpstreamError>;
}

#[derive(Clone)]
pub struct AlchemyHistoryClient {
    http: reqwest::Client,
    endpoint: Url,
    network: String,
}

#[derive(Serialize)]
struct HistoryRequest<'a> {
    addresses: [AddressFilter<'a>; 1],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
}

#[derive(Serialize)]
struct AddressFilter<'a> {
    address: &'a str,
    networks: [&'a str; 1],
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    transactions: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    after: Option<String>,
}

impl HistoryResponse {
    /// Records are decoded one by one. One that is not even an object becomes
    /// an empty record, which the aggregator then skips and counts.
    fn into_page(self) -> HistoryPage {
        let transactions = self
            .transactions
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                serde_json::from_value(raw).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "unreadable history record");
                    TransactionRecord::default()
                })
            })
            .collect();
        HistoryPage {
            transactions,
            after: self.after,
        }
    }
}

impl AlchemyHistoryClient {
    pub fn new(http: reqwest::Client, endpoint: Url, network: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            network: network.into(),
        }
    }
}

#[async_trait]
impl TransactionHistorySource for AlchemyHistoryClient {
    async fn fetch_page(
        &self,
        address: &str,
        after: Option<&str>,
    ) -> Result<HistoryPage, UpstreamError> {
        let body = HistoryRequest {
            addresses: [AddressFilter {
                address,
                networks: [self.network.as_str()],
            }],
            limit: MAX_PAGE_SIZE,
            after,
        };
        let request = self.http.post(self.endpoint.clone()).json(&body);
        let response: HistoryResponse = send_json(ENDPOINT, request).await?;
        Ok(response.into_page())
    }
}

enum Cursor {
    First,
    After(String),
    Exhausted,
}

/// Pages of history in provider order. Ends after a page with no cursor or no records.
fn history_pages<'a>(
    source: &'a dyn TransactionHistorySource,
    address: &'a str,
) -> impl Stream<Item = Result<Vec<TransactionRecord>, UpstreamError>> + 'a {
    stream::try_unfold((Cursor::First, 0usize), move |(cursor, page_no)| async move {
        let after = match cursor {
            Cursor::First => None,
            Cursor::After(token) => Some(token),
            Cursor::Exhausted => return Ok(None),
        };

        let page = source.fetch_page(address, after.as_deref()).await?;
        tracing::debug!(
            page = page_no,
            records = page.transactions.len(),
            has_cursor = page.after.is_some(),
            "fetched history page"
        );

        let next = match page.after {
            Some(token) if !token.is_empty() && !page.transactions.is_empty() => {
                Cursor::After(token)
            }
            _ => Cursor::Exhausted,
        };
        Ok::<_, UpstreamError>(Some((page.transactions, (next, page_no + 1))))
    })
}

/// Walks every page for `address` and returns the concatenated records.
/// Any failed page discards what was already fetched.
pub async fn fetch_all_transactions(
    source: &dyn TransactionHistorySource,
    address: &str,
) -> Result<Vec<TransactionRecord>, UpstreamError> {
    let records: Vec<TransactionRecord> = history_pages(source, address).try_concat().await?;
    tracing::debug!(address, records = records.len(), "history fetch complete");
    Ok(records)
}
