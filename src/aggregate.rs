use std::sync::Arc;

use anyhow::{Context, Result};
use ethers_core::types::U256;
use futures_util::{stream, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{GasSummaryError, SkipReason, UpstreamError},
    history::{fetch_all_transactions, AlchemyHistoryClient, TransactionHistorySource},
    models::{AggregateResult, TransactionCost, TransactionRecord},
    price::{resolve_price, AlchemyPriceClient, PriceSource},
    summary_stats::SUMMARY_STATS,
};

/// Smallest units per native-currency unit (wei per ETH).
pub const WEI_PER_ETH: f64 = 1e18;

#[derive(Clone)]
pub struct GasCostAggregator {
    history: Arc<dyn TransactionHistorySource>,
    prices: Arc<dyn PriceSource>,
}

/// Running state threaded through one aggregation, in fetch order.
#[derive(Debug, Default)]
struct Tally {
    total_wei: U256,
    total_eth: f64,
    total_usd: f64,
    costs: Vec<TransactionCost>,
    last_price: Option<f64>,
    skipped: u64,
    stale: u64,
}

impl Tally {
    fn skip(mut self, tx: &TransactionRecord, reason: SkipReason) -> Self {
        warn!(hash = %tx.hash, %reason, "skipping transaction");
        self.skipped += 1;
        self
    }

    fn into_result(self) -> AggregateResult {
        AggregateResult {
            total_gas_cost_wei: self.total_wei.to_string(),
            total_gas_cost_eth: self.total_eth.to_string(),
            total_gas_cost_usd: format!("{:.2}", self.total_usd),
            transaction_costs: self.costs,
            skipped_transactions: self.skipped,
            stale_substitutions: self.stale,
        }
    }
}

impl GasCostAggregator {
    pub fn new(
        history: Arc<dyn TransactionHistorySource>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self { history, prices }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("failed to build reqwest client")?;
        let history = AlchemyHistoryClient::new(
            http.clone(),
            config.history_endpoint.clone(),
            config.network.clone(),
        );
        let prices = AlchemyPriceClient::new(
            http,
            config.prices_endpoint.clone(),
            config.price_symbol.clone(),
        );
        Ok(Self::new(Arc::new(history), Arc::new(prices)))
    }

    /// Fetches the full history of `address` and prices every transaction's gas.
    ///
    /// Transactions are processed strictly in fetch order: a window with no
    /// price falls back to the last price resolved earlier in the same run.
    /// Any upstream failure aborts the whole summary.
    pub async fn compute_gas_summary(
        &self,
        address: &str,
    ) -> Result<AggregateResult, GasSummaryError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GasSummaryError::Validation(
                "Missing address parameter".to_string(),
            ));
        }

        let records = fetch_all_transactions(self.history.as_ref(), address).await?;
        let fetched = records.len();

        let tally = stream::iter(records.into_iter().map(Ok::<_, UpstreamError>))
            .try_fold(Tally::default(), |tally, tx| self.apply(tally, tx))
            .await?;

        let priced = tally.costs.len() as u64;
        SUMMARY_STATS.record_run(priced, tally.skipped, tally.stale);
        info!(
            address,
            fetched,
            priced,
            skipped = tally.skipped,
            stale = tally.stale,
            "gas summary computed"
        );

        Ok(tally.into_result())
    }

    async fn apply(&self, mut tally: Tally, tx: TransactionRecord) -> Result<Tally, UpstreamError> {
        let cost_wei = match gas_cost_wei(&tx) {
            Ok(cost) => cost,
            Err(reason) => return Ok(tally.skip(&tx, reason)),
        };
        let Some(total_wei) = tally.total_wei.checked_add(cost_wei) else {
            return Ok(tally.skip(&tx, SkipReason::Overflow));
        };

        let (timestamp, at) = match tx.block_timestamp.as_ref() {
            None => return Ok(tally.skip(&tx, SkipReason::MissingTimestamp)),
            Some(raw) => match raw.to_datetime() {
                Some(at) => (raw.clone(), at),
                None => return Ok(tally.skip(&tx, SkipReason::InvalidTimestamp)),
            },
        };

        let usd_price = match resolve_price(self.prices.as_ref(), at).await? {
            Some(quote) => {
                tally.last_price = Some(quote.value);
                quote.value
            }
            None => match tally.last_price {
                Some(price) => {
                    debug!(hash = %tx.hash, price, "no price for window, reusing last known price");
                    tally.stale += 1;
                    price
                }
                None => return Ok(tally.skip(&tx, SkipReason::NoPrice)),
            },
        };

        let cost_eth = wei_to_eth(cost_wei);
        let cost_usd = cost_eth * usd_price;

        tally.total_wei = total_wei;
        tally.total_eth += cost_eth;
        tally.total_usd += cost_usd;
        tally.costs.push(TransactionCost {
            hash: tx.hash,
            timestamp,
            cost_eth,
            cost_usd,
        });
        Ok(tally)
    }
}

/// Exact gas cost in wei: gas used times effective gas price, falling back to
/// the nominal `gas` and `gasPrice` fields.
pub fn gas_cost_wei(tx: &TransactionRecord) -> Result<U256, SkipReason> {
    let gas = tx
        .gas_quantity()
        .ok_or(SkipReason::MissingGasUsed)?
        .to_u256()
        .ok_or(SkipReason::InvalidQuantity)?;
    let price = tx
        .price_quantity()
        .ok_or(SkipReason::MissingGasPrice)?
        .to_u256()
        .ok_or(SkipReason::InvalidQuantity)?;
    gas.checked_mul(price).ok_or(SkipReason::Overflow)
}

/// Lossy conversion for display and USD math.
pub fn wei_to_eth(wei: U256) -> f64 {
    wei.to_string().parse::<f64>().unwrap_or(0.0) / WEI_PER_ETH
}
