use chrono::{DateTime, Utc};
use ethers_core::types::U256;
use serde::{Deserialize, Deserializer, Serialize};

/// A provider value that may arrive as a JSON number or as a string.
/// Anything else lands in `Other` and never parses, so one odd field
/// cannot fail a whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl NumericField {
    /// Parses an unsigned integer quantity: decimal, `0x` hex, or a JSON integer.
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            NumericField::Number(n) => n.as_u64().map(U256::from),
            NumericField::Text(s) => {
                let s = s.trim();
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    if hex.is_empty() {
                        return None;
                    }
                    U256::from_str_radix(hex, 16).ok()
                } else if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    U256::from_dec_str(s).ok()
                } else {
                    None
                }
            }
            NumericField::Other(_) => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            NumericField::Number(n) => n.as_f64()?,
            NumericField::Text(s) => s.trim().parse::<f64>().ok()?,
            NumericField::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Interprets the value as a block timestamp in milliseconds since epoch.
    /// RFC 3339 strings are accepted as well.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = match self {
            NumericField::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            NumericField::Text(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(ms) => ms,
                    Err(_) => {
                        return DateTime::parse_from_rfc3339(s)
                            .ok()
                            .map(|dt| dt.with_timezone(&Utc))
                    }
                }
            }
            NumericField::Other(_) => return None,
        };
        DateTime::<Utc>::from_timestamp_millis(millis)
    }
}

impl From<u64> for NumericField {
    fn from(value: u64) -> Self {
        NumericField::Number(value.into())
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        NumericField::Text(value.to_string())
    }
}

/// One transaction as returned by the history provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default, deserialize_with = "hash_or_empty")]
    pub hash: String,
    #[serde(default)]
    pub gas_used: Option<NumericField>,
    #[serde(default)]
    pub gas: Option<NumericField>,
    #[serde(default)]
    pub effective_gas_price: Option<NumericField>,
    #[serde(default)]
    pub gas_price: Option<NumericField>,
    #[serde(default, alias = "timestamp", alias = "timeStamp")]
    pub block_timestamp: Option<NumericField>,
}

fn hash_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default())
}

impl TransactionRecord {
    /// `gasUsed` wins over the nominal `gas` limit.
    pub fn gas_quantity(&self) -> Option<&NumericField> {
        self.gas_used.as_ref().or(self.gas.as_ref())
    }

    /// `effectiveGasPrice` wins over the quoted `gasPrice`.
    pub fn price_quantity(&self) -> Option<&NumericField> {
        self.effective_gas_price.as_ref().or(self.gas_price.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub transactions: Vec<TransactionRecord>,
    /// Cursor for the next page; `None` once the history is exhausted.
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCost {
    pub hash: String,
    pub timestamp: NumericField,
    #[serde(rename = "costETH")]
    pub cost_eth: f64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "totalGasCostWei")]
    pub total_gas_cost_wei: String,
    #[serde(rename = "totalGasCostETH")]
    pub total_gas_cost_eth: String,
    #[serde(rename = "totalGasCostUSD")]
    pub total_gas_cost_usd: String,
    #[serde(rename = "transactionCosts")]
    pub transaction_costs: Vec<TransactionCost>,
    #[serde(rename = "skippedTransactions")]
    pub skipped_transactions: u64,
    #[serde(rename = "staleSubstitutions")]
    pub stale_substitutions: u64,
}
