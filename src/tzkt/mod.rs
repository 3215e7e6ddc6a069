// tzkt => the TzKT indexer (https://api.tzkt.io)
pub mod client;
#[cfg(test)]
pub(crate) mod mock;

use anyhow::Result;
use chrono::{DateTime, Utc};

pub use client::TzKTClient;

/// One key of a big-map, as the indexer reports it. `key` and `value` are
/// the indexer's JSON rendering of the Michelson data, left undecoded here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigMapItem {
    pub id: i64,
    pub active: bool,
    pub hash: String,
    pub key: serde_json::Value,
    pub value: serde_json::Value,
    #[serde(default)]
    pub first_level: i64,
    #[serde(default)]
    pub last_level: i64,
    #[serde(default)]
    pub updates: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A contract event (EMIT), payload left undecoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub level: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub contract: EventContract,
    #[serde(default)]
    pub code_hash: i64,
    pub tag: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub transaction_id: i64,
}

/// Read access to chain state. Unknown big-map ids are not an error, they
/// come back as an empty list, same as a big-map without keys.
pub trait Indexer {
    fn contract_storage(&self, address: &str) -> Result<serde_json::Value>;

    fn bigmap_keys(&self, bigmap_id: i64) -> Result<Vec<BigMapItem>>;

    fn contract_events(&self, address: &str, tag: &str) -> Result<Vec<Event>>;
}
