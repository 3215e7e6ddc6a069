use super::{BigMapItem, Event, EventContract, Indexer};
use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;

/// In-memory indexer for tests.
#[derive(Default)]
pub(crate) struct MockIndexer {
    pub should_error: bool,
    pub storage: HashMap<String, serde_json::Value>,
    pub bigmaps: HashMap<i64, Vec<BigMapItem>>,
    pub events: HashMap<(String, String), Vec<Event>>,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_error: true,
            ..Self::default()
        }
    }

    pub fn add_storage(&mut self, address: &str, storage: serde_json::Value) {
        self.storage
            .insert(address.to_string(), storage);
    }

    pub fn add_bigmap(&mut self, bigmap_id: i64, items: Vec<BigMapItem>) {
        self.bigmaps.insert(bigmap_id, items);
    }

    pub fn add_events(&mut self, address: &str, tag: &str, events: Vec<Event>) {
        self.events
            .insert((address.to_string(), tag.to_string()), events);
    }
}

impl Indexer for MockIndexer {
    fn contract_storage(&self, address: &str) -> Result<serde_json::Value> {
        if self.should_error {
            return Err(anyhow!("test should fail"));
        }
        self.storage
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("bad http status code: 204"))
    }

    fn bigmap_keys(&self, bigmap_id: i64) -> Result<Vec<BigMapItem>> {
        if self.should_error {
            return Err(anyhow!("test should fail"));
        }
        Ok(self
            .bigmaps
            .get(&bigmap_id)
            .cloned()
            .unwrap_or_default())
    }

    fn contract_events(&self, address: &str, tag: &str) -> Result<Vec<Event>> {
        if self.should_error {
            return Err(anyhow!("test should fail"));
        }
        Ok(self
            .events
            .get(&(address.to_string(), tag.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) fn bigmap_item(
    active: bool,
    key: serde_json::Value,
    value: serde_json::Value,
) -> BigMapItem {
    BigMapItem {
        id: 131066,
        active,
        hash: "exprumPYk1WQo92cnqQ67ZDn26HMpSSHxXcY8ALtvcHXMQFMjhTrtQ".to_string(),
        key,
        value,
        first_level: 371199,
        last_level: 371202,
        updates: 1,
    }
}

pub(crate) fn event(id: i64, tag: &str, payload: serde_json::Value) -> Event {
    Event {
        id,
        level: 371200 + id,
        timestamp: Utc.timestamp(1_670_000_000 + id, 0),
        contract: EventContract {
            address: Some("KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR".to_string()),
            alias: None,
        },
        code_hash: 0,
        tag: tag.to_string(),
        payload,
        transaction_id: id * 10,
    }
}
