//! Saving contract state out as JSON, and turning such a save back into
//! initial storage for a new contract.
//!
//! JSON maps can only have string keys while the ledgers are keyed by
//! structs, so every big-map is written as a list of `{key, value}` items,
//! the same way indexers return them.

use crate::error::InputError;
use crate::michelson::{comparable_address, validate_address, Value};
use crate::submit::Submitter;
use crate::tzkt::Indexer;
use crate::x4c::custodian_state::{
    get_custodian_storage, CustodianMetadata, CustodianStorage,
    ExternalLedger, Ledger, LedgerKey, TokenID,
};
use crate::x4c::events::{
    get_custodian_retire_events, get_fa2_retire_events,
    get_internal_mint_events, get_internal_transfer_events,
    ContractEvent, CustodianRetireEvent, FA2RetireEvent, InternalMintEvent,
    InternalTransferEvent,
};
use crate::x4c::fa2_state::{
    get_fa2_storage, FA2Ledger, FA2Metadata, FA2Owner, FA2Storage,
    FA2TokenMetadata, FA2TokenMetadataMap,
};
use crate::x4c::numeric::nat;
use anyhow::{Context, Result};
use num::BigUint;
use std::collections::BTreeMap;

/// Stored under the empty key when a snapshot has no metadata schema of its
/// own.
pub const DEFAULT_METADATA_URL: &str =
    "https://tzprofiles.com/tzip016_metadata.json";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JSONSafeFA2Ledger {
    pub key: FA2Owner,
    pub value: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JSONSafeMetadata {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JSONSafeFA2TokenMetadata {
    #[serde(with = "nat")]
    pub key: BigUint,
    pub value: FA2TokenMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FA2Snapshot {
    #[serde(flatten)]
    pub storage: FA2Storage,

    #[serde(rename = "ledger_bigmap", default)]
    pub ledger: Vec<JSONSafeFA2Ledger>,
    #[serde(rename = "metadata_bigmap", default)]
    pub metadata: Vec<JSONSafeMetadata>,
    #[serde(rename = "token_metadata_bigmap", default)]
    pub token_metadata: Vec<JSONSafeFA2TokenMetadata>,

    #[serde(default)]
    pub retire_events: Vec<ContractEvent<FA2RetireEvent>>,
}

pub fn to_json_safe_ledger(ledger: &FA2Ledger) -> Vec<JSONSafeFA2Ledger> {
    ledger
        .iter()
        .map(|(key, value)| JSONSafeFA2Ledger {
            key: key.clone(),
            value: *value,
        })
        .collect()
}

pub fn to_json_safe_metadata(
    metadata: &BTreeMap<String, String>,
) -> Vec<JSONSafeMetadata> {
    metadata
        .iter()
        .map(|(key, value)| JSONSafeMetadata {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

pub fn to_json_safe_token_metadata(
    token_metadata: &FA2TokenMetadataMap,
) -> Vec<JSONSafeFA2TokenMetadata> {
    token_metadata
        .iter()
        .map(|(key, value)| JSONSafeFA2TokenMetadata {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

fn text_map(entries: &BTreeMap<String, String>) -> Value {
    Value::map(entries.iter().map(|(k, v)| {
        (Value::string(k.as_str()), Value::bytes(v.as_bytes()))
    }))
}

impl FA2Snapshot {
    pub fn from_contract(indexer: &dyn Indexer, address: &str) -> Result<Self> {
        let storage = get_fa2_storage(indexer, address)?;
        let ledger = storage.get_ledger(indexer)?;
        let metadata: FA2Metadata = storage.get_fa2_metadata(indexer)?;
        let token_metadata = storage.get_token_metadata(indexer)?;
        let retire_events = get_fa2_retire_events(indexer, address)?;
        info!(
            "snapshot of {}: {} ledger entries, {} tokens, {} retirements",
            address,
            ledger.len(),
            token_metadata.len(),
            retire_events.len()
        );

        Ok(Self {
            storage,
            ledger: to_json_safe_ledger(&ledger),
            metadata: to_json_safe_metadata(&metadata),
            token_metadata: to_json_safe_token_metadata(&token_metadata),
            retire_events,
        })
    }

    /// The ledger as a map literal. The JSON may have been edited by hand,
    /// so entries are put in the chain's key order here, owner first (see
    /// `comparable_address`) then token id. The last of any duplicate keys
    /// wins.
    pub fn ledger_as_michelson(&self) -> Result<Value> {
        let mut sorted: BTreeMap<(Vec<u8>, BigUint), (&str, BigUint)> =
            BTreeMap::new();
        for item in &self.ledger {
            if item.value < 0 {
                return Err(InputError::NegativeBalance {
                    key: format!(
                        "{}/{}",
                        item.key.token_owner, item.key.token_id
                    ),
                    balance: item.value,
                }
                .into());
            }
            let owner = item.key.token_owner.as_str();
            sorted.insert(
                (comparable_address(owner)?, item.key.token_id.clone()),
                (owner, BigUint::from(item.value as u64)),
            );
        }
        Ok(Value::map(sorted.into_iter().map(
            |((_, token_id), (owner, amount))| {
                (
                    Value::pair(Value::string(owner), Value::nat(token_id)),
                    Value::nat(amount),
                )
            },
        )))
    }

    pub fn metadata_as_michelson(&self) -> Value {
        let mut entries: BTreeMap<String, String> = self
            .metadata
            .iter()
            .map(|item| (item.key.clone(), item.value.clone()))
            .collect();
        entries
            .entry("".to_string())
            .or_insert_with(|| DEFAULT_METADATA_URL.to_string());
        text_map(&entries)
    }

    pub fn token_metadata_as_michelson(&self) -> Value {
        let entries: BTreeMap<&BigUint, &FA2TokenMetadata> = self
            .token_metadata
            .iter()
            .map(|item| (&item.key, &item.value))
            .collect();
        Value::map(entries.into_iter().map(|(token_id, metadata)| {
            (
                Value::nat(token_id.clone()),
                Value::pair(
                    Value::nat(token_id.clone()),
                    text_map(&metadata.token_info),
                ),
            )
        }))
    }

    /// `Pair (Pair (Pair ledger metadata) {} oracle) token_metadata`, the
    /// operators start out empty.
    pub fn origination_storage(&self) -> Result<Value> {
        validate_address(&self.storage.oracle)?;
        let ledger = self
            .ledger_as_michelson()
            .context("failed to convert ledger")?;
        Ok(Value::pair(
            Value::comb(vec![
                Value::pair(ledger, self.metadata_as_michelson()),
                Value::Seq(vec![]),
                Value::string(self.storage.oracle.as_str()),
            ]),
            self.token_metadata_as_michelson(),
        ))
    }
}

pub fn fa2_originate(
    submitter: &dyn Submitter,
    signer: &str,
    code: &serde_json::Value,
    snapshot: &FA2Snapshot,
) -> Result<String> {
    let storage = snapshot.origination_storage()?;
    info!(
        "originating FA2 with oracle {} and {} ledger entries",
        snapshot.storage.oracle,
        snapshot.ledger.len()
    );
    submitter
        .originate(signer, code, &storage)
        .context("FA2 origination failed")
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JSONSafeLedger {
    pub key: LedgerKey,
    pub value: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JSONSafeExternalLedger {
    pub key: TokenID,
    pub value: i64,
}

/// Everything a custodian holds, for export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustodianSnapshot {
    #[serde(flatten)]
    pub storage: CustodianStorage,

    #[serde(rename = "ledger_bigmap", default)]
    pub ledger: Vec<JSONSafeLedger>,
    #[serde(rename = "external_ledger_bigmap", default)]
    pub external_ledger: Vec<JSONSafeExternalLedger>,
    #[serde(rename = "metadata_bigmap", default)]
    pub metadata: Vec<JSONSafeMetadata>,

    #[serde(default)]
    pub internal_mint_events: Vec<ContractEvent<InternalMintEvent>>,
    #[serde(default)]
    pub internal_transfer_events: Vec<ContractEvent<InternalTransferEvent>>,
    #[serde(default)]
    pub retire_events: Vec<ContractEvent<CustodianRetireEvent>>,
}

fn to_json_safe_custodian_ledger(ledger: &Ledger) -> Vec<JSONSafeLedger> {
    let mut res: Vec<JSONSafeLedger> = ledger
        .iter()
        .map(|(key, value)| JSONSafeLedger {
            key: key.clone(),
            value: *value,
        })
        .collect();
    // packed hex leads with the length, so order on the decoded text
    res.sort_by(|a, b| {
        a.key
            .token
            .token_id
            .cmp(&b.key.token.token_id)
            .then_with(|| a.key.kyc.text().cmp(&b.key.kyc.text()))
            .then_with(|| {
                a.key
                    .token
                    .token_address
                    .cmp(&b.key.token.token_address)
            })
    });
    res
}

fn to_json_safe_external_ledger(
    ledger: &ExternalLedger,
) -> Vec<JSONSafeExternalLedger> {
    ledger
        .iter()
        .map(|(key, value)| JSONSafeExternalLedger {
            key: key.clone(),
            value: *value,
        })
        .collect()
}

impl CustodianSnapshot {
    pub fn from_contract(indexer: &dyn Indexer, address: &str) -> Result<Self> {
        let storage = get_custodian_storage(indexer, address)?;
        let ledger = storage.get_ledger(indexer)?;
        let external_ledger = storage.get_external_ledger(indexer)?;
        let metadata: CustodianMetadata =
            storage.get_custodian_metadata(indexer)?;

        Ok(Self {
            ledger: to_json_safe_custodian_ledger(&ledger),
            external_ledger: to_json_safe_external_ledger(&external_ledger),
            metadata: to_json_safe_metadata(&metadata),
            internal_mint_events: get_internal_mint_events(indexer, address)?,
            internal_transfer_events: get_internal_transfer_events(
                indexer, address,
            )?,
            retire_events: get_custodian_retire_events(indexer, address)?,
            storage,
        })
    }
}
