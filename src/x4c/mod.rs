pub(crate) mod bigmap;
pub mod custodian_entrypoints;
pub mod custodian_state;
pub mod events;
pub mod fa2_entrypoints;
pub mod fa2_state;
pub mod numeric;
pub mod snapshot;

use crate::error::DecodeError;
use crate::tzkt::Indexer;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub use custodian_state::{
    get_custodian_storage, CustodianMetadata, CustodianStorage,
    ExternalLedger, Ledger, LedgerKey, OperatorInformation, TokenID,
};
pub use fa2_state::{
    get_fa2_storage, FA2Ledger, FA2Metadata, FA2Operator, FA2Owner,
    FA2Storage, FA2TokenMetadata, FA2TokenMetadataMap,
};

fn get_storage<T>(indexer: &dyn Indexer, address: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw = indexer
        .contract_storage(address)
        .with_context(|| format!("failed to get storage of {}", address))?;
    Ok(serde_json::from_value(raw).map_err(|source| {
        DecodeError::Storage {
            address: address.to_string(),
            source,
        }
    })?)
}
