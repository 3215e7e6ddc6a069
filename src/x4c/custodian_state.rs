use crate::michelson::PackedString;
use crate::tzkt::Indexer;
use crate::x4c::bigmap::{self, Entries};
use crate::x4c::numeric::{self, nat};
use anyhow::{Context, Result};
use num::BigUint;
use std::collections::BTreeMap;

#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct TokenID {
    #[serde(with = "nat")]
    pub token_id: BigUint,
    pub token_address: String,
}

/// Off-chain ownership: `token`, held on behalf of the KYC'd party `kyc`.
#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct LedgerKey {
    pub token: TokenID,
    pub kyc: PackedString,
}

pub type Ledger = BTreeMap<LedgerKey, i64>;

pub type ExternalLedger = BTreeMap<TokenID, i64>;

// Technically this is string -> bytes, but the custodian only ever stores
// text in there.
pub type CustodianMetadata = BTreeMap<String, String>;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OperatorInformation {
    #[serde(rename = "token_owner")]
    pub kyc: PackedString,
    #[serde(rename = "token_operator")]
    pub operator: String,
    #[serde(with = "nat")]
    pub token_id: BigUint,
}

/// The custodian contract storage as the indexer summarizes it, big-maps
/// are referenced by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustodianStorage {
    pub custodian: String,
    pub ledger: i64,
    pub metadata: i64,
    #[serde(default)]
    pub operators: Vec<OperatorInformation>,
    pub external_ledger: i64,
}

pub fn get_custodian_storage(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<CustodianStorage> {
    super::get_storage(indexer, address)
}

impl CustodianStorage {
    pub fn get_ledger(&self, indexer: &dyn Indexer) -> Result<Ledger> {
        let items = indexer
            .bigmap_keys(self.ledger)
            .context("failed to get ledger big map")?;
        Ok(bigmap::collect(
            "ledger",
            &items,
            Entries::ActiveOnly,
            |v| numeric::balance("ledger", v),
        )?)
    }

    pub fn get_external_ledger(
        &self,
        indexer: &dyn Indexer,
    ) -> Result<ExternalLedger> {
        let items = indexer
            .bigmap_keys(self.external_ledger)
            .context("failed to get external ledger big map")?;
        Ok(bigmap::collect(
            "external ledger",
            &items,
            Entries::All,
            |v| numeric::balance("external ledger", v),
        )?)
    }

    pub fn get_custodian_metadata(
        &self,
        indexer: &dyn Indexer,
    ) -> Result<CustodianMetadata> {
        let items = indexer
            .bigmap_keys(self.metadata)
            .context("failed to get custodian metadata big map")?;
        Ok(bigmap::collect(
            "custodian metadata",
            &items,
            Entries::All,
            bigmap::metadata_text("custodian metadata"),
        )?)
    }
}
