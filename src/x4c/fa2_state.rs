use crate::tzkt::Indexer;
use crate::x4c::bigmap::{self, Entries};
use crate::x4c::numeric::{self, nat};
use anyhow::{Context, Result};
use num::BigUint;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FA2Operator {
    pub token_owner: String,
    pub token_operator: String,
    #[serde(with = "nat")]
    pub token_id: BigUint,
}

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
pub struct FA2Owner {
    pub token_owner: String,
    #[serde(with = "nat")]
    pub token_id: BigUint,
}

pub type FA2Ledger = BTreeMap<FA2Owner, i64>;

// string -> bytes on chain, held as text (see bigmap::hex_to_text)
pub type FA2Metadata = BTreeMap<String, String>;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FA2TokenMetadata {
    #[serde(with = "nat")]
    pub token_id: BigUint,
    pub token_info: BTreeMap<String, String>,
}

pub type FA2TokenMetadataMap = BTreeMap<BigUint, FA2TokenMetadata>;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Deserialize)]
#[serde(transparent)]
struct TokenKey(#[serde(with = "nat")] BigUint);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FA2Storage {
    pub oracle: String,
    pub ledger: i64,
    #[serde(default)]
    pub operators: Vec<FA2Operator>,
    pub token_metadata: i64,
    pub metadata: i64,
}

pub fn get_fa2_storage(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<FA2Storage> {
    super::get_storage(indexer, address)
}

impl FA2Storage {
    pub fn get_ledger(&self, indexer: &dyn Indexer) -> Result<FA2Ledger> {
        let items = indexer
            .bigmap_keys(self.ledger)
            .context("failed to get ledger big map")?;
        Ok(bigmap::collect(
            "FA2 ledger",
            &items,
            Entries::ActiveOnly,
            |v| numeric::balance("FA2 ledger", v),
        )?)
    }

    pub fn get_fa2_metadata(
        &self,
        indexer: &dyn Indexer,
    ) -> Result<FA2Metadata> {
        let items = indexer
            .bigmap_keys(self.metadata)
            .context("failed to get FA2 metadata big map")?;
        Ok(bigmap::collect(
            "FA2 metadata",
            &items,
            Entries::All,
            bigmap::metadata_text("FA2 metadata"),
        )?)
    }

    pub fn get_token_metadata(
        &self,
        indexer: &dyn Indexer,
    ) -> Result<FA2TokenMetadataMap> {
        let items = indexer
            .bigmap_keys(self.token_metadata)
            .context("failed to get token metadata big map")?;
        let as_metadata = bigmap::typed::<FA2TokenMetadata>("token metadata");
        let by_key: BTreeMap<TokenKey, FA2TokenMetadata> = bigmap::collect(
            "token metadata",
            &items,
            Entries::ActiveOnly,
            |v| {
                let mut metadata = as_metadata(v)?;
                for value in metadata.token_info.values_mut() {
                    *value = bigmap::hex_to_text(value);
                }
                Ok(metadata)
            },
        )?;
        Ok(by_key
            .into_iter()
            .map(|(k, v)| (k.0, v))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DecodeError;
    use crate::tzkt::mock::{bigmap_item, MockIndexer};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn owner(token_owner: &str, token_id: u32) -> FA2Owner {
        FA2Owner {
            token_owner: token_owner.to_string(),
            token_id: BigUint::from(token_id),
        }
    }

    #[test]
    fn test_fa2_ledger() {
        let mut indexer = MockIndexer::new();
        indexer.add_bigmap(
            11,
            vec![
                bigmap_item(
                    false,
                    json!({"token_owner": "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu", "token_id": "123"}),
                    json!("1462"),
                ),
                bigmap_item(
                    true,
                    json!({"token_owner": "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu", "token_id": "59"}),
                    json!("1000"),
                ),
            ],
        );
        let storage = FA2Storage {
            ledger: 11,
            ..FA2Storage::default()
        };
        let ledger = storage.get_ledger(&indexer).unwrap();

        let mut exp = FA2Ledger::new();
        exp.insert(owner("KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu", 59), 1000);
        assert_eq!(exp, ledger);

        let storage = FA2Storage {
            ledger: 12,
            ..FA2Storage::default()
        };
        assert_eq!(FA2Ledger::new(), storage.get_ledger(&indexer).unwrap());
    }

    #[test]
    fn test_fa2_ledger_balance_out_of_range() {
        let mut indexer = MockIndexer::new();
        indexer.add_bigmap(
            11,
            vec![bigmap_item(
                true,
                json!({"token_owner": "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb", "token_id": "1"}),
                json!("18446744073709551616"),
            )],
        );
        let storage = FA2Storage {
            ledger: 11,
            ..FA2Storage::default()
        };
        let err = storage.get_ledger(&indexer).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DecodeError>(),
            Some(DecodeError::Balance { .. })
        ));
    }

    #[test]
    fn test_fa2_metadata() {
        let mut indexer = MockIndexer::new();
        indexer.add_bigmap(
            13,
            vec![
                bigmap_item(
                    true,
                    json!(""),
                    json!(hex::encode(
                        "https://tzprofiles.com/tzip016_metadata.json"
                    )),
                ),
                bigmap_item(true, json!("contents"), json!("{\"name\": \"x4c\"}")),
            ],
        );
        let storage = FA2Storage {
            metadata: 13,
            ..FA2Storage::default()
        };
        let metadata = storage.get_fa2_metadata(&indexer).unwrap();
        assert_eq!(
            "https://tzprofiles.com/tzip016_metadata.json",
            metadata[""]
        );
        assert_eq!("{\"name\": \"x4c\"}", metadata["contents"]);

        indexer.add_bigmap(13, vec![bigmap_item(true, json!(""), json!(42))]);
        assert!(storage.get_fa2_metadata(&indexer).is_err());
    }

    #[test]
    fn test_token_metadata() {
        let token_metadata = |id: u32, title: &str, url: &str| {
            json!({
                "token_id": format!("{}", id),
                "token_info": {
                    "title": hex::encode(title),
                    "url": hex::encode(url),
                }
            })
        };
        let mut indexer = MockIndexer::new();
        indexer.add_bigmap(
            14,
            vec![
                bigmap_item(
                    true,
                    json!("123"),
                    token_metadata(123, "My project", "http://project.url"),
                ),
                bigmap_item(true, json!("58"), token_metadata(58, "bob", "urlish")),
                bigmap_item(false, json!("7"), token_metadata(7, "gone", "gone")),
            ],
        );
        let storage = FA2Storage {
            token_metadata: 14,
            ..FA2Storage::default()
        };
        let res = storage.get_token_metadata(&indexer).unwrap();
        assert_eq!(
            vec![BigUint::from(58u32), BigUint::from(123u32)],
            res.keys().cloned().collect::<Vec<BigUint>>()
        );
        let project = &res[&BigUint::from(123u32)];
        assert_eq!("My project", project.token_info["title"]);
        assert_eq!("http://project.url", project.token_info["url"]);

        indexer.add_bigmap(
            14,
            vec![bigmap_item(true, json!("not a number"), token_metadata(1, "a", "b"))],
        );
        assert!(storage.get_token_metadata(&indexer).is_err());
    }

    #[test]
    fn test_get_fa2_storage() {
        let mut indexer = MockIndexer::new();
        indexer.add_storage(
            "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu",
            json!({
                "oracle": "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
                "ledger": 100,
                "operators": [],
                "token_metadata": 101,
                "metadata": 102
            }),
        );
        let storage =
            get_fa2_storage(&indexer, "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu")
                .unwrap();
        assert_eq!(
            FA2Storage {
                oracle: "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb".to_string(),
                ledger: 100,
                operators: vec![],
                token_metadata: 101,
                metadata: 102,
            },
            storage
        );
    }
}
