use crate::error::DecodeError;
use crate::michelson::PackedString;
use crate::tzkt::Indexer;
use crate::x4c::custodian_state::TokenID;
use crate::x4c::numeric::nat;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use num::BigUint;
use serde::de::DeserializeOwned;

pub const TAG_INTERNAL_MINT: &str = "internal_mint";
pub const TAG_INTERNAL_TRANSFER: &str = "internal_transfer";
pub const TAG_RETIRE: &str = "retire";

/// A decoded event together with where it sits in the chain history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent<T> {
    pub id: i64,
    pub level: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InternalMintEvent {
    pub token: TokenID,
    #[serde(with = "nat")]
    pub amount: BigUint,
    #[serde(with = "nat")]
    pub new_total: BigUint,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InternalTransferEvent {
    pub token: TokenID,
    #[serde(with = "nat")]
    pub amount: BigUint,
    pub from: PackedString,
    pub to: PackedString,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustodianRetireEvent {
    pub token: TokenID,
    #[serde(with = "nat")]
    pub amount: BigUint,
    pub retiring_party: String,
    pub retiring_party_kyc: PackedString,
    pub reason: PackedString,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FA2RetireEvent {
    #[serde(with = "nat")]
    pub token_id: BigUint,
    #[serde(with = "nat")]
    pub amount: BigUint,
    pub retiring_party: String,
    pub reason: PackedString,
}

fn get_events<T>(
    indexer: &dyn Indexer,
    address: &str,
    tag: &'static str,
) -> Result<Vec<ContractEvent<T>>>
where
    T: DeserializeOwned,
{
    let raw = indexer
        .contract_events(address, tag)
        .with_context(|| format!("failed to find {} events", tag))?;

    let mut res = Vec::with_capacity(raw.len());
    for event in raw {
        let data: T = serde_json::from_value(event.payload.clone()).map_err(
            |source| DecodeError::EventPayload {
                tag,
                id: event.id,
                payload: event.payload.to_string(),
                source,
            },
        )?;
        res.push(ContractEvent {
            id: event.id,
            level: event.level,
            timestamp: event.timestamp,
            data,
        });
    }
    debug!("decoded {} {} events of {}", res.len(), tag, address);
    Ok(res)
}

pub fn get_internal_mint_events(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<Vec<ContractEvent<InternalMintEvent>>> {
    get_events(indexer, address, TAG_INTERNAL_MINT)
}

pub fn get_internal_transfer_events(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<Vec<ContractEvent<InternalTransferEvent>>> {
    get_events(indexer, address, TAG_INTERNAL_TRANSFER)
}

pub fn get_custodian_retire_events(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<Vec<ContractEvent<CustodianRetireEvent>>> {
    get_events(indexer, address, TAG_RETIRE)
}

pub fn get_fa2_retire_events(
    indexer: &dyn Indexer,
    address: &str,
) -> Result<Vec<ContractEvent<FA2RetireEvent>>> {
    get_events(indexer, address, TAG_RETIRE)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tzkt::mock::{event, MockIndexer};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CUSTODIAN: &str = "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR";
    const FA2: &str = "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu";

    fn token() -> serde_json::Value {
        json!({"token_id": "42", "token_address": FA2})
    }

    #[test]
    fn test_internal_mint_events() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            CUSTODIAN,
            TAG_INTERNAL_MINT,
            vec![
                event(
                    1,
                    TAG_INTERNAL_MINT,
                    json!({"token": token(), "amount": "100", "new_total": "100"}),
                ),
                event(
                    2,
                    TAG_INTERNAL_MINT,
                    json!({"token": token(), "amount": "50", "new_total": "150"}),
                ),
            ],
        );
        let events = get_internal_mint_events(&indexer, CUSTODIAN).unwrap();
        assert_eq!(2, events.len());
        assert_eq!(1, events[0].id);
        assert_eq!(BigUint::from(50u32), events[1].data.amount);
        assert_eq!(BigUint::from(150u32), events[1].data.new_total);
        assert_eq!(FA2, events[1].data.token.token_address);

        assert!(get_internal_mint_events(&indexer, FA2)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_internal_transfer_events() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            CUSTODIAN,
            TAG_INTERNAL_TRANSFER,
            vec![event(
                3,
                TAG_INTERNAL_TRANSFER,
                json!({
                    "token": token(),
                    "amount": "7",
                    "from": "05010000000473656c66",
                    "to": "not packed"
                }),
            )],
        );
        let events =
            get_internal_transfer_events(&indexer, CUSTODIAN).unwrap();
        assert_eq!(1, events.len());
        let transfer = &events[0].data;
        assert_eq!("self", transfer.from.text());
        assert_eq!("not packed", transfer.to.text());
        assert_eq!("not packed", transfer.to.raw());
    }

    #[test]
    fn test_custodian_retire_events() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            CUSTODIAN,
            TAG_RETIRE,
            vec![event(
                4,
                TAG_RETIRE,
                json!({
                    "token": token(),
                    "amount": "456",
                    "retiring_party": "tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB",
                    "retiring_party_kyc": crate::michelson::packed::encode("compsci").unwrap(),
                    "reason": crate::michelson::packed::encode("fun").unwrap()
                }),
            )],
        );
        let events = get_custodian_retire_events(&indexer, CUSTODIAN).unwrap();
        let retire = &events[0].data;
        assert_eq!(BigUint::from(456u32), retire.amount);
        assert_eq!("compsci", retire.retiring_party_kyc.text());
        assert_eq!("fun", retire.reason.decode().unwrap());
        assert_eq!("tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB", retire.retiring_party);
    }

    #[test]
    fn test_fa2_retire_events() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            FA2,
            TAG_RETIRE,
            vec![event(
                5,
                TAG_RETIRE,
                json!({
                    "token_id": 42,
                    "amount": "1",
                    "retiring_party": CUSTODIAN,
                    "reason": "0501000000096f74686572206f7267"
                }),
            )],
        );
        let events = get_fa2_retire_events(&indexer, FA2).unwrap();
        assert_eq!(BigUint::from(42u32), events[0].data.token_id);
        assert_eq!("other org", events[0].data.reason.text());

        let out = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json!(5), out["id"]);
        assert_eq!(json!("42"), out["token_id"]);
        assert_eq!(json!("0501000000096f74686572206f7267"), out["reason"]);
    }

    #[test]
    fn test_events_fail_on_one_bad_payload() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            FA2,
            TAG_RETIRE,
            vec![
                event(
                    6,
                    TAG_RETIRE,
                    json!({
                        "token_id": "1",
                        "amount": "1",
                        "retiring_party": CUSTODIAN,
                        "reason": "05010000000473656c66"
                    }),
                ),
                // the historical encoding: hex of the bare reason as payload
                event(7, TAG_RETIRE, json!("66756e")),
            ],
        );
        let err = get_fa2_retire_events(&indexer, FA2).unwrap_err();
        match err.downcast_ref::<DecodeError>() {
            Some(DecodeError::EventPayload { tag, id, .. }) => {
                assert_eq!("retire", *tag);
                assert_eq!(7, *id);
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(get_fa2_retire_events(&MockIndexer::failing(), FA2).is_err());
    }
}
