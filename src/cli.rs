use crate::config::Config;
use crate::michelson::Parameters;
use crate::tzkt::Indexer;
use crate::x4c::custodian_entrypoints::{
    self, custodian_origination_storage, CustodianOperatorUpdate,
    OperatorUpdateType,
};
use crate::x4c::events::{
    get_custodian_retire_events, get_fa2_retire_events,
    get_internal_mint_events, get_internal_transfer_events,
};
use crate::x4c::fa2_entrypoints;
use crate::x4c::snapshot::FA2Snapshot;
use crate::x4c::{get_custodian_storage, get_fa2_storage, TokenID};
use anyhow::{Context, Result};
use itertools::Itertools;
use num::BigUint;
use std::fs;

#[derive(Clone, Debug, PartialEq)]
pub enum EventsOf {
    Custodian,
    FA2,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliAction {
    CustodianInfo { contract: String },
    FA2Info { contract: String },
    Events { contract: String, of: EventsOf },
    FA2Snapshot { contract: String, out: Option<String> },
    FA2OriginationStorage { snapshot: String },
    CustodianOriginationStorage { owner: String },
    Params(ParamsAction),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamsAction {
    InternalMint {
        token_address: String,
        token_ids: Vec<BigUint>,
    },
    InternalTransfer {
        token_address: String,
        token_id: BigUint,
        amount: BigUint,
        from: String,
        to: String,
    },
    UpdateInternalOperators {
        kyc: String,
        operator: String,
        token_id: BigUint,
        update_type: OperatorUpdateType,
    },
    Retire {
        token_address: String,
        token_id: BigUint,
        kyc: String,
        amount: BigUint,
        reason: String,
    },
    AddTokenId {
        token_id: BigUint,
        title: String,
        url: String,
    },
    Mint {
        token_id: BigUint,
        owner: String,
        amount: BigUint,
    },
}

pub fn process_cli_action(
    config: &Config,
    indexer: &dyn Indexer,
    action: &CliAction,
) -> Result<()> {
    info!("processing cli action: {:?}", action);
    let out = run(config, indexer, action)?;
    p!("{}", out);
    Ok(())
}

fn run(
    config: &Config,
    indexer: &dyn Indexer,
    action: &CliAction,
) -> Result<String> {
    match action {
        CliAction::CustodianInfo { contract } => {
            custodian_info(config, indexer, contract)
        }
        CliAction::FA2Info { contract } => fa2_info(config, indexer, contract),
        CliAction::Events { contract, of } => events(indexer, contract, of),
        CliAction::FA2Snapshot { contract, out } => {
            let snapshot = FA2Snapshot::from_contract(indexer, contract)?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            match out {
                Some(fpath) => {
                    fs::write(fpath, json)
                        .with_context(|| format!("failed to write {}", fpath))?;
                    Ok(format!("saved snapshot of {} to {}", contract, fpath))
                }
                None => Ok(json),
            }
        }
        CliAction::FA2OriginationStorage { snapshot } => {
            let content = fs::read_to_string(snapshot)
                .with_context(|| format!("failed to read {}", snapshot))?;
            let snapshot: FA2Snapshot = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", snapshot))?;
            let storage = snapshot.origination_storage()?;
            Ok(serde_json::to_string_pretty(&storage.to_micheline())?)
        }
        CliAction::CustodianOriginationStorage { owner } => {
            let storage = custodian_origination_storage(owner)?;
            Ok(serde_json::to_string_pretty(&storage.to_micheline())?)
        }
        CliAction::Params(params) => {
            let parameters = build_parameters(params)?;
            Ok(serde_json::to_string_pretty(&parameters.to_micheline())?)
        }
    }
}

fn token(address: &str, token_id: &BigUint) -> TokenID {
    TokenID {
        token_id: token_id.clone(),
        token_address: address.to_string(),
    }
}

fn build_parameters(params: &ParamsAction) -> Result<Parameters> {
    match params {
        ParamsAction::InternalMint {
            token_address,
            token_ids,
        } => {
            let tokens: Vec<TokenID> = token_ids
                .iter()
                .map(|id| token(token_address, id))
                .collect();
            custodian_entrypoints::internal_mint(&tokens)
        }
        ParamsAction::InternalTransfer {
            token_address,
            token_id,
            amount,
            from,
            to,
        } => custodian_entrypoints::internal_transfer(
            &token(token_address, token_id),
            amount,
            from,
            to,
        ),
        ParamsAction::UpdateInternalOperators {
            kyc,
            operator,
            token_id,
            update_type,
        } => custodian_entrypoints::update_internal_operators(&[
            CustodianOperatorUpdate {
                owner_kyc: kyc.clone(),
                operator: operator.clone(),
                token_id: token_id.clone(),
                update_type: *update_type,
            },
        ]),
        ParamsAction::Retire {
            token_address,
            token_id,
            kyc,
            amount,
            reason,
        } => custodian_entrypoints::retire(
            &token(token_address, token_id),
            kyc,
            amount,
            reason,
        ),
        ParamsAction::AddTokenId {
            token_id,
            title,
            url,
        } => fa2_entrypoints::add_token_id(token_id, title, url),
        ParamsAction::Mint {
            token_id,
            owner,
            amount,
        } => fa2_entrypoints::mint(token_id, owner, amount),
    }
}

fn custodian_info(
    config: &Config,
    indexer: &dyn Indexer,
    contract: &str,
) -> Result<String> {
    let storage = get_custodian_storage(indexer, contract)?;
    let ledger = storage.get_ledger(indexer)?;
    let external_ledger = storage.get_external_ledger(indexer)?;
    let metadata = storage.get_custodian_metadata(indexer)?;

    let mut lines = vec![
        format!("custodian {} ({})", contract, config.contract_link(contract)),
        format!("owner: {}", storage.custodian),
        format!("ledger ({} entries):", ledger.len()),
    ];
    lines.extend(ledger.iter().map(|(key, balance)| {
        format!(
            "  {}/{} {}: {}",
            key.token.token_address, key.token.token_id, key.kyc, balance
        )
    }));
    lines.push(format!("external ledger ({} entries):", external_ledger.len()));
    lines.extend(external_ledger.iter().map(|(token, balance)| {
        format!("  {}/{}: {}", token.token_address, token.token_id, balance)
    }));
    lines.push(format!("operators ({}):", storage.operators.len()));
    lines.extend(storage.operators.iter().map(|op| {
        format!("  {} -> {} (token {})", op.kyc, op.operator, op.token_id)
    }));
    lines.push(format!("metadata ({} entries):", metadata.len()));
    lines.extend(
        metadata
            .iter()
            .map(|(k, v)| format!("  {:?}: {}", k, v)),
    );
    Ok(lines.iter().join("\n"))
}

fn fa2_info(
    config: &Config,
    indexer: &dyn Indexer,
    contract: &str,
) -> Result<String> {
    let storage = get_fa2_storage(indexer, contract)?;
    let ledger = storage.get_ledger(indexer)?;
    let token_metadata = storage.get_token_metadata(indexer)?;
    let metadata = storage.get_fa2_metadata(indexer)?;

    let mut lines = vec![
        format!("FA2 {} ({})", contract, config.contract_link(contract)),
        format!("oracle: {}", storage.oracle),
        format!("tokens ({}):", token_metadata.len()),
    ];
    lines.extend(token_metadata.iter().map(|(id, token)| {
        format!(
            "  {}: {}",
            id,
            token
                .token_info
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .join(", ")
        )
    }));
    lines.push(format!("ledger ({} entries):", ledger.len()));
    lines.extend(ledger.iter().map(|(owner, balance)| {
        format!("  {}/{}: {}", owner.token_owner, owner.token_id, balance)
    }));
    lines.push(format!("metadata ({} entries):", metadata.len()));
    lines.extend(
        metadata
            .iter()
            .map(|(k, v)| format!("  {:?}: {}", k, v)),
    );
    Ok(lines.iter().join("\n"))
}

fn events(
    indexer: &dyn Indexer,
    contract: &str,
    of: &EventsOf,
) -> Result<String> {
    let mut lines: Vec<(i64, String)> = vec![];
    match of {
        EventsOf::Custodian => {
            for ev in get_internal_mint_events(indexer, contract)? {
                let d = &ev.data;
                lines.push((
                    ev.id,
                    format!(
                        "{} #{} mint {} of {}/{} (total {})",
                        ev.timestamp.to_rfc3339(),
                        ev.level,
                        d.amount,
                        d.token.token_address,
                        d.token.token_id,
                        d.new_total
                    ),
                ));
            }
            for ev in get_internal_transfer_events(indexer, contract)? {
                let d = &ev.data;
                lines.push((
                    ev.id,
                    format!(
                        "{} #{} transfer {} of {}/{} from {} to {}",
                        ev.timestamp.to_rfc3339(),
                        ev.level,
                        d.amount,
                        d.token.token_address,
                        d.token.token_id,
                        d.from,
                        d.to
                    ),
                ));
            }
            for ev in get_custodian_retire_events(indexer, contract)? {
                let d = &ev.data;
                lines.push((
                    ev.id,
                    format!(
                        "{} #{} retire {} of {}/{} by {} ({}): {}",
                        ev.timestamp.to_rfc3339(),
                        ev.level,
                        d.amount,
                        d.token.token_address,
                        d.token.token_id,
                        d.retiring_party,
                        d.retiring_party_kyc,
                        d.reason
                    ),
                ));
            }
        }
        EventsOf::FA2 => {
            for ev in get_fa2_retire_events(indexer, contract)? {
                let d = &ev.data;
                lines.push((
                    ev.id,
                    format!(
                        "{} #{} retire {} of token {} by {}: {}",
                        ev.timestamp.to_rfc3339(),
                        ev.level,
                        d.amount,
                        d.token_id,
                        d.retiring_party,
                        d.reason
                    ),
                ));
            }
        }
    }
    Ok(lines
        .into_iter()
        .sorted_by_key(|(id, _)| *id)
        .map(|(_, line)| line)
        .join("\n"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{is_decode_error, is_input_error};
    use crate::michelson::packed::encode;
    use crate::tzkt::mock::{bigmap_item, event, MockIndexer};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CUSTODIAN: &str = "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR";
    const FA2: &str = "KT1Jt2kGneGyh4kYB6BcXkdXr4NKqnxg9dMu";
    const OWNER: &str = "tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB";

    fn token_json() -> serde_json::Value {
        json!({"token_id": "42", "token_address": FA2})
    }

    #[test]
    fn test_custodian_info() {
        let mut indexer = MockIndexer::new();
        indexer.add_storage(
            CUSTODIAN,
            json!({
                "custodian": OWNER,
                "ledger": 1,
                "metadata": 2,
                "operators": [],
                "external_ledger": 3
            }),
        );
        indexer.add_bigmap(
            1,
            vec![bigmap_item(
                true,
                json!({"token": token_json(), "kyc": "0501000000096f74686572206f7267"}),
                json!("1234"),
            )],
        );
        let out = run(
            &Config::default(),
            &indexer,
            &CliAction::CustodianInfo {
                contract: CUSTODIAN.to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            vec![
                format!("custodian {} (https://tzkt.io/{})", CUSTODIAN, CUSTODIAN),
                format!("owner: {}", OWNER),
                "ledger (1 entries):".to_string(),
                format!("  {}/42 other org: 1234", FA2),
                "external ledger (0 entries):".to_string(),
                "operators (0):".to_string(),
                "metadata (0 entries):".to_string(),
            ],
            out.lines().map(String::from).collect::<Vec<String>>()
        );
    }

    #[test]
    fn test_events_in_order() {
        let mut indexer = MockIndexer::new();
        indexer.add_events(
            CUSTODIAN,
            "internal_mint",
            vec![event(
                1,
                "internal_mint",
                json!({"token": token_json(), "amount": "10", "new_total": "10"}),
            )],
        );
        indexer.add_events(
            CUSTODIAN,
            "retire",
            vec![event(
                3,
                "retire",
                json!({
                    "token": token_json(),
                    "amount": "4",
                    "retiring_party": OWNER,
                    "retiring_party_kyc": encode("self").unwrap(),
                    "reason": encode("offset").unwrap()
                }),
            )],
        );
        indexer.add_events(
            CUSTODIAN,
            "internal_transfer",
            vec![event(
                2,
                "internal_transfer",
                json!({
                    "token": token_json(),
                    "amount": "6",
                    "from": encode("self").unwrap(),
                    "to": encode("other org").unwrap()
                }),
            )],
        );
        let out = events(&indexer, CUSTODIAN, &EventsOf::Custodian).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[0].ends_with(&format!("mint 10 of {}/42 (total 10)", FA2)));
        assert!(lines[1].ends_with("from self to other org"));
        assert!(lines[2].ends_with(&format!("by {} (self): offset", OWNER)));

        assert_eq!("", events(&indexer, FA2, &EventsOf::FA2).unwrap());

        // custodian shaped retire events don't decode as FA2 ones
        let err = events(&indexer, CUSTODIAN, &EventsOf::FA2).unwrap_err();
        assert!(is_decode_error(&err));
    }

    #[test]
    fn test_params() {
        let out = run(
            &Config::default(),
            &MockIndexer::new(),
            &CliAction::Params(ParamsAction::Mint {
                token_id: BigUint::from(1u32),
                owner: OWNER.to_string(),
                amount: BigUint::from(5u32),
            }),
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json!("mint"), parsed["entrypoint"]);

        let err = build_parameters(&ParamsAction::InternalMint {
            token_address: "nope".to_string(),
            token_ids: vec![BigUint::from(1u32)],
        })
        .unwrap_err();
        assert!(is_input_error(&err));
    }

    #[test]
    fn test_custodian_origination_storage() {
        let out = run(
            &Config::default(),
            &MockIndexer::failing(),
            &CliAction::CustodianOriginationStorage {
                owner: OWNER.to_string(),
            },
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json!("Pair"), parsed["prim"]);
    }
}
