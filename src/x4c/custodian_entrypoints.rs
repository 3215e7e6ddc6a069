use crate::error::InputError;
use crate::michelson::{packed, validate_address, Parameters, Value};
use crate::submit::Submitter;
use crate::x4c::custodian_state::TokenID;
use anyhow::{Context, Result};
use num::BigUint;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperatorUpdateType {
    Add,
    Remove,
}

impl FromStr for OperatorUpdateType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "1" => Ok(OperatorUpdateType::Add),
            "remove" | "2" => Ok(OperatorUpdateType::Remove),
            _ => Err(InputError::UnknownUpdateType(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CustodianOperatorUpdate {
    /// plain text, packed when the parameters are built
    pub owner_kyc: String,
    pub operator: String,
    pub token_id: BigUint,
    pub update_type: OperatorUpdateType,
}

fn packed_bytes(field: &'static str, text: &str) -> Result<Value, InputError> {
    packed::pack(text)
        .map(Value::Bytes)
        .map_err(|source| InputError::Packing { field, source })
}

fn address(a: &str) -> Result<Value, InputError> {
    validate_address(a)?;
    Ok(Value::string(a))
}

// list (pair (address %token_address) (nat %token_id))
pub fn internal_mint(tokens: &[TokenID]) -> Result<Parameters> {
    let mut xs = Vec::with_capacity(tokens.len());
    for token in tokens {
        xs.push(Value::pair(
            address(&token.token_address)?,
            Value::nat(token.token_id.clone()),
        ));
    }
    Ok(Parameters::new("internal_mint", Value::Seq(xs)))
}

// list (pair (bytes %from_)
//            (pair (address %token_address)
//                  (list %txs (pair (bytes %to_) (pair (nat %token_id) (nat %amount))))))
pub fn internal_transfer(
    token: &TokenID,
    amount: &BigUint,
    current_kyc: &str,
    new_kyc: &str,
) -> Result<Parameters> {
    let tx = Value::pair(
        packed_bytes("new kyc", new_kyc)?,
        Value::pair(
            Value::nat(token.token_id.clone()),
            Value::nat(amount.clone()),
        ),
    );
    let value = Value::Seq(vec![Value::pair(
        packed_bytes("current kyc", current_kyc)?,
        Value::pair(address(&token.token_address)?, Value::Seq(vec![tx])),
    )]);
    Ok(Parameters::new("internal_transfer", value))
}

// list (or (pair %add_operator (bytes %token_owner) (pair (address %token_operator) (nat %token_id)))
//          (pair %remove_operator (bytes %token_owner) (pair (address %token_operator) (nat %token_id))))
pub fn update_internal_operators(
    updates: &[CustodianOperatorUpdate],
) -> Result<Parameters> {
    let mut xs = Vec::with_capacity(updates.len());
    for (i, update) in updates.iter().enumerate() {
        let operator = Value::pair(
            packed_bytes("owner", &update.owner_kyc)?,
            Value::pair(
                address(&update.operator)
                    .with_context(|| format!("operator update {}", i))?,
                Value::nat(update.token_id.clone()),
            ),
        );
        xs.push(match update.update_type {
            OperatorUpdateType::Add => Value::left(operator),
            OperatorUpdateType::Remove => Value::right(operator),
        });
    }
    Ok(Parameters::new("update_internal_operators", Value::Seq(xs)))
}

// list (pair (address %token_address)
//            (list %txs (pair (pair (nat %amount) (bytes %retiring_data))
//                             (pair (bytes %retiring_party_kyc) (nat %token_id)))))
pub fn retire(
    token: &TokenID,
    kyc: &str,
    amount: &BigUint,
    reason: &str,
) -> Result<Parameters> {
    let tx = Value::pair(
        Value::pair(Value::nat(amount.clone()), packed_bytes("reason", reason)?),
        Value::pair(
            packed_bytes("kyc", kyc)?,
            Value::nat(token.token_id.clone()),
        ),
    );
    let value = Value::Seq(vec![Value::pair(
        address(&token.token_address)?,
        Value::Seq(vec![tx]),
    )]);
    Ok(Parameters::new("retire", value))
}

/// Initial storage of a freshly originated custodian: `owner` and nothing
/// else, `Pair (Pair (Pair owner {}) {} {}) {}`.
pub fn custodian_origination_storage(owner: &str) -> Result<Value> {
    let empty = || Value::Seq(vec![]);
    Ok(Value::pair(
        Value::comb(vec![
            Value::pair(address(owner)?, empty()),
            empty(),
            empty(),
        ]),
        empty(),
    ))
}

pub fn submit_internal_mint(
    submitter: &dyn Submitter,
    signer: &str,
    target: &str,
    tokens: &[TokenID],
) -> Result<String> {
    let parameters = internal_mint(tokens)?;
    submitter
        .call_contract(signer, target, &parameters)
        .with_context(|| format!("internal_mint on {} failed", target))
}

pub fn submit_internal_transfer(
    submitter: &dyn Submitter,
    signer: &str,
    target: &str,
    token: &TokenID,
    amount: &BigUint,
    current_kyc: &str,
    new_kyc: &str,
) -> Result<String> {
    let parameters = internal_transfer(token, amount, current_kyc, new_kyc)?;
    submitter
        .call_contract(signer, target, &parameters)
        .with_context(|| format!("internal_transfer on {} failed", target))
}

pub fn submit_update_internal_operators(
    submitter: &dyn Submitter,
    signer: &str,
    target: &str,
    updates: &[CustodianOperatorUpdate],
) -> Result<String> {
    let parameters = update_internal_operators(updates)?;
    submitter
        .call_contract(signer, target, &parameters)
        .with_context(|| {
            format!("update_internal_operators on {} failed", target)
        })
}

pub fn submit_retire(
    submitter: &dyn Submitter,
    signer: &str,
    target: &str,
    token: &TokenID,
    kyc: &str,
    amount: &BigUint,
    reason: &str,
) -> Result<String> {
    let parameters = retire(token, kyc, amount, reason)?;
    submitter
        .call_contract(signer, target, &parameters)
        .with_context(|| format!("retire on {} failed", target))
}

pub fn custodian_originate(
    submitter: &dyn Submitter,
    signer: &str,
    code: &serde_json::Value,
    owner: &str,
) -> Result<String> {
    let storage = custodian_origination_storage(owner)?;
    info!("originating custodian owned by {}", owner);
    submitter
        .originate(signer, code, &storage)
        .context("custodian origination failed")
}
