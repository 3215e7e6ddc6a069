use crate::michelson::{validate_address, Parameters, Value};
use crate::submit::Submitter;
use anyhow::{Context, Result};
use num::BigUint;

// list (pair (nat %token_id) (map %token_info string bytes))
pub fn add_token_id(
    token_id: &BigUint,
    title: &str,
    url: &str,
) -> Result<Parameters> {
    // map literals must be key ordered, "title" < "url"
    let token_info = Value::map(vec![
        (Value::string("title"), Value::bytes(title.as_bytes())),
        (Value::string("url"), Value::bytes(url.as_bytes())),
    ]);
    Ok(Parameters::new(
        "add_token_id",
        Value::Seq(vec![Value::pair(
            Value::nat(token_id.clone()),
            token_info,
        )]),
    ))
}

// list (pair (pair (address %owner) (nat %qty)) (nat %token_id))
pub fn mint(
    token_id: &BigUint,
    owner: &str,
    amount: &BigUint,
) -> Result<Parameters> {
    validate_address(owner)?;
    Ok(Parameters::new(
        "mint",
        Value::Seq(vec![Value::pair(
            Value::pair(Value::string(owner), Value::nat(amount.clone())),
            Value::nat(token_id.clone()),
        )]),
    ))
}

pub fn submit_add_token_id(
    submitter: &dyn Submitter,
    oracle: &str,
    target: &str,
    token_id: &BigUint,
    title: &str,
    url: &str,
) -> Result<String> {
    let parameters = add_token_id(token_id, title, url)?;
    submitter
        .call_contract(oracle, target, &parameters)
        .with_context(|| format!("add_token_id on {} failed", target))
}

pub fn submit_mint(
    submitter: &dyn Submitter,
    oracle: &str,
    target: &str,
    token_id: &BigUint,
    owner: &str,
    amount: &BigUint,
) -> Result<String> {
    let parameters = mint(token_id, owner, amount)?;
    submitter
        .call_contract(oracle, target, &parameters)
        .with_context(|| format!("mint on {} failed", target))
}
