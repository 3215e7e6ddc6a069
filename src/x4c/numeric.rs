use crate::error::{DecodeError, InputError};
use num::BigUint;
use std::str::FromStr;

#[cfg(test)]
use pretty_assertions::assert_eq;

/// Serde glue for naturals that indexers hand out either as JSON numbers
/// or as decimal strings. Always written back as a string.
///
/// Text is arbitrary precision. JSON numbers are limited to u64, larger ones
/// already lost precision in the JSON parser and are rejected.
pub mod nat {
    use num::BigUint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
        Float(f64),
    }

    pub fn serialize<S>(n: &BigUint, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&n.to_string())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(BigUint::from(n)),
            Raw::Float(f) if f.fract() == 0.0 && f >= u64::MAX as f64 => {
                Err(D::Error::custom(format!(
                    "{} does not fit a u64, naturals this large must be decimal strings",
                    f
                )))
            }
            Raw::Float(f) => Err(D::Error::custom(format!(
                "{} is not a natural number",
                f
            ))),
            Raw::Text(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(D::Error::custom(format!(
                        "{:?} is not a natural number",
                        s
                    )));
                }
                BigUint::from_str(&s).map_err(D::Error::custom)
            }
        }
    }
}

/// Ledger balances are text encoded on the wire, but held as i64.
pub(crate) fn balance(
    what: &'static str,
    raw: &serde_json::Value,
) -> Result<i64, DecodeError> {
    let fail = |reason: String| DecodeError::Balance {
        what,
        value: raw.to_string(),
        reason,
    };
    match raw {
        serde_json::Value::String(s) => {
            s.parse::<i64>().map_err(|e| fail(e.to_string()))
        }
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| fail("out of range for i64".to_string())),
        _ => Err(fail("expected a number".to_string())),
    }
}

pub fn parse_nat(field: &'static str, s: &str) -> Result<BigUint, InputError> {
    let invalid = || InputError::InvalidNat {
        field,
        value: s.to_string(),
    };
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    BigUint::from_str(s).map_err(|_| invalid())
}

/// Like `parse_nat`, additionally rejecting 0 (moving zero tokens is
/// always a caller mistake).
pub fn parse_amount(
    field: &'static str,
    s: &str,
) -> Result<BigUint, InputError> {
    let n = parse_nat(field, s)?;
    if n == BigUint::from(0u32) {
        return Err(InputError::NotPositive { field });
    }
    Ok(n)
}

#[test]
fn test_balance() {
    use serde_json::json;

    assert_eq!(1234, balance("ledger", &json!("1234")).unwrap());
    assert_eq!(1234, balance("ledger", &json!(1234)).unwrap());
    assert_eq!(-5, balance("ledger", &json!("-5")).unwrap());
    assert!(balance("ledger", &json!("invalid")).is_err());
    assert!(balance("ledger", &json!("92233720368547758070")).is_err());
    assert!(balance("ledger", &json!(1.5)).is_err());
    assert!(balance("ledger", &json!({"amount": "1"})).is_err());
}

#[test]
fn test_nat_serde() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct T {
        #[serde(with = "nat")]
        n: BigUint,
    }
    let from_text: T = serde_json::from_str(r#"{"n": "123"}"#).unwrap();
    let from_num: T = serde_json::from_str(r#"{"n": 123}"#).unwrap();
    assert_eq!(from_text, from_num);
    assert_eq!(r#"{"n":"123"}"#, serde_json::to_string(&from_num).unwrap());

    let huge: T =
        serde_json::from_str(r#"{"n": "340282366920938463463374607431768211456"}"#)
            .unwrap();
    assert_eq!(
        "340282366920938463463374607431768211456",
        huge.n.to_string()
    );

    let max: T = serde_json::from_str(r#"{"n": 18446744073709551615}"#).unwrap();
    assert_eq!(u64::MAX.to_string(), max.n.to_string());
    let err = serde_json::from_str::<T>(r#"{"n": 18446744073709551616}"#)
        .unwrap_err();
    assert!(err.to_string().contains("decimal strings"), "{}", err);

    for bad in &[
        r#"{"n": "-1"}"#,
        r#"{"n": -1}"#,
        r#"{"n": ""}"#,
        r#"{"n": "1e3"}"#,
        r#"{"n": 1.5}"#,
    ] {
        assert!(serde_json::from_str::<T>(bad).is_err(), "{}", bad);
    }
}

#[test]
fn test_parse_amount() {
    assert_eq!(BigUint::from(456u32), parse_amount("amount", "456").unwrap());
    assert!(matches!(
        parse_amount("amount", "0"),
        Err(InputError::NotPositive { field: "amount" })
    ));
    assert!(parse_nat("token id", "-3").is_err());
    assert!(parse_nat("token id", "12a").is_err());
    assert_eq!(BigUint::from(0u32), parse_nat("token id", "0").unwrap());
}
