use crate::error::InputError;

// base58check version bytes per address kind, payload is always a 20 byte hash
const PREFIXES: &[(&str, [u8; 3])] = &[
    ("tz1", [6, 161, 159]),
    ("tz2", [6, 161, 161]),
    ("tz3", [6, 161, 164]),
    ("KT1", [2, 90, 121]),
];
const HASH_LEN: usize = 20;

/// Checks that `address` is an implicit (tz1/tz2/tz3) or originated (KT1)
/// account. An entrypoint suffix (`KT1..%entrypoint`) is accepted.
pub fn validate_address(address: &str) -> Result<(), InputError> {
    let invalid = |reason: String| InputError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    let base = match address.split_once('%') {
        Some((base, entrypoint)) => {
            if entrypoint.is_empty() {
                return Err(invalid("empty entrypoint suffix".to_string()));
            }
            base
        }
        None => address,
    };

    let (_, version) = PREFIXES
        .iter()
        .find(|(prefix, _)| base.starts_with(prefix))
        .ok_or_else(|| invalid("unknown address prefix".to_string()))?;
    let decoded = bs58::decode(base)
        .with_check(None)
        .into_vec()
        .map_err(|e| invalid(format!("{}", e)))?;
    if decoded.len() != version.len() + HASH_LEN {
        return Err(invalid(format!(
            "decoded to {} bytes, expected {}",
            decoded.len(),
            version.len() + HASH_LEN
        )));
    }
    if decoded[..version.len()] != version[..] {
        return Err(invalid("version bytes do not match prefix".to_string()));
    }
    Ok(())
}

/// The binary form the chain orders addresses by: implicit accounts
/// (tagged by curve) before originated ones, then by hash, then by
/// entrypoint. Plain string order puts `KT1` before `tz1`, which is wrong.
pub fn comparable_address(address: &str) -> Result<Vec<u8>, InputError> {
    validate_address(address)?;
    let (base, entrypoint) = match address.split_once('%') {
        Some((base, entrypoint)) => (base, entrypoint),
        None => (address, ""),
    };
    let decoded = bs58::decode(base)
        .with_check(None)
        .into_vec()
        .map_err(|e| InputError::InvalidAddress {
            address: address.to_string(),
            reason: format!("{}", e),
        })?;
    let hash = &decoded[decoded.len() - HASH_LEN..];

    let mut res = Vec::with_capacity(HASH_LEN + 2 + entrypoint.len());
    match &base[..3] {
        "KT1" => {
            res.push(1);
            res.extend_from_slice(hash);
            res.push(0);
        }
        implicit => {
            let curve = match implicit {
                "tz1" => 0,
                "tz2" => 1,
                _ => 2,
            };
            res.push(0);
            res.push(curve);
            res.extend_from_slice(hash);
        }
    }
    res.extend_from_slice(entrypoint.as_bytes());
    Ok(res)
}

#[test]
fn test_validate_address() {
    for valid in &[
        "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
        "KT1U7Adyu5A7JWvEVSKjJEkG2He2SU1nATfq",
        "KT1JdufSdfg3WyxWJcCRNsBFV9V3x9TQBkJ2%borrow_callback",
    ] {
        assert!(validate_address(valid).is_ok(), "{}", valid);
    }
    for invalid in &[
        "",
        "compsci",
        "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcja",
        "KT1U7Adyu5A7JWvEVSKjJEkG2He2SU1nATf",
        "KT1U7Adyu5A7JWvEVSKjJEkG2He2SU1nATfq%",
        "xx1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
    ] {
        assert!(validate_address(invalid).is_err(), "{}", invalid);
    }
}

#[test]
fn test_comparable_address() {
    let key = |a: &str| comparable_address(a).unwrap();
    let tz1_d = "tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB";
    let tz1_v = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
    let kt1 = "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR";

    assert!(key(tz1_v) < key(tz1_d));
    assert!(key(tz1_d) < key(kt1));
    assert!(key(kt1) < key(&format!("{}%retire", kt1)));
    assert_eq!(22, key(tz1_d).len());
    assert_eq!(22, key(kt1).len());
    assert!(comparable_address("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcja").is_err());
}
