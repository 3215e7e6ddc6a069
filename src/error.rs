use crate::michelson::PackedStringError;
use thiserror::Error;

/// Chain or indexer data that did not have the shape we expect. Decoders
/// never hand out partial results next to one of these.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode {what} key {key}: {source}")]
    BigMapKey {
        what: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode {what} value {value}: {source}")]
    BigMapValue {
        what: &'static str,
        value: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to convert {value:?} to a {what} balance: {reason}")]
    Balance {
        what: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to decode {tag} event (id={id}) payload {payload}: {source}")]
    EventPayload {
        tag: &'static str,
        id: i64,
        payload: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode storage of {address}: {source}")]
    Storage {
        address: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller supplied arguments that can't be turned into a contract call,
/// raised before anything is sent out.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error(
        "unknown operator update type {0:?} (expected add/1 or remove/2)"
    )]
    UnknownUpdateType(String),
    #[error("invalid {field}: {value:?} is not a natural number")]
    InvalidNat { field: &'static str, value: String },
    #[error("range {range} spans more than {max} token ids")]
    RangeTooLarge { range: String, max: u64 },
    #[error("{field} must be larger than 0")]
    NotPositive { field: &'static str },
    #[error("balance {balance} of {key} can't be stored as a nat")]
    NegativeBalance { key: String, balance: i64 },
    #[error("failed to pack {field}: {source}")]
    Packing {
        field: &'static str,
        #[source]
        source: PackedStringError,
    },
}

/// Whether `err` (or anything it wraps) was caused by bad input, as opposed
/// to bad chain data or transport trouble.
pub fn is_input_error(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.is::<InputError>())
}

pub fn is_decode_error(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|e| e.is::<DecodeError>() || e.is::<PackedStringError>())
}

pub fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

#[macro_export]
macro_rules! p {
    ( $( $a:expr) , + ) => {
        if $crate::error::stdout_is_tty() {
            println!( $( $a, )* );
        } else {
            info!( $( $a, )* );
        }
    };
}

#[test]
fn test_error_classification() {
    use anyhow::Context;

    let input: anyhow::Result<()> =
        Err(InputError::UnknownUpdateType("3".to_string()))
            .context("failed to build update_internal_operators");
    let input = input.unwrap_err();
    assert!(is_input_error(&input));
    assert!(!is_decode_error(&input));

    let decode: anyhow::Result<()> = Err(DecodeError::Balance {
        what: "ledger",
        value: "invalid".to_string(),
        reason: "not a number".to_string(),
    })
    .context("failed to get ledger");
    let decode = decode.unwrap_err();
    assert!(is_decode_error(&decode));
    assert!(!is_input_error(&decode));

    let transport = anyhow::anyhow!("bad http status code: 502");
    assert!(!is_input_error(&transport));
    assert!(!is_decode_error(&transport));
}
