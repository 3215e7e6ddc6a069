use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
use pretty_assertions::assert_eq;

// first byte is the PACK tag, second the Michelson string tag,
// next four bytes are the big endian payload length.
const PACK_TAG: u8 = 0x05;
const STRING_TAG: u8 = 0x01;
const PREFIX: &str = "0501";
const HEADER_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackedStringError {
    #[error("packed string prefix (expected {expected:?}, got {found:?})")]
    MissingPrefix {
        expected: &'static str,
        found: String,
    },
    #[error("failed to decode packed string to bytes: {0}")]
    InvalidHex(String),
    #[error("packed string too short ({0} bytes, header alone is 6)")]
    TooShort(usize),
    #[error(
        "length mismatch: expected {declared} bytes of payload, have {actual}"
    )]
    LengthMismatch { declared: u32, actual: usize },
    #[error("packed string payload is not valid utf8")]
    InvalidUtf8,
    #[error("string of {0} bytes is too long to pack")]
    TooLong(usize),
}

/// Packs a string the way PACK does for a Michelson string literal.
pub fn pack(s: &str) -> Result<Vec<u8>, PackedStringError> {
    let len =
        u32::try_from(s.len()).map_err(|_| PackedStringError::TooLong(s.len()))?;
    let mut res = Vec::with_capacity(HEADER_LEN + s.len());
    res.push(PACK_TAG);
    res.push(STRING_TAG);
    res.extend_from_slice(&len.to_be_bytes());
    res.extend_from_slice(s.as_bytes());
    Ok(res)
}

/// Hex form of `pack`, as stored in bytes fields and returned by indexers.
pub fn encode(s: &str) -> Result<String, PackedStringError> {
    Ok(hex::encode(pack(s)?))
}

pub fn decode(packed_hex: &str) -> Result<String, PackedStringError> {
    if !packed_hex.starts_with(PREFIX) {
        return Err(PackedStringError::MissingPrefix {
            expected: PREFIX,
            found: packed_hex.chars().take(4).collect(),
        });
    }
    let bytes = hex::decode(packed_hex)
        .map_err(|e| PackedStringError::InvalidHex(e.to_string()))?;
    if bytes.len() < HEADER_LEN {
        return Err(PackedStringError::TooShort(bytes.len()));
    }

    let declared = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    let payload = &bytes[HEADER_LEN..];
    if declared as usize != payload.len() {
        return Err(PackedStringError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    String::from_utf8(payload.to_vec())
        .map_err(|_| PackedStringError::InvalidUtf8)
}

/// A text field as the contracts store it: packed, hex encoded. The raw
/// value is always kept, `text()` falls back to it when it does not decode.
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PackedString(String);

impl PackedString {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    pub fn from_text(text: &str) -> Result<Self, PackedStringError> {
        Ok(Self(encode(text)?))
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<String, PackedStringError> {
        decode(&self.0)
    }

    pub fn text(&self) -> Cow<'_, str> {
        match self.decode() {
            Ok(s) => Cow::Owned(s),
            Err(e) => {
                debug!("keeping raw value {:?} ({})", self.0, e);
                Cow::Borrowed(&self.0)
            }
        }
    }
}

impl From<String> for PackedString {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for PackedString {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for PackedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[test]
fn test_decode() {
    struct TestCase {
        input: &'static str,
        exp: Result<&'static str, PackedStringError>,
    }
    let testcases = vec![
        TestCase {
            input: "05010000000473656c66",
            exp: Ok("self"),
        },
        TestCase {
            input: "0501000000096f74686572206f7267",
            exp: Ok("other org"),
        },
        TestCase {
            input: "05010000000c6578616d706c6520636f7270",
            exp: Ok("example corp"),
        },
        TestCase {
            input: "050100000000",
            exp: Ok(""),
        },
        TestCase {
            input: "hello",
            exp: Err(PackedStringError::MissingPrefix {
                expected: "0501",
                found: "hell".to_string(),
            }),
        },
        TestCase {
            // bytes literal, not a string
            input: "050a0000000473656c66",
            exp: Err(PackedStringError::MissingPrefix {
                expected: "0501",
                found: "050a".to_string(),
            }),
        },
        TestCase {
            input: "05010000",
            exp: Err(PackedStringError::TooShort(4)),
        },
        TestCase {
            input: "05010000000573656c66",
            exp: Err(PackedStringError::LengthMismatch {
                declared: 5,
                actual: 4,
            }),
        },
        TestCase {
            input: "05010000000373656c66",
            exp: Err(PackedStringError::LengthMismatch {
                declared: 3,
                actual: 4,
            }),
        },
        TestCase {
            input: "0501000000010xff",
            exp: Err(PackedStringError::InvalidHex(
                hex::decode("0501000000010xff")
                    .unwrap_err()
                    .to_string(),
            )),
        },
        TestCase {
            input: "050100000001ff",
            exp: Err(PackedStringError::InvalidUtf8),
        },
    ];
    for tc in testcases {
        println!("test case: {}", tc.input);
        assert_eq!(tc.exp.map(String::from), decode(tc.input));
    }
}

#[test]
fn test_encode() {
    assert_eq!("05010000000473656c66", encode("self").unwrap());
    assert_eq!(
        "0501000000096f74686572206f7267",
        encode("other org").unwrap()
    );
    assert_eq!(
        vec![0x05, 0x01, 0x00, 0x00, 0x00, 0x03, b'f', b'u', b'n'],
        pack("fun").unwrap()
    );
}

#[test]
fn test_roundtrip() {
    for s in &[
        "",
        "compsci",
        "a reason with spaces",
        "ünïcödé ✓ 碳",
        "{\"json\": [1, 2]}",
    ] {
        assert_eq!(*s, decode(&encode(s).unwrap()).unwrap());
    }
}

#[test]
fn test_packed_string_fallback() {
    let decodable = PackedString::new("0501000000096f74686572206f7267");
    assert_eq!("other org", decodable.text());
    assert_eq!("0501000000096f74686572206f7267", decodable.raw());

    let raw = PackedString::new("tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB");
    assert!(raw.decode().is_err());
    assert_eq!("tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB", raw.text());
    assert_eq!("tz1deC7DBmyTU7DtfV7f4YmpbW3xQkBYEwVB", format!("{}", raw));

    assert_eq!(
        "compsci",
        PackedString::from_text("compsci")
            .unwrap()
            .to_string()
    );
}
