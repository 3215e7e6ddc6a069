use crate::error::DecodeError;
use crate::tzkt::BigMapItem;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Entries {
    /// skip keys that have been removed from the big-map
    ActiveOnly,
    All,
}

/// Decodes every item of a big-map into a map. Keys are decoded with serde,
/// values with `decode_value`. The first item that does not decode fails
/// the whole map.
pub(crate) fn collect<K, V, F>(
    what: &'static str,
    items: &[BigMapItem],
    entries: Entries,
    decode_value: F,
) -> Result<BTreeMap<K, V>, DecodeError>
where
    K: DeserializeOwned + Ord,
    F: Fn(&serde_json::Value) -> Result<V, DecodeError>,
{
    let mut res = BTreeMap::new();
    for item in items {
        if entries == Entries::ActiveOnly && !item.active {
            continue;
        }
        let key: K =
            serde_json::from_value(item.key.clone()).map_err(|source| {
                DecodeError::BigMapKey {
                    what,
                    key: item.key.to_string(),
                    source,
                }
            })?;
        let value = decode_value(&item.value)?;
        res.insert(key, value);
    }
    debug!(
        "decoded {} big-map: {} of {} items",
        what,
        res.len(),
        items.len()
    );
    Ok(res)
}

/// Value decoder for values that deserialize directly.
pub(crate) fn typed<T>(
    what: &'static str,
) -> impl Fn(&serde_json::Value) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    move |raw| {
        serde_json::from_value(raw.clone()).map_err(|source| {
            DecodeError::BigMapValue {
                what,
                value: raw.to_string(),
                source,
            }
        })
    }
}

/// Big-map bytes values come back hex encoded. Values that are valid hex
/// and valid utf8 once decoded are returned as text, anything else is
/// returned unchanged (with a warning).
pub(crate) fn hex_to_text(raw: &str) -> String {
    match decode_hex_text(raw) {
        Ok(text) => text,
        Err(reason) => {
            warn!("{:?} {}, keeping it raw", raw, reason);
            raw.to_string()
        }
    }
}

fn decode_hex_text(raw: &str) -> Result<String, &'static str> {
    let bytes = hex::decode(raw).map_err(|_| "is not hex")?;
    String::from_utf8(bytes).map_err(|_| "is hex but not utf8")
}

/// Value decoder for metadata style `string -> bytes` maps.
pub(crate) fn metadata_text(
    what: &'static str,
) -> impl Fn(&serde_json::Value) -> Result<String, DecodeError> {
    let as_string = typed::<String>(what);
    move |raw| Ok(hex_to_text(&as_string(raw)?))
}
