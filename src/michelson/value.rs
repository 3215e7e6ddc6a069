use num::{BigInt, BigUint};
use serde_json::json;

#[cfg(test)]
use pretty_assertions::assert_eq;

/// Michelson data as it is sent to a node: entrypoint arguments and
/// initial storage. Numbers stay arbitrary precision all the way down.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Value {
    Bytes(Vec<u8>),
    Elt(Box<Value>, Box<Value>),
    Int(BigInt),
    Left(Box<Value>),
    Nat(BigUint),
    Pair(Box<Value>, Box<Value>),
    Right(Box<Value>),
    Seq(Vec<Value>),
    String(String),
    Unit,
}

impl Value {
    pub fn nat<N: Into<BigUint>>(n: N) -> Value {
        Value::Nat(n.into())
    }

    pub fn string<S: Into<String>>(s: S) -> Value {
        Value::String(s.into())
    }

    pub fn bytes<B: Into<Vec<u8>>>(b: B) -> Value {
        Value::Bytes(b.into())
    }

    pub fn pair(left: Value, right: Value) -> Value {
        Value::Pair(Box::new(left), Box::new(right))
    }

    pub fn elt(key: Value, value: Value) -> Value {
        Value::Elt(Box::new(key), Box::new(value))
    }

    pub fn left(v: Value) -> Value {
        Value::Left(Box::new(v))
    }

    pub fn right(v: Value) -> Value {
        Value::Right(Box::new(v))
    }

    /// Right comb of pairs, `Pair a b c` is `Pair a (Pair b c)`.
    pub fn comb(xs: Vec<Value>) -> Value {
        let mut xs = xs;
        match xs.len() {
            0 => Value::Unit,
            1 => xs.remove(0),
            _ => {
                let left = xs.remove(0);
                Value::pair(left, Value::comb(xs))
            }
        }
    }

    /// A map literal, given entries must already be in key order.
    pub fn map<I>(entries: I) -> Value
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        Value::Seq(
            entries
                .into_iter()
                .map(|(k, v)| Value::elt(k, v))
                .collect(),
        )
    }

    pub fn args(&self) -> Vec<&Value> {
        match self {
            Value::Elt(l, r) | Value::Pair(l, r) => vec![l.as_ref(), r.as_ref()],
            Value::Left(x) | Value::Right(x) => vec![x.as_ref()],
            Value::Seq(xs) => xs.iter().collect(),
            _ => vec![],
        }
    }

    /// Micheline JSON, the form the node RPC and indexers speak.
    pub fn to_micheline(&self) -> serde_json::Value {
        match self {
            Value::Bytes(b) => json!({ "bytes": hex::encode(b) }),
            Value::Int(i) => json!({ "int": i.to_string() }),
            Value::Nat(n) => json!({ "int": n.to_string() }),
            Value::String(s) => json!({ "string": s }),
            Value::Unit => json!({ "prim": "Unit" }),
            Value::Seq(xs) => serde_json::Value::Array(
                xs.iter()
                    .map(|x| x.to_micheline())
                    .collect(),
            ),
            Value::Elt(l, r) => prim("Elt", &[l.as_ref(), r.as_ref()]),
            Value::Pair(l, r) => prim("Pair", &[l.as_ref(), r.as_ref()]),
            Value::Left(x) => prim("Left", &[x.as_ref()]),
            Value::Right(x) => prim("Right", &[x.as_ref()]),
        }
    }
}

fn prim(name: &str, args: &[&Value]) -> serde_json::Value {
    json!({
        "prim": name,
        "args": args
            .iter()
            .map(|a| a.to_micheline())
            .collect::<Vec<serde_json::Value>>(),
    })
}

/// A contract call argument: the entrypoint and its value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameters {
    pub entrypoint: String,
    pub value: Value,
}

impl Parameters {
    pub fn new(entrypoint: &str, value: Value) -> Self {
        Self {
            entrypoint: entrypoint.to_string(),
            value,
        }
    }

    pub fn to_micheline(&self) -> serde_json::Value {
        json!({
            "entrypoint": self.entrypoint,
            "value": self.value.to_micheline(),
        })
    }
}

#[test]
fn test_comb() {
    let v = |n: u32| Value::nat(n);
    assert_eq!(Value::Unit, Value::comb(vec![]));
    assert_eq!(v(1), Value::comb(vec![v(1)]));
    assert_eq!(Value::pair(v(1), v(2)), Value::comb(vec![v(1), v(2)]));
    assert_eq!(
        Value::pair(v(1), Value::pair(v(2), v(3))),
        Value::comb(vec![v(1), v(2), v(3)])
    );
}

#[test]
fn test_to_micheline() {
    let value = Value::Seq(vec![Value::left(Value::comb(vec![
        Value::bytes(vec![0x05, 0x01]),
        Value::string("KT1U7Adyu5A7JWvEVSKjJEkG2He2SU1nATfq"),
        Value::nat(42u32),
    ]))]);
    let exp = json!([{
        "prim": "Left",
        "args": [{
            "prim": "Pair",
            "args": [
                { "bytes": "0501" },
                {
                    "prim": "Pair",
                    "args": [
                        { "string": "KT1U7Adyu5A7JWvEVSKjJEkG2He2SU1nATfq" },
                        { "int": "42" },
                    ]
                },
            ]
        }]
    }]);
    assert_eq!(exp, value.to_micheline());

    let params = Parameters::new(
        "mint",
        Value::map(vec![(Value::string("a"), Value::Int(BigInt::from(-1)))]),
    );
    assert_eq!(
        json!({
            "entrypoint": "mint",
            "value": [{
                "prim": "Elt",
                "args": [{ "string": "a" }, { "int": "-1" }]
            }]
        }),
        params.to_micheline()
    );
}
