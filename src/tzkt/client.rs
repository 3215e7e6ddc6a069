use super::{BigMapItem, Event, Indexer};
use anyhow::{anyhow, Context, Result};
use backoff::{retry, Error, ExponentialBackoff};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use pretty_assertions::assert_eq;

const PAGE_SIZE: usize = 1000;

#[derive(Error, Debug)]
#[error("bad http status code: {}", .status_code)]
struct HttpError {
    status_code: u16,
    body: String,
}

#[derive(Clone)]
pub struct TzKTClient {
    api_url: String,
    timeout: Duration,
    comm_retries: i32,
    page_size: usize,
}

impl TzKTClient {
    pub fn new(api_url: String, comm_retries: i32) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(20),
            comm_retries,
            page_size: PAGE_SIZE,
        }
    }

    /// Fetches every page of a list endpoint, TzKT caps each response at
    /// `limit` items.
    fn load_all<T>(
        &self,
        endpoint: &str,
        query_params: &[(String, String)],
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut res: Vec<T> = vec![];
        loop {
            let mut params = query_params.to_vec();
            params.push(("limit".to_string(), format!("{}", self.page_size)));
            params.push(("offset".to_string(), format!("{}", res.len())));

            let body = self.load(endpoint, &params)?;
            let page: Vec<T> = Self::deserialize(&body).with_context(|| {
                format!("failed to parse response of {}", endpoint)
            })?;
            let page_len = page.len();
            res.extend(page);
            if page_len < self.page_size {
                break;
            }
        }
        Ok(res)
    }

    fn load(
        &self,
        endpoint: &str,
        query_params: &[(String, String)],
    ) -> Result<String> {
        let max_attempts = if self.comm_retries >= 0 {
            format!("{}", self.comm_retries + 1)
        } else {
            "∞".to_string()
        };

        let mut attempt = 0;
        retry(ExponentialBackoff::default(), || {
            attempt += 1;
            let res = self.load_once(endpoint, query_params);
            if let Err(e) = &res {
                warn!(
                    "failed to call indexer endpoint (attempt {}/{}) (endpoint={}), err: {:?}",
                    attempt, max_attempts, endpoint, e
                );
            }
            res.map_err(|e| {
                if self.comm_retries >= 0 && attempt > self.comm_retries {
                    Error::Permanent(e)
                } else {
                    transient_err(e)
                }
            })
        })
        .map_err(|e| match e {
            Error::Permanent(e) | Error::Transient(e) => e,
        })
        .with_context(|| {
            format!("failed to call indexer (endpoint={})", endpoint)
        })
    }

    fn load_once(
        &self,
        endpoint: &str,
        query_params: &[(String, String)],
    ) -> Result<String> {
        let uri = format!("{}/{}", self.api_url, endpoint);
        debug!("GET {} {:?}..", uri, query_params);

        let cli = reqwest::blocking::Client::new();
        let resp = cli
            .get(&uri)
            .query(query_params)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()?;

        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(HttpError {
                status_code: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(body)
    }

    fn deserialize<T: DeserializeOwned>(body: &str) -> Result<T> {
        let mut deserializer = serde_json::Deserializer::from_str(body);
        deserializer.disable_recursion_limit();
        let deserializer = serde_stacker::Deserializer::new(&mut deserializer);
        Ok(T::deserialize(deserializer)?)
    }
}

fn transient_err(e: anyhow::Error) -> Error<anyhow::Error> {
    if let Some(req_err) = e.downcast_ref::<reqwest::Error>() {
        if req_err.is_timeout() || req_err.is_connect() {
            warn!(
                "transient indexer communication error, retrying.. err={:?}",
                req_err
            );
            return Error::Transient(e);
        }
    }
    if let Some(http_err) = e.downcast_ref::<HttpError>() {
        if http_err.status_code == 429 || http_err.status_code >= 500 {
            warn!(
                "transient indexer communication error, retrying.. err={}",
                http_err
            );
            return Error::Transient(e);
        }
        return Error::Permanent(anyhow!(
            "bad http status code {}, not retrying.. (body: {})",
            http_err.status_code,
            http_err.body
        ));
    }
    warn!(
        "permanent indexer communication error, not retrying.. err={:?}",
        e
    );
    Error::Permanent(e)
}

/// TzKT answers with whatever it has, so make sure the items we got are
/// real big-map keys and not some other object that happened to parse.
fn check_bigmap_items(items: &[BigMapItem]) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        if item.id == 0 {
            return Err(anyhow!(
                "item {} had invalid identifier {}",
                index,
                item.id
            ));
        }
        if item.hash.is_empty() {
            return Err(anyhow!("item {} had empty hash", index));
        }
    }
    Ok(())
}

impl Indexer for TzKTClient {
    fn contract_storage(&self, address: &str) -> Result<serde_json::Value> {
        let body = self
            .load(&format!("v1/contracts/{}/storage", address), &[])
            .with_context(|| {
                format!("failed to get storage for contract='{}'", address)
            })?;
        Self::deserialize(&body).with_context(|| {
            format!(
                "failed to parse storage for contract='{}', storage body={}",
                address, body
            )
        })
    }

    fn bigmap_keys(&self, bigmap_id: i64) -> Result<Vec<BigMapItem>> {
        let items: Vec<BigMapItem> = self
            .load_all(&format!("v1/bigmaps/{}/keys", bigmap_id), &[])
            .with_context(|| {
                format!("failed to get keys of bigmap_id={}", bigmap_id)
            })?;
        check_bigmap_items(&items)?;
        Ok(items)
    }

    fn contract_events(&self, address: &str, tag: &str) -> Result<Vec<Event>> {
        self.load_all(
            "v1/contracts/events",
            &[
                ("contract".to_string(), address.to_string()),
                ("tag".to_string(), tag.to_string()),
            ],
        )
        .with_context(|| {
            format!(
                "failed to get events for contract='{}', tag={}",
                address, tag
            )
        })
    }
}

#[test]
fn test_bigmap_page() {
    struct TestCase {
        name: String,
        body: String,
        exp_count: usize,
        exp_error: bool,
    }
    let testcases = vec![
        TestCase {
            name: "empty bigmap or unknown id".to_string(),
            body: "[]".to_string(),
            exp_count: 0,
            exp_error: false,
        },
        TestCase {
            name: "wrong payload".to_string(),
            body: r#"[{"This": "Is the wrong", "Payload": 42}]"#.to_string(),
            exp_count: 0,
            exp_error: true,
        },
        TestCase {
            name: "empty object".to_string(),
            body: "[{}]".to_string(),
            exp_count: 0,
            exp_error: true,
        },
        TestCase {
            name: "zero identifier".to_string(),
            body: r#"[{"id": 0, "active": true, "hash": "expr", "key": "a", "value": "1"}]"#
                .to_string(),
            exp_count: 0,
            exp_error: true,
        },
        TestCase {
            name: "single custodian ledger key".to_string(),
            body: r#"[
                {
                    "id": 131066,
                    "active": false,
                    "hash": "exprumPYk1WQo92cnqQ67ZDn26HMpSSHxXcY8ALtvcHXMQFMjhTrtQ",
                    "key": {
                        "kyc": "05010000000473656c66",
                        "token": {
                            "token_id": "123",
                            "token_address": "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR"
                        }
                    },
                    "value": "500",
                    "firstLevel": 371199,
                    "lastLevel": 371202,
                    "updates": 3
                }
            ]"#
            .to_string(),
            exp_count: 1,
            exp_error: false,
        },
    ];
    for tc in testcases {
        println!("test case: {}", tc.name);
        let res = TzKTClient::deserialize::<Vec<BigMapItem>>(&tc.body)
            .and_then(|items| check_bigmap_items(&items).map(|_| items));
        if tc.exp_error {
            assert!(res.is_err());
        } else {
            assert_eq!(tc.exp_count, res.unwrap().len());
        }
    }
}

#[test]
fn test_event_deserialize() {
    let body = r#"[
        {
            "id": 12,
            "level": 371300,
            "timestamp": "2022-12-02T10:00:00Z",
            "contract": {"address": "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR"},
            "codeHash": -1207321452,
            "tag": "internal_mint",
            "payload": {
                "token": {"token_id": "1", "token_address": "KT1MHx2nw8y2JyryGbuAvTYPNGwrfTp4PEYR"},
                "amount": "10",
                "new_total": "10"
            },
            "transactionId": 98765
        }
    ]"#;
    let events: Vec<Event> = TzKTClient::deserialize(body).unwrap();
    assert_eq!(1, events.len());
    assert_eq!("internal_mint", events[0].tag);
    assert_eq!(371300, events[0].level);
    assert_eq!("10", events[0].payload["amount"]);
}

#[test]
fn test_transient_err() {
    let retried = |status_code: u16| {
        matches!(
            transient_err(
                HttpError {
                    status_code,
                    body: "".to_string()
                }
                .into()
            ),
            Error::Transient(_)
        )
    };
    assert!(retried(429));
    assert!(retried(502));
    assert!(!retried(404));
    assert!(!retried(400));
    assert!(matches!(
        transient_err(anyhow!("something else")),
        Error::Permanent(_)
    ));
}
