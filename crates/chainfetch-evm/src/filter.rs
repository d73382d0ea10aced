//! `eth_getLogs` filter: which contract, which event, which indexed values.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::fetcher::RawLog;

/// An indexed event argument slot (`topics[1..=3]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexedTopic {
    First,
    Second,
    Third,
}

impl IndexedTopic {
    fn slot(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }
}

/// Filter for the logs of one contract event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Contract address (`None` = any contract).
    pub address: Option<String>,
    /// Human-readable event name, e.g. `"Transfer"`. Only used for logging.
    pub event: Option<String>,
    /// Event signature hash matched against `topics[0]` (`None` = any event).
    pub topic0: Option<String>,
    /// OR-lists for `topics[1..=3]`; an empty list matches anything.
    pub indexed: [Vec<String>; 3],
}

impl LogFilter {
    /// Create a filter for a single contract address.
    pub fn contract(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }

    /// Restrict to one event by name and signature hash.
    pub fn event(mut self, name: impl Into<String>, topic0: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self.topic0 = Some(topic0.into());
        self
    }

    /// Match an indexed argument against any of `values` (32-byte topics).
    pub fn indexed<I, S>(mut self, topic: IndexedTopic, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed[topic.slot()] = values.into_iter().map(Into::into).collect();
        self
    }

    /// Match an indexed `address` argument against any of `addresses`.
    pub fn indexed_addresses<I, S>(self, topic: IndexedTopic, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics: Vec<String> = addresses
            .into_iter()
            .map(|a| pad_address_topic(a.as_ref()))
            .collect();
        self.indexed(topic, topics)
    }

    /// Build the `eth_getLogs` parameter object for `[from, to_inclusive]`.
    pub fn to_rpc_params(&self, from: u64, to_inclusive: u64) -> Value {
        let mut params = Map::new();
        params.insert("fromBlock".into(), json!(format!("0x{from:x}")));
        params.insert("toBlock".into(), json!(format!("0x{to_inclusive:x}")));
        if let Some(address) = &self.address {
            params.insert("address".into(), json!(address));
        }

        let mut topics = vec![self.topic0.as_ref().map_or(Value::Null, |t| json!(t))];
        for values in &self.indexed {
            topics.push(match values.as_slice() {
                [] => Value::Null,
                [single] => json!(single),
                many => json!(many),
            });
        }
        while topics.last() == Some(&Value::Null) {
            topics.pop();
        }
        if !topics.is_empty() {
            params.insert("topics".into(), Value::Array(topics));
        }
        Value::Object(params)
    }

    /// Returns `true` if `log` passes this filter (case-insensitive hex).
    pub fn matches(&self, log: &RawLog) -> bool {
        let address_ok = self
            .address
            .as_ref()
            .map_or(true, |a| a.eq_ignore_ascii_case(&log.address));
        let topic0_ok = self.topic0.as_ref().map_or(true, |t| {
            log.topics
                .first()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(t))
        });
        let indexed_ok = self.indexed.iter().enumerate().all(|(i, values)| {
            values.is_empty()
                || log.topics.get(i + 1).is_some_and(|actual| {
                    values.iter().any(|v| v.eq_ignore_ascii_case(actual))
                })
        });
        address_ok && topic0_ok && indexed_ok
    }
}

/// Left-pad a 20-byte address to a 32-byte topic (`0x` + 64 hex chars).
pub fn pad_address_topic(address: &str) -> String {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    format!("0x{:0>64}", hex.to_ascii_lowercase())
}
