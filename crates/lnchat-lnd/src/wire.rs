//! JSON shapes of the lnd REST gateway.
//!
//! The gateway encodes `bytes` as standard base64, 64-bit integers as
//! strings, enums by name, and map keys of custom records as decimal
//! strings.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use lnchat_shared::CustomRecords;

use crate::error::RpcError;
use crate::models::{
    FailureReason, Graph, GraphNode, HtlcState, Invoice, InvoiceHtlc, InvoiceState, KeyLocator,
    NodeInfo, PaymentStatus, SendPaymentRequest,
};

/// One line of a server stream.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFrame<T> {
    pub result: Option<T>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default, deserialize_with = "de_i64")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphJson {
    #[serde(default)]
    pub nodes: Vec<GraphNodeJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphNodeJson {
    #[serde(default)]
    pub pub_key: String,
    #[serde(default)]
    pub alias: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetInfoJson {
    #[serde(default)]
    pub identity_pubkey: String,
    #[serde(default)]
    pub alias: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvoiceJson {
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "de_i64")]
    pub amt_paid_msat: i64,
    #[serde(default)]
    pub htlcs: Vec<InvoiceHtlcJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvoiceHtlcJson {
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "de_i64")]
    pub amt_msat: i64,
    #[serde(default)]
    pub custom_records: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentJson {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "de_i64")]
    pub fee_msat: i64,
    #[serde(default)]
    pub failure_reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendPaymentJson {
    pub dest: String,
    pub amt_msat: String,
    pub payment_hash: String,
    pub final_cltv_delta: i32,
    pub fee_limit_msat: String,
    pub timeout_seconds: i32,
    pub dest_custom_records: HashMap<String, String>,
    pub no_inflight_updates: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyLocatorJson {
    pub key_family: i32,
    pub key_index: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignMessageJson {
    pub msg: String,
    pub key_loc: KeyLocatorJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignMessageResponseJson {
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyMessageJson {
    pub msg: String,
    pub signature: String,
    pub pubkey: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyMessageResponseJson {
    #[serde(default)]
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<GraphJson> for Graph {
    fn from(g: GraphJson) -> Self {
        Graph {
            nodes: g
                .nodes
                .into_iter()
                .map(|n| GraphNode {
                    pub_key: n.pub_key,
                    alias: n.alias,
                })
                .collect(),
        }
    }
}

impl From<GetInfoJson> for NodeInfo {
    fn from(i: GetInfoJson) -> Self {
        NodeInfo {
            identity_pubkey: i.identity_pubkey,
            alias: i.alias,
        }
    }
}

impl TryFrom<InvoiceJson> for Invoice {
    type Error = RpcError;

    fn try_from(inv: InvoiceJson) -> Result<Self, Self::Error> {
        let state = match inv.state.as_str() {
            "OPEN" | "" => InvoiceState::Open,
            "SETTLED" => InvoiceState::Settled,
            "CANCELED" => InvoiceState::Canceled,
            "ACCEPTED" => InvoiceState::Accepted,
            other => return Err(RpcError::Decode(format!("unknown invoice state {other}"))),
        };

        let htlcs = inv
            .htlcs
            .into_iter()
            .map(InvoiceHtlc::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Invoice {
            state,
            amt_paid_msat: inv.amt_paid_msat,
            htlcs,
        })
    }
}

impl TryFrom<InvoiceHtlcJson> for InvoiceHtlc {
    type Error = RpcError;

    fn try_from(h: InvoiceHtlcJson) -> Result<Self, Self::Error> {
        let state = match h.state.as_str() {
            "ACCEPTED" | "" => HtlcState::Accepted,
            "SETTLED" => HtlcState::Settled,
            "CANCELED" => HtlcState::Canceled,
            other => return Err(RpcError::Decode(format!("unknown htlc state {other}"))),
        };

        Ok(InvoiceHtlc {
            state,
            amt_msat: h.amt_msat,
            custom_records: records_from_json(&h.custom_records)?,
        })
    }
}

impl From<PaymentJson> for PaymentStatus {
    fn from(p: PaymentJson) -> Self {
        match p.status.as_str() {
            "IN_FLIGHT" | "INITIATED" => PaymentStatus::InFlight,
            "SUCCEEDED" => PaymentStatus::Succeeded {
                fee_msat: p.fee_msat,
            },
            _ => PaymentStatus::Failed(failure_reason(&p.failure_reason)),
        }
    }
}

fn failure_reason(s: &str) -> FailureReason {
    match s {
        "FAILURE_REASON_TIMEOUT" => FailureReason::Timeout,
        "FAILURE_REASON_NO_ROUTE" => FailureReason::NoRoute,
        "FAILURE_REASON_ERROR" => FailureReason::Error,
        "FAILURE_REASON_INCORRECT_PAYMENT_DETAILS" => FailureReason::IncorrectPaymentDetails,
        "FAILURE_REASON_INSUFFICIENT_BALANCE" => FailureReason::InsufficientBalance,
        _ => FailureReason::Unknown,
    }
}

impl From<&SendPaymentRequest> for SendPaymentJson {
    fn from(req: &SendPaymentRequest) -> Self {
        SendPaymentJson {
            dest: B64.encode(req.dest.as_bytes()),
            amt_msat: req.amt_msat.to_string(),
            payment_hash: B64.encode(req.payment_hash.as_bytes()),
            final_cltv_delta: req.final_cltv_delta,
            fee_limit_msat: req.fee_limit_msat.to_string(),
            timeout_seconds: req.timeout_seconds,
            dest_custom_records: records_to_json(&req.dest_custom_records),
            no_inflight_updates: false,
        }
    }
}

impl From<KeyLocator> for KeyLocatorJson {
    fn from(k: KeyLocator) -> Self {
        KeyLocatorJson {
            key_family: k.key_family,
            key_index: k.key_index,
        }
    }
}

pub(crate) fn records_to_json(records: &CustomRecords) -> HashMap<String, String> {
    records
        .iter()
        .map(|(tag, value)| (tag.to_string(), B64.encode(value)))
        .collect()
}

pub(crate) fn records_from_json(json: &HashMap<String, String>) -> Result<CustomRecords, RpcError> {
    json.iter()
        .map(|(tag, value)| {
            let tag = tag
                .parse::<u64>()
                .map_err(|e| RpcError::Decode(format!("invalid record type {tag}: {e}")))?;
            Ok((tag, B64.decode(value)?))
        })
        .collect()
}

/// Accept 64-bit integers encoded either as JSON numbers or strings.
fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int {
        Num(i64),
        Str(String),
    }

    match Int::deserialize(deserializer)? {
        Int::Num(n) => Ok(n),
        Int::Str(s) if s.is_empty() => Ok(0),
        Int::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
