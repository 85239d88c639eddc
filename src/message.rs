use derive_ex::derive_ex;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Error, Result};

#[cfg(test)]
mod tests;

/// A JSON-RPC request id as it appears on the wire: an integer, a float,
/// or a string.
#[derive_ex(Eq, PartialEq, Hash)]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Float(#[eq(key = OrderedFloat($))] f64),
    String(String),
}

const MAX_SAFE_INTEGER: u64 = 9007199254740991;

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        if id <= MAX_SAFE_INTEGER {
            RequestId::Number(id as i64)
        } else {
            RequestId::String(id.to_string())
        }
    }
}

impl RequestId {
    /// Pending-registry key, for ids that can have originated from the
    /// call counter.
    pub(crate) fn as_key(&self) -> Option<u64> {
        match self {
            RequestId::Number(n) => u64::try_from(*n).ok(),
            RequestId::Float(f) => {
                if f.fract() == 0.0 && *f >= 0.0 && *f <= MAX_SAFE_INTEGER as f64 {
                    Some(*f as u64)
                } else {
                    None
                }
            }
            RequestId::String(s) => s.parse().ok(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            RequestId::Number(n) => Value::from(n),
            RequestId::Float(f) => Value::from(f),
            RequestId::String(s) => Value::from(s),
        }
    }
}

/// Serialize-side message envelope. Absent fields stay off the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Default for RawMessage {
    fn default() -> Self {
        RawMessage {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }
}

/// An inbound error response, as delivered to the response-error listener.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub id: Option<RequestId>,
    pub error: Value,
}

pub(crate) enum Message {
    Response(ResponseMessage),
    Request(RequestMessage),
    Error(ErrorMessage),
}

pub(crate) struct ResponseMessage {
    pub id: Option<RequestId>,
    pub result: Value,
}

pub(crate) struct RequestMessage {
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Option<Value>,
}

pub(crate) struct ErrorMessage {
    pub id: Option<RequestId>,
    pub error: Value,
}

impl Message {
    /// Classifies one decoded message by field presence, with precedence
    /// `result`, then `method`, then `error`. Presence is what counts:
    /// `"result": null` is a response. An id of `null` counts as absent.
    pub(crate) fn classify(value: Value) -> Result<Message> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return Err(Error::InvalidMessage(other)),
        };
        let id = match fields.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => match serde_json::from_value(id.clone()) {
                Ok(id) => Some(id),
                Err(_) => return Err(Error::InvalidMessage(Value::Object(fields))),
            },
        };
        if let Some(result) = fields.remove("result") {
            return Ok(Message::Response(ResponseMessage { id, result }));
        }
        match fields.remove("method") {
            Some(Value::String(method)) => {
                let params = fields.remove("params");
                return Ok(Message::Request(RequestMessage { id, method, params }));
            }
            Some(method) => {
                fields.insert("method".to_string(), method);
                return Err(Error::InvalidMessage(Value::Object(fields)));
            }
            None => {}
        }
        if let Some(error) = fields.remove("error") {
            return Ok(Message::Error(ErrorMessage { id, error }));
        }
        Err(Error::InvalidMessage(Value::Object(fields)))
    }
}

impl ResponseMessage {
    pub(crate) fn into_value(self) -> Value {
        rebuild(self.id, |fields| {
            fields.insert("result".to_string(), self.result);
        })
    }
}

impl RequestMessage {
    pub(crate) fn into_value(self) -> Value {
        rebuild(self.id, |fields| {
            fields.insert("method".to_string(), Value::from(self.method));
            if let Some(params) = self.params {
                fields.insert("params".to_string(), params);
            }
        })
    }
}

fn rebuild(id: Option<RequestId>, fill: impl FnOnce(&mut Map<String, Value>)) -> Value {
    let mut fields = Map::new();
    fields.insert("jsonrpc".to_string(), Value::from("2.0"));
    if let Some(id) = id {
        fields.insert("id".to_string(), id.into_value());
    }
    fill(&mut fields);
    Value::Object(fields)
}
