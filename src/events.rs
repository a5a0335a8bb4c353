use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single payload value attached to a trace event.
///
/// Values participate in correlation keys, so they must hash and compare
/// exactly; floating point payloads are not representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::UInt(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// One timestamped trace occurrence: a name, a monotonic nanosecond
/// timestamp, and a payload field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    pub ts: u64,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

impl TraceEvent {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

// The trace input is JSON lines, one message per line:
//
// {"type": "stream-begin"}
// {"type": "event", "name": "net:send", "ts": 1000000000, "fields": {"id": 1}}
// {"type": "event", "name": "net:recv", "ts": 1050000000, "fields": {"id": 1}}
// {"type": "stream-end"}
//
// Stream and packet boundary markers carry no payload and are dropped
// before events reach any consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamMessage {
    StreamBegin,
    StreamEnd,
    PacketBegin,
    PacketEnd,
    Event(TraceEvent),
}
