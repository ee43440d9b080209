//! Response envelope written back for every request line.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Envelope<'a> {
    Ok {
        id: &'a str,
        ok: bool,
        result: Value,
    },
    Err {
        id: &'a str,
        ok: bool,
        error: ErrorBody<'a>,
    },
}

impl Envelope<'_> {
    fn into_value(self) -> Value {
        let id = match &self {
            Envelope::Ok { id, .. } | Envelope::Err { id, .. } => id.to_string(),
        };
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({
                "id": id,
                "ok": false,
                "error": { "code": "internal", "message": e.to_string() }
            })
        })
    }
}

pub fn ok(id: &str, result: Value) -> Value {
    Envelope::Ok {
        id,
        ok: true,
        result,
    }
    .into_value()
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    Envelope::Err {
        id,
        ok: false,
        error: ErrorBody {
            code,
            message: message.into(),
            details,
        },
    }
    .into_value()
}
