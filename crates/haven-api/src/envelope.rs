//! # Response Envelope
//!
//! Every success response is `{"success": true, "data": <entity>,
//! "message": <str|null>}`. Write endpoints put the full updated entity in
//! `data` so the dashboard reconciler can replace — never merge — its
//! optimistic copy with the server's authoritative state.

use serde::Serialize;

/// The uniform success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always `true`.
    pub success: bool,
    /// The full entity (or list) this response is authoritative for.
    pub data: T,
    /// Optional human-readable note.
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// Wrap a payload with a note.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(Envelope::new(vec![1, 2, 3])).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["message"], serde_json::Value::Null);
    }

    #[test]
    fn test_envelope_message() {
        let json = serde_json::to_value(Envelope::with_message(1, "lease created")).unwrap();
        assert_eq!(json["message"], "lease created");
    }
}
